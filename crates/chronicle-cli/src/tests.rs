use std::path::PathBuf;

use super::*;

fn scratch_file(name: &str, contents: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("chronicle-cli-{}-{name}", std::process::id()));
    std::fs::write(&path, contents).expect("write scratch file");
    path
}

#[test]
fn parses_check_query_command() {
    let cli = Cli::try_parse_from([
        "chronicle-cli",
        "check-query",
        "SELECT Id FROM Task ORDER BY ActivityDate",
    ])
    .expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Commands::CheckQuery { ref query } if query.ends_with("ORDER BY ActivityDate")
    ));
}

#[test]
fn parses_run_command() {
    let cli = Cli::try_parse_from([
        "chronicle-cli",
        "run",
        "--account",
        "001A",
        "--user",
        "005U",
        "--callback-url",
        "https://crm.example.com/cb",
        "--callback-token",
        "t",
        "--monthly-prompt",
        "monthly.txt",
        "--quarterly-prompt",
        "quarterly.txt",
        "--query",
        "SELECT Id FROM Task ORDER BY ActivityDate",
    ])
    .expect("expected valid cli args");

    let Commands::Run(args) = cli.command else {
        panic!("expected run command");
    };
    assert_eq!(args.account, "001A");
    assert_eq!(args.monthly_prompt, PathBuf::from("monthly.txt"));
    assert!(args.existing.is_none());
}

#[test]
fn run_requires_query() {
    let result = Cli::try_parse_from([
        "chronicle-cli",
        "run",
        "--account",
        "001A",
        "--user",
        "005U",
        "--callback-url",
        "https://crm.example.com/cb",
        "--callback-token",
        "t",
        "--monthly-prompt",
        "m.txt",
        "--quarterly-prompt",
        "q.txt",
    ]);
    assert!(result.is_err());
}

#[test]
fn build_request_reads_prompt_and_lookup_files() {
    let monthly = scratch_file("monthly.txt", "Summarize {{YearMonth}}");
    let quarterly = scratch_file("quarterly.txt", "Summarize {{Quarter}} {{Year}}");
    let existing = scratch_file("existing.json", r#"{"Jan 2024": "a01A"}"#);

    let request = run::build_request(RunArgs {
        account: "001A".into(),
        user: "005U".into(),
        callback_url: "https://crm.example.com/cb".into(),
        callback_token: "t".into(),
        monthly_prompt: monthly.clone(),
        quarterly_prompt: quarterly.clone(),
        query: "SELECT Id FROM Task ORDER BY ActivityDate".into(),
        existing: Some(existing.clone()),
    })
    .expect("request");

    assert_eq!(request.monthly_prompt, "Summarize {{YearMonth}}");
    assert_eq!(request.quarterly_prompt, "Summarize {{Quarter}} {{Year}}");
    assert_eq!(
        request.existing_summaries.get("Jan 2024").map(String::as_str),
        Some("a01A")
    );
    assert!(request.validate().is_ok());

    for path in [monthly, quarterly, existing] {
        let _ = std::fs::remove_file(path);
    }
}

#[test]
fn build_request_reports_missing_prompt_file() {
    let err = run::build_request(RunArgs {
        account: "001A".into(),
        user: "005U".into(),
        callback_url: "https://crm.example.com/cb".into(),
        callback_token: "t".into(),
        monthly_prompt: PathBuf::from("/nonexistent/chronicle/monthly.txt"),
        quarterly_prompt: PathBuf::from("/nonexistent/chronicle/quarterly.txt"),
        query: "SELECT Id FROM Task ORDER BY ActivityDate".into(),
        existing: None,
    })
    .unwrap_err();
    assert!(err.to_string().contains("monthly.txt"));
}
