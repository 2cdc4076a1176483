//! Foreground pipeline run for the CLI.

use std::collections::HashMap;
use std::path::Path;

use anyhow::Context;
use chronicle_core::{AppConfig, ProcessResult};
use chronicle_pipeline::{
    PipelineConfig, PipelineDeps, PipelineOrchestrator, PipelineRequest, RunReport,
};

use crate::RunArgs;

/// Builds a request from `args`, runs it to completion and prints the report.
///
/// # Errors
///
/// Returns an error if an input file cannot be read, the request fails
/// validation, a client cannot be constructed, or the run ends `Failed`.
pub(crate) async fn run_pipeline(config: &AppConfig, args: RunArgs) -> anyhow::Result<()> {
    let request = build_request(args)?;
    let job = request.validate()?;

    let deps = PipelineDeps::from_app_config(config)?;
    let orchestrator = PipelineOrchestrator::new(deps, PipelineConfig::from_app_config(config));

    let report = orchestrator.run(job).await;
    print_report(&report);

    if report.process_result == ProcessResult::Failed {
        anyhow::bail!("summary run failed");
    }
    Ok(())
}

pub(crate) fn build_request(args: RunArgs) -> anyhow::Result<PipelineRequest> {
    let existing_summaries = match &args.existing {
        Some(path) => read_existing(path)?,
        None => HashMap::new(),
    };

    Ok(PipelineRequest {
        account_id: args.account,
        user_id: args.user,
        callback_url: args.callback_url,
        callback_token: args.callback_token,
        monthly_prompt: read_prompt(&args.monthly_prompt)?,
        quarterly_prompt: read_prompt(&args.quarterly_prompt)?,
        activity_query: args.query,
        existing_summaries,
        monthly_schema: None,
        quarterly_schema: None,
    })
}

fn read_prompt(path: &Path) -> anyhow::Result<String> {
    std::fs::read_to_string(path)
        .with_context(|| format!("failed to read prompt file {}", path.display()))
}

fn read_existing(path: &Path) -> anyhow::Result<HashMap<String, String>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read existing summaries {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("{} is not a JSON object of period key to record id", path.display()))
}

fn print_report(report: &RunReport) {
    println!("result:   {}", report.process_result);
    println!("months:   {}", report.months_summarized);
    println!("quarters: {}", report.quarters_summarized);
    for line in report.message.lines() {
        println!("  {line}");
    }
}
