use serde_json::json;

use super::*;

fn valid_request() -> PipelineRequest {
    serde_json::from_value(json!({
        "accountId": "001A",
        "userId": "005U",
        "callbackUrl": "https://crm.example.com/services/apexrest/summaryCallback",
        "callbackToken": "cb-token",
        "monthlyPrompt": "Summarize {{YearMonth}}",
        "quarterlyPrompt": "Summarize {{Quarter}} {{Year}}",
        "activityQuery": "SELECT Id, ActivityDate, Subject, Description FROM Task WHERE WhatId = '001A' ORDER BY ActivityDate ASC",
        "existingSummaries": {"Jan 2024": "a01A"}
    }))
    .expect("fixture should deserialize")
}

#[test]
fn valid_request_uses_builtin_schemas() {
    let job = valid_request().validate().expect("should validate");
    assert_eq!(job.monthly_schema, FunctionSchema::monthly());
    assert_eq!(job.quarterly_schema, FunctionSchema::quarterly());
    assert_eq!(job.existing_summaries.get("Jan 2024").map(String::as_str), Some("a01A"));
    assert_eq!(job.callback.token, "cb-token");
}

#[test]
fn missing_field_is_named() {
    let mut request = valid_request();
    request.quarterly_prompt = "  ".into();
    let err = request.validate().unwrap_err();
    assert_eq!(err.field, "quarterlyPrompt");
}

#[test]
fn descending_query_is_rejected() {
    let mut request = valid_request();
    request.activity_query = "SELECT Id FROM Task ORDER BY ActivityDate DESC".into();
    let err = request.validate().unwrap_err();
    assert_eq!(err.field, "activityQuery");
}

#[test]
fn non_http_callback_is_rejected() {
    let mut request = valid_request();
    request.callback_url = "ftp://example.com/cb".into();
    assert_eq!(request.validate().unwrap_err().field, "callbackUrl");

    let mut request = valid_request();
    request.callback_url = "not a url".into();
    assert_eq!(request.validate().unwrap_err().field, "callbackUrl");
}

#[test]
fn schema_override_must_keep_function_name() {
    let mut request = valid_request();
    request.monthly_schema = Some(json!({
        "name": "summarize_month",
        "parameters": {"type": "object"}
    }));
    let err = request.validate().unwrap_err();
    assert_eq!(err.field, "monthlySchema");
    assert!(err.message.contains("generate_monthly_summary"));
}

#[test]
fn matching_schema_override_is_used() {
    let mut request = valid_request();
    request.quarterly_schema = Some(json!({
        "name": "generate_quarterly_summary",
        "description": "custom",
        "parameters": {"type": "object", "properties": {}}
    }));
    let job = request.validate().expect("override should be accepted");
    assert_eq!(job.quarterly_schema.description, "custom");
}

#[test]
fn blank_existing_id_is_rejected() {
    let mut request = valid_request();
    request
        .existing_summaries
        .insert("Q1 2024".into(), String::new());
    assert_eq!(request.validate().unwrap_err().field, "existingSummaries");
}
