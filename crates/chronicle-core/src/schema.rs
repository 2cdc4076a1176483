//! Function schemas the model is forced to call.
//!
//! Callers may supply their own schema for either tier, but it must declare
//! the same function name as the built-in one so the run's forced tool
//! choice and the response check stay consistent.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

pub const MONTHLY_FUNCTION_NAME: &str = "generate_monthly_summary";
pub const QUARTERLY_FUNCTION_NAME: &str = "generate_quarterly_summary";

/// A named function definition with JSON-Schema parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionSchema {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub parameters: Value,
}

/// Why a caller-supplied schema was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaRejection {
    #[error("schema is malformed: {0}")]
    Malformed(String),
    #[error("schema declares function '{actual}' but '{expected}' is required")]
    NameMismatch { expected: String, actual: String },
}

impl FunctionSchema {
    /// Parses a caller-supplied schema and checks its declared name.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaRejection::Malformed`] if the value is not a function
    /// definition with object parameters, or
    /// [`SchemaRejection::NameMismatch`] if the name differs from `expected_name`.
    pub fn from_override(value: Value, expected_name: &str) -> Result<Self, SchemaRejection> {
        let schema: FunctionSchema = serde_json::from_value(value)
            .map_err(|e| SchemaRejection::Malformed(e.to_string()))?;
        if schema.name != expected_name {
            return Err(SchemaRejection::NameMismatch {
                expected: expected_name.to_string(),
                actual: schema.name,
            });
        }
        if !schema.parameters.is_object() {
            return Err(SchemaRejection::Malformed(
                "parameters must be a JSON object".to_string(),
            ));
        }
        Ok(schema)
    }

    /// Built-in monthly contract.
    #[must_use]
    pub fn monthly() -> Self {
        let sub_theme = json!({
            "type": "array",
            "items": {
                "type": "object",
                "properties": {
                    "Summary": {"type": "string"},
                    "ActivityList": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "Id": {"type": "string"},
                                "LinkText": {"type": "string"},
                                "ActivityDate": {"type": "string"}
                            },
                            "required": ["Id", "LinkText", "ActivityDate"]
                        }
                    }
                },
                "required": ["Summary", "ActivityList"]
            }
        });

        Self {
            name: MONTHLY_FUNCTION_NAME.to_string(),
            description: "Summarize one month of account activity into an HTML narrative \
                          and a categorized activity mapping."
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "summary": {
                        "type": "string",
                        "description": "HTML with one top-level heading followed by a bullet list."
                    },
                    "activityMapping": {
                        "type": "object",
                        "properties": {
                            "Key Engagements": sub_theme.clone(),
                            "Challenges and Risks": sub_theme.clone(),
                            "Opportunities and Next Steps": sub_theme
                        },
                        "required": [
                            "Key Engagements",
                            "Challenges and Risks",
                            "Opportunities and Next Steps"
                        ]
                    },
                    "activityCount": {"type": "integer"}
                },
                "required": ["summary", "activityMapping", "activityCount"]
            }),
        }
    }

    /// Built-in quarterly contract.
    #[must_use]
    pub fn quarterly() -> Self {
        Self {
            name: QUARTERLY_FUNCTION_NAME.to_string(),
            description: "Aggregate monthly summaries into a quarterly narrative.".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "yearlySummary": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "year": {"type": "integer"},
                                "quarters": {
                                    "type": "array",
                                    "items": {
                                        "type": "object",
                                        "properties": {
                                            "quarter": {"type": "string"},
                                            "summary": {"type": "string"},
                                            "activityMapping": {
                                                "type": "array",
                                                "items": {
                                                    "type": "object",
                                                    "properties": {
                                                        "category": {"type": "string"},
                                                        "summary": {"type": "string"},
                                                        "activityList": {
                                                            "type": "array",
                                                            "items": {
                                                                "type": "object",
                                                                "properties": {
                                                                    "id": {"type": "string"},
                                                                    "linkText": {"type": "string"},
                                                                    "ActivityDate": {"type": "string"}
                                                                },
                                                                "required": ["id", "linkText", "ActivityDate"]
                                                            }
                                                        }
                                                    },
                                                    "required": ["category", "summary", "activityList"]
                                                }
                                            },
                                            "activityCount": {"type": "integer"},
                                            "startdate": {"type": "string"}
                                        },
                                        "required": [
                                            "quarter",
                                            "summary",
                                            "activityMapping",
                                            "activityCount",
                                            "startdate"
                                        ]
                                    }
                                }
                            },
                            "required": ["year", "quarters"]
                        }
                    }
                },
                "required": ["yearlySummary"]
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_names_match_constants() {
        assert_eq!(FunctionSchema::monthly().name, MONTHLY_FUNCTION_NAME);
        assert_eq!(FunctionSchema::quarterly().name, QUARTERLY_FUNCTION_NAME);
    }

    #[test]
    fn monthly_schema_requires_three_categories() {
        let schema = FunctionSchema::monthly();
        let required = &schema.parameters["properties"]["activityMapping"]["required"];
        assert_eq!(required.as_array().map(Vec::len), Some(3));
    }

    #[test]
    fn override_with_matching_name_is_accepted() {
        let value = json!({
            "name": MONTHLY_FUNCTION_NAME,
            "parameters": {"type": "object", "properties": {}}
        });
        let schema = FunctionSchema::from_override(value, MONTHLY_FUNCTION_NAME).unwrap();
        assert_eq!(schema.description, "");
    }

    #[test]
    fn override_with_other_name_is_rejected() {
        let value = json!({"name": "something_else", "parameters": {"type": "object"}});
        let err = FunctionSchema::from_override(value, QUARTERLY_FUNCTION_NAME).unwrap_err();
        assert!(matches!(err, SchemaRejection::NameMismatch { .. }));
    }

    #[test]
    fn override_without_parameters_is_malformed() {
        let value = json!({"name": MONTHLY_FUNCTION_NAME});
        let err = FunctionSchema::from_override(value, MONTHLY_FUNCTION_NAME).unwrap_err();
        assert!(matches!(err, SchemaRejection::Malformed(_)));
    }

    #[test]
    fn rejection_propagates_as_boxed_error() {
        fn load() -> Result<FunctionSchema, Box<dyn std::error::Error + Send + Sync>> {
            Ok(FunctionSchema::from_override(
                json!({"name": "other_fn", "parameters": {"type": "object"}}),
                MONTHLY_FUNCTION_NAME,
            )?)
        }
        let err = load().unwrap_err();
        assert!(err.downcast_ref::<SchemaRejection>().is_some());
        assert!(err.to_string().contains("'other_fn'"));
    }
}
