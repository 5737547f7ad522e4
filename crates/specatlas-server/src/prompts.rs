//! Prompt templates for working with registered specs.

use rmcp::ErrorData as McpError;
use rmcp::model::{
    GetPromptResult, JsonObject, Prompt, PromptArgument, PromptMessage, PromptMessageRole,
};

const API_OVERVIEW: &str = "api_overview";
const API_REQUEST_DRAFTER: &str = "api_request_drafter";

pub fn definitions() -> Vec<Prompt> {
    vec![
        Prompt::new(
            API_OVERVIEW,
            Some("Summarize an OpenAPI document for a developer audience"),
            Some(vec![argument(
                "spec_json",
                "The spec document as JSON (e.g. from the openapi://{specId}/spec resource)",
            )]),
        ),
        Prompt::new(
            API_REQUEST_DRAFTER,
            Some("Draft a concrete HTTP request for one API operation"),
            Some(vec![argument(
                "operation_json",
                "The operation record as JSON (e.g. from the get_operation tool)",
            )]),
        ),
    ]
}

pub fn render(name: &str, arguments: Option<JsonObject>) -> Result<GetPromptResult, McpError> {
    match name {
        API_OVERVIEW => {
            let spec_json = required_arg(arguments.as_ref(), "spec_json", name)?;
            Ok(GetPromptResult {
                description: Some("Summarize an OpenAPI document".to_string()),
                messages: vec![
                    PromptMessage::new_text(
                        PromptMessageRole::Assistant,
                        "I will summarize the API: its purpose, the main resource groups, \
                         authentication requirements, and the most useful operations.",
                    ),
                    PromptMessage::new_text(
                        PromptMessageRole::User,
                        format!(
                            "Summarize this OpenAPI document:\n\n```json\n{spec_json}\n```"
                        ),
                    ),
                ],
            })
        }
        API_REQUEST_DRAFTER => {
            let operation_json = required_arg(arguments.as_ref(), "operation_json", name)?;
            Ok(GetPromptResult {
                description: Some("Draft a request for one operation".to_string()),
                messages: vec![
                    PromptMessage::new_text(
                        PromptMessageRole::Assistant,
                        "I will draft a complete, runnable HTTP request for this operation, \
                         explaining each required parameter and the expected response.",
                    ),
                    PromptMessage::new_text(
                        PromptMessageRole::User,
                        format!(
                            "Draft a request for this operation:\n\n```json\n{operation_json}\n```"
                        ),
                    ),
                ],
            })
        }
        other => Err(McpError::invalid_params(
            format!("Unknown prompt '{other}'"),
            None,
        )),
    }
}

fn argument(name: &str, description: &str) -> PromptArgument {
    PromptArgument {
        name: name.to_string(),
        title: None,
        description: Some(description.to_string()),
        required: Some(true),
    }
}

fn required_arg(
    arguments: Option<&JsonObject>,
    key: &str,
    prompt: &str,
) -> Result<String, McpError> {
    arguments
        .and_then(|args| args.get(key))
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .ok_or_else(|| {
            McpError::invalid_params(
                format!("Prompt '{prompt}' requires the '{key}' argument"),
                None,
            )
        })
}
