//! Action group request and reply envelopes.
//!
//! An orchestrating agent calls this service with an [`ActionEvent`] naming
//! an action group, an API path, an HTTP method, and a list of named
//! parameters. The reply echoes the routing fields back with a status code
//! and a string body nested under `application/json`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::dispatcher::Dispatcher;
use crate::error::RequestError;
use crate::model::ModelId;

/// The only API path this action group serves.
pub const CALL_MODEL_PATH: &str = "/callModel";

/// Envelope version echoed in every reply.
pub const MESSAGE_VERSION: &str = "1.0";

/// A single named parameter of an inbound action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionParameter {
    pub name: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    pub value: String,
}

impl ActionParameter {
    pub fn string(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: Some("string".to_string()),
            value: value.into(),
        }
    }
}

/// Metadata about the calling agent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub alias: String,
    #[serde(default)]
    pub version: String,
}

/// Inbound action request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionEvent {
    #[serde(default)]
    pub message_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<AgentInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default)]
    pub action_group: String,
    #[serde(default)]
    pub api_path: String,
    #[serde(default)]
    pub http_method: String,
    #[serde(default)]
    pub parameters: Vec<ActionParameter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_text: Option<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub session_attributes: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub prompt_session_attributes: HashMap<String, String>,
}

impl ActionEvent {
    /// A `/callModel` POST carrying `modelId` and `prompt`.
    pub fn call_model(action_group: &str, model_id: &str, prompt: &str) -> Self {
        Self {
            message_version: Some(MESSAGE_VERSION.to_string()),
            action_group: action_group.to_string(),
            api_path: CALL_MODEL_PATH.to_string(),
            http_method: "POST".to_string(),
            parameters: vec![
                ActionParameter::string("modelId", model_id),
                ActionParameter::string("prompt", prompt),
            ],
            ..Default::default()
        }
    }

    /// Value of the first parameter with the given name.
    pub fn parameter(&self, name: &str) -> Result<&str, RequestError> {
        self.parameters
            .iter()
            .find(|p| p.name == name)
            .map(|p| p.value.as_str())
            .ok_or_else(|| RequestError::MissingParameter {
                name: name.to_string(),
            })
    }
}

/// `{ "application/json": { "body": ... } }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseBody {
    #[serde(rename = "application/json")]
    pub application_json: JsonBody,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonBody {
    pub body: String,
}

/// The `response` member of the reply envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionResult {
    pub action_group: String,
    pub api_path: String,
    pub http_method: String,
    pub http_status_code: u16,
    pub response_body: ResponseBody,
}

/// Outbound reply envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionResponse {
    pub message_version: String,
    pub response: ActionResult,
}

impl ActionResponse {
    pub fn new(event: &ActionEvent, status: u16, body: impl Into<String>) -> Self {
        Self {
            message_version: MESSAGE_VERSION.to_string(),
            response: ActionResult {
                action_group: event.action_group.clone(),
                api_path: event.api_path.clone(),
                http_method: event.http_method.clone(),
                http_status_code: status,
                response_body: ResponseBody {
                    application_json: JsonBody { body: body.into() },
                },
            },
        }
    }

    pub fn status(&self) -> u16 {
        self.response.http_status_code
    }

    pub fn body(&self) -> &str {
        &self.response.response_body.application_json.body
    }
}

/// Handle one inbound action.
///
/// `modelId` and `prompt` are required regardless of the API path; their
/// absence is a caller error and produces no envelope. The model is invoked
/// only for [`CALL_MODEL_PATH`].
pub async fn handle_event(
    dispatcher: &Dispatcher,
    event: &ActionEvent,
) -> Result<ActionResponse, RequestError> {
    let model_id = ModelId::parse(event.parameter("modelId")?)?;
    let prompt = event.parameter("prompt")?;
    info!(
        model_id = %model_id,
        action_group = event.action_group.as_str(),
        api_path = event.api_path.as_str(),
        "Handling action"
    );

    if event.api_path != CALL_MODEL_PATH {
        warn!(api_path = event.api_path.as_str(), "Unrecognized api path");
        let message = format!(
            "Unrecognized api path: {}::{}",
            event.action_group, event.api_path
        );
        return Ok(ActionResponse::new(event, 404, message));
    }

    let outcome = dispatcher.respond(&model_id, prompt).await;
    Ok(ActionResponse::new(event, 200, outcome.into_body()))
}
