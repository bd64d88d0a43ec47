//! Request and error types shared by all collaborator implementations

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Errors raised by the stack-management API or the transport in front of it
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error: {status} - {message}")]
    Status { status: u16, message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

/// Idempotent create-or-update of a named stack
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertRequest {
    pub name: String,

    /// Template identifier; template contents live with the API
    pub template: String,

    /// Structured definition the template is rendered from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<serde_json::Value>,

    #[serde(default)]
    pub parameters: HashMap<String, String>,

    #[serde(default)]
    pub tags: HashMap<String, String>,

    /// Role the API assumes to perform the mutation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role_arn: Option<String>,
}

impl UpsertRequest {
    pub fn new(name: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            template: template.into(),
            ..Default::default()
        }
    }

    pub fn input(mut self, input: serde_json::Value) -> Self {
        self.input = Some(input);
        self
    }

    pub fn parameters(mut self, parameters: HashMap<String, String>) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn tags(mut self, tags: HashMap<String, String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn role_arn(mut self, role_arn: Option<String>) -> Self {
        self.role_arn = role_arn.filter(|arn| !arn.is_empty());
        self
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct AuthorizeRequest<'a> {
    pub image: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AuthorizeResponse {
    pub token: String,
}
