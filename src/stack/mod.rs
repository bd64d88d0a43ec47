//! Stack snapshots and naming conventions
//!
//! - `status` - Status enumeration and terminal-state classification
//! - `naming` - Stack names and ownership tags

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod naming;
pub mod status;

pub use naming::{stack_name, ServiceTags};
pub use status::{StackStatus, StatusClass};

/// Tag key that classifies what kind of resource a stack holds
pub const TAG_TYPE: &str = "type";
/// Tag key naming the owning service
pub const TAG_SERVICE: &str = "service";
/// Tag key naming the owning environment
pub const TAG_ENVIRONMENT: &str = "environment";

/// Read-only snapshot of a remotely managed stack
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stack {
    pub name: String,

    pub status: StackStatus,

    #[serde(default)]
    pub status_reason: String,

    /// Ownership/classification tags (type, environment, service, ...)
    #[serde(default)]
    pub tags: HashMap<String, String>,

    /// Values computed by the stack (role ARNs, repository URLs, ...)
    #[serde(default)]
    pub outputs: HashMap<String, String>,

    pub last_update: DateTime<Utc>,
}

impl Stack {
    pub fn new(name: impl Into<String>, status: StackStatus) -> Self {
        Self {
            name: name.into(),
            status,
            status_reason: String::new(),
            tags: HashMap::new(),
            outputs: HashMap::new(),
            last_update: Utc::now(),
        }
    }

    pub fn with_tag(mut self, key: &str, value: &str) -> Self {
        self.tags.insert(key.to_string(), value.to_string());
        self
    }

    pub fn with_output(mut self, key: &str, value: &str) -> Self {
        self.outputs.insert(key.to_string(), value.to_string());
        self
    }

    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(|s| s.as_str())
    }

    pub fn output(&self, key: &str) -> Option<&str> {
        self.outputs.get(key).map(|s| s.as_str())
    }

    /// Value of the `type` tag, if the stack carries one
    pub fn stack_type(&self) -> Option<&str> {
        self.tag(TAG_TYPE)
    }

    pub fn outcome(&self) -> StatusClass {
        self.status.classify()
    }
}

/// Kinds of stacks this tool creates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StackType {
    Vpc,
    Environment,
    #[serde(rename = "loadbalancer")]
    LoadBalancer,
    Consul,
    Repo,
    Service,
    Pipeline,
    Database,
    Schedule,
    Bucket,
    Iam,
    Batch,
    #[serde(rename = "*")]
    All,
}

impl StackType {
    /// The value used in stack names and `type` tags
    pub fn as_str(&self) -> &'static str {
        match self {
            StackType::Vpc => "vpc",
            StackType::Environment => "environment",
            StackType::LoadBalancer => "loadbalancer",
            StackType::Consul => "consul",
            StackType::Repo => "repo",
            StackType::Service => "service",
            StackType::Pipeline => "pipeline",
            StackType::Database => "database",
            StackType::Schedule => "schedule",
            StackType::Bucket => "bucket",
            StackType::Iam => "iam",
            StackType::Batch => "batch",
            StackType::All => "*",
        }
    }

    /// Whether a stack belongs to this type (`All` matches everything)
    pub fn matches(&self, stack: &Stack) -> bool {
        *self == StackType::All || stack.stack_type() == Some(self.as_str())
    }
}

impl fmt::Display for StackType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
