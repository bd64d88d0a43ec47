//! Stack names and ownership tags

use std::collections::HashMap;

use super::{StackType, TAG_ENVIRONMENT, TAG_SERVICE, TAG_TYPE};

/// Build a stack name: `{namespace}-{type}-{part}-{part}...`
pub fn stack_name(namespace: &str, stack_type: StackType, parts: &[&str]) -> String {
    let mut name = format!("{}-{}", namespace, stack_type.as_str());
    for part in parts.iter().filter(|p| !p.is_empty()) {
        name.push('-');
        name.push_str(part);
    }
    name
}

/// Tags written on every stack a workflow creates
#[derive(Debug, Clone, Default)]
pub struct ServiceTags {
    pub service: String,
    pub environment: String,
    pub stack_type: String,
    pub provider: String,
    pub revision: String,
    pub repo: String,
}

impl ServiceTags {
    /// Tag map with empty values left out
    pub fn into_map(self) -> HashMap<String, String> {
        [
            (TAG_SERVICE, self.service),
            (TAG_ENVIRONMENT, self.environment),
            (TAG_TYPE, self.stack_type),
            ("provider", self.provider),
            ("revision", self.revision),
            ("repo", self.repo),
        ]
        .into_iter()
        .filter(|(_, v)| !v.is_empty())
        .map(|(k, v)| (k.to_string(), v))
        .collect()
    }
}
