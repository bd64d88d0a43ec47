//! Project configuration
//!
//! Loaded from `stackflow.yml`:
//!
//! ```yaml
//! namespace: mu
//! repo:
//!   name: worker
//!   slug: acme/worker
//!   revision: abc123
//! service:
//!   name: worker
//!   memory: 512
//!   vcpu: 1
//!   environment:
//!     REGION: us-east-1
//!     LOG_LEVEL:
//!       acceptance: debug
//!       production: info
//! api:
//!   endpoint: http://localhost:8080
//! tracker:
//!   poll_interval_secs: 5
//!   timeout_secs: 1800
//! ```

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::engine::tracker::TrackerSettings;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error in {file}: {error}")]
    Yaml {
        file: String,
        error: serde_yaml::Error,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Prefix for every stack this tool owns
    #[serde(default = "default_namespace")]
    pub namespace: String,

    #[serde(default)]
    pub repo: RepoConfig,

    #[serde(default)]
    pub service: ServiceConfig,

    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub tracker: TrackerConfig,
}

fn default_namespace() -> String {
    "mu".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            repo: RepoConfig::default(),
            service: ServiceConfig::default(),
            api: ApiConfig::default(),
            tracker: TrackerConfig::default(),
        }
    }
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content).map_err(|error| ConfigError::Yaml {
            file: path.display().to_string(),
            error,
        })
    }

    pub fn parse(yaml: &str) -> Result<Self, serde_yaml::Error> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(yaml)
    }

    pub fn tracker_settings(&self) -> TrackerSettings {
        TrackerSettings {
            poll_interval: Duration::from_secs(self.tracker.poll_interval_secs),
            timeout: self.tracker.timeout_secs.map(Duration::from_secs),
        }
    }
}

/// Source repository the service is built from
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RepoConfig {
    #[serde(default)]
    pub name: String,

    /// `owner/name` slug, written to stack tags
    #[serde(default)]
    pub slug: String,

    /// Source revision of the working copy
    #[serde(default)]
    pub revision: String,
}

/// The service (batch job) this project deploys
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default)]
    pub name: String,

    /// Externally managed image repository; when empty a repository stack is created
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub image_repository: String,

    #[serde(default)]
    pub memory: u32,

    #[serde(default)]
    pub vcpu: u32,

    /// Fetch registry credentials for managed repositories
    #[serde(default)]
    pub registry_auth: bool,

    #[serde(default)]
    pub environment: BTreeMap<String, EnvValue>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
}

fn default_endpoint() -> String {
    "http://localhost:8080".to_string()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerConfig {
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

fn default_poll_interval() -> u64 {
    5
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval(),
            timeout_secs: None,
        }
    }
}

/// An environment variable value: the same everywhere, or chosen per environment
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum EnvValue {
    Literal(String),
    PerEnvironment(HashMap<String, String>),
}

impl EnvValue {
    /// Value for `environment`; a per-environment map without it yields `""`
    pub fn resolve(&self, environment: &str) -> String {
        match self {
            EnvValue::Literal(value) => value.clone(),
            EnvValue::PerEnvironment(values) => {
                values.get(environment).cloned().unwrap_or_default()
            }
        }
    }
}

impl<'de> Deserialize<'de> for EnvValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Scalar {
            Bool(bool),
            Number(serde_yaml::Number),
            Text(String),
        }

        #[derive(Deserialize)]
        #[serde(untagged)]
        enum EnvValueHelper {
            Scalar(Option<Scalar>),
            Map(HashMap<String, Option<Scalar>>),
            Unsupported(serde_yaml::Value),
        }

        fn text(scalar: Option<Scalar>) -> String {
            match scalar {
                None => String::new(),
                Some(Scalar::Bool(b)) => b.to_string(),
                Some(Scalar::Number(n)) => n.to_string(),
                Some(Scalar::Text(s)) => s,
            }
        }

        match EnvValueHelper::deserialize(deserializer)? {
            EnvValueHelper::Scalar(s) => Ok(EnvValue::Literal(text(s))),
            EnvValueHelper::Map(m) => Ok(EnvValue::PerEnvironment(
                m.into_iter().map(|(k, v)| (k, text(v))).collect(),
            )),
            EnvValueHelper::Unsupported(value) => {
                warn!("unable to resolve environment value {:?}, using empty", value);
                Ok(EnvValue::Literal(String::new()))
            }
        }
    }
}

/// Resolve every variable for one target environment
pub fn resolve_environment(
    vars: &BTreeMap<String, EnvValue>,
    environment: &str,
) -> BTreeMap<String, String> {
    vars.iter()
        .map(|(key, value)| (key.clone(), value.resolve(environment)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.namespace, "mu");
        assert_eq!(config.api.endpoint, "http://localhost:8080");
        assert_eq!(config.tracker.poll_interval_secs, 5);
        assert!(config.tracker.timeout_secs.is_none());
    }

    #[test]
    fn test_parse_empty() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.namespace, "mu");
    }

    #[test]
    fn test_parse_config() {
        let yaml = r#"
namespace: acme
repo:
  name: worker-repo
  revision: abc123
service:
  name: worker
  memory: 512
  vcpu: 2
  environment:
    REGION: us-east-1
    PORT: 8080
    DEBUG: true
    LOG_LEVEL:
      acceptance: debug
      production: info
tracker:
  poll_interval_secs: 1
  timeout_secs: 60
"#;
        let config = Config::parse(yaml).unwrap();

        assert_eq!(config.namespace, "acme");
        assert_eq!(config.repo.revision, "abc123");
        assert_eq!(config.service.memory, 512);
        assert_eq!(config.service.vcpu, 2);
        assert_eq!(
            config.service.environment["REGION"],
            EnvValue::Literal("us-east-1".to_string())
        );
        assert_eq!(
            config.service.environment["PORT"],
            EnvValue::Literal("8080".to_string())
        );
        assert_eq!(
            config.service.environment["DEBUG"],
            EnvValue::Literal("true".to_string())
        );
        assert!(matches!(
            config.service.environment["LOG_LEVEL"],
            EnvValue::PerEnvironment(_)
        ));

        let settings = config.tracker_settings();
        assert_eq!(settings.poll_interval, Duration::from_secs(1));
        assert_eq!(settings.timeout, Some(Duration::from_secs(60)));
    }

    #[test]
    fn test_env_value_resolution() {
        let per_env = EnvValue::PerEnvironment(
            [
                ("acceptance".to_string(), "debug".to_string()),
                ("production".to_string(), "info".to_string()),
            ]
            .into(),
        );

        assert_eq!(per_env.resolve("acceptance"), "debug");
        assert_eq!(per_env.resolve("production"), "info");
        assert_eq!(per_env.resolve("staging"), "");
        assert_eq!(EnvValue::Literal("x".to_string()).resolve("staging"), "x");
    }

    #[test]
    fn test_parse_null_and_unsupported_env_values() {
        let yaml = r#"
service:
  environment:
    EMPTY:
    TILDE: ~
    LIST: [a, b]
    A: b
    PER_ENV:
      dev: ~
      prod: x
"#;
        let config = Config::parse(yaml).unwrap();
        let env = resolve_environment(&config.service.environment, "dev");

        assert_eq!(env["EMPTY"], "");
        assert_eq!(env["TILDE"], "");
        assert_eq!(env["LIST"], "");
        assert_eq!(env["A"], "b");
        assert_eq!(env["PER_ENV"], "");
        assert_eq!(
            resolve_environment(&config.service.environment, "prod")["PER_ENV"],
            "x"
        );
    }

    #[test]
    fn test_resolve_environment() {
        let mut vars = BTreeMap::new();
        vars.insert("A".to_string(), EnvValue::Literal("1".to_string()));
        vars.insert(
            "B".to_string(),
            EnvValue::PerEnvironment([("dev".to_string(), "2".to_string())].into()),
        );

        let resolved = resolve_environment(&vars, "prod");
        assert_eq!(resolved["A"], "1");
        assert_eq!(resolved["B"], "");
    }

    #[test]
    fn test_load_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("stackflow.yml");
        fs::write(&path, "namespace: test\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.namespace, "test");
    }

    #[test]
    fn test_load_errors() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            Config::load(dir.path().join("missing.yml")),
            Err(ConfigError::Io(_))
        ));

        let path = dir.path().join("bad.yml");
        fs::write(&path, "service: [unclosed").unwrap();
        assert!(matches!(Config::load(&path), Err(ConfigError::Yaml { .. })));
    }
}
