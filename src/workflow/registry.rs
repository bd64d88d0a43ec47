//! Registry credential encoding
//!
//! The authenticator hands back base64 `username:password`. Container
//! tooling downstream expects a base64 JSON blob instead.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Serialize;
use tracing::debug;

use crate::client::RepositoryAuthenticator;
use crate::engine::error::WorkflowError;

#[derive(Debug, Serialize)]
struct RegistryCredentials<'a> {
    username: &'a str,
    password: &'a str,
}

/// Turn base64 `username:password` into base64 `{"username":..,"password":..}`
pub fn encode_registry_auth(token: &str) -> Result<String, WorkflowError> {
    let decoded = STANDARD
        .decode(token.trim())
        .map_err(|e| WorkflowError::Credentials(e.to_string()))?;
    let decoded = String::from_utf8(decoded)
        .map_err(|_| WorkflowError::Credentials("token is not valid UTF-8".to_string()))?;

    let (username, password) = decoded.split_once(':').ok_or_else(|| {
        WorkflowError::Credentials("expected 'username:password'".to_string())
    })?;

    let json = serde_json::to_string(&RegistryCredentials { username, password })
        .map_err(|e| WorkflowError::Credentials(e.to_string()))?;
    Ok(STANDARD.encode(json))
}

/// Fetch and re-encode credentials for `image`
pub async fn authenticate_registry(
    authenticator: &dyn RepositoryAuthenticator,
    image: &str,
) -> Result<String, WorkflowError> {
    debug!("Authenticating to registry '{}'", image);
    let token = authenticator.authenticate_repository(image).await?;
    encode_registry_auth(&token)
}
