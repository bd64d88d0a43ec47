//! HTTP collaborator - talks to a JSON stack-management endpoint via reqwest
//!
//! | Operation    | Request                                   |
//! |--------------|-------------------------------------------|
//! | describe     | `GET    /stacks/{name}` (404 = absent)    |
//! | list         | `GET    /stacks?type={type}`              |
//! | upsert       | `PUT    /stacks/{name}`                   |
//! | delete       | `DELETE /stacks/{name}` (404 = ok)        |
//! | rolesets     | `PUT/GET/DELETE /rolesets/...`            |
//! | authenticate | `POST   /registries/authorize`            |

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;

use super::types::{AuthorizeRequest, AuthorizeResponse};
use super::{
    ApiError, RepositoryAuthenticator, RolesetManager, StackDeleter, StackDescriber, StackLister,
    StackUpserter, UpsertRequest,
};
use crate::stack::{Stack, StackType};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct HttpStackClient {
    base_url: String,
    client: reqwest::Client,
}

impl HttpStackClient {
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder().timeout(DEFAULT_TIMEOUT).build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn check(response: Response) -> Result<Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response.text().await.unwrap_or_default();
        Err(ApiError::Status {
            status: status.as_u16(),
            message,
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>, ApiError> {
        let url = self.url(path);
        debug!("GET {}", url);
        let response = self.client.get(&url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = Self::check(response).await?;
        Ok(Some(response.json().await?))
    }

    async fn put(&self, path: &str, body: Option<&serde_json::Value>) -> Result<(), ApiError> {
        let url = self.url(path);
        debug!("PUT {}", url);
        let mut request = self.client.put(&url);
        if let Some(body) = body {
            request = request.json(body);
        }
        Self::check(request.send().await?).await?;
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<(), ApiError> {
        let url = self.url(path);
        debug!("DELETE {}", url);
        let response = self.client.delete(&url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        Self::check(response).await?;
        Ok(())
    }
}

#[async_trait]
impl StackDescriber for HttpStackClient {
    async fn describe_stack(&self, name: &str) -> Result<Option<Stack>, ApiError> {
        self.get_json(&format!("stacks/{}", name)).await
    }
}

#[async_trait]
impl StackLister for HttpStackClient {
    async fn list_stacks(&self, stack_type: StackType) -> Result<Vec<Stack>, ApiError> {
        let url = self.url("stacks");
        debug!("GET {} (type={})", url, stack_type);
        let response = self
            .client
            .get(&url)
            .query(&[("type", stack_type.as_str())])
            .send()
            .await?;
        let response = Self::check(response).await?;
        Ok(response.json().await?)
    }
}

#[async_trait]
impl StackUpserter for HttpStackClient {
    async fn upsert_stack(&self, request: UpsertRequest) -> Result<(), ApiError> {
        let body = serde_json::to_value(&request)?;
        self.put(&format!("stacks/{}", request.name), Some(&body))
            .await
    }
}

#[async_trait]
impl StackDeleter for HttpStackClient {
    async fn delete_stack(&self, name: &str) -> Result<(), ApiError> {
        self.delete(&format!("stacks/{}", name)).await
    }
}

#[async_trait]
impl RolesetManager for HttpStackClient {
    async fn upsert_common_roleset(&self) -> Result<(), ApiError> {
        self.put("rolesets/common", None).await
    }

    async fn get_common_roleset(&self) -> Result<HashMap<String, String>, ApiError> {
        Ok(self.get_json("rolesets/common").await?.unwrap_or_default())
    }

    async fn upsert_service_roleset(
        &self,
        environment: &str,
        service: &str,
    ) -> Result<(), ApiError> {
        self.put(
            &format!("rolesets/environments/{}/services/{}", environment, service),
            None,
        )
        .await
    }

    async fn get_service_roleset(
        &self,
        environment: &str,
        service: &str,
    ) -> Result<HashMap<String, String>, ApiError> {
        let path = format!("rolesets/environments/{}/services/{}", environment, service);
        Ok(self.get_json(&path).await?.unwrap_or_default())
    }

    async fn delete_environment_roleset(&self, environment: &str) -> Result<(), ApiError> {
        self.delete(&format!("rolesets/environments/{}", environment))
            .await
    }

    async fn delete_pipeline_roleset(&self, service: &str) -> Result<(), ApiError> {
        self.delete(&format!("rolesets/pipelines/{}", service)).await
    }
}

#[async_trait]
impl RepositoryAuthenticator for HttpStackClient {
    async fn authenticate_repository(&self, image: &str) -> Result<String, ApiError> {
        let url = self.url("registries/authorize");
        debug!("POST {}", url);
        let response = self
            .client
            .post(&url)
            .json(&AuthorizeRequest { image })
            .send()
            .await?;
        let response = Self::check(response).await?;
        let body: AuthorizeResponse = response.json().await?;
        Ok(body.token)
    }
}
