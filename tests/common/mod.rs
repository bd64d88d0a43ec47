#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use stackflow::client::{
    ApiError, RepositoryAuthenticator, RolesetManager, StackDeleter, StackDescriber, StackLister,
    StackUpserter, StackWaiter, UpsertRequest,
};
use stackflow::stack::{Stack, StackStatus, StackType, TAG_ENVIRONMENT, TAG_SERVICE, TAG_TYPE};
use stackflow::{Config, Context, WorkflowError};

/// In-memory stack API; every mutation settles immediately
#[derive(Default)]
pub struct FakeCloud {
    stacks: Mutex<Vec<Stack>>,
    calls: Mutex<Vec<String>>,
    upserts: Mutex<Vec<UpsertRequest>>,
    outputs: Mutex<HashMap<String, HashMap<String, String>>>,
    upsert_status: Mutex<HashMap<String, StackStatus>>,
    failing_deletes: Mutex<HashSet<String>>,
    common_roleset: Mutex<HashMap<String, String>>,
    service_roleset: Mutex<HashMap<String, String>>,
    registry_token: Mutex<String>,
    list_fails: Mutex<bool>,
}

impl FakeCloud {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Rolesets with every role a deploy needs
    pub fn with_rolesets() -> Arc<Self> {
        let cloud = Self::new();
        cloud.set_common_roleset(&[("CloudFormationRoleArn", "arn:aws:iam::1:role/cfn")]);
        cloud.set_service_roleset(&[("BatchJobRoleArn", "arn:aws:iam::1:role/job")]);
        cloud
    }

    pub fn add_stack(&self, stack: Stack) {
        self.stacks.lock().unwrap().push(stack);
    }

    pub fn stack(&self, name: &str) -> Option<Stack> {
        self.stacks
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.name == name)
            .cloned()
    }

    pub fn stack_names(&self) -> Vec<String> {
        self.stacks
            .lock()
            .unwrap()
            .iter()
            .map(|s| s.name.clone())
            .collect()
    }

    /// Outputs a stack reports once it has been upserted
    pub fn set_outputs(&self, name: &str, outputs: &[(&str, &str)]) {
        self.outputs.lock().unwrap().insert(
            name.to_string(),
            outputs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        );
    }

    /// Status a stack settles in after an upsert (default `CREATE_COMPLETE`)
    pub fn set_upsert_status(&self, name: &str, status: StackStatus) {
        self.upsert_status
            .lock()
            .unwrap()
            .insert(name.to_string(), status);
    }

    pub fn fail_delete(&self, name: &str) {
        self.failing_deletes.lock().unwrap().insert(name.to_string());
    }

    pub fn fail_listing(&self) {
        *self.list_fails.lock().unwrap() = true;
    }

    pub fn set_common_roleset(&self, roles: &[(&str, &str)]) {
        *self.common_roleset.lock().unwrap() = to_map(roles);
    }

    pub fn set_service_roleset(&self, roles: &[(&str, &str)]) {
        *self.service_roleset.lock().unwrap() = to_map(roles);
    }

    pub fn set_registry_token(&self, token: &str) {
        *self.registry_token.lock().unwrap() = token.to_string();
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn upserts(&self) -> Vec<UpsertRequest> {
        self.upserts.lock().unwrap().clone()
    }

    pub fn upsert(&self, name: &str) -> Option<UpsertRequest> {
        self.upserts().into_iter().find(|u| u.name == name)
    }

    /// Index of the first recorded call equal to `call`
    pub fn position(&self, call: &str) -> Option<usize> {
        self.calls().iter().position(|c| c == call)
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

fn to_map(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[async_trait]
impl StackUpserter for FakeCloud {
    async fn upsert_stack(&self, request: UpsertRequest) -> Result<(), ApiError> {
        self.record(format!("upsert {}", request.name));

        let status = self
            .upsert_status
            .lock()
            .unwrap()
            .get(&request.name)
            .cloned()
            .unwrap_or(StackStatus::CreateComplete);
        let mut stack = Stack::new(&request.name, status);
        stack.tags = request.tags.clone();
        if let Some(outputs) = self.outputs.lock().unwrap().get(&request.name) {
            stack.outputs = outputs.clone();
        }

        let mut stacks = self.stacks.lock().unwrap();
        stacks.retain(|s| s.name != request.name);
        stacks.push(stack);
        drop(stacks);

        self.upserts.lock().unwrap().push(request);
        Ok(())
    }
}

#[async_trait]
impl StackDescriber for FakeCloud {
    async fn describe_stack(&self, name: &str) -> Result<Option<Stack>, ApiError> {
        Ok(self.stack(name))
    }
}

#[async_trait]
impl StackWaiter for FakeCloud {
    async fn await_final_status(&self, name: &str) -> Result<Option<Stack>, WorkflowError> {
        self.record(format!("await {}", name));
        Ok(self.stack(name))
    }
}

#[async_trait]
impl StackLister for FakeCloud {
    async fn list_stacks(&self, stack_type: StackType) -> Result<Vec<Stack>, ApiError> {
        self.record(format!("list {}", stack_type));
        if *self.list_fails.lock().unwrap() {
            return Err(ApiError::Other("listing unavailable".to_string()));
        }
        Ok(self
            .stacks
            .lock()
            .unwrap()
            .iter()
            .filter(|s| stack_type.matches(s))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl StackDeleter for FakeCloud {
    async fn delete_stack(&self, name: &str) -> Result<(), ApiError> {
        self.record(format!("delete {}", name));

        let mut stacks = self.stacks.lock().unwrap();
        if self.failing_deletes.lock().unwrap().contains(name) {
            if let Some(stack) = stacks.iter_mut().find(|s| s.name == name) {
                stack.status = StackStatus::DeleteFailed;
                stack.status_reason = "resource still in use".to_string();
            }
        } else {
            stacks.retain(|s| s.name != name);
        }
        Ok(())
    }
}

#[async_trait]
impl RolesetManager for FakeCloud {
    async fn upsert_common_roleset(&self) -> Result<(), ApiError> {
        self.record("upsert common roleset".to_string());
        Ok(())
    }

    async fn get_common_roleset(&self) -> Result<HashMap<String, String>, ApiError> {
        Ok(self.common_roleset.lock().unwrap().clone())
    }

    async fn upsert_service_roleset(
        &self,
        environment: &str,
        service: &str,
    ) -> Result<(), ApiError> {
        self.record(format!("upsert service roleset {} {}", environment, service));
        Ok(())
    }

    async fn get_service_roleset(
        &self,
        _environment: &str,
        _service: &str,
    ) -> Result<HashMap<String, String>, ApiError> {
        Ok(self.service_roleset.lock().unwrap().clone())
    }

    async fn delete_environment_roleset(&self, environment: &str) -> Result<(), ApiError> {
        self.record(format!("delete environment roleset {}", environment));
        Ok(())
    }

    async fn delete_pipeline_roleset(&self, service: &str) -> Result<(), ApiError> {
        self.record(format!("delete pipeline roleset {}", service));
        Ok(())
    }
}

#[async_trait]
impl RepositoryAuthenticator for FakeCloud {
    async fn authenticate_repository(&self, image: &str) -> Result<String, ApiError> {
        self.record(format!("authenticate {}", image));
        Ok(self.registry_token.lock().unwrap().clone())
    }
}

pub fn context(cloud: &Arc<FakeCloud>, config: Config) -> Context {
    Context::from_client(config, cloud.clone(), cloud.clone())
}

pub fn config(service: &str) -> Config {
    let mut config = Config::default();
    config.service.name = service.to_string();
    config.service.memory = 512;
    config.service.vcpu = 1;
    config.repo.revision = "abc123".to_string();
    config.repo.slug = "acme/worker".to_string();
    config
}

pub fn environment_stack(environment: &str) -> Stack {
    Stack::new(
        format!("mu-environment-{}", environment),
        StackStatus::CreateComplete,
    )
    .with_tag(TAG_TYPE, "environment")
    .with_tag(TAG_ENVIRONMENT, environment)
    .with_output("provider", "ec2")
}

pub fn service_stack(service: &str, environment: &str) -> Stack {
    Stack::new(
        format!("mu-batch-{}-{}", service, environment),
        StackStatus::UpdateComplete,
    )
    .with_tag(TAG_TYPE, "service")
    .with_tag(TAG_SERVICE, service)
    .with_tag(TAG_ENVIRONMENT, environment)
}

pub fn environment_resource(stack_type: &str, environment: &str) -> Stack {
    Stack::new(
        format!("mu-{}-{}", stack_type, environment),
        StackStatus::CreateComplete,
    )
    .with_tag(TAG_TYPE, stack_type)
    .with_tag(TAG_ENVIRONMENT, environment)
}

pub fn pipeline_stack(service: &str) -> Stack {
    Stack::new(format!("mu-pipeline-{}", service), StackStatus::CreateComplete)
        .with_tag(TAG_TYPE, "pipeline")
        .with_tag(TAG_SERVICE, service)
}
