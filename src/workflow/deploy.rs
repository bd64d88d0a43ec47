//! Deploy workflow
//!
//! `deploy <environment>` registers the service's batch job in an existing
//! environment. It runs as a chain of phases, each taking the typed output of
//! the phases before it:
//!
//! 1. [`resolve_service_name`] - which service is being deployed
//! 2. [`resolve_tag`] - image tag and revision key
//! 3. [`load_environment`] - the target environment must already exist
//! 4. [`upsert_rolesets`] - permission rolesets and their role ARNs
//! 5. [`resolve_image`] - external image, or a managed repository stack
//! 6. [`assemble_parameters`] - stack parameters
//! 7. [`deploy_service`] - upsert the batch job stack and wait for it
//!
//! The chain stops at the first failing phase.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::client::{ApiError, RolesetManager, UpsertRequest};
use crate::engine::error::WorkflowError;
use crate::engine::pipeline::{executor, Executor};
use crate::engine::tracker::await_healthy;
use crate::stack::{stack_name, ServiceTags, Stack, StackType};
use crate::workflow::config::{resolve_environment, Config, ServiceConfig};
use crate::workflow::context::Context;
use crate::workflow::registry::authenticate_registry;

pub const CLOUDFORMATION_ROLE_ARN: &str = "CloudFormationRoleArn";
pub const BATCH_JOB_ROLE_ARN: &str = "BatchJobRoleArn";
pub const REPO_URL_OUTPUT: &str = "RepoUrl";
pub const JOB_DEFINITION_OUTPUT: &str = "BatchJobDefinitionArn";

pub const REPO_TEMPLATE: &str = "repo.yml";
pub const BATCH_JOB_TEMPLATE: &str = "batch-job.yml";

const DEFAULT_TAG: &str = "latest";

/// The service being deployed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceTarget {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTag {
    pub tag: String,
    /// `{service}/{tag}.zip`
    pub revision_key: String,
}

/// Role ARNs captured from the common and service rolesets
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rolesets {
    pub cloudformation_role_arn: String,
    pub batch_job_role_arn: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceImage {
    pub url: String,
    /// Base64 JSON registry credentials, when requested
    pub registry_auth: Option<String>,
}

pub type StackParameters = HashMap<String, String>;

#[derive(Debug, Clone)]
pub struct DeployedService {
    pub stack: Stack,
    pub job_definition_arn: Option<String>,
}

/// Everything a successful deploy produced
#[derive(Debug, Clone)]
pub struct DeployOutcome {
    pub run_id: Uuid,
    pub service: ServiceTarget,
    pub tag: ResolvedTag,
    pub environment: Stack,
    pub rolesets: Rolesets,
    pub image: ServiceImage,
    pub parameters: StackParameters,
    pub deployed: DeployedService,
}

/// Explicit name, else `service.name`, else `repo.name`
pub fn resolve_service_name(
    explicit: Option<&str>,
    config: &Config,
) -> Result<ServiceTarget, WorkflowError> {
    [
        explicit.unwrap_or_default(),
        config.service.name.as_str(),
        config.repo.name.as_str(),
    ]
    .into_iter()
    .find(|name| !name.is_empty())
    .map(|name| ServiceTarget {
        name: name.to_string(),
    })
    .ok_or_else(|| WorkflowError::MissingInput("service name".to_string()))
}

/// Explicit tag, else the source revision, else `latest`
pub fn resolve_tag(explicit: Option<&str>, revision: &str, service: &ServiceTarget) -> ResolvedTag {
    let tag = match explicit {
        Some(tag) if !tag.is_empty() => tag,
        _ if !revision.is_empty() => revision,
        _ => DEFAULT_TAG,
    };

    ResolvedTag {
        tag: tag.to_string(),
        revision_key: revision_key(&service.name, tag),
    }
}

pub fn revision_key(service: &str, tag: &str) -> String {
    format!("{}/{}.zip", service, tag)
}

/// The environment stack must exist before anything is deployed into it
pub async fn load_environment(ctx: &Context, environment: &str) -> Result<Stack, WorkflowError> {
    let name = stack_name(ctx.namespace(), StackType::Environment, &[environment]);
    ctx.waiter
        .await_final_status(&name)
        .await?
        .ok_or_else(|| {
            WorkflowError::not_found(&name, format!("for environment '{}'", environment))
        })
}

fn required_role(roles: &HashMap<String, String>, key: &str) -> Result<String, WorkflowError> {
    roles
        .get(key)
        .filter(|arn| !arn.is_empty())
        .cloned()
        .ok_or_else(|| WorkflowError::MissingInput(format!("roleset key '{}'", key)))
}

pub async fn upsert_rolesets(
    rolesets: &dyn RolesetManager,
    environment: &str,
    service: &ServiceTarget,
) -> Result<Rolesets, WorkflowError> {
    rolesets.upsert_common_roleset().await?;
    let common = rolesets.get_common_roleset().await?;
    let cloudformation_role_arn = required_role(&common, CLOUDFORMATION_ROLE_ARN)?;

    rolesets
        .upsert_service_roleset(environment, &service.name)
        .await?;
    let service_roles = rolesets
        .get_service_roleset(environment, &service.name)
        .await?;
    let batch_job_role_arn = required_role(&service_roles, BATCH_JOB_ROLE_ARN)?;

    Ok(Rolesets {
        cloudformation_role_arn,
        batch_job_role_arn,
    })
}

/// Use the configured image repository, or upsert a repository stack for the service
pub async fn resolve_image(
    ctx: &Context,
    service: &ServiceTarget,
    tag: &ResolvedTag,
) -> Result<ServiceImage, WorkflowError> {
    let config = &ctx.config;
    if !config.service.image_repository.is_empty() {
        info!(
            "Using repo '{}' for service '{}'",
            config.service.image_repository, service.name
        );
        return Ok(ServiceImage {
            url: config.service.image_repository.clone(),
            registry_auth: None,
        });
    }

    info!("Upsert repo for service '{}'", service.name);
    let name = stack_name(ctx.namespace(), StackType::Repo, &[&service.name]);
    let parameters = HashMap::from([(
        "RepoName".to_string(),
        format!("{}-{}", ctx.namespace(), service.name),
    )]);
    let tags = ServiceTags {
        service: service.name.clone(),
        stack_type: StackType::Repo.to_string(),
        revision: config.repo.revision.clone(),
        repo: config.repo.slug.clone(),
        ..Default::default()
    };

    ctx.upserter
        .upsert_stack(
            UpsertRequest::new(&name, REPO_TEMPLATE)
                .parameters(parameters)
                .tags(tags.into_map()),
        )
        .await?;
    let stack = await_healthy(ctx.waiter.as_ref(), &name).await?;

    let repo_url = stack
        .output(REPO_URL_OUTPUT)
        .filter(|url| !url.is_empty())
        .ok_or_else(|| {
            WorkflowError::MissingInput(format!("output '{}' of stack '{}'", REPO_URL_OUTPUT, name))
        })?;
    let url = format!("{}:{}", repo_url, tag.tag);

    let registry_auth = if config.service.registry_auth {
        Some(authenticate_registry(ctx.authenticator.as_ref(), &url).await?)
    } else {
        None
    };

    Ok(ServiceImage { url, registry_auth })
}

pub fn assemble_parameters(
    namespace: &str,
    service_config: &ServiceConfig,
    service: &ServiceTarget,
    environment: &str,
    rolesets: &Rolesets,
    image: &ServiceImage,
) -> StackParameters {
    HashMap::from([
        ("ServiceName".to_string(), service.name.clone()),
        ("Namespace".to_string(), namespace.to_string()),
        ("EnvironmentName".to_string(), environment.to_string()),
        (
            "BatchJobRoleArn".to_string(),
            rolesets.batch_job_role_arn.clone(),
        ),
        ("ServiceMemory".to_string(), service_config.memory.to_string()),
        ("ServiceVCpu".to_string(), service_config.vcpu.to_string()),
        ("ImageUrl".to_string(), image.url.clone()),
    ])
}

/// Input document sent alongside the batch job template
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ServiceDefinition<'a> {
    name: &'a str,
    memory: u32,
    vcpu: u32,
    image_url: &'a str,
    environment: BTreeMap<String, String>,
}

/// Everything [`deploy_service`] needs from earlier phases
#[derive(Debug, Clone, Copy)]
pub struct DeployInputs<'a> {
    pub service: &'a ServiceTarget,
    pub environment: &'a str,
    pub environment_stack: &'a Stack,
    pub rolesets: &'a Rolesets,
    pub image: &'a ServiceImage,
    pub parameters: &'a StackParameters,
}

pub async fn deploy_service(
    ctx: &Context,
    inputs: DeployInputs<'_>,
) -> Result<DeployedService, WorkflowError> {
    let config = &ctx.config;
    info!(
        "Deploying service '{}' to '{}' from '{}'",
        inputs.service.name, inputs.environment, inputs.image.url
    );

    let name = stack_name(
        ctx.namespace(),
        StackType::Batch,
        &[&inputs.service.name, inputs.environment],
    );

    let definition = ServiceDefinition {
        name: &inputs.service.name,
        memory: config.service.memory,
        vcpu: config.service.vcpu,
        image_url: &inputs.image.url,
        environment: resolve_environment(&config.service.environment, inputs.environment),
    };
    let input = serde_json::to_value(&definition).map_err(ApiError::from)?;

    let tags = ServiceTags {
        service: inputs.service.name.clone(),
        environment: inputs.environment.to_string(),
        stack_type: StackType::Service.to_string(),
        provider: inputs
            .environment_stack
            .output("provider")
            .unwrap_or_default()
            .to_string(),
        revision: config.repo.revision.clone(),
        repo: config.repo.slug.clone(),
    };

    ctx.upserter
        .upsert_stack(
            UpsertRequest::new(&name, BATCH_JOB_TEMPLATE)
                .input(input)
                .parameters(inputs.parameters.clone())
                .tags(tags.into_map())
                .role_arn(Some(inputs.rolesets.cloudformation_role_arn.clone())),
        )
        .await?;

    let stack = await_healthy(ctx.waiter.as_ref(), &name).await?;
    let job_definition_arn = stack.output(JOB_DEFINITION_OUTPUT).map(str::to_string);

    Ok(DeployedService {
        stack,
        job_definition_arn,
    })
}

/// `deploy <environment> [--tag TAG]`
#[derive(Debug, Clone)]
pub struct DeployWorkflow {
    ctx: Context,
    environment: String,
    tag: Option<String>,
    service: Option<String>,
    run_id: Uuid,
}

impl DeployWorkflow {
    pub fn new(ctx: Context, environment: impl Into<String>, tag: Option<String>) -> Self {
        Self {
            ctx,
            environment: environment.into(),
            tag,
            service: None,
            run_id: Uuid::new_v4(),
        }
    }

    /// Deploy a service other than the one named in the configuration
    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.service = Some(service.into());
        self
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    #[instrument(name = "deploy", skip(self), fields(run_id = %self.run_id, environment = %self.environment))]
    pub async fn run(self) -> Result<DeployOutcome, WorkflowError> {
        let ctx = &self.ctx;
        if self.environment.is_empty() {
            return Err(WorkflowError::MissingInput("environment".to_string()));
        }

        let service = resolve_service_name(self.service.as_deref(), &ctx.config)?;
        let tag = resolve_tag(self.tag.as_deref(), &ctx.config.repo.revision, &service);
        debug!("Working with service:'{}' tag:'{}'", service.name, tag.tag);

        let environment = load_environment(ctx, &self.environment).await?;
        let rolesets = upsert_rolesets(ctx.rolesets.as_ref(), &self.environment, &service).await?;
        let image = resolve_image(ctx, &service, &tag).await?;
        let parameters = assemble_parameters(
            ctx.namespace(),
            &ctx.config.service,
            &service,
            &self.environment,
            &rolesets,
            &image,
        );

        let deployed = deploy_service(
            ctx,
            DeployInputs {
                service: &service,
                environment: &self.environment,
                environment_stack: &environment,
                rolesets: &rolesets,
                image: &image,
                parameters: &parameters,
            },
        )
        .await?;

        info!(
            "Service '{}' deployed to '{}' as '{}'",
            service.name, self.environment, deployed.stack.name
        );

        Ok(DeployOutcome {
            run_id: self.run_id,
            service,
            tag,
            environment,
            rolesets,
            image,
            parameters,
            deployed,
        })
    }

    /// Run the whole deploy as one step of a larger pipeline
    pub fn into_executor(self) -> Executor {
        executor(move || async move { self.run().await.map(|_| ()) })
    }
}
