//! Purge workflow
//!
//! Tears down everything the tool created in dependency order: services
//! first, then the environments they ran in, then pipelines. Every planned
//! step runs even when an earlier one fails.

use std::collections::HashSet;
use std::fmt;
use std::io::Write;

use chrono::Local;
use tabled::{settings::Style, Table, Tabled};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::client::StackLister;
use crate::engine::error::WorkflowError;
use crate::engine::pipeline::{executor, Executor, Pipeline};
use crate::engine::result::PipelineReport;
use crate::stack::{Stack, StackStatus, StackType, TAG_ENVIRONMENT, TAG_SERVICE};
use crate::workflow::context::Context;
use crate::workflow::deploy::resolve_service_name;
use crate::workflow::terminate;

/// List every stack, leaving out those that already rolled back
///
/// A listing failure is logged and treated as nothing discovered.
pub async fn discover(lister: &dyn StackLister) -> Vec<Stack> {
    let stacks = match lister.list_stacks(StackType::All).await {
        Ok(stacks) => stacks,
        Err(e) => {
            warn!("couldn't list stacks (all): {}", e);
            Vec::new()
        }
    };

    stacks
        .into_iter()
        .filter(|stack| stack.status != StackStatus::RollbackComplete)
        .collect()
}

#[derive(Tabled)]
struct PurgeRow {
    #[tabled(rename = "TYPE")]
    stack_type: String,
    #[tabled(rename = "NAME")]
    name: String,
    #[tabled(rename = "STATUS")]
    status: String,
    #[tabled(rename = "REASON")]
    reason: String,
    #[tabled(rename = "LAST UPDATE")]
    last_update: String,
}

/// Write a table of the stacks that carry a `type` tag, returning how many there were
pub fn render_table<W: Write>(stacks: &[Stack], writer: &mut W) -> std::io::Result<usize> {
    let rows: Vec<PurgeRow> = stacks
        .iter()
        .filter_map(|stack| {
            stack.stack_type().map(|stack_type| PurgeRow {
                stack_type: stack_type.to_string(),
                name: stack.name.clone(),
                status: stack.status.to_string(),
                reason: stack.status_reason.clone(),
                last_update: stack
                    .last_update
                    .with_timezone(&Local)
                    .format("%Y-%m-%d %H:%M:%S")
                    .to_string(),
            })
        })
        .collect();

    let count = rows.len();
    let mut table = Table::new(rows);
    table.with(Style::modern());
    writeln!(writer, "{}", table)?;

    Ok(count)
}

/// One unit of teardown work, carrying the tag values it was planned from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlannedStep {
    ResolveService { service: String },
    UndeployService { service: String, environment: String },
    TerminateServices { environment: String },
    TerminateDatabases { environment: String },
    TerminateCluster { environment: String },
    TerminateServiceDiscovery { environment: String },
    TerminateEnvironmentRoleset { environment: String },
    TerminateLoadBalancer { environment: String },
    TerminateNetwork { environment: String },
    ResolvePipelineService { service: String },
    TerminatePipeline { service: String },
    TerminatePipelineRoleset { service: String },
}

impl fmt::Display for PlannedStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use PlannedStep::*;
        match self {
            ResolveService { service } => write!(f, "resolve service '{}'", service),
            UndeployService {
                service,
                environment,
            } => write!(f, "undeploy service '{}' from '{}'", service, environment),
            TerminateServices { environment } => {
                write!(f, "terminate services in '{}'", environment)
            }
            TerminateDatabases { environment } => {
                write!(f, "terminate databases in '{}'", environment)
            }
            TerminateCluster { environment } => write!(f, "terminate cluster '{}'", environment),
            TerminateServiceDiscovery { environment } => {
                write!(f, "terminate service discovery '{}'", environment)
            }
            TerminateEnvironmentRoleset { environment } => {
                write!(f, "terminate roleset for environment '{}'", environment)
            }
            TerminateLoadBalancer { environment } => {
                write!(f, "terminate load balancer '{}'", environment)
            }
            TerminateNetwork { environment } => write!(f, "terminate network '{}'", environment),
            ResolvePipelineService { service } => {
                write!(f, "resolve pipeline service '{}'", service)
            }
            TerminatePipeline { service } => write!(f, "terminate pipeline '{}'", service),
            TerminatePipelineRoleset { service } => {
                write!(f, "terminate roleset for pipeline '{}'", service)
            }
        }
    }
}

fn require_tag(value: &str, tag: &str) -> Result<(), WorkflowError> {
    if value.is_empty() {
        return Err(WorkflowError::MissingInput(format!("'{}' tag", tag)));
    }
    Ok(())
}

impl PlannedStep {
    /// Environment steps in the order they must run
    pub fn for_environment(environment: &str) -> Vec<PlannedStep> {
        let environment = environment.to_string();
        vec![
            PlannedStep::TerminateServices {
                environment: environment.clone(),
            },
            PlannedStep::TerminateDatabases {
                environment: environment.clone(),
            },
            PlannedStep::TerminateCluster {
                environment: environment.clone(),
            },
            PlannedStep::TerminateServiceDiscovery {
                environment: environment.clone(),
            },
            PlannedStep::TerminateEnvironmentRoleset {
                environment: environment.clone(),
            },
            PlannedStep::TerminateLoadBalancer {
                environment: environment.clone(),
            },
            PlannedStep::TerminateNetwork { environment },
        ]
    }

    pub async fn execute(&self, ctx: &Context) -> Result<(), WorkflowError> {
        use PlannedStep::*;
        match self {
            ResolveService { service } | ResolvePipelineService { service } => {
                let target = resolve_service_name(Some(service), &ctx.config)?;
                debug!("Resolved service '{}'", target.name);
                Ok(())
            }
            UndeployService {
                service,
                environment,
            } => {
                let target = resolve_service_name(Some(service), &ctx.config)?;
                require_tag(environment, TAG_ENVIRONMENT)?;
                terminate::undeploy_service(ctx, &target.name, environment).await
            }
            TerminateServices { environment } => {
                require_tag(environment, TAG_ENVIRONMENT)?;
                terminate::terminate_in_environment(ctx, StackType::Service, environment).await
            }
            TerminateDatabases { environment } => {
                require_tag(environment, TAG_ENVIRONMENT)?;
                terminate::terminate_in_environment(ctx, StackType::Database, environment).await
            }
            TerminateCluster { environment } => {
                require_tag(environment, TAG_ENVIRONMENT)?;
                terminate::terminate_environment_stack(ctx, StackType::Environment, environment)
                    .await
            }
            TerminateServiceDiscovery { environment } => {
                require_tag(environment, TAG_ENVIRONMENT)?;
                terminate::terminate_environment_stack(ctx, StackType::Consul, environment).await
            }
            TerminateEnvironmentRoleset { environment } => {
                require_tag(environment, TAG_ENVIRONMENT)?;
                terminate::terminate_environment_roleset(ctx, environment).await
            }
            TerminateLoadBalancer { environment } => {
                require_tag(environment, TAG_ENVIRONMENT)?;
                terminate::terminate_environment_stack(ctx, StackType::LoadBalancer, environment)
                    .await
            }
            TerminateNetwork { environment } => {
                require_tag(environment, TAG_ENVIRONMENT)?;
                terminate::terminate_environment_stack(ctx, StackType::Vpc, environment).await
            }
            TerminatePipeline { service } => {
                let target = resolve_service_name(Some(service), &ctx.config)?;
                terminate::terminate_pipeline(ctx, &target.name).await
            }
            TerminatePipelineRoleset { service } => {
                let target = resolve_service_name(Some(service), &ctx.config)?;
                terminate::terminate_pipeline_roleset(ctx, &target.name).await
            }
        }
    }

    pub fn into_executor(self, ctx: Context) -> Executor {
        executor(move || async move { self.execute(&ctx).await })
    }
}

/// Resource tiers a complete teardown also has to cover; not yet planned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FutureTier {
    /// Scheduled tasks attached to services, before the services themselves
    Schedules,
    /// Image repositories shared across environments
    Repositories,
    /// Buckets named after environments
    Buckets,
    /// Log groups and dashboards
    Logs,
}

pub const FUTURE_TIERS: &[FutureTier] = &[
    FutureTier::Schedules,
    FutureTier::Repositories,
    FutureTier::Buckets,
    FutureTier::Logs,
];

/// Ordered teardown steps for a set of discovered stacks
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PurgePlan {
    steps: Vec<PlannedStep>,
}

fn of_type<'a>(stacks: &'a [Stack], stack_type: StackType) -> impl Iterator<Item = &'a Stack> {
    stacks
        .iter()
        .filter(move |stack| stack.stack_type() == Some(stack_type.as_str()))
}

fn tag_value(stack: &Stack, key: &str) -> String {
    stack.tag(key).unwrap_or_default().to_string()
}

impl PurgePlan {
    pub fn build(stacks: &[Stack]) -> Self {
        let mut steps = Vec::new();

        for stack in of_type(stacks, StackType::Service) {
            let service = tag_value(stack, TAG_SERVICE);
            steps.push(PlannedStep::ResolveService {
                service: service.clone(),
            });
            steps.push(PlannedStep::UndeployService {
                service,
                environment: tag_value(stack, TAG_ENVIRONMENT),
            });
        }

        let mut environments = HashSet::new();
        for stack in of_type(stacks, StackType::Environment) {
            let environment = tag_value(stack, TAG_ENVIRONMENT);
            if !environments.insert(environment.clone()) {
                continue;
            }
            steps.extend(PlannedStep::for_environment(&environment));
        }

        for stack in of_type(stacks, StackType::Pipeline) {
            let service = tag_value(stack, TAG_SERVICE);
            steps.push(PlannedStep::ResolvePipelineService {
                service: service.clone(),
            });
            steps.push(PlannedStep::TerminatePipeline {
                service: service.clone(),
            });
            steps.push(PlannedStep::TerminatePipelineRoleset { service });
        }

        Self { steps }
    }

    pub fn steps(&self) -> &[PlannedStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn into_pipeline(self, ctx: &Context) -> Pipeline {
        let mut pipeline = Pipeline::continuing();
        for step in self.steps {
            let name = step.to_string();
            pipeline = pipeline.step(name, step.into_executor(ctx.clone()));
        }
        pipeline
    }
}

/// What a purge found and did
#[derive(Debug)]
pub struct PurgeSummary {
    /// Stacks carrying a `type` tag
    pub discovered: usize,
    /// Environment stacks sharing an `environment` tag are planned once,
    /// so this can be less than the per-stack step count
    pub planned: usize,
    pub report: PipelineReport,
}

/// `purge`
#[derive(Debug, Clone)]
pub struct PurgeWorkflow {
    ctx: Context,
    run_id: Uuid,
}

impl PurgeWorkflow {
    pub fn new(ctx: Context) -> Self {
        Self {
            ctx,
            run_id: Uuid::new_v4(),
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Discover, print, plan and run; individual step failures end up in the report
    #[instrument(name = "purge", skip_all, fields(run_id = %self.run_id))]
    pub async fn run<W: Write>(self, writer: &mut W) -> Result<PurgeSummary, WorkflowError> {
        let stacks = discover(self.ctx.lister.as_ref()).await;
        let discovered = match render_table(&stacks, writer) {
            Ok(count) => count,
            Err(e) => {
                warn!("unable to write purge table: {}", e);
                stacks.iter().filter(|stack| stack.stack_type().is_some()).count()
            }
        };

        let plan = PurgePlan::build(&stacks);
        let planned = plan.len();
        info!("total of {} stacks of {} types to purge", discovered, planned);
        debug!("Not yet covered by purge: {:?}", FUTURE_TIERS);

        let report = plan.into_pipeline(&self.ctx).run().await?;
        if !report.success() {
            warn!(
                "{} of {} purge steps failed: {:?}",
                report.failed(),
                report.attempted,
                report.failed_steps()
            );
        }

        Ok(PurgeSummary {
            discovered,
            planned,
            report,
        })
    }
}
