mod common;

use std::io::{self, Write};
use std::sync::Arc;

use common::*;
use stackflow::stack::{Stack, StackStatus, TAG_ENVIRONMENT, TAG_TYPE};
use stackflow::{Config, PurgeSummary, PurgeWorkflow};

struct FailingWriter;

impl Write for FailingWriter {
    fn write(&mut self, _: &[u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn populated_cloud() -> Arc<FakeCloud> {
    let cloud = FakeCloud::new();
    for service in ["worker", "api", "cron"] {
        cloud.add_stack(service_stack(service, "dev"));
    }
    cloud.add_stack(environment_stack("dev"));
    for stack_type in ["consul", "loadbalancer", "vpc"] {
        cloud.add_stack(environment_resource(stack_type, "dev"));
    }
    cloud.add_stack(
        Stack::new("mu-environment-broken", StackStatus::RollbackComplete)
            .with_tag(TAG_TYPE, "environment")
            .with_tag(TAG_ENVIRONMENT, "broken"),
    );
    cloud.add_stack(Stack::new("someone-elses-stack", StackStatus::CreateComplete));
    cloud
}

async fn purge(cloud: &Arc<FakeCloud>) -> (PurgeSummary, String) {
    purge_with(cloud, config("worker")).await
}

async fn purge_with(cloud: &Arc<FakeCloud>, config: Config) -> (PurgeSummary, String) {
    let mut out = Vec::new();
    let summary = PurgeWorkflow::new(context(cloud, config))
        .run(&mut out)
        .await
        .unwrap();
    (summary, String::from_utf8(out).unwrap())
}

#[tokio::test]
async fn test_purge_services_before_environment() {
    let cloud = populated_cloud();

    let (summary, table) = purge(&cloud).await;

    // 3 services + environment + consul + loadbalancer + vpc
    assert_eq!(summary.discovered, 7);
    assert_eq!(summary.planned, 3 * 2 + 7);
    assert_eq!(summary.report.attempted, summary.planned);
    assert!(summary.report.success());

    let env_delete = cloud.position("delete mu-environment-dev").unwrap();
    for service in ["worker", "api", "cron"] {
        let delete = cloud
            .position(&format!("delete mu-batch-{}-dev", service))
            .unwrap();
        assert!(delete < env_delete, "{} deleted after its environment", service);
    }

    let consul = cloud.position("delete mu-consul-dev").unwrap();
    let roleset = cloud.position("delete environment roleset dev").unwrap();
    let elb = cloud.position("delete mu-loadbalancer-dev").unwrap();
    let vpc = cloud.position("delete mu-vpc-dev").unwrap();
    assert!(env_delete < consul && consul < roleset && roleset < elb && elb < vpc);

    assert_eq!(
        cloud.stack_names(),
        vec!["mu-environment-broken", "someone-elses-stack"]
    );

    assert!(table.contains("mu-batch-cron-dev"));
    assert!(table.contains("mu-vpc-dev"));
    assert!(!table.contains("mu-environment-broken"));
    assert!(!table.contains("someone-elses-stack"));
}

#[tokio::test]
async fn test_purge_services_keep_discovery_order() {
    let cloud = populated_cloud();

    purge(&cloud).await;

    let worker = cloud.position("delete mu-batch-worker-dev").unwrap();
    let api = cloud.position("delete mu-batch-api-dev").unwrap();
    let cron = cloud.position("delete mu-batch-cron-dev").unwrap();
    assert!(worker < api && api < cron);
}

#[tokio::test]
async fn test_purge_continues_after_failed_step() {
    let cloud = populated_cloud();
    cloud.fail_delete("mu-batch-api-dev");

    let (summary, _) = purge(&cloud).await;

    assert_eq!(summary.report.attempted, summary.planned);
    assert!(!summary.report.success());

    let failed = summary.report.failed_steps();
    assert!(failed.contains(&"undeploy service 'api' from 'dev'"));
    assert!(failed.contains(&"terminate services in 'dev'"));
    assert_eq!(failed.len(), 2);

    assert!(cloud.position("delete mu-batch-cron-dev").is_some());
    assert!(cloud.position("delete mu-vpc-dev").is_some());
    assert!(cloud.stack("mu-batch-api-dev").is_some());
    assert!(cloud.stack("mu-vpc-dev").is_none());
}

#[tokio::test]
async fn test_purge_pipelines_last() {
    let cloud = populated_cloud();
    cloud.add_stack(pipeline_stack("api"));

    let (summary, _) = purge(&cloud).await;

    assert_eq!(summary.planned, 3 * 2 + 7 + 3);
    let vpc = cloud.position("delete mu-vpc-dev").unwrap();
    let pipeline = cloud.position("delete mu-pipeline-api").unwrap();
    let roleset = cloud.position("delete pipeline roleset api").unwrap();
    assert!(vpc < pipeline && pipeline < roleset);
}

#[tokio::test]
async fn test_purge_untagged_service_uses_configured_name() {
    let cloud = FakeCloud::new();
    cloud.add_stack(
        Stack::new("mu-batch-worker-dev", StackStatus::CreateComplete)
            .with_tag(TAG_TYPE, "service")
            .with_tag(TAG_ENVIRONMENT, "dev"),
    );

    let (summary, _) = purge(&cloud).await;

    assert_eq!(summary.planned, 2);
    assert!(summary.report.success());
    assert!(cloud.position("delete mu-batch-worker-dev").is_some());
    assert!(cloud.stack("mu-batch-worker-dev").is_none());
}

#[tokio::test]
async fn test_purge_unresolvable_service_fails_only_its_steps() {
    let cloud = FakeCloud::new();
    cloud.add_stack(
        Stack::new("mu-batch-orphan-dev", StackStatus::CreateComplete)
            .with_tag(TAG_TYPE, "service")
            .with_tag(TAG_ENVIRONMENT, "dev"),
    );
    cloud.add_stack(service_stack("api", "dev"));

    let (summary, _) = purge_with(&cloud, config("")).await;

    assert_eq!(summary.planned, 4);
    assert_eq!(
        summary.report.failed_steps(),
        vec!["resolve service ''", "undeploy service '' from 'dev'"]
    );
    assert_eq!(summary.report.succeeded, 2);
    assert!(cloud.stack("mu-batch-api-dev").is_none());
    assert!(cloud.stack("mu-batch-orphan-dev").is_some());
}

#[tokio::test]
async fn test_purge_table_write_error_is_not_fatal() {
    let cloud = populated_cloud();

    let summary = PurgeWorkflow::new(context(&cloud, config("worker")))
        .run(&mut FailingWriter)
        .await
        .unwrap();

    assert_eq!(summary.discovered, 7);
    assert!(summary.report.success());
    assert!(cloud.stack("mu-vpc-dev").is_none());
}

#[tokio::test]
async fn test_purge_with_listing_error() {
    let cloud = populated_cloud();
    cloud.fail_listing();

    let (summary, _) = purge(&cloud).await;

    assert_eq!(summary.discovered, 0);
    assert_eq!(summary.planned, 0);
    assert_eq!(summary.report.attempted, 0);
    assert_eq!(cloud.calls(), vec!["list *"]);
}

#[tokio::test]
async fn test_purge_nothing_to_do() {
    let cloud = FakeCloud::new();

    let (summary, table) = purge(&cloud).await;

    assert_eq!(summary.discovered, 0);
    assert_eq!(summary.planned, 0);
    assert!(summary.report.success());
    assert!(table.contains("NAME"));
}
