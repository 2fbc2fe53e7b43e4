//! World state for issue fabrication BDD scenarios.

use std::sync::Arc;
use std::time::Duration;

use fabrica::issue::adapters::memory::InMemoryIssueRepository;
use fabrica::issue::domain::{Issue, RepoCoords};
use fabrica::issue::services::IssueLifecycleService;
use fabrica::mirror::adapters::memory::InMemoryTrackerClient;
use fabrica::mirror::services::MirrorResolver;
use fabrica::pipeline::adapters::memory::InMemoryMirrorProvisioner;
use fabrica::pipeline::domain::FabricationTarget;
use fabrica::pipeline::services::{AbsorbOutcome, AdvanceOutcome, PipelineError, PipelineService};
use fabrica::run::adapters::memory::{InMemoryRunLedger, InMemoryWorkflowClient};
use fabrica::run::domain::{ExternalRunId, RawRunSnapshot, WorkflowId};
use fabrica::run::ports::WorkflowRun;
use fabrica::run::services::{RetryPolicy, RunDispatchService};

use chrono::Utc;
use mockable::DefaultClock;
use rstest::fixture;

pub type FabricationPipeline = PipelineService<
    InMemoryIssueRepository,
    InMemoryTrackerClient,
    InMemoryMirrorProvisioner,
    InMemoryWorkflowClient,
    InMemoryRunLedger,
    DefaultClock,
>;

/// World state for fabrication BDD tests.
pub struct FabricationWorld {
    pub tracker: Arc<InMemoryTrackerClient>,
    pub provisioner: Arc<InMemoryMirrorProvisioner>,
    pub workflow: Arc<InMemoryWorkflowClient>,
    pub lifecycle: IssueLifecycleService<InMemoryIssueRepository, DefaultClock>,
    pub pipeline: FabricationPipeline,
    pub repo: RepoCoords,
    pub issue: Option<Issue>,
    pub last_advance: Option<Result<AdvanceOutcome, PipelineError>>,
    pub last_absorb: Option<Result<AbsorbOutcome, PipelineError>>,
}

impl Default for FabricationWorld {
    fn default() -> Self {
        let clock = Arc::new(DefaultClock);
        let repository = Arc::new(InMemoryIssueRepository::new());
        let tracker = Arc::new(InMemoryTrackerClient::new());
        let provisioner =
            Arc::new(InMemoryMirrorProvisioner::new(Arc::clone(&tracker)).with_next_artifact(500));
        let workflow = Arc::new(InMemoryWorkflowClient::new());
        let ledger = Arc::new(InMemoryRunLedger::new());
        let repo = RepoCoords::new("octo", "widgets").expect("valid repo coords");

        let lifecycle = IssueLifecycleService::new(Arc::clone(&repository), Arc::clone(&clock));
        let pipeline = PipelineService::new(
            IssueLifecycleService::new(Arc::clone(&repository), Arc::clone(&clock)),
            MirrorResolver::new(Arc::clone(&tracker)),
            Arc::clone(&provisioner),
            RunDispatchService::new(
                Arc::clone(&workflow),
                Arc::clone(&ledger),
                Arc::clone(&clock),
                locate_policy(),
            ),
            FabricationTarget::new(repo.clone(), fabrication_workflow(), "main"),
        );

        Self {
            tracker,
            provisioner,
            workflow,
            lifecycle,
            pipeline,
            repo,
            issue: None,
            last_advance: None,
            last_absorb: None,
        }
    }
}

#[fixture]
pub fn world() -> FabricationWorld {
    FabricationWorld::default()
}

pub fn run_async<T>(future: impl std::future::Future<Output = T>) -> T {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}

/// Workflow identifier every scenario dispatches against.
pub fn fabrication_workflow() -> WorkflowId {
    WorkflowId::new("fabricate.yml").expect("valid workflow id")
}

fn locate_policy() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 3,
        delay: Duration::ZERO,
        safety_margin: Duration::from_secs(60),
    }
}

/// Builds a queued provider run echoing the dispatch correlation token.
pub fn provider_run(run_id: u64, canonical_id: &str) -> Result<WorkflowRun, eyre::Report> {
    let id = ExternalRunId::new(run_id)
        .map_err(|err| eyre::eyre!("invalid scripted run id: {err}"))?;
    Ok(WorkflowRun {
        id,
        url: format!("https://ci.example/octo/widgets/runs/{run_id}"),
        raw: RawRunSnapshot::new("queued", None),
        correlation_token: Some(canonical_id.to_owned()),
        created_at: Utc::now(),
        started_at: None,
        completed_at: None,
        logs_url: None,
    })
}
