//! When steps for issue fabrication BDD scenarios.

use super::world::{FabricationWorld, run_async};
use chrono::Utc;
use eyre::WrapErr;
use fabrica::issue::domain::IssueState;
use fabrica::pipeline::services::{AbsorbOutcome, AdvanceRequest};
use fabrica::run::domain::{ExternalRunId, RawRunSnapshot};
use fabrica::run::ports::WorkflowRun;
use rstest_bdd_macros::when;

#[when(r#"the issue advances to "{state}""#)]
fn issue_advances(world: &mut FabricationWorld, state: String) -> Result<(), eyre::Report> {
    let to = IssueState::try_from(state.as_str())
        .map_err(|err| eyre::eyre!("invalid target state in scenario: {err}"))?;
    let issue = world
        .issue
        .as_ref()
        .ok_or_else(|| eyre::eyre!("missing issue in scenario world"))?;

    let result = run_async(world.pipeline.advance(AdvanceRequest::new(issue.id(), to)));
    if let Ok(ref outcome) = result {
        world.issue = Some(outcome.issue.clone());
    }
    world.last_advance = Some(result);
    Ok(())
}

#[when(r#"the provider reports run #{run_id:u64} completed with conclusion "{conclusion}""#)]
fn provider_reports_completion(
    world: &mut FabricationWorld,
    run_id: u64,
    conclusion: String,
) -> Result<(), eyre::Report> {
    let id = ExternalRunId::new(run_id)
        .map_err(|err| eyre::eyre!("invalid run id in scenario: {err}"))?;
    let run = WorkflowRun {
        id,
        url: format!("https://ci.example/octo/widgets/runs/{run_id}"),
        raw: RawRunSnapshot::new("completed", Some(conclusion)),
        correlation_token: None,
        created_at: Utc::now(),
        started_at: Some(Utc::now()),
        completed_at: Some(Utc::now()),
        logs_url: None,
    };
    world
        .workflow
        .update_run(&world.repo, run)
        .wrap_err("update scripted run")?;
    Ok(())
}

#[when("the run outcome is absorbed")]
fn run_outcome_is_absorbed(world: &mut FabricationWorld) -> Result<(), eyre::Report> {
    let issue = world
        .issue
        .as_ref()
        .ok_or_else(|| eyre::eyre!("missing issue in scenario world"))?;
    let run_id = world
        .last_advance
        .as_ref()
        .and_then(|advance| advance.as_ref().ok())
        .and_then(|outcome| outcome.dispatch.as_ref())
        .and_then(|receipt| receipt.record.external_run_id())
        .ok_or_else(|| eyre::eyre!("missing dispatched run in scenario world"))?;

    let result = run_async(
        world
            .pipeline
            .absorb_run_completion(issue.id(), &world.repo, run_id),
    );
    if let Ok(
        AbsorbOutcome::Transitioned { issue: ref updated, .. }
        | AbsorbOutcome::Unchanged { issue: ref updated, .. },
    ) = result
    {
        world.issue = Some(updated.clone());
    }
    world.last_absorb = Some(result);
    Ok(())
}
