//! Then steps for issue fabrication BDD scenarios.

use super::world::{FabricationWorld, run_async};
use eyre::WrapErr;
use fabrica::issue::domain::{IssueDomainError, IssueState};
use fabrica::issue::services::IssueLifecycleError;
use fabrica::pipeline::services::{AdvanceOutcome, MirrorOutcome, PipelineError};
use rstest_bdd_macros::then;

fn advance_outcome(world: &FabricationWorld) -> Result<&AdvanceOutcome, eyre::Report> {
    world
        .last_advance
        .as_ref()
        .ok_or_else(|| eyre::eyre!("missing advance result"))?
        .as_ref()
        .map_err(|err| eyre::eyre!("advance failed: {err}"))
}

#[then("a mirror artifact is provisioned and bound")]
fn mirror_provisioned_and_bound(world: &FabricationWorld) -> Result<(), eyre::Report> {
    let outcome = advance_outcome(world)?;
    if !matches!(outcome.mirror_outcome, Some(MirrorOutcome::Provisioned(_))) {
        return Err(eyre::eyre!(
            "expected a provisioned mirror, got {:?}",
            outcome.mirror_outcome
        ));
    }
    if outcome.issue.mirror().is_none() {
        return Err(eyre::eyre!("issue carries no mirror binding after the advance"));
    }
    if world.provisioner.provision_call_count() != 1 {
        return Err(eyre::eyre!(
            "expected exactly one provision call, got {}",
            world.provisioner.provision_call_count()
        ));
    }
    Ok(())
}

#[then(r#"a fabrication run is dispatched with correlation key "{key}""#)]
fn run_dispatched_with_key(world: &FabricationWorld, key: String) -> Result<(), eyre::Report> {
    let outcome = advance_outcome(world)?;
    let receipt = outcome
        .dispatch
        .as_ref()
        .ok_or_else(|| eyre::eyre!("no dispatch receipt on the advance outcome"))?;

    if receipt.record.correlation_key().as_str() != key {
        return Err(eyre::eyre!(
            "expected correlation key {key}, found {}",
            receipt.record.correlation_key()
        ));
    }
    if receipt.is_existing {
        return Err(eyre::eyre!("expected a fresh dispatch, found an existing record"));
    }
    if world.workflow.trigger_call_count() != 1 {
        return Err(eyre::eyre!(
            "expected exactly one workflow trigger, got {}",
            world.workflow.trigger_call_count()
        ));
    }
    Ok(())
}

#[then("the existing artifact #{artifact_id:u64} is bound without provisioning")]
fn existing_artifact_bound(
    world: &FabricationWorld,
    artifact_id: u64,
) -> Result<(), eyre::Report> {
    let outcome = advance_outcome(world)?;
    match outcome.mirror_outcome {
        Some(MirrorOutcome::Resolved(ref mirror))
            if mirror.artifact_id().value() == artifact_id => {}
        ref other => {
            return Err(eyre::eyre!(
                "expected artifact #{artifact_id} resolved, got {other:?}"
            ));
        }
    }
    if world.provisioner.provision_call_count() != 0 {
        return Err(eyre::eyre!(
            "expected no provision calls, got {}",
            world.provisioner.provision_call_count()
        ));
    }
    Ok(())
}

#[then(r#"the issue state is "{state}""#)]
fn issue_state_is(world: &FabricationWorld, state: String) -> Result<(), eyre::Report> {
    let expected = IssueState::try_from(state.as_str())
        .map_err(|err| eyre::eyre!("invalid expected state in scenario: {err}"))?;

    let issue = world
        .issue
        .as_ref()
        .ok_or_else(|| eyre::eyre!("missing issue in scenario world"))?;
    let stored = run_async(world.lifecycle.get(issue.id()))
        .wrap_err("load the issue")?
        .ok_or_else(|| eyre::eyre!("issue vanished from the repository"))?;

    if stored.state() != expected {
        return Err(eyre::eyre!(
            "expected state {}, found {}",
            expected.as_str(),
            stored.state().as_str()
        ));
    }
    Ok(())
}

#[then("the advance is rejected as an invalid transition")]
fn advance_rejected_as_invalid_transition(world: &FabricationWorld) -> Result<(), eyre::Report> {
    let result = world
        .last_advance
        .as_ref()
        .ok_or_else(|| eyre::eyre!("missing advance result"))?;

    if !matches!(
        result,
        Err(PipelineError::Lifecycle(IssueLifecycleError::Domain(
            IssueDomainError::InvalidTransition { .. }
        )))
    ) {
        return Err(eyre::eyre!(
            "expected an invalid transition rejection, got {result:?}"
        ));
    }
    Ok(())
}

#[then("no fabrication run is dispatched")]
fn no_run_dispatched(world: &FabricationWorld) -> Result<(), eyre::Report> {
    if world.workflow.trigger_call_count() != 0 {
        return Err(eyre::eyre!(
            "expected no workflow triggers, got {}",
            world.workflow.trigger_call_count()
        ));
    }
    Ok(())
}
