//! Given steps for issue fabrication BDD scenarios.

use super::world::{FabricationWorld, fabrication_workflow, provider_run, run_async};
use eyre::WrapErr;
use fabrica::issue::domain::{ArtifactId, CanonicalId, IssueState};
use fabrica::mirror::domain::{ArtifactKind, TrackerArtifact};
use fabrica::pipeline::services::AdvanceRequest;
use fabrica::run::adapters::memory::ScriptedRun;
use rstest_bdd_macros::given;

#[given(r#"an issue "{canonical_id}" ready for implementation"#)]
fn issue_ready_for_implementation(
    world: &mut FabricationWorld,
    canonical_id: String,
) -> Result<(), eyre::Report> {
    let canonical = CanonicalId::new(canonical_id)
        .map_err(|err| eyre::eyre!("invalid canonical id in scenario: {err}"))?;
    let issue = run_async(world.lifecycle.create(canonical)).wrap_err("create issue")?;
    let ready = run_async(world.lifecycle.transition(issue.id(), IssueState::SpecReady))
        .wrap_err("mark the issue spec-ready")?;
    world.issue = Some(ready);
    Ok(())
}

#[given(r#"the provider will report run #{run_id:u64} for "{canonical_id}""#)]
fn provider_will_report_run(
    world: &mut FabricationWorld,
    run_id: u64,
    canonical_id: String,
) -> Result<(), eyre::Report> {
    let run = provider_run(run_id, &canonical_id)?;
    world
        .workflow
        .seed_run(&world.repo, &fabrication_workflow(), ScriptedRun::new(run, "main"))
        .wrap_err("seed scripted run")?;
    Ok(())
}

#[given(r#"the tracker already holds artifact #{artifact_id:u64} whose body marks "{canonical_id}""#)]
fn tracker_holds_marked_artifact(
    world: &mut FabricationWorld,
    artifact_id: u64,
    canonical_id: String,
) -> Result<(), eyre::Report> {
    let id = ArtifactId::new(artifact_id)
        .map_err(|err| eyre::eyre!("invalid artifact id in scenario: {err}"))?;
    let artifact = TrackerArtifact::new(
        id,
        format!("https://tracker.example/octo/widgets/issues/{artifact_id}"),
        "Fabricate the widget",
        format!("Notes\n\nCanonical-ID: {canonical_id}"),
        ArtifactKind::Issue,
    );
    world
        .tracker
        .seed_artifact(&world.repo, artifact)
        .wrap_err("seed tracker artifact")?;
    Ok(())
}

#[given(r#"an issue "{canonical_id}" being implemented as run #{run_id:u64}"#)]
fn issue_being_implemented(
    world: &mut FabricationWorld,
    canonical_id: String,
    run_id: u64,
) -> Result<(), eyre::Report> {
    let canonical = CanonicalId::new(canonical_id.as_str())
        .map_err(|err| eyre::eyre!("invalid canonical id in scenario: {err}"))?;
    let issue = run_async(world.lifecycle.create(canonical)).wrap_err("create issue")?;
    run_async(world.lifecycle.transition(issue.id(), IssueState::SpecReady))
        .wrap_err("mark the issue spec-ready")?;

    let run = provider_run(run_id, &canonical_id)?;
    world
        .workflow
        .seed_run(&world.repo, &fabrication_workflow(), ScriptedRun::new(run, "main"))
        .wrap_err("seed scripted run")?;

    let outcome = run_async(
        world
            .pipeline
            .advance(AdvanceRequest::new(issue.id(), IssueState::Implementing)),
    )
    .wrap_err("advance the issue into implementing")?;
    world.issue = Some(outcome.issue.clone());
    world.last_advance = Some(Ok(outcome));
    Ok(())
}

#[given("the issue has been killed")]
fn issue_has_been_killed(world: &mut FabricationWorld) -> Result<(), eyre::Report> {
    let issue = world
        .issue
        .as_ref()
        .ok_or_else(|| eyre::eyre!("missing issue in scenario world"))?;
    let killed = run_async(world.lifecycle.transition(issue.id(), IssueState::Killed))
        .wrap_err("kill the issue")?;
    world.issue = Some(killed);
    Ok(())
}
