//! Static coordinates of the fabrication workflow and its mirror home.

use crate::issue::domain::RepoCoords;
use crate::mirror::domain::MirrorTemplate;
use crate::run::domain::WorkflowId;

/// Where fabrication happens: the repository hosting both the mirror
/// artifacts and the workflow, the workflow to trigger, and the git
/// reference it runs against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FabricationTarget {
    /// Repository hosting mirror artifacts and the fabrication workflow.
    pub repo: RepoCoords,
    /// Workflow triggered for each implementing issue.
    pub workflow_id: WorkflowId,
    /// Git reference the workflow runs against.
    pub git_ref: String,
    /// Template used when a mirror document must be provisioned.
    pub template: MirrorTemplate,
}

impl FabricationTarget {
    /// Creates a fabrication target with the default mirror template.
    #[must_use]
    pub fn new(repo: RepoCoords, workflow_id: WorkflowId, git_ref: impl Into<String>) -> Self {
        Self {
            repo,
            workflow_id,
            git_ref: git_ref.into(),
            template: MirrorTemplate::default(),
        }
    }

    /// Replaces the mirror document template.
    #[must_use]
    pub fn with_template(mut self, template: MirrorTemplate) -> Self {
        self.template = template;
        self
    }
}
