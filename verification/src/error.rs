use roadwatch_types::ReportStatus;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LifecycleError {
    #[error("{0} has already voted on this report")]
    DuplicateVote(String),

    #[error("submitter {0} cannot vote on their own report")]
    SelfVote(String),

    #[error("report {id} is already {status}")]
    ReportClosed { id: String, status: ReportStatus },

    #[error("negative votes are disabled")]
    RejectionDisabled,

    #[error("report {id} violates an invariant: {detail}")]
    InvariantViolated { id: String, detail: String },
}
