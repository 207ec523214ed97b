use crate::eligibility::Ineligibility;

/// Operation-boundary errors for fork and merge.
///
/// Internal db helpers stay on `anyhow::Result`; conversion to this taxonomy
/// happens where `Forker::fork` and `Merger::merge` return to the caller.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The caller passed an id that does not resolve to an item.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The operation's preconditions are not met.
    #[error(transparent)]
    NotEligible(#[from] Ineligibility),

    /// A required relationship (fork to source) cannot be resolved.
    #[error("missing relationship: {0}")]
    MissingRelationship(String),

    /// The store rejected a write. The transaction has been rolled back.
    #[error("persist failure: {0}")]
    PersistFailure(String),
}

impl Error {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidArgument(_) => "E4001",
            Self::NotEligible(_) => "E4002",
            Self::MissingRelationship(_) => "E4003",
            Self::PersistFailure(_) => "E4004",
        }
    }

    /// Wrap a db-layer failure, flattening its context chain.
    #[must_use]
    pub fn persist(error: &anyhow::Error) -> Self {
        Self::PersistFailure(format!("{error:#}"))
    }

    /// `InvalidArgument` for an id that resolved to nothing.
    #[must_use]
    pub fn unknown_item(item_id: i64) -> Self {
        Self::InvalidArgument(format!("item {item_id} does not exist"))
    }
}
