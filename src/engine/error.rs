use thiserror::Error;

pub type FieldResult<T> = Result<T, FieldError>;

/// Everything that can go wrong while setting up or stepping a gravity field
#[derive(Error, Debug)]
pub enum FieldError {
    /// A batch resolver needs at least one arrow to size its buffers
    #[error("cannot initialize a batch resolver without arrows")]
    NoSources,

    #[error("batch resolver is already initialized, call teardown first")]
    AlreadyInitialized,

    #[error("batch resolver is not initialized")]
    NotInitialized,

    #[error("group count must be at least 1")]
    ZeroGroups,

    #[error("batch width must be at least 1, got {width}")]
    InvalidBatchWidth { width: usize },

    /// More queries than the resolver was sized for
    #[error("{len} queries exceed the batch capacity of {capacity}")]
    CapacityOverflow { len: usize, capacity: usize },

    /// Arrow updates must keep the count the buffers were sized with
    #[error("expected {expected} arrows, got {got}")]
    SourceCountMismatch { expected: usize, got: usize },

    #[error("gravity magnitude must be finite and non-negative, got {magnitude}")]
    InvalidMagnitude { magnitude: f32 },

    #[error("invalid field config: {reason}")]
    InvalidConfig { reason: String },

    #[error("failed to read scene: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse scene: {0}")]
    Parse(#[from] serde_json::Error),
}
