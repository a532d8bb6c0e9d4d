use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AggregatorError {
    #[error("aggregator name must not be empty")]
    EmptyName,
    #[error("aggregator '{aggregator}' has no configured messages")]
    NoMessages { aggregator: String },
    #[error("counter target must be at least 1, got {target}")]
    InvalidTarget { target: u32 },
}
