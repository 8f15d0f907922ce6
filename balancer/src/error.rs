use thiserror::Error;

#[derive(Debug, Error)]
pub enum BalancerError {
    #[error("unknown balancer algorithm: {0}")]
    UnknownAlgorithm(String),

    #[error("failed to initialize balancer algorithm: {0}")]
    InitFailure(String),
}
