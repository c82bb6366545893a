use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TestInfraError {
    #[error("container error: {0}")]
    Container(#[from] testcontainers::TestcontainersError),
    #[error("{addr} not accepting connections after {timeout:?}")]
    NotReady { addr: String, timeout: Duration },
}

pub type Result<T> = std::result::Result<T, TestInfraError>;
