use tc_core::TcError;
use tc_vehicle::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("traffic manager is not initialized")]
    NotInitialized,

    #[error("manager configuration error: {0}")]
    Config(String),

    /// Clock-mode mismatches, invalid step lengths, and parse failures.
    #[error(transparent)]
    Core(#[from] TcError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[cfg(feature = "parallel")]
    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

pub type SimResult<T> = Result<T, SimError>;
