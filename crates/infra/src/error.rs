use thiserror::Error;

use almox_core::DomainError;
use almox_inventory::LedgerError;

use crate::store::{MovementError, StoreError};

/// Error returned by the inventory services.
///
/// Keeps the three failure families apart so the HTTP layer can map each to
/// its own status: form/domain validation, ledger rejections, and storage.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<MovementError> for ServiceError {
    fn from(value: MovementError) -> Self {
        match value {
            MovementError::Rejected(e) => ServiceError::Ledger(e),
            MovementError::Store(e) => ServiceError::Store(e),
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;
