use thiserror::Error;

use avatarai_net::NetError;
use avatarai_shared::{ProtocolError, ValidationError};
use avatarai_store::StoreError;

#[derive(Error, Debug)]
pub enum ClientError {
    /// Display text is the server message, shown to the user as-is.
    #[error(transparent)]
    Net(#[from] NetError),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Not signed in")]
    NotSignedIn,

    #[error("Lock poisoned")]
    LockPoisoned,
}

impl ClientError {
    /// Missing, invalid or expired credentials. The session must be dropped.
    pub fn is_auth_failure(&self) -> bool {
        match self {
            ClientError::Net(e) => e.is_auth_failure(),
            ClientError::NotSignedIn => true,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
