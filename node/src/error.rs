use crate::client::ClientError;
use mpc_wallet_primitives::{CommonKeychain, Party, SessionId};
use thiserror::Error;

/// Broad classification of a ceremony failure. The routing layer maps these
/// to response status classes; within this crate the class decides nothing,
/// it only travels with the error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorClass {
    /// Malformed or mismatched caller input. The ceremony never ran, or was
    /// aborted at the first check.
    Validation,
    /// Cross-party disagreement detected mid-ceremony. Never retryable.
    Consistency,
    /// A Party or Coordinator round trip failed.
    Transport,
    /// Aggregate outcome of a batch that did not fully succeed.
    Batch,
}

#[derive(Debug, Error)]
pub enum CeremonyError {
    #[error("unsupported mpc algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("wallet {wallet_id} is not an on-prem cold or custody wallet")]
    UnsupportedWallet { wallet_id: String },

    #[error("no {party} tss keychain exists for wallet {wallet_id}")]
    MissingKeychain { wallet_id: String, party: Party },

    #[error(
        "supplied common keychain does not match the {party} keychain on record \
         (expected {expected}, got {actual})"
    )]
    CommonKeychainMismatch {
        party: Party,
        expected: CommonKeychain,
        actual: CommonKeychain,
    },

    #[error("{operation} reply is missing required data: {detail}")]
    InvalidRoundReply {
        operation: &'static str,
        detail: String,
    },

    #[error("session id changed at {operation}: expected {expected}, got {actual}")]
    SessionIdMismatch {
        operation: &'static str,
        expected: SessionId,
        actual: SessionId,
    },

    #[error(
        "parties disagree on the generated common keychain \
         (user {user}, backup {backup}, coordinator {coordinator})"
    )]
    CommonKeychainDisagreement {
        user: CommonKeychain,
        backup: CommonKeychain,
        coordinator: CommonKeychain,
    },

    #[error("unsupported tx request api version: {0}")]
    UnsupportedApiVersion(String),

    #[error("{operation} failed")]
    Transport {
        operation: &'static str,
        #[source]
        source: ClientError,
    },

    #[error("Consolidations failed: {failed} and succeeded: {succeeded}")]
    BatchPartiallyFailed { failed: usize, succeeded: usize },

    #[error("All consolidations failed")]
    BatchFailed,
}

impl CeremonyError {
    pub fn class(&self) -> ErrorClass {
        match self {
            CeremonyError::UnsupportedAlgorithm(_)
            | CeremonyError::UnsupportedWallet { .. }
            | CeremonyError::MissingKeychain { .. }
            | CeremonyError::CommonKeychainMismatch { .. }
            | CeremonyError::InvalidRoundReply { .. } => ErrorClass::Validation,
            CeremonyError::SessionIdMismatch { .. }
            | CeremonyError::CommonKeychainDisagreement { .. }
            | CeremonyError::UnsupportedApiVersion(_) => ErrorClass::Consistency,
            CeremonyError::Transport { .. } => ErrorClass::Transport,
            CeremonyError::BatchPartiallyFailed { .. } | CeremonyError::BatchFailed => {
                ErrorClass::Batch
            }
        }
    }

    /// Whether the routing layer should surface this as a server-side
    /// failure. Everything except caller-input validation is.
    pub fn is_server_error(&self) -> bool {
        self.class() != ErrorClass::Validation
    }

    /// Classifies a failed client call: replies that did not match the typed
    /// round schema are validation failures naming the offending field, all
    /// other client failures are transport failures with the cause kept.
    pub(crate) fn from_client(operation: &'static str, source: ClientError) -> Self {
        match source {
            ClientError::Decode(err) => CeremonyError::InvalidRoundReply {
                operation,
                detail: err.to_string(),
            },
            source => CeremonyError::Transport { operation, source },
        }
    }
}
