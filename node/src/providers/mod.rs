//! Algorithm-specific ceremony coordinators. The dispatcher selects the
//! provider matching a wallet's declared algorithm; both drive their rounds
//! through the injected Party and Coordinator clients and never perform
//! cryptography themselves.

pub mod ecdsa;
pub mod eddsa;

use crate::client::ClientError;
use crate::error::CeremonyError;
use crate::types::{TxRequest, Wallet};
use async_trait::async_trait;
use mpc_wallet_primitives::{CommonKeychain, Party};
use std::future::Future;
use std::time::Duration;

pub use ecdsa::EcdsaSignatureProvider;
pub use eddsa::EddsaSignatureProvider;

/// Interface over the algorithm-specific signing ceremonies.
#[async_trait]
pub trait SignatureProvider {
    /// Drives one complete signing ceremony over a prepared tx request,
    /// returning it in a terminal state. Any failed round aborts the whole
    /// ceremony; no partial signature is usable.
    async fn sign(
        &self,
        wallet: &Wallet,
        tx_request: TxRequest,
        party: Party,
        common_keychain: &CommonKeychain,
    ) -> Result<TxRequest, CeremonyError>;
}

/// Bounds one client round trip by the ceremony's configured timeout and
/// classifies its failure. Every network suspension in a ceremony goes
/// through here.
pub(crate) async fn round_trip<T, F>(
    operation: &'static str,
    timeout_sec: u64,
    call: F,
) -> Result<T, CeremonyError>
where
    F: Future<Output = Result<T, ClientError>>,
{
    match tokio::time::timeout(Duration::from_secs(timeout_sec), call).await {
        Ok(Ok(reply)) => Ok(reply),
        Ok(Err(err)) => Err(CeremonyError::from_client(operation, err)),
        Err(_) => Err(CeremonyError::from_client(
            operation,
            ClientError::Timeout {
                operation,
                seconds: timeout_sec,
            },
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[tokio::test]
    async fn round_trip_times_out_as_a_transport_error() {
        let err = round_trip("keygen round 1", 0, async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<(), ClientError>(())
        })
        .await
        .unwrap_err();
        assert_matches!(
            err,
            CeremonyError::Transport {
                operation: "keygen round 1",
                source: ClientError::Timeout { .. },
            }
        );
    }
}
