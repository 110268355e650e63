//! Fans one operation (consolidation, acceleration) out over N independent
//! signing ceremonies and aggregates the per-item outcomes. One item's
//! failure never touches another item's in-flight ceremony; the aggregate
//! outcome is decided only after every item has finished.

use crate::client::{CoordinatorClient, PartyClient};
use crate::dispatcher::SigningDispatcher;
use crate::error::CeremonyError;
use crate::types::{SignResult, Wallet};
use futures::future;
use mpc_wallet_primitives::{CommonKeychain, Party};
use std::future::Future;

/// The captured failure of one batch item.
#[derive(Clone, Debug)]
pub struct BatchFailure {
    pub tx_request_id: String,
    pub error: String,
}

/// Accumulated outcomes of one batch run. Callers only ever see the complete
/// result; nothing is surfaced while items are still in flight.
#[derive(Clone, Debug, Default)]
pub struct BatchResult {
    pub success: Vec<SignResult>,
    pub failure: Vec<BatchFailure>,
}

impl BatchResult {
    /// Collapses the per-item outcomes into the aggregate ceremony outcome:
    /// no failures is success, anything else is a server-class error whose
    /// message distinguishes some progress from none.
    pub fn outcome(&self) -> Result<(), CeremonyError> {
        match (self.failure.len(), self.success.len()) {
            (0, _) => Ok(()),
            (_, 0) => Err(CeremonyError::BatchFailed),
            (failed, succeeded) => Err(CeremonyError::BatchPartiallyFailed { failed, succeeded }),
        }
    }
}

/// Runs `signer` once per tx request, all items concurrently and fully
/// independently, and captures every outcome without aborting the batch.
pub async fn run_batch<F, Fut>(tx_request_ids: Vec<String>, signer: F) -> BatchResult
where
    F: Fn(String) -> Fut,
    Fut: Future<Output = Result<SignResult, CeremonyError>>,
{
    let items = tx_request_ids.into_iter().map(|id| {
        let ceremony = signer(id.clone());
        async move { (id, ceremony.await) }
    });
    let outcomes = future::join_all(items).await;

    let mut result = BatchResult::default();
    for (tx_request_id, outcome) in outcomes {
        match outcome {
            Ok(signed) => result.success.push(signed),
            Err(err) => {
                tracing::warn!(
                    tx_request_id = tx_request_id.as_str(),
                    error = %err,
                    "batch item failed"
                );
                result.failure.push(BatchFailure {
                    tx_request_id,
                    error: render_chain(&err),
                });
            }
        }
    }
    result
}

/// The full cause chain, so a batch entry keeps the originating failure.
fn render_chain(err: &CeremonyError) -> String {
    let mut rendered = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        rendered.push_str(": ");
        rendered.push_str(&cause.to_string());
        source = cause.source();
    }
    rendered
}

impl<P, C> SigningDispatcher<P, C>
where
    P: PartyClient,
    C: CoordinatorClient,
{
    /// Signs every consolidation tx request independently and surfaces the
    /// aggregate outcome. Partial and total failure carry different errors;
    /// a fully successful batch returns with an empty failure list.
    pub async fn send_consolidations(
        &self,
        wallet: &Wallet,
        tx_request_ids: Vec<String>,
        party: Party,
        common_keychain: Option<&CommonKeychain>,
    ) -> Result<BatchResult, CeremonyError> {
        tracing::info!(
            wallet_id = wallet.id.as_str(),
            items = tx_request_ids.len(),
            "running consolidation batch"
        );
        self.sign_batch(wallet, tx_request_ids, party, common_keychain)
            .await
    }

    /// Identical aggregation semantics to consolidations; only the prepared
    /// tx requests differ.
    pub async fn send_accelerations(
        &self,
        wallet: &Wallet,
        tx_request_ids: Vec<String>,
        party: Party,
        common_keychain: Option<&CommonKeychain>,
    ) -> Result<BatchResult, CeremonyError> {
        tracing::info!(
            wallet_id = wallet.id.as_str(),
            items = tx_request_ids.len(),
            "running acceleration batch"
        );
        self.sign_batch(wallet, tx_request_ids, party, common_keychain)
            .await
    }

    async fn sign_batch(
        &self,
        wallet: &Wallet,
        tx_request_ids: Vec<String>,
        party: Party,
        common_keychain: Option<&CommonKeychain>,
    ) -> Result<BatchResult, CeremonyError> {
        let result = run_batch(tx_request_ids, |tx_request_id| async move {
            self.sign_and_send(wallet, &tx_request_id, party, common_keychain)
                .await
        })
        .await;
        result.outcome()?;
        Ok(result)
    }
}
