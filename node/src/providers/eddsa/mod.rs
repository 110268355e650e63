mod sign;

use crate::client::{CoordinatorClient, PartyClient};
use crate::config::SignatureConfig;
use crate::error::CeremonyError;
use crate::providers::SignatureProvider;
use crate::types::{TxRequest, Wallet};
use async_trait::async_trait;
use mpc_wallet_primitives::{CommonKeychain, Party};
use std::sync::Arc;

/// Drives the EdDSA signing ceremony: commitment exchange, R-share exchange,
/// G-share submission.
pub struct EddsaSignatureProvider<P, C> {
    party: Arc<P>,
    coordinator: Arc<C>,
    signature_config: SignatureConfig,
}

impl<P, C> EddsaSignatureProvider<P, C> {
    pub fn new(party: Arc<P>, coordinator: Arc<C>, signature_config: SignatureConfig) -> Self {
        EddsaSignatureProvider {
            party,
            coordinator,
            signature_config,
        }
    }
}

#[async_trait]
impl<P, C> SignatureProvider for EddsaSignatureProvider<P, C>
where
    P: PartyClient,
    C: CoordinatorClient,
{
    async fn sign(
        &self,
        wallet: &Wallet,
        tx_request: TxRequest,
        party: Party,
        common_keychain: &CommonKeychain,
    ) -> Result<TxRequest, CeremonyError> {
        self.sign_transaction(wallet, tx_request, party, common_keychain)
            .await
    }
}
