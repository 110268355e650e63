mod key_generation;
mod sign;

pub use key_generation::GeneratedKeys;

use crate::client::{CoordinatorClient, PartyClient};
use crate::config::{KeygenConfig, SignatureConfig};
use crate::error::CeremonyError;
use crate::providers::SignatureProvider;
use crate::types::{TxRequest, Wallet};
use async_trait::async_trait;
use mpc_wallet_primitives::{CommonKeychain, Party};
use std::sync::Arc;

/// Drives the ECDSA ceremonies: the 4-round-plus-finalize distributed key
/// generation and the 3-round transaction signing protocol.
pub struct EcdsaSignatureProvider<P, C> {
    party: Arc<P>,
    coordinator: Arc<C>,
    keygen_config: KeygenConfig,
    signature_config: SignatureConfig,
    coordinator_gpg_key: String,
}

impl<P, C> EcdsaSignatureProvider<P, C> {
    pub fn new(
        party: Arc<P>,
        coordinator: Arc<C>,
        keygen_config: KeygenConfig,
        signature_config: SignatureConfig,
        coordinator_gpg_key: String,
    ) -> Self {
        EcdsaSignatureProvider {
            party,
            coordinator,
            keygen_config,
            signature_config,
            coordinator_gpg_key,
        }
    }
}

#[async_trait]
impl<P, C> SignatureProvider for EcdsaSignatureProvider<P, C>
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
