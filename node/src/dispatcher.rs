use crate::client::{CoordinatorClient, PartyClient};
use crate::config::ConfigFile;
use crate::error::CeremonyError;
use crate::providers::{
    round_trip, EcdsaSignatureProvider, EddsaSignatureProvider, SignatureProvider,
};
use crate::types::{SignResult, TxRequest, TxRequestState, Wallet, FULL_API_VERSION};
use mpc_wallet_primitives::{CommonKeychain, MpcAlgorithm, Party, UnknownAlgorithmError};
use std::sync::Arc;

/// Selects the signing ceremony matching a wallet's declared algorithm,
/// validates the caller's inputs against the keychain on record, and
/// normalizes the terminal tx request into a signed or pending-approval
/// result.
pub struct SigningDispatcher<P, C> {
    coordinator: Arc<C>,
    ecdsa: EcdsaSignatureProvider<P, C>,
    eddsa: EddsaSignatureProvider<P, C>,
    timeout_sec: u64,
}

impl<P, C> SigningDispatcher<P, C>
where
    P: PartyClient,
    C: CoordinatorClient,
{
    pub fn new(party: Arc<P>, coordinator: Arc<C>, config: &ConfigFile) -> Self {
        SigningDispatcher {
            ecdsa: EcdsaSignatureProvider::new(
                party.clone(),
                coordinator.clone(),
                config.keygen.clone(),
                config.signature.clone(),
                config.coordinator.gpg_public_key.clone(),
            ),
            eddsa: EddsaSignatureProvider::new(
                party,
                coordinator.clone(),
                config.signature.clone(),
            ),
            coordinator,
            timeout_sec: config.signature.timeout_sec,
        }
    }

    /// Runs the ECDSA key-generation ceremony for an enterprise. Key
    /// generation has no algorithm dispatch; only the ECDSA provider
    /// implements it.
    pub async fn generate_keys(
        &self,
        enterprise: &str,
        wallet_params: serde_json::Value,
    ) -> Result<crate::providers::ecdsa::GeneratedKeys, CeremonyError> {
        self.ecdsa.generate_keys(enterprise, wallet_params).await
    }

    /// Validates the wallet and keychain, drives the matching signing
    /// ceremony to a terminal state, and returns the normalized outcome.
    pub async fn sign_and_send(
        &self,
        wallet: &Wallet,
        tx_request_id: &str,
        party: Party,
        common_keychain: Option<&CommonKeychain>,
    ) -> Result<SignResult, CeremonyError> {
        if !wallet.subtype.is_on_prem() {
            return Err(CeremonyError::UnsupportedWallet {
                wallet_id: wallet.id.clone(),
            });
        }
        let algorithm: MpcAlgorithm = wallet
            .multisig_type
            .parse()
            .map_err(|err: UnknownAlgorithmError| CeremonyError::UnsupportedAlgorithm(err.0))?;

        let keychain = round_trip(
            "fetch signing keychain",
            self.timeout_sec,
            self.coordinator.get_keychain(&wallet.id, party),
        )
        .await?
        .ok_or_else(|| CeremonyError::MissingKeychain {
            wallet_id: wallet.id.clone(),
            party,
        })?;
        if let Some(supplied) = common_keychain {
            if *supplied != keychain.common_keychain {
                return Err(CeremonyError::CommonKeychainMismatch {
                    party,
                    expected: keychain.common_keychain,
                    actual: supplied.clone(),
                });
            }
        }

        let tx_request = round_trip(
            "fetch tx request",
            self.timeout_sec,
            self.coordinator.get_tx_request(&wallet.id, tx_request_id),
        )
        .await?;
        ensure_full_api_version(&tx_request)?;

        let tx_request = match algorithm {
            MpcAlgorithm::Ecdsa => {
                self.ecdsa
                    .sign(wallet, tx_request, party, &keychain.common_keychain)
                    .await?
            }
            MpcAlgorithm::Eddsa => {
                self.eddsa
                    .sign(wallet, tx_request, party, &keychain.common_keychain)
                    .await?
            }
        };
        ensure_full_api_version(&tx_request)?;

        if tx_request.state == TxRequestState::PendingApproval {
            let approval_id = tx_request.pending_approval_id.clone().ok_or(
                CeremonyError::InvalidRoundReply {
                    operation: "fetch tx request",
                    detail: "pendingApprovalId".to_string(),
                },
            )?;
            let pending_approval = round_trip(
                "fetch pending approval",
                self.timeout_sec,
                self.coordinator.get_pending_approval(&approval_id),
            )
            .await?;
            return Ok(SignResult::PendingApproval {
                pending_approval,
                tx_request,
            });
        }

        let signed = tx_request
            .transactions
            .first()
            .and_then(|transaction| transaction.signed_tx.clone())
            .ok_or_else(|| CeremonyError::InvalidRoundReply {
                operation: "fetch tx request",
                detail: "signedTx on the first transaction".to_string(),
            })?;
        Ok(SignResult::Signed {
            txid: signed.id,
            tx: signed.tx,
            tx_request,
        })
    }
}

fn ensure_full_api_version(tx_request: &TxRequest) -> Result<(), CeremonyError> {
    if tx_request.api_version != FULL_API_VERSION {
        return Err(CeremonyError::UnsupportedApiVersion(
            tx_request.api_version.clone(),
        ));
    }
    Ok(())
}
