use crate::client::{
    CoordinatorClient, EddsaCommitmentRequest, EddsaGShareRequest, EddsaRShareRequest, PartyClient,
};
use crate::error::CeremonyError;
use crate::providers::eddsa::EddsaSignatureProvider;
use crate::providers::round_trip;
use crate::types::{TxRequest, Wallet};
use mpc_wallet_primitives::{CommonKeychain, Party};

impl<P, C> EddsaSignatureProvider<P, C>
where
    P: PartyClient,
    C: CoordinatorClient,
{
    /// Drives the EdDSA signing ceremony: the party commits, commitments are
    /// exchanged with the coordinator, R-shares are produced and swapped,
    /// and the final G-share is submitted before the terminal tx request is
    /// fetched back. Any failed step aborts the whole ceremony.
    pub(super) async fn sign_transaction(
        &self,
        wallet: &Wallet,
        tx_request: TxRequest,
        party: Party,
        common_keychain: &CommonKeychain,
    ) -> Result<TxRequest, CeremonyError> {
        let timeout = self.signature_config.timeout_sec;
        tracing::info!(
            wallet_id = wallet.id.as_str(),
            tx_request_id = tx_request.tx_request_id.as_str(),
            %party,
            "starting eddsa signing ceremony"
        );

        let coordinator_public_key = round_trip(
            "fetch coordinator public key",
            timeout,
            self.coordinator.coordinator_public_key(),
        )
        .await?;

        let commitment = round_trip(
            "eddsa commitment",
            timeout,
            self.party.eddsa_commitment(EddsaCommitmentRequest {
                source: party,
                tx_request: tx_request.clone(),
                coordinator_public_key,
                common_keychain: common_keychain.clone(),
            }),
        )
        .await?;

        let coordinator_commitment = round_trip(
            "exchange commitments",
            timeout,
            self.coordinator.exchange_commitments(
                &wallet.id,
                &tx_request.tx_request_id,
                commitment.commitment.clone(),
            ),
        )
        .await?;

        let r_share = round_trip(
            "eddsa r share",
            timeout,
            self.party.eddsa_r_share(EddsaRShareRequest {
                source: party,
                encrypted_r_share: commitment.encrypted_r_share.clone(),
                encrypted_data_key: commitment.encrypted_data_key.clone(),
            }),
        )
        .await?;

        round_trip(
            "offer r share",
            timeout,
            self.coordinator.offer_r_share(
                &wallet.id,
                &tx_request.tx_request_id,
                r_share.r_share.clone(),
                &commitment.encrypted_signer_share,
            ),
        )
        .await?;

        let coordinator_r_share = round_trip(
            "fetch coordinator r share",
            timeout,
            self.coordinator
                .get_r_share(&wallet.id, &tx_request.tx_request_id),
        )
        .await?;

        let g_share = round_trip(
            "eddsa g share",
            timeout,
            self.party.eddsa_g_share(EddsaGShareRequest {
                source: party,
                r_share: r_share.r_share,
                coordinator_r_share,
                coordinator_commitment,
            }),
        )
        .await?;

        round_trip(
            "send g share",
            timeout,
            self.coordinator
                .send_g_share(&wallet.id, &tx_request.tx_request_id, g_share.g_share),
        )
        .await?;

        let tx_request = round_trip(
            "fetch tx request",
            timeout,
            self.coordinator
                .get_tx_request(&wallet.id, &tx_request.tx_request_id),
        )
        .await?;
        tracing::info!(
            wallet_id = wallet.id.as_str(),
            tx_request_id = tx_request.tx_request_id.as_str(),
            state = %tx_request.state,
            "eddsa signing ceremony finished"
        );
        Ok(tx_request)
    }
}
