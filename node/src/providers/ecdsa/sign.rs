use crate::client::{
    CoordinatorClient, PartyClient, SignRound1Request, SignRoundRequest, SignSessionArtifacts,
};
use crate::error::CeremonyError;
use crate::providers::ecdsa::EcdsaSignatureProvider;
use crate::providers::round_trip;
use crate::types::{TxRequest, Wallet};
use mpc_wallet_primitives::{CommonKeychain, MpcAlgorithm, Party};

/// The encrypted session material of one in-flight signing ceremony. Owned by
/// exactly one ceremony run; `take` moves the artifacts out, so a round can
/// only ever consume what the immediately preceding round produced.
struct SigningSession {
    artifacts: SignSessionArtifacts,
}

impl SigningSession {
    fn advance(artifacts: SignSessionArtifacts) -> Self {
        SigningSession { artifacts }
    }

    fn take(self) -> SignSessionArtifacts {
        self.artifacts
    }
}

impl<P, C> EcdsaSignatureProvider<P, C>
where
    P: PartyClient,
    C: CoordinatorClient,
{
    /// Drives the 3-round ECDSA signing ceremony over a prepared tx request.
    /// Each round's share goes to the coordinator, whose reply (the tx
    /// request with the share appended) becomes the next round's input. Any
    /// failed round aborts the ceremony; no partial signature is usable.
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
            "starting ecdsa signing ceremony"
        );

        let round1 = round_trip(
            "ecdsa sign round 1",
            timeout,
            self.party.sign_round1(SignRound1Request {
                source: party,
                tx_request: tx_request.clone(),
                coordinator_public_key: self.coordinator_gpg_key.clone(),
                common_keychain: common_keychain.clone(),
            }),
        )
        .await?;
        let session = SigningSession::advance(round1.artifacts);
        let tx_request = round_trip(
            "submit ecdsa round 1 share",
            timeout,
            self.coordinator.send_signature_share(
                &wallet.id,
                &tx_request.tx_request_id,
                round1.signature_share,
                MpcAlgorithm::Ecdsa,
            ),
        )
        .await?;

        let round2 = round_trip(
            "ecdsa sign round 2",
            timeout,
            self.party.sign_round2(SignRoundRequest {
                source: party,
                tx_request: tx_request.clone(),
                artifacts: session.take(),
            }),
        )
        .await?;
        let session = SigningSession::advance(round2.artifacts);
        let tx_request = round_trip(
            "submit ecdsa round 2 share",
            timeout,
            self.coordinator.send_signature_share(
                &wallet.id,
                &tx_request.tx_request_id,
                round2.signature_share,
                MpcAlgorithm::Ecdsa,
            ),
        )
        .await?;

        let round3 = round_trip(
            "ecdsa sign round 3",
            timeout,
            self.party.sign_round3(SignRoundRequest {
                source: party,
                tx_request: tx_request.clone(),
                artifacts: session.take(),
            }),
        )
        .await?;
        let tx_request = round_trip(
            "submit ecdsa round 3 share",
            timeout,
            self.coordinator.send_signature_share(
                &wallet.id,
                &tx_request.tx_request_id,
                round3.signature_share,
                MpcAlgorithm::Ecdsa,
            ),
        )
        .await?;

        tracing::info!(
            wallet_id = wallet.id.as_str(),
            tx_request_id = tx_request.tx_request_id.as_str(),
            state = %tx_request.state,
            "ecdsa signing ceremony finished"
        );
        Ok(tx_request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{ClientError, MockCoordinatorClient, MockPartyClient, SignRoundReply};
    use crate::config::{KeygenConfig, SignatureConfig};
    use crate::types::{SignatureShare, TxRequestState};
    use assert_matches::assert_matches;
    use std::sync::Arc;

    fn artifacts(round: u32) -> SignSessionArtifacts {
        SignSessionArtifacts {
            gpg_key: "user-gpg".to_string(),
            encrypted_session: format!("session-{round}"),
            encrypted_signer_material: format!("material-{round}"),
            encrypted_data_key: format!("data-key-{round}"),
        }
    }

    fn share(round: u32) -> SignatureShare {
        SignatureShare {
            from: Party::User,
            to: Party::Coordinator,
            share: format!("share-{round}"),
        }
    }

    fn tx_request(shares: u32, state: TxRequestState) -> TxRequest {
        TxRequest {
            tx_request_id: "txreq-1".to_string(),
            wallet_id: "wallet-1".to_string(),
            api_version: "full".to_string(),
            state,
            signature_shares: (1..=shares).map(share).collect(),
            transactions: Vec::new(),
            pending_approval_id: None,
        }
    }

    fn wallet() -> Wallet {
        Wallet {
            id: "wallet-1".to_string(),
            enterprise: "enterprise-1".to_string(),
            subtype: crate::types::WalletSubtype::OnPremCold,
            multisig_type: "ecdsa".to_string(),
        }
    }

    fn provider(
        party: MockPartyClient,
        coordinator: MockCoordinatorClient,
    ) -> EcdsaSignatureProvider<MockPartyClient, MockCoordinatorClient> {
        EcdsaSignatureProvider::new(
            Arc::new(party),
            Arc::new(coordinator),
            KeygenConfig { timeout_sec: 5 },
            SignatureConfig { timeout_sec: 5 },
            "coordinator-gpg".to_string(),
        )
    }

    #[tokio::test]
    async fn threads_each_rounds_artifacts_into_the_next() {
        let mut party = MockPartyClient::new();
        let mut coordinator = MockCoordinatorClient::new();

        party.expect_sign_round1().returning(|request| {
            assert_eq!(request.source, Party::User);
            assert_eq!(request.coordinator_public_key, "coordinator-gpg");
            assert_eq!(request.common_keychain.as_str(), "03c0ffee");
            assert!(request.tx_request.signature_shares.is_empty());
            Ok(SignRoundReply {
                signature_share: share(1),
                artifacts: artifacts(1),
            })
        });
        party.expect_sign_round2().returning(|request| {
            // round 2 must consume exactly what round 1 returned
            assert_eq!(request.artifacts, artifacts(1));
            assert_eq!(request.tx_request.signature_shares.len(), 1);
            Ok(SignRoundReply {
                signature_share: share(2),
                artifacts: artifacts(2),
            })
        });
        party.expect_sign_round3().returning(|request| {
            assert_eq!(request.artifacts, artifacts(2));
            assert_eq!(request.tx_request.signature_shares.len(), 2);
            Ok(SignRoundReply {
                signature_share: share(3),
                artifacts: artifacts(3),
            })
        });
        coordinator
            .expect_send_signature_share()
            .times(3)
            .returning(|wallet_id, tx_request_id, submitted, algorithm| {
                assert_eq!(wallet_id, "wallet-1");
                assert_eq!(tx_request_id, "txreq-1");
                assert_eq!(algorithm, MpcAlgorithm::Ecdsa);
                let round: u32 = submitted.share.trim_start_matches("share-").parse().unwrap();
                let state = if round == 3 {
                    TxRequestState::Signed
                } else {
                    TxRequestState::PendingUserSignature
                };
                Ok(tx_request(round, state))
            });

        let signed = provider(party, coordinator)
            .sign_transaction(
                &wallet(),
                tx_request(0, TxRequestState::PendingUserSignature),
                Party::User,
                &"03c0ffee".into(),
            )
            .await
            .unwrap();

        assert_eq!(signed.state, TxRequestState::Signed);
        assert_eq!(signed.signature_shares.len(), 3);
    }

    #[tokio::test]
    async fn a_rejected_share_aborts_the_ceremony() {
        let mut party = MockPartyClient::new();
        let mut coordinator = MockCoordinatorClient::new();

        party.expect_sign_round1().returning(|_| {
            Ok(SignRoundReply {
                signature_share: share(1),
                artifacts: artifacts(1),
            })
        });
        // round 2 and 3 are never mocked; reaching them would panic the test
        coordinator
            .expect_send_signature_share()
            .times(1)
            .returning(|_, _, _, _| {
                Err(ClientError::Status {
                    status: 400,
                    body: "share rejected".to_string(),
                })
            });

        let err = provider(party, coordinator)
            .sign_transaction(
                &wallet(),
                tx_request(0, TxRequestState::PendingUserSignature),
                Party::User,
                &"03c0ffee".into(),
            )
            .await
            .unwrap_err();

        assert_matches!(
            err,
            CeremonyError::Transport {
                operation: "submit ecdsa round 1 share",
                source: ClientError::Status { status: 400, .. },
            }
        );
    }
}
