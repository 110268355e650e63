use crate::client::{
    AddKeychainRequest, CoordinatorClient, InitializedParty, KeygenFinalizeRequest,
    KeygenRound1Reply, KeygenRound1Request, KeygenRound2Reply, KeygenRound2Request,
    KeygenRound3Reply, KeygenRound3Request, PartyClient,
};
use crate::error::CeremonyError;
use crate::providers::ecdsa::EcdsaSignatureProvider;
use crate::providers::round_trip;
use crate::types::KeychainKind;
use futures::future;
use mpc_wallet_primitives::{
    BroadcastMessage, CommonKeychain, P2pMessage, Party, RoundMessages, SessionId,
};

/// Result of a completed key-generation ceremony: the three keychain record
/// ids, the agreed common keychain, and the caller's wallet parameters passed
/// through for wallet creation.
#[derive(Clone, Debug)]
pub struct GeneratedKeys {
    pub common_keychain: CommonKeychain,
    pub user_keychain_id: String,
    pub backup_keychain_id: String,
    pub coordinator_keychain_id: String,
    pub wallet_params: serde_json::Value,
}

/// All state owned by one key-generation run: both co-signers' GPG identities
/// and encrypted blobs plus the pinned session id. Created at ceremony start,
/// threaded through the rounds, dropped at the end. Never stored in a shared
/// table; session material must not outlive or leak across runs.
struct KeygenSession {
    session_id: Option<SessionId>,
    user: PartyState,
    backup: PartyState,
}

struct PartyState {
    gpg_key: String,
    encrypted_data: String,
    encrypted_data_key: String,
}

impl From<InitializedParty> for PartyState {
    fn from(init: InitializedParty) -> Self {
        PartyState {
            gpg_key: init.public_key,
            encrypted_data: init.encrypted_data,
            encrypted_data_key: init.encrypted_data_key,
        }
    }
}

impl KeygenSession {
    fn new(user: InitializedParty, backup: InitializedParty) -> Self {
        KeygenSession {
            session_id: None,
            user: user.into(),
            backup: backup.into(),
        }
    }

    /// This party's state and its counterparty's, in that order.
    fn pair(&self, source: Party) -> (&PartyState, &PartyState) {
        match source {
            Party::User => (&self.user, &self.backup),
            Party::Backup => (&self.backup, &self.user),
            Party::Coordinator => unreachable!("the coordinator holds no co-signer state"),
        }
    }

    fn state_mut(&mut self, source: Party) -> &mut PartyState {
        match source {
            Party::User => &mut self.user,
            Party::Backup => &mut self.backup,
            Party::Coordinator => unreachable!("the coordinator holds no co-signer state"),
        }
    }

    /// Replaces a party's encrypted blobs with the ones its own round reply
    /// carried. No other code path writes them.
    fn advance(&mut self, source: Party, encrypted_data: String, encrypted_data_key: String) {
        let state = self.state_mut(source);
        state.encrypted_data = encrypted_data;
        state.encrypted_data_key = encrypted_data_key;
    }

    /// Pins the session id on first sight; any later change aborts the run.
    fn observe_session_id(
        &mut self,
        operation: &'static str,
        session_id: &SessionId,
    ) -> Result<(), CeremonyError> {
        match &self.session_id {
            None => {
                self.session_id = Some(session_id.clone());
                Ok(())
            }
            Some(expected) if expected == session_id => Ok(()),
            Some(expected) => Err(CeremonyError::SessionIdMismatch {
                operation,
                expected: expected.clone(),
                actual: session_id.clone(),
            }),
        }
    }

    fn absorb_round1(&mut self, source: Party, reply: KeygenRound1Reply) -> BroadcastMessage {
        self.advance(source, reply.encrypted_data, reply.encrypted_data_key);
        reply.broadcast_message
    }

    fn absorb_round2(&mut self, source: Party, reply: KeygenRound2Reply) -> Vec<P2pMessage> {
        self.advance(source, reply.encrypted_data, reply.encrypted_data_key);
        reply.p2p_messages
    }

    fn absorb_round3(&mut self, source: Party, reply: KeygenRound3Reply) -> BroadcastMessage {
        self.advance(source, reply.encrypted_data, reply.encrypted_data_key);
        reply.broadcast_message
    }

    fn round1_request(&self, source: Party, coordinator_gpg_key: &str) -> KeygenRound1Request {
        let (own, other) = self.pair(source);
        KeygenRound1Request {
            source,
            encrypted_data: own.encrypted_data.clone(),
            encrypted_data_key: own.encrypted_data_key.clone(),
            counterparty_public_key: other.gpg_key.clone(),
            coordinator_public_key: coordinator_gpg_key.to_string(),
        }
    }

    fn round2_request(
        &self,
        source: Party,
        coordinator_broadcast: &BroadcastMessage,
        counterparty_broadcast: &BroadcastMessage,
        coordinator_message: &P2pMessage,
    ) -> KeygenRound2Request {
        let (own, _) = self.pair(source);
        KeygenRound2Request {
            source,
            encrypted_data: own.encrypted_data.clone(),
            encrypted_data_key: own.encrypted_data_key.clone(),
            broadcast_messages: vec![coordinator_broadcast.clone(), counterparty_broadcast.clone()],
            p2p_messages: vec![coordinator_message.clone()],
        }
    }

    fn round3_request(
        &self,
        source: Party,
        coordinator_message: &P2pMessage,
        counterparty_message: &P2pMessage,
    ) -> KeygenRound3Request {
        let (own, _) = self.pair(source);
        KeygenRound3Request {
            source,
            encrypted_data: own.encrypted_data.clone(),
            encrypted_data_key: own.encrypted_data_key.clone(),
            p2p_messages: vec![coordinator_message.clone(), counterparty_message.clone()],
        }
    }

    fn finalize_request(
        &self,
        source: Party,
        coordinator_broadcast: &BroadcastMessage,
        counterparty_broadcast: &BroadcastMessage,
        coordinator_common_keychain: &CommonKeychain,
    ) -> KeygenFinalizeRequest {
        let (own, _) = self.pair(source);
        KeygenFinalizeRequest {
            source,
            encrypted_data: own.encrypted_data.clone(),
            encrypted_data_key: own.encrypted_data_key.clone(),
            broadcast_messages: vec![coordinator_broadcast.clone(), counterparty_broadcast.clone()],
            coordinator_common_keychain: coordinator_common_keychain.clone(),
        }
    }
}

/// Finds the message a round reply addressed to `to`; a round that fails to
/// produce it is treated as an invalid reply, fatally.
fn p2p_to(
    messages: &[P2pMessage],
    operation: &'static str,
    to: Party,
) -> Result<P2pMessage, CeremonyError> {
    messages
        .iter()
        .find(|message| message.to == to)
        .cloned()
        .ok_or_else(|| CeremonyError::InvalidRoundReply {
            operation,
            detail: format!("no message addressed to {to}"),
        })
}

impl<P, C> EcdsaSignatureProvider<P, C>
where
    P: PartyClient,
    C: CoordinatorClient,
{
    /// Drives the whole distributed key-generation ceremony. The two
    /// co-signer calls of each round are issued together and joined before
    /// the next round starts; rounds themselves are strictly sequential
    /// because each one consumes the previous one's returned messages.
    ///
    /// Any missing field, session-id change, or common-keychain disagreement
    /// aborts the run; there is no partial retry of individual rounds.
    pub async fn generate_keys(
        &self,
        enterprise: &str,
        wallet_params: serde_json::Value,
    ) -> Result<GeneratedKeys, CeremonyError> {
        let timeout = self.keygen_config.timeout_sec;
        tracing::info!(enterprise, "starting ecdsa key generation ceremony");

        let (user_init, backup_init) = future::try_join(
            round_trip(
                "user keygen initialize",
                timeout,
                self.party.initialize(Party::User),
            ),
            round_trip(
                "backup keygen initialize",
                timeout,
                self.party.initialize(Party::Backup),
            ),
        )
        .await?;
        let mut session = KeygenSession::new(user_init, backup_init);

        let (user_r1, backup_r1) = future::try_join(
            round_trip(
                "user keygen round 1",
                timeout,
                self.party
                    .keygen_round1(session.round1_request(Party::User, &self.coordinator_gpg_key)),
            ),
            round_trip(
                "backup keygen round 1",
                timeout,
                self.party
                    .keygen_round1(session.round1_request(Party::Backup, &self.coordinator_gpg_key)),
            ),
        )
        .await?;
        let user_broadcast1 = session.absorb_round1(Party::User, user_r1);
        let backup_broadcast1 = session.absorb_round1(Party::Backup, backup_r1);

        // Coordinator round 1+2: establishes the session id and produces the
        // coordinator's broadcast plus one message addressed to each party.
        let coordinator_r1 = round_trip(
            "coordinator keygen round 1",
            timeout,
            self.coordinator.send_keygen_round1(
                enterprise,
                &session.user.gpg_key,
                &session.backup.gpg_key,
                RoundMessages::broadcasts([user_broadcast1.clone(), backup_broadcast1.clone()]),
            ),
        )
        .await?;
        session.observe_session_id("coordinator keygen round 1", &coordinator_r1.session_id)?;
        tracing::debug!(
            enterprise,
            session_id = coordinator_r1.session_id.as_str(),
            "keygen session established"
        );

        let (user_r2, backup_r2) = future::try_join(
            round_trip(
                "user keygen round 2",
                timeout,
                self.party.keygen_round2(session.round2_request(
                    Party::User,
                    &coordinator_r1.broadcast_message,
                    &backup_broadcast1,
                    &coordinator_r1.p2p_message_to_user,
                )),
            ),
            round_trip(
                "backup keygen round 2",
                timeout,
                self.party.keygen_round2(session.round2_request(
                    Party::Backup,
                    &coordinator_r1.broadcast_message,
                    &user_broadcast1,
                    &coordinator_r1.p2p_message_to_backup,
                )),
            ),
        )
        .await?;
        let user_messages2 = session.absorb_round2(Party::User, user_r2);
        let backup_messages2 = session.absorb_round2(Party::Backup, backup_r2);
        let user_to_coordinator = p2p_to(&user_messages2, "user keygen round 2", Party::Coordinator)?;
        let user_to_backup = p2p_to(&user_messages2, "user keygen round 2", Party::Backup)?;
        let backup_to_coordinator =
            p2p_to(&backup_messages2, "backup keygen round 2", Party::Coordinator)?;
        let backup_to_user = p2p_to(&backup_messages2, "backup keygen round 2", Party::User)?;

        // Coordinator round 2: must echo the pinned session id; returns the
        // commitment-carrying messages round 3 consumes.
        let coordinator_r2 = round_trip(
            "coordinator keygen round 2",
            timeout,
            self.coordinator.send_keygen_round2(
                enterprise,
                &coordinator_r1.session_id,
                RoundMessages::p2p([user_to_coordinator.clone(), backup_to_coordinator.clone()]),
            ),
        )
        .await?;
        session.observe_session_id("coordinator keygen round 2", &coordinator_r2.session_id)?;

        let (user_r3, backup_r3) = future::try_join(
            round_trip(
                "user keygen round 3",
                timeout,
                self.party.keygen_round3(session.round3_request(
                    Party::User,
                    &coordinator_r2.p2p_message_to_user,
                    &backup_to_user,
                )),
            ),
            round_trip(
                "backup keygen round 3",
                timeout,
                self.party.keygen_round3(session.round3_request(
                    Party::Backup,
                    &coordinator_r2.p2p_message_to_backup,
                    &user_to_backup,
                )),
            ),
        )
        .await?;
        let user_broadcast3 = session.absorb_round3(Party::User, user_r3);
        let backup_broadcast3 = session.absorb_round3(Party::Backup, backup_r3);

        // Coordinator finalize: consumes both round-3 broadcasts plus the
        // counterparty-addressed round-2 messages, and names the common
        // keychain the parties must agree with.
        let finalize = round_trip(
            "coordinator keygen finalize",
            timeout,
            self.coordinator.send_keygen_finalize(
                enterprise,
                &coordinator_r1.session_id,
                RoundMessages {
                    broadcast_messages: vec![user_broadcast3.clone(), backup_broadcast3.clone()],
                    p2p_messages: vec![user_to_backup.clone(), backup_to_user.clone()],
                },
            ),
        )
        .await?;
        session.observe_session_id("coordinator keygen finalize", &finalize.session_id)?;

        let (user_final, backup_final) = future::try_join(
            round_trip(
                "user keygen finalize",
                timeout,
                self.party.keygen_finalize(session.finalize_request(
                    Party::User,
                    &finalize.broadcast_message,
                    &backup_broadcast3,
                    &finalize.common_keychain,
                )),
            ),
            round_trip(
                "backup keygen finalize",
                timeout,
                self.party.keygen_finalize(session.finalize_request(
                    Party::Backup,
                    &finalize.broadcast_message,
                    &user_broadcast3,
                    &finalize.common_keychain,
                )),
            ),
        )
        .await?;

        if user_final.common_keychain != backup_final.common_keychain
            || user_final.common_keychain != finalize.common_keychain
        {
            return Err(CeremonyError::CommonKeychainDisagreement {
                user: user_final.common_keychain,
                backup: backup_final.common_keychain,
                coordinator: finalize.common_keychain,
            });
        }
        let common_keychain = user_final.common_keychain;
        tracing::info!(
            enterprise,
            common_keychain = common_keychain.as_str(),
            "key generation ceremony agreed a common keychain"
        );

        let (user_record, backup_record, coordinator_record) = future::try_join3(
            round_trip(
                "add user keychain",
                timeout,
                self.coordinator
                    .add_keychain(add_keychain_request(Party::User, &common_keychain)),
            ),
            round_trip(
                "add backup keychain",
                timeout,
                self.coordinator
                    .add_keychain(add_keychain_request(Party::Backup, &common_keychain)),
            ),
            round_trip(
                "add coordinator keychain",
                timeout,
                self.coordinator
                    .add_keychain(add_keychain_request(Party::Coordinator, &common_keychain)),
            ),
        )
        .await?;

        Ok(GeneratedKeys {
            common_keychain,
            user_keychain_id: user_record.id,
            backup_keychain_id: backup_record.id,
            coordinator_keychain_id: coordinator_record.id,
            wallet_params,
        })
    }
}

fn add_keychain_request(source: Party, common_keychain: &CommonKeychain) -> AddKeychainRequest {
    AddKeychainRequest {
        source,
        kind: KeychainKind::Tss,
        common_keychain: common_keychain.clone(),
        is_mpc_v2: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{
        CoordinatorKeygenFinalizeReply, CoordinatorKeygenRound1Reply, CoordinatorKeygenRound2Reply,
        MockCoordinatorClient, MockPartyClient,
    };
    use crate::config::{KeygenConfig, SignatureConfig};
    use assert_matches::assert_matches;
    use std::sync::Arc;

    const COORDINATOR_GPG: &str = "coordinator-gpg";
    const COMMON_KEYCHAIN: &str = "03c0ffee";

    fn provider(
        party: MockPartyClient,
        coordinator: MockCoordinatorClient,
    ) -> EcdsaSignatureProvider<MockPartyClient, MockCoordinatorClient> {
        EcdsaSignatureProvider::new(
            Arc::new(party),
            Arc::new(coordinator),
            KeygenConfig { timeout_sec: 5 },
            SignatureConfig { timeout_sec: 5 },
            COORDINATOR_GPG.to_string(),
        )
    }

    fn p2p(from: Party, to: Party, payload: &str, commitment: Option<&str>) -> P2pMessage {
        P2pMessage {
            from,
            to,
            payload: payload.to_string(),
            commitment: commitment.map(str::to_string),
        }
    }

    fn script_initialize(party: &mut MockPartyClient) {
        party.expect_initialize().times(2).returning(|source| {
            Ok(InitializedParty {
                public_key: format!("{source}-gpg"),
                encrypted_data: format!("{source}-state-0"),
                encrypted_data_key: format!("{source}-key-0"),
            })
        });
    }

    fn script_round1(party: &mut MockPartyClient) {
        party.expect_keygen_round1().times(2).returning(|request| {
            let source = request.source;
            let other = source.counterparty().unwrap();
            assert_eq!(request.encrypted_data, format!("{source}-state-0"));
            assert_eq!(request.encrypted_data_key, format!("{source}-key-0"));
            assert_eq!(request.counterparty_public_key, format!("{other}-gpg"));
            assert_eq!(request.coordinator_public_key, COORDINATOR_GPG);
            Ok(KeygenRound1Reply {
                encrypted_data: format!("{source}-state-1"),
                encrypted_data_key: format!("{source}-key-1"),
                broadcast_message: BroadcastMessage {
                    from: source,
                    payload: format!("{source}-broadcast-1"),
                },
            })
        });
    }

    fn script_coordinator_round1(coordinator: &mut MockCoordinatorClient, session_id: &'static str) {
        coordinator.expect_send_keygen_round1().returning(
            move |_, user_gpg, backup_gpg, messages| {
                assert_eq!(user_gpg, "user-gpg");
                assert_eq!(backup_gpg, "backup-gpg");
                let payloads: Vec<&str> = messages
                    .broadcast_messages
                    .iter()
                    .map(|message| message.payload.as_str())
                    .collect();
                assert_eq!(payloads, ["user-broadcast-1", "backup-broadcast-1"]);
                Ok(CoordinatorKeygenRound1Reply {
                    session_id: session_id.into(),
                    broadcast_message: BroadcastMessage {
                        from: Party::Coordinator,
                        payload: "coordinator-broadcast-1".to_string(),
                    },
                    p2p_message_to_user: p2p(
                        Party::Coordinator,
                        Party::User,
                        "coordinator-to-user-1",
                        None,
                    ),
                    p2p_message_to_backup: p2p(
                        Party::Coordinator,
                        Party::Backup,
                        "coordinator-to-backup-1",
                        None,
                    ),
                })
            },
        );
    }

    fn script_round2(party: &mut MockPartyClient) {
        party.expect_keygen_round2().times(2).returning(|request| {
            let source = request.source;
            let other = source.counterparty().unwrap();
            assert_eq!(request.encrypted_data, format!("{source}-state-1"));
            assert_eq!(request.broadcast_messages.len(), 2);
            assert_eq!(
                request.broadcast_messages[0].payload,
                "coordinator-broadcast-1"
            );
            assert_eq!(
                request.broadcast_messages[1].payload,
                format!("{other}-broadcast-1")
            );
            assert_eq!(request.p2p_messages.len(), 1);
            assert_eq!(
                request.p2p_messages[0].payload,
                format!("coordinator-to-{source}-1")
            );
            Ok(KeygenRound2Reply {
                encrypted_data: format!("{source}-state-2"),
                encrypted_data_key: format!("{source}-key-2"),
                p2p_messages: vec![
                    p2p(
                        source,
                        Party::Coordinator,
                        &format!("{source}-to-coordinator-2"),
                        Some(&format!("{source}-commitment")),
                    ),
                    p2p(
                        source,
                        other,
                        &format!("{source}-to-{other}-2"),
                        Some(&format!("{source}-commitment")),
                    ),
                ],
            })
        });
    }

    fn script_coordinator_round2(coordinator: &mut MockCoordinatorClient, session_id: &'static str) {
        coordinator
            .expect_send_keygen_round2()
            .returning(move |_, session, messages| {
                assert_eq!(session.as_str(), "session-1");
                let payloads: Vec<&str> = messages
                    .p2p_messages
                    .iter()
                    .map(|message| message.payload.as_str())
                    .collect();
                assert_eq!(payloads, ["user-to-coordinator-2", "backup-to-coordinator-2"]);
                Ok(CoordinatorKeygenRound2Reply {
                    session_id: session_id.into(),
                    p2p_message_to_user: p2p(
                        Party::Coordinator,
                        Party::User,
                        "coordinator-to-user-2",
                        Some("coordinator-commitment"),
                    ),
                    p2p_message_to_backup: p2p(
                        Party::Coordinator,
                        Party::Backup,
                        "coordinator-to-backup-2",
                        Some("coordinator-commitment"),
                    ),
                })
            });
    }

    fn script_round3(party: &mut MockPartyClient) {
        party.expect_keygen_round3().times(2).returning(|request| {
            let source = request.source;
            let other = source.counterparty().unwrap();
            assert_eq!(request.encrypted_data, format!("{source}-state-2"));
            assert_eq!(request.p2p_messages.len(), 2);
            assert_eq!(
                request.p2p_messages[0].payload,
                format!("coordinator-to-{source}-2")
            );
            assert_eq!(
                request.p2p_messages[1].payload,
                format!("{other}-to-{source}-2")
            );
            // the coordinator's commitment must arrive verbatim
            assert_eq!(
                request.p2p_messages[0].commitment.as_deref(),
                Some("coordinator-commitment")
            );
            Ok(KeygenRound3Reply {
                encrypted_data: format!("{source}-state-3"),
                encrypted_data_key: format!("{source}-key-3"),
                broadcast_message: BroadcastMessage {
                    from: source,
                    payload: format!("{source}-broadcast-3"),
                },
            })
        });
    }

    fn script_coordinator_finalize(
        coordinator: &mut MockCoordinatorClient,
        session_id: &'static str,
    ) {
        coordinator
            .expect_send_keygen_finalize()
            .returning(move |_, session, messages| {
                assert_eq!(session.as_str(), "session-1");
                let broadcasts: Vec<&str> = messages
                    .broadcast_messages
                    .iter()
                    .map(|message| message.payload.as_str())
                    .collect();
                assert_eq!(broadcasts, ["user-broadcast-3", "backup-broadcast-3"]);
                assert_eq!(messages.p2p_messages.len(), 2);
                Ok(CoordinatorKeygenFinalizeReply {
                    session_id: session_id.into(),
                    broadcast_message: BroadcastMessage {
                        from: Party::Coordinator,
                        payload: "coordinator-final-broadcast".to_string(),
                    },
                    common_keychain: COMMON_KEYCHAIN.into(),
                })
            });
    }

    fn script_party_finalize(party: &mut MockPartyClient, backup_keychain: &'static str) {
        party
            .expect_keygen_finalize()
            .times(2)
            .returning(move |request| {
                let source = request.source;
                let other = source.counterparty().unwrap();
                assert_eq!(request.encrypted_data, format!("{source}-state-3"));
                assert_eq!(request.broadcast_messages.len(), 2);
                assert_eq!(
                    request.broadcast_messages[0].payload,
                    "coordinator-final-broadcast"
                );
                assert_eq!(
                    request.broadcast_messages[1].payload,
                    format!("{other}-broadcast-3")
                );
                assert_eq!(
                    request.coordinator_common_keychain.as_str(),
                    COMMON_KEYCHAIN
                );
                let keychain = match source {
                    Party::Backup => backup_keychain,
                    _ => COMMON_KEYCHAIN,
                };
                Ok(crate::client::KeygenFinalizeReply {
                    common_keychain: keychain.into(),
                })
            });
    }

    fn script_add_keychains(coordinator: &mut MockCoordinatorClient) {
        coordinator
            .expect_add_keychain()
            .times(3)
            .returning(|request| {
                assert_eq!(request.kind, KeychainKind::Tss);
                assert!(request.is_mpc_v2);
                assert_eq!(request.common_keychain.as_str(), COMMON_KEYCHAIN);
                Ok(crate::client::AddedKeychain {
                    id: format!("{}-keychain-id", request.source),
                })
            });
    }

    #[tokio::test]
    async fn runs_the_full_ceremony_and_creates_three_keychains() {
        let mut party = MockPartyClient::new();
        let mut coordinator = MockCoordinatorClient::new();
        script_initialize(&mut party);
        script_round1(&mut party);
        script_coordinator_round1(&mut coordinator, "session-1");
        script_round2(&mut party);
        script_coordinator_round2(&mut coordinator, "session-1");
        script_round3(&mut party);
        script_coordinator_finalize(&mut coordinator, "session-1");
        script_party_finalize(&mut party, COMMON_KEYCHAIN);
        script_add_keychains(&mut coordinator);

        let generated = provider(party, coordinator)
            .generate_keys("enterprise-1", serde_json::json!({ "label": "treasury" }))
            .await
            .unwrap();

        assert_eq!(generated.common_keychain.as_str(), COMMON_KEYCHAIN);
        assert_eq!(generated.user_keychain_id, "user-keychain-id");
        assert_eq!(generated.backup_keychain_id, "backup-keychain-id");
        assert_eq!(generated.coordinator_keychain_id, "coordinator-keychain-id");
        assert_eq!(generated.wallet_params["label"], "treasury");
    }

    #[tokio::test]
    async fn a_changed_session_id_aborts_before_finalize() {
        let mut party = MockPartyClient::new();
        let mut coordinator = MockCoordinatorClient::new();
        script_initialize(&mut party);
        script_round1(&mut party);
        script_coordinator_round1(&mut coordinator, "session-1");
        script_round2(&mut party);
        // the coordinator comes back with a different session at round 2;
        // finalize is never mocked, so reaching it would panic the test
        script_coordinator_round2(&mut coordinator, "session-2");

        let err = provider(party, coordinator)
            .generate_keys("enterprise-1", serde_json::Value::Null)
            .await
            .unwrap_err();

        assert_matches!(
            err,
            CeremonyError::SessionIdMismatch {
                operation: "coordinator keygen round 2",
                ..
            }
        );
    }

    #[tokio::test]
    async fn keychain_disagreement_fails_and_creates_no_records() {
        let mut party = MockPartyClient::new();
        let mut coordinator = MockCoordinatorClient::new();
        script_initialize(&mut party);
        script_round1(&mut party);
        script_coordinator_round1(&mut coordinator, "session-1");
        script_round2(&mut party);
        script_coordinator_round2(&mut coordinator, "session-1");
        script_round3(&mut party);
        script_coordinator_finalize(&mut coordinator, "session-1");
        // the backup party arrives at a different fingerprint; add_keychain is
        // never mocked, so any record creation would panic the test
        script_party_finalize(&mut party, "02deadbeef");

        let err = provider(party, coordinator)
            .generate_keys("enterprise-1", serde_json::Value::Null)
            .await
            .unwrap_err();

        assert_matches!(err, CeremonyError::CommonKeychainDisagreement { user, backup, .. } => {
            assert_eq!(user.as_str(), COMMON_KEYCHAIN);
            assert_eq!(backup.as_str(), "02deadbeef");
        });
    }

    #[tokio::test]
    async fn a_round_reply_without_a_coordinator_message_is_invalid() {
        let mut party = MockPartyClient::new();
        let mut coordinator = MockCoordinatorClient::new();
        script_initialize(&mut party);
        script_round1(&mut party);
        script_coordinator_round1(&mut coordinator, "session-1");
        party.expect_keygen_round2().times(2).returning(|request| {
            let source = request.source;
            let other = source.counterparty().unwrap();
            Ok(KeygenRound2Reply {
                encrypted_data: format!("{source}-state-2"),
                encrypted_data_key: format!("{source}-key-2"),
                // no coordinator-addressed message
                p2p_messages: vec![p2p(source, other, &format!("{source}-to-{other}-2"), None)],
            })
        });

        let err = provider(party, coordinator)
            .generate_keys("enterprise-1", serde_json::Value::Null)
            .await
            .unwrap_err();

        assert_matches!(err, CeremonyError::InvalidRoundReply { detail, .. } => {
            assert!(detail.contains("coordinator"));
        });
    }
}
