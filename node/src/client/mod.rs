//! RPC client abstractions for the two external collaborators: the Party
//! Signing Service, which performs cryptography on behalf of the user and
//! backup parties, and the Coordinator Service, which performs the central
//! party's cryptography and owns wallet and tx request state.
//!
//! Ceremony coordinators take these traits as injected dependencies; nothing
//! in this crate constructs a client from ambient configuration.

mod http;

pub use http::{HttpCoordinatorClient, HttpPartyClient};

use crate::types::{CommitmentShare, Keychain, PendingApproval, SignatureShare, TxRequest};
use async_trait::async_trait;
use mpc_wallet_primitives::{
    BroadcastMessage, CommonKeychain, MpcAlgorithm, P2pMessage, Party, RoundMessages, SessionId,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[cfg(test)]
use mockall::automock;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("http request failed")]
    Http(#[from] reqwest::Error),

    #[error("service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("reply did not match the expected schema")]
    Decode(#[from] serde_json::Error),

    #[error("invalid request url")]
    Url(#[from] url::ParseError),

    #[error("{operation} timed out after {seconds}s")]
    Timeout {
        operation: &'static str,
        seconds: u64,
    },
}

/// Reply to `initialize`: the party's GPG identity plus its initial encrypted
/// key-generation state. The encrypted blobs are opaque and owned by the
/// party that produced them.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializedParty {
    pub public_key: String,
    pub encrypted_data: String,
    pub encrypted_data_key: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeygenRound1Request {
    pub source: Party,
    pub encrypted_data: String,
    pub encrypted_data_key: String,
    pub counterparty_public_key: String,
    pub coordinator_public_key: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeygenRound1Reply {
    pub encrypted_data: String,
    pub encrypted_data_key: String,
    pub broadcast_message: BroadcastMessage,
}

/// Round 2 input: the coordinator's round-1 broadcast, the counterparty's
/// round-1 broadcast, and the coordinator's peer-to-peer message for this
/// party, all relayed unmodified.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeygenRound2Request {
    pub source: Party,
    pub encrypted_data: String,
    pub encrypted_data_key: String,
    pub broadcast_messages: Vec<BroadcastMessage>,
    pub p2p_messages: Vec<P2pMessage>,
}

/// Round 2 output: one commitment-carrying message for the coordinator and
/// one for the counterparty.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeygenRound2Reply {
    pub encrypted_data: String,
    pub encrypted_data_key: String,
    pub p2p_messages: Vec<P2pMessage>,
}

/// Round 3 input: the coordinator's commitment-carrying message for this
/// party plus the counterparty's round-2 message, relayed verbatim.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeygenRound3Request {
    pub source: Party,
    pub encrypted_data: String,
    pub encrypted_data_key: String,
    pub p2p_messages: Vec<P2pMessage>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeygenRound3Reply {
    pub encrypted_data: String,
    pub encrypted_data_key: String,
    pub broadcast_message: BroadcastMessage,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeygenFinalizeRequest {
    pub source: Party,
    pub encrypted_data: String,
    pub encrypted_data_key: String,
    /// The coordinator's final broadcast plus the counterparty's round-3
    /// broadcast.
    pub broadcast_messages: Vec<BroadcastMessage>,
    pub coordinator_common_keychain: CommonKeychain,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeygenFinalizeReply {
    pub common_keychain: CommonKeychain,
}

/// Encrypted session material carried between ECDSA signing rounds. Round N
/// must be fed exactly the artifacts round N-1 returned.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignSessionArtifacts {
    pub gpg_key: String,
    pub encrypted_session: String,
    pub encrypted_signer_material: String,
    pub encrypted_data_key: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignRound1Request {
    pub source: Party,
    pub tx_request: TxRequest,
    pub coordinator_public_key: String,
    pub common_keychain: CommonKeychain,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignRoundRequest {
    pub source: Party,
    pub tx_request: TxRequest,
    pub artifacts: SignSessionArtifacts,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignRoundReply {
    pub signature_share: SignatureShare,
    pub artifacts: SignSessionArtifacts,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EddsaCommitmentRequest {
    pub source: Party,
    pub tx_request: TxRequest,
    pub coordinator_public_key: String,
    pub common_keychain: CommonKeychain,
}

/// Reply to the EdDSA commitment step: the party's commitment share plus the
/// encrypted material the later steps consume.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EddsaCommitmentReply {
    pub commitment: CommitmentShare,
    pub encrypted_signer_share: String,
    pub encrypted_r_share: String,
    pub encrypted_data_key: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EddsaRShareRequest {
    pub source: Party,
    pub encrypted_r_share: String,
    pub encrypted_data_key: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EddsaRShareReply {
    pub r_share: SignatureShare,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EddsaGShareRequest {
    pub source: Party,
    pub r_share: SignatureShare,
    pub coordinator_r_share: SignatureShare,
    pub coordinator_commitment: CommitmentShare,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EddsaGShareReply {
    pub g_share: SignatureShare,
}

/// One capability per ceremony round of the Party Signing Service. All
/// request and reply payloads are typed; a reply that does not match the
/// schema fails at this boundary.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait PartyClient: Send + Sync {
    async fn initialize(&self, source: Party) -> Result<InitializedParty, ClientError>;

    async fn keygen_round1(
        &self,
        request: KeygenRound1Request,
    ) -> Result<KeygenRound1Reply, ClientError>;

    async fn keygen_round2(
        &self,
        request: KeygenRound2Request,
    ) -> Result<KeygenRound2Reply, ClientError>;

    async fn keygen_round3(
        &self,
        request: KeygenRound3Request,
    ) -> Result<KeygenRound3Reply, ClientError>;

    async fn keygen_finalize(
        &self,
        request: KeygenFinalizeRequest,
    ) -> Result<KeygenFinalizeReply, ClientError>;

    async fn sign_round1(&self, request: SignRound1Request) -> Result<SignRoundReply, ClientError>;

    async fn sign_round2(&self, request: SignRoundRequest) -> Result<SignRoundReply, ClientError>;

    async fn sign_round3(&self, request: SignRoundRequest) -> Result<SignRoundReply, ClientError>;

    async fn eddsa_commitment(
        &self,
        request: EddsaCommitmentRequest,
    ) -> Result<EddsaCommitmentReply, ClientError>;

    async fn eddsa_r_share(
        &self,
        request: EddsaRShareRequest,
    ) -> Result<EddsaRShareReply, ClientError>;

    async fn eddsa_g_share(
        &self,
        request: EddsaGShareRequest,
    ) -> Result<EddsaGShareReply, ClientError>;
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoordinatorKeygenRound1Reply {
    pub session_id: SessionId,
    pub broadcast_message: BroadcastMessage,
    pub p2p_message_to_user: P2pMessage,
    pub p2p_message_to_backup: P2pMessage,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoordinatorKeygenRound2Reply {
    pub session_id: SessionId,
    pub p2p_message_to_user: P2pMessage,
    pub p2p_message_to_backup: P2pMessage,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoordinatorKeygenFinalizeReply {
    pub session_id: SessionId,
    pub broadcast_message: BroadcastMessage,
    pub common_keychain: CommonKeychain,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddKeychainRequest {
    pub source: Party,
    #[serde(rename = "type")]
    pub kind: crate::types::KeychainKind,
    pub common_keychain: CommonKeychain,
    pub is_mpc_v2: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddedKeychain {
    pub id: String,
}

/// The Coordinator Service's role in each ceremony, plus reads and writes of
/// the wallet, keychain, tx request and pending approval records it owns.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait CoordinatorClient: Send + Sync {
    /// The coordinator's GPG public key, a deployment-wide constant served
    /// by the coordinator itself.
    async fn coordinator_public_key(&self) -> Result<String, ClientError>;

    async fn send_keygen_round1(
        &self,
        enterprise: &str,
        user_gpg_key: &str,
        backup_gpg_key: &str,
        messages: RoundMessages,
    ) -> Result<CoordinatorKeygenRound1Reply, ClientError>;

    async fn send_keygen_round2(
        &self,
        enterprise: &str,
        session_id: &SessionId,
        messages: RoundMessages,
    ) -> Result<CoordinatorKeygenRound2Reply, ClientError>;

    async fn send_keygen_finalize(
        &self,
        enterprise: &str,
        session_id: &SessionId,
        messages: RoundMessages,
    ) -> Result<CoordinatorKeygenFinalizeReply, ClientError>;

    async fn add_keychain(&self, request: AddKeychainRequest)
        -> Result<AddedKeychain, ClientError>;

    /// `None` when no keychain record exists for the party on this wallet.
    async fn get_keychain(
        &self,
        wallet_id: &str,
        party: Party,
    ) -> Result<Option<Keychain>, ClientError>;

    async fn get_tx_request(
        &self,
        wallet_id: &str,
        tx_request_id: &str,
    ) -> Result<TxRequest, ClientError>;

    /// Submits one round's signature share; the reply is the tx request with
    /// the new share appended, which becomes the next round's input.
    async fn send_signature_share(
        &self,
        wallet_id: &str,
        tx_request_id: &str,
        share: SignatureShare,
        algorithm: MpcAlgorithm,
    ) -> Result<TxRequest, ClientError>;

    async fn exchange_commitments(
        &self,
        wallet_id: &str,
        tx_request_id: &str,
        commitment: CommitmentShare,
    ) -> Result<CommitmentShare, ClientError>;

    async fn offer_r_share(
        &self,
        wallet_id: &str,
        tx_request_id: &str,
        r_share: SignatureShare,
        encrypted_signer_share: &str,
    ) -> Result<(), ClientError>;

    async fn get_r_share(
        &self,
        wallet_id: &str,
        tx_request_id: &str,
    ) -> Result<SignatureShare, ClientError>;

    async fn send_g_share(
        &self,
        wallet_id: &str,
        tx_request_id: &str,
        g_share: SignatureShare,
    ) -> Result<(), ClientError>;

    async fn get_pending_approval(&self, id: &str) -> Result<PendingApproval, ClientError>;
}
