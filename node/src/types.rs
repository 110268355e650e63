use mpc_wallet_primitives::{CommonKeychain, Party};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// A wallet as resolved by the routing layer. The coordination layer only
/// reads its identity, its subtype, and its declared MPC algorithm.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Wallet {
    pub id: String,
    pub enterprise: String,
    #[serde(rename = "subType")]
    pub subtype: WalletSubtype,
    /// Declared algorithm family, kept as the raw wire value so an
    /// unsupported declaration can be named in the error.
    pub multisig_type: String,
}

/// Only the on-premises cold and custody subtypes may drive ceremonies here.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WalletSubtype {
    OnPremCold,
    OnPremCustody,
    #[serde(other)]
    Other,
}

impl WalletSubtype {
    pub fn is_on_prem(self) -> bool {
        matches!(
            self,
            WalletSubtype::OnPremCold | WalletSubtype::OnPremCustody
        )
    }
}

/// A keychain record held by the coordinator service.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Keychain {
    pub id: String,
    pub source: Party,
    #[serde(rename = "type")]
    pub kind: KeychainKind,
    pub common_keychain: CommonKeychain,
    #[serde(default)]
    pub is_mpc_v2: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeychainKind {
    Tss,
}

/// The coordinator-held record of one transaction awaiting signature. Mostly
/// opaque to this layer; only identity, api version, lifecycle state and the
/// accumulating signature shares matter here.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxRequest {
    pub tx_request_id: String,
    pub wallet_id: String,
    pub api_version: String,
    pub state: TxRequestState,
    #[serde(default)]
    pub signature_shares: Vec<SignatureShare>,
    #[serde(default)]
    pub transactions: Vec<TxRequestTransaction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_approval_id: Option<String>,
}

/// Only the `full` api version is supported by the ceremonies.
pub const FULL_API_VERSION: &str = "full";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TxRequestState {
    PendingUserSignature,
    PendingApproval,
    Signed,
}

impl Display for TxRequestState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TxRequestState::PendingUserSignature => "pendingUserSignature",
            TxRequestState::PendingApproval => "pendingApproval",
            TxRequestState::Signed => "signed",
        };
        f.write_str(name)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxRequestTransaction {
    pub state: TransactionState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signed_tx: Option<SignedTransaction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unsigned_tx: Option<serde_json::Value>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TransactionState {
    PendingSignature,
    Signed,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedTransaction {
    pub id: String,
    pub tx: String,
}

/// One signature share exchanged during a signing ceremony, appended to the
/// tx request's share list by the coordinator service.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureShare {
    pub from: Party,
    pub to: Party,
    pub share: String,
}

/// A commitment exchanged ahead of the EdDSA R-share round.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitmentShare {
    pub from: Party,
    pub to: Party,
    pub commitment: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingApproval {
    pub id: String,
    pub state: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wallet_id: Option<String>,
}

/// Normalized outcome of a dispatched signing ceremony.
#[derive(Clone, Debug, PartialEq)]
pub enum SignResult {
    Signed {
        txid: String,
        tx: String,
        tx_request: TxRequest,
    },
    PendingApproval {
        pending_approval: PendingApproval,
        tx_request: TxRequest,
    },
}
