use crate::Party;
use serde::{Deserialize, Serialize};

/// A round output delivered identically to every other party. The payload is
/// opaque to the coordination layer and relayed byte-for-byte.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BroadcastMessage {
    pub from: Party,
    pub payload: String,
}

/// A round output addressed to exactly one other party, optionally carrying a
/// commitment that the following round must forward verbatim.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct P2pMessage {
    pub from: Party,
    pub to: Party,
    pub payload: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commitment: Option<String>,
}

/// Everything one round produced, routed to the next round unmodified. The
/// coordination layer reshapes envelopes; it never rewrites payloads.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundMessages {
    #[serde(default)]
    pub broadcast_messages: Vec<BroadcastMessage>,
    #[serde(default)]
    pub p2p_messages: Vec<P2pMessage>,
}

impl RoundMessages {
    pub fn broadcasts(messages: impl IntoIterator<Item = BroadcastMessage>) -> Self {
        RoundMessages {
            broadcast_messages: messages.into_iter().collect(),
            p2p_messages: Vec::new(),
        }
    }

    pub fn p2p(messages: impl IntoIterator<Item = P2pMessage>) -> Self {
        RoundMessages {
            broadcast_messages: Vec::new(),
            p2p_messages: messages.into_iter().collect(),
        }
    }
}
