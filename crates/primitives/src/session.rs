use derive_more::{AsRef, Display, From, Into};
use serde::{Deserialize, Serialize};

/// Coordinator-issued identifier binding every round of one ECDSA
/// key-generation run. The first coordinator round establishes it; all later
/// rounds must echo the same value or the ceremony is aborted.
#[derive(
    Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, AsRef, Display, From, Into,
)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        SessionId(value.to_string())
    }
}

/// Public-key fingerprint all three parties must independently arrive at when
/// key generation completes. Agreement is byte equality, nothing weaker.
#[derive(
    Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, AsRef, Display, From, Into,
)]
#[serde(transparent)]
pub struct CommonKeychain(String);

impl CommonKeychain {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for CommonKeychain {
    fn from(value: &str) -> Self {
        CommonKeychain(value.to_string())
    }
}
