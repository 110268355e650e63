use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

/// One of the three participants in a ceremony. `User` and `Backup` co-sign;
/// `Coordinator` is the central service that relays rounds and validates
/// cross-party consistency. It never holds co-signer key material.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Party {
    User,
    Backup,
    Coordinator,
}

impl Party {
    /// The two co-signing parties of every ceremony, in wire order.
    pub const COSIGNERS: [Party; 2] = [Party::User, Party::Backup];

    /// Stable numeric index used in message envelopes.
    pub fn index(self) -> u8 {
        match self {
            Party::User => 0,
            Party::Backup => 1,
            Party::Coordinator => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Party::User => "user",
            Party::Backup => "backup",
            Party::Coordinator => "coordinator",
        }
    }

    /// The other co-signing party. `None` for the coordinator, which has no
    /// counterpart in the two-plus-one topology.
    pub fn counterparty(self) -> Option<Party> {
        match self {
            Party::User => Some(Party::Backup),
            Party::Backup => Some(Party::User),
            Party::Coordinator => None,
        }
    }
}

impl Display for Party {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The threshold-signature algorithm family a wallet is declared with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MpcAlgorithm {
    Ecdsa,
    Eddsa,
}

impl MpcAlgorithm {
    pub fn as_str(self) -> &'static str {
        match self {
            MpcAlgorithm::Ecdsa => "ecdsa",
            MpcAlgorithm::Eddsa => "eddsa",
        }
    }
}

impl Display for MpcAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MpcAlgorithm {
    type Err = UnknownAlgorithmError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "ecdsa" => Ok(MpcAlgorithm::Ecdsa),
            "eddsa" => Ok(MpcAlgorithm::Eddsa),
            other => Err(UnknownAlgorithmError(other.to_string())),
        }
    }
}

/// Raised when a wallet declares an algorithm this coordinator cannot drive.
/// Keeps the offending value for the error message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnknownAlgorithmError(pub String);

impl Display for UnknownAlgorithmError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown mpc algorithm: {}", self.0)
    }
}

impl std::error::Error for UnknownAlgorithmError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn party_wire_names() {
        assert_eq!(serde_json::to_string(&Party::User).unwrap(), "\"user\"");
        assert_eq!(serde_json::to_string(&Party::Backup).unwrap(), "\"backup\"");
        assert_eq!(
            serde_json::to_string(&Party::Coordinator).unwrap(),
            "\"coordinator\""
        );
    }

    #[test]
    fn counterparty_is_symmetric() {
        assert_eq!(Party::User.counterparty(), Some(Party::Backup));
        assert_eq!(Party::Backup.counterparty(), Some(Party::User));
        assert_eq!(Party::Coordinator.counterparty(), None);
    }

    #[test]
    fn algorithm_from_str() {
        assert_eq!("ecdsa".parse::<MpcAlgorithm>().unwrap(), MpcAlgorithm::Ecdsa);
        assert_eq!("eddsa".parse::<MpcAlgorithm>().unwrap(), MpcAlgorithm::Eddsa);
        let err = "schnorr".parse::<MpcAlgorithm>().unwrap_err();
        assert_eq!(err.0, "schnorr");
    }
}
