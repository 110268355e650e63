mod message;
mod party;
mod session;

pub use message::{BroadcastMessage, P2pMessage, RoundMessages};
pub use party::{MpcAlgorithm, Party, UnknownAlgorithmError};
pub use session::{CommonKeychain, SessionId};
