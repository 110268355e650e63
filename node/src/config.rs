use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;
use url::Url;

/// The contents of the main config.yaml file.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConfigFile {
    /// Endpoint of the Party Signing Service that performs cryptography for
    /// the user and backup parties.
    pub party: PartyServiceConfig,
    /// Endpoint and identity of the Coordinator Service.
    pub coordinator: CoordinatorServiceConfig,
    pub keygen: KeygenConfig,
    pub signature: SignatureConfig,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PartyServiceConfig {
    pub base_url: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CoordinatorServiceConfig {
    pub base_url: String,
    /// The coordinator's GPG public key. This MUST BE IDENTICAL for every
    /// ceremony of one deployment; parties encrypt round material to it.
    pub gpg_public_key: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct KeygenConfig {
    /// Bound on each key-generation round trip. An elapsed timer aborts the
    /// ceremony as a transport failure; nothing hangs.
    pub timeout_sec: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SignatureConfig {
    pub timeout_sec: u64,
}

impl ConfigFile {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let file = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&file)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        Url::parse(&self.party.base_url).context("invalid party service base url")?;
        Url::parse(&self.coordinator.base_url).context("invalid coordinator service base url")?;
        Ok(())
    }
}
