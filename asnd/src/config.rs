use anyhow::{ensure, Context as _, Result};
use asn_lib::{AuthPub, EncrPub, EncrSec};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, net::SocketAddr, path::Path, path::PathBuf};

/// configuration of the server
///
/// loaded once at start, read only afterward.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// prefix of the sessions' names
    #[serde(default = "default_name")]
    pub name: String,

    /// root directory of the blob repositories
    pub repos: PathBuf,

    /// this is the address the server will listen for incoming
    /// connections
    #[serde(default = "default_listen_address")]
    pub listen_address: SocketAddr,

    pub keys: Keys,

    /// signing keys of the users, by login key
    #[serde(default)]
    pub users: BTreeMap<EncrPub, AuthPub>,

    /// number of sessions and blobs kept for reuse
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,
}

#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Keys {
    pub admin: PeerKeys,
    pub server: ServerKeys,
}

/// login key and signing key of a peer
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PeerKeys {
    pub encr: EncrPub,
    pub auth: AuthPub,
}

/// keys of this server
///
/// `encr` is the public half of `secret`: clients say hello to it and
/// other servers log in with it.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerKeys {
    pub encr: EncrPub,
    pub auth: AuthPub,
    pub secret: EncrSec,
}

fn default_name() -> String {
    "asnd".to_owned()
}

fn default_listen_address() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 6060))
}

fn default_pool_size() -> usize {
    16
}

impl Config {
    pub const EXAMPLE: &'static str = include_str!("config.yaml");

    pub fn from_file<P>(path: P) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let file = std::fs::File::open(path)
            .with_context(|| format!("Cannot open file: {}", path.display()))?;
        let config: Self = serde_yaml::from_reader(file)
            .with_context(|| format!("Invalid config file: {}", path.display()))?;

        config
            .check()
            .with_context(|| format!("Invalid config file: {}", path.display()))?;

        Ok(config)
    }

    /// check the consistency of the keys
    pub fn check(&self) -> Result<()> {
        ensure!(
            self.keys.server.secret.public() == self.keys.server.encr,
            "keys.server.encr is not the public key of keys.server.secret"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_example() {
        let example = Config::EXAMPLE;

        let config: Config = serde_yaml::from_str(example).expect("Valid example");

        config.check().unwrap();
        assert_eq!(config.name, "asnd");
        assert_eq!(config.users.len(), 1);
        assert_eq!(config.pool_size, 16);
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, Config::EXAMPLE).unwrap();

        let config = Config::from_file(&path).unwrap();

        assert_eq!(config.listen_address, default_listen_address());
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let example = format!("{}\nunexpected: true\n", Config::EXAMPLE);

        assert!(serde_yaml::from_str::<Config>(&example).is_err());
    }

    #[test]
    fn mismatched_server_keys() {
        let mut config: Config = serde_yaml::from_str(Config::EXAMPLE).unwrap();
        config.keys.server.encr = config.keys.admin.encr;

        assert!(config.check().is_err());
    }
}
