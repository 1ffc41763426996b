//! Vault configuration

use serde::{Deserialize, Serialize};

use lumen_core::types::hex_bytes_32;
use lumen_core::ObjectId;

/// One configured key server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyServerEntry {
    pub id: String,
    pub url: String,
    #[serde(with = "hex_bytes_32")]
    pub public_key: [u8; 32],
    /// Relative weight for threshold accounting; 1 for every server today
    pub weight: u32,
}

/// Everything the vault client needs to know about its environment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultConfig {
    /// On-chain package implementing the access policy
    pub policy_package: ObjectId,
    /// Registry object file ids are minted under
    pub registry_object: ObjectId,
    pub key_servers: Vec<KeyServerEntry>,
    /// Key-server responses required for decryption
    pub threshold: usize,
    /// How many epochs uploaded blobs stay stored
    pub blob_epochs: u64,
    pub publisher_url: String,
    pub aggregator_url: String,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            policy_package: ObjectId::new([0u8; 32]),
            registry_object: ObjectId::new([0u8; 32]),
            key_servers: Vec::new(),
            threshold: 2,
            blob_epochs: 5,
            publisher_url: "https://publisher.example.com".to_string(),
            aggregator_url: "https://aggregator.example.com".to_string(),
        }
    }
}

impl VaultConfig {
    pub fn load(path: &std::path::Path) -> lumen_core::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        Ok(config)
    }

    pub fn save(&self, path: &std::path::Path) -> lumen_core::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// (id, public key) pairs in configuration order, the order shares are
    /// addressed in
    pub fn server_publics(&self) -> Vec<(String, [u8; 32])> {
        self.key_servers
            .iter()
            .map(|s| (s.id.clone(), s.public_key))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_json_roundtrip() {
        let mut config = VaultConfig::default();
        config.key_servers.push(KeyServerEntry {
            id: "ks-1".to_string(),
            url: "https://ks1.example.com".to_string(),
            public_key: [7u8; 32],
            weight: 1,
        });

        let json = serde_json::to_string(&config).unwrap();
        let back: VaultConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.threshold, 2);
        assert_eq!(back.key_servers[0].public_key, [7u8; 32]);
        assert_eq!(back.server_publics(), vec![("ks-1".to_string(), [7u8; 32])]);
    }
}
