//! Key-server protocol
//!
//! Each key server receives its own wrapped share, the sender's session
//! key, and the sender-less access-check transaction. The server dry-runs
//! the access check against the policy package, verifies the session-key
//! signature, unwraps the share with its secret, and returns the share
//! material. Any individual server may fail; decryption only needs a
//! threshold of them.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use tracing::warn;

use lumen_core::{Error, Result};

use crate::seal::{EncryptedObject, WrappedShare};
use crate::session_key::SessionKey;
use crate::shamir::KeyShare;

/// One share request, as posted to a key server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareRequest {
    /// Hex-encoded file id
    pub file_id: String,
    pub wrapped_share: WrappedShare,
    /// Base64 of the sender-less access-check transaction bytes
    pub access_tx: String,
    pub session_key: SessionKey,
    pub threshold: u8,
}

#[async_trait]
pub trait KeyServer: Send + Sync {
    /// Identifier matching the wrapped shares addressed to this server
    fn id(&self) -> &str;

    /// Authorize the request and return the unwrapped share
    async fn fetch_share(&self, request: &ShareRequest) -> Result<KeyShare>;
}

/// HTTP key server
pub struct HttpKeyServer {
    http: reqwest::Client,
    id: String,
    url: String,
}

impl HttpKeyServer {
    pub fn new(id: impl Into<String>, url: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| Error::Storage(format!("failed to build client: {}", e)))?;
        Ok(Self {
            http,
            id: id.into(),
            url: url.into(),
        })
    }
}

/// Wire shape of a successful share reply
#[derive(Debug, Deserialize)]
struct ShareReply {
    /// Hex of the 33-byte share encoding (index byte + scalar)
    share: String,
}

#[async_trait]
impl KeyServer for HttpKeyServer {
    fn id(&self) -> &str {
        &self.id
    }

    async fn fetch_share(&self, request: &ShareRequest) -> Result<KeyShare> {
        let url = format!("{}/v1/fetch_key", self.url);
        let response = self
            .http
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| Error::Storage(format!("key server {}: {}", self.id, e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(Error::Storage(format!(
                "key server {} returned {}: {}",
                self.id,
                status.as_u16(),
                text
            )));
        }

        let reply: ShareReply = response
            .json()
            .await
            .map_err(|e| Error::Storage(format!("key server {} reply: {}", self.id, e)))?;
        let bytes = hex::decode(&reply.share)
            .map_err(|e| Error::Storage(format!("key server {} share: {}", self.id, e)))?;
        KeyShare::from_bytes(&bytes)
    }
}

/// Ask every configured server for its share.
///
/// Individual failures are tolerated and logged; the call fails only when
/// fewer than `threshold` servers answer.
pub async fn fetch_key_shares(
    servers: &[std::sync::Arc<dyn KeyServer>],
    object: &EncryptedObject,
    access_tx: &[u8],
    session_key: &SessionKey,
) -> Result<Vec<KeyShare>> {
    let threshold = object.threshold as usize;
    let mut shares = Vec::with_capacity(servers.len());

    for server in servers {
        let Some(wrapped) = object.share_for(server.id()) else {
            warn!(server = server.id(), "no wrapped share addressed to server");
            continue;
        };
        let request = ShareRequest {
            file_id: hex::encode(&object.file_id),
            wrapped_share: wrapped.clone(),
            access_tx: STANDARD.encode(access_tx),
            session_key: session_key.clone(),
            threshold: object.threshold,
        };
        match server.fetch_share(&request).await {
            Ok(share) => shares.push(share),
            Err(e) => warn!(server = server.id(), error = %e, "share fetch failed"),
        }
    }

    if shares.len() < threshold {
        return Err(Error::InsufficientKeyShards {
            received: shares.len(),
            threshold,
        });
    }
    Ok(shares)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seal;
    use curve25519_dalek::montgomery::MontgomeryPoint;
    use curve25519_dalek::scalar::Scalar;
    use lumen_core::{Address, EphemeralIdentity, ObjectId};
    use rand::{RngCore, SeedableRng};
    use rand_chacha::ChaCha20Rng;
    use std::sync::Arc;

    /// In-process server that actually unwraps with its secret
    struct LocalKeyServer {
        id: String,
        secret: Scalar,
        healthy: bool,
    }

    #[async_trait]
    impl KeyServer for LocalKeyServer {
        fn id(&self) -> &str {
            &self.id
        }

        async fn fetch_share(&self, request: &ShareRequest) -> Result<KeyShare> {
            if !self.healthy {
                return Err(Error::Storage("server offline".to_string()));
            }
            let file_id = hex::decode(&request.file_id)
                .map_err(|e| Error::Storage(e.to_string()))?;
            seal::unwrap_share(&request.wrapped_share, &self.secret, &file_id)
        }
    }

    fn setup(
        healthy: [bool; 3],
    ) -> (EncryptedObject, Vec<Arc<dyn KeyServer>>, SessionKey) {
        let mut rng = ChaCha20Rng::seed_from_u64(17);
        let mut servers: Vec<Arc<dyn KeyServer>> = Vec::new();
        let mut publics = Vec::new();
        for (i, healthy) in healthy.into_iter().enumerate() {
            let mut bytes = [0u8; 32];
            rng.fill_bytes(&mut bytes);
            let secret = Scalar::from_bytes_mod_order(bytes);
            let id = format!("server-{}", i);
            publics.push((id.clone(), MontgomeryPoint::mul_base(&secret).to_bytes()));
            servers.push(Arc::new(LocalKeyServer { id, secret, healthy }));
        }

        let object =
            seal::seal(b"vault payload", &ObjectId::new([4u8; 32]), &publics, 2, &mut rng).unwrap();
        let identity = EphemeralIdentity::generate(&mut rng, 10);
        let session_key = SessionKey::mint(
            &identity,
            Address::new([1u8; 32]),
            ObjectId::new([8u8; 32]),
            chrono::Utc::now(),
        )
        .unwrap();
        (object, servers, session_key)
    }

    #[tokio::test]
    async fn test_all_servers_answer() {
        let (object, servers, session_key) = setup([true, true, true]);
        let shares = fetch_key_shares(&servers, &object, b"tx", &session_key)
            .await
            .unwrap();
        assert_eq!(shares.len(), 3);
        assert_eq!(seal::open(&object, &shares).unwrap(), b"vault payload");
    }

    #[tokio::test]
    async fn test_one_failure_is_tolerated() {
        let (object, servers, session_key) = setup([true, false, true]);
        let shares = fetch_key_shares(&servers, &object, b"tx", &session_key)
            .await
            .unwrap();
        assert_eq!(shares.len(), 2);
        assert_eq!(seal::open(&object, &shares).unwrap(), b"vault payload");
    }

    #[tokio::test]
    async fn test_below_threshold_fails() {
        let (object, servers, session_key) = setup([true, false, false]);
        let err = fetch_key_shares(&servers, &object, b"tx", &session_key)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::InsufficientKeyShards {
                received: 1,
                threshold: 2
            }
        ));
    }
}
