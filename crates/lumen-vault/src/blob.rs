//! Blob store access
//!
//! The blob store is content-addressed and external: publishers accept
//! uploads for a bounded number of epochs, aggregators serve reads. The
//! store never sees plaintext; only encoded encrypted objects pass through.

use async_trait::async_trait;

use lumen_core::{BlobId, Error, Result};

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store bytes for `epochs` epochs, returning the blob id
    async fn put(&self, bytes: Vec<u8>, epochs: u64) -> Result<BlobId>;

    /// Fetch a blob by id
    async fn get(&self, blob_id: &BlobId) -> Result<Vec<u8>>;
}

/// HTTP publisher/aggregator pair
pub struct HttpBlobStore {
    http: reqwest::Client,
    publisher_url: String,
    aggregator_url: String,
}

impl HttpBlobStore {
    pub fn new(publisher_url: impl Into<String>, aggregator_url: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| Error::Storage(format!("failed to build client: {}", e)))?;
        Ok(Self {
            http,
            publisher_url: publisher_url.into(),
            aggregator_url: aggregator_url.into(),
        })
    }
}

#[async_trait]
impl BlobStore for HttpBlobStore {
    async fn put(&self, bytes: Vec<u8>, epochs: u64) -> Result<BlobId> {
        let url = format!("{}/v1/store?epochs={}", self.publisher_url, epochs);
        let response = self
            .http
            .put(&url)
            .body(bytes)
            .send()
            .await
            .map_err(|e| Error::Storage(format!("blob upload failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(Error::Storage(format!(
                "blob publisher returned {}: {}",
                status.as_u16(),
                text
            )));
        }

        let value: serde_json::Value = response
            .json()
            .await
            .map_err(|e| Error::Storage(format!("blob publisher response: {}", e)))?;
        blob_id_from_store_reply(&value)
    }

    async fn get(&self, blob_id: &BlobId) -> Result<Vec<u8>> {
        let url = format!("{}/v1/{}", self.aggregator_url, blob_id);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::Storage(format!("blob fetch failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Storage(format!(
                "blob aggregator returned {} for {}",
                status.as_u16(),
                blob_id
            )));
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::Storage(format!("blob body: {}", e)))?;
        Ok(bytes.to_vec())
    }
}

/// A publisher reply names the blob either as already certified or as
/// newly created; both carry the id in a different place.
fn blob_id_from_store_reply(value: &serde_json::Value) -> Result<BlobId> {
    let id = value
        .pointer("/alreadyCertified/blobId")
        .or_else(|| value.pointer("/newlyCreated/blobObject/blobId"))
        .and_then(|v| v.as_str())
        .ok_or_else(|| Error::Storage("publisher reply carries no blob id".to_string()))?;
    Ok(BlobId::new(id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_already_certified_reply() {
        let value = json!({ "alreadyCertified": { "blobId": "blob-1", "eventOrObject": {} } });
        assert_eq!(blob_id_from_store_reply(&value).unwrap().as_str(), "blob-1");
    }

    #[test]
    fn test_newly_created_reply() {
        let value = json!({ "newlyCreated": { "blobObject": { "blobId": "blob-2", "size": 44 } } });
        assert_eq!(blob_id_from_store_reply(&value).unwrap().as_str(), "blob-2");
    }

    #[test]
    fn test_unrecognized_reply_is_storage_error() {
        let err = blob_id_from_store_reply(&json!({ "ok": true })).unwrap_err();
        assert!(matches!(err, Error::Storage(_)));
    }
}
