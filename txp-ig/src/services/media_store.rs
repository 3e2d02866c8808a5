//! Media storage writer
//!
//! Persists uploaded audio/image payloads as private objects under the
//! gateway's root folder and hands out time-bounded signed references
//! instead of permanent public URLs. Object names combine a millisecond
//! timestamp with a short random suffix so rapid successive stores never
//! collide.
//!
//! A store failure is reported as `None`, never as an error: the ingestion
//! pipeline persists the submission with a null media reference instead of
//! aborting.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::Utc;
use rand::distributions::Alphanumeric;
use rand::Rng;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Storage bucket for one media kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bucket {
    Audio,
    Images,
}

impl Bucket {
    pub fn as_str(&self) -> &'static str {
        match self {
            Bucket::Audio => "audio",
            Bucket::Images => "images",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "audio" => Some(Bucket::Audio),
            "images" => Some(Bucket::Images),
            _ => None,
        }
    }
}

/// Filesystem-backed private object store with signed references
#[derive(Debug, Clone)]
pub struct MediaStore {
    media_root: PathBuf,
    secret: String,
    url_ttl_seconds: u64,
}

impl MediaStore {
    /// Create a store rooted at `<root>/media`. Bucket directories are
    /// created lazily on first store.
    pub fn new(root: &Path, secret: String, url_ttl_seconds: u64) -> Self {
        Self {
            media_root: root.join("media"),
            secret,
            url_ttl_seconds,
        }
    }

    /// Decode a base64 payload (optionally carrying a data-URL prefix) and
    /// persist it as a new object. Returns the signed reference, or `None`
    /// on any failure.
    pub async fn store(&self, bucket: Bucket, base64_data: &str, extension: &str) -> Option<String> {
        let cleaned = strip_data_url_prefix(base64_data);
        let bytes = match BASE64.decode(cleaned.trim()) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(bucket = bucket.as_str(), error = %e, "Media decode failed, storing null reference");
                return None;
            }
        };

        let name = generate_object_name(extension);
        let dir = self.media_root.join(bucket.as_str());
        if let Err(e) = tokio::fs::create_dir_all(&dir).await {
            warn!(bucket = bucket.as_str(), error = %e, "Media bucket creation failed, storing null reference");
            return None;
        }

        let path = dir.join(&name);
        if let Err(e) = tokio::fs::write(&path, &bytes).await {
            warn!(bucket = bucket.as_str(), error = %e, "Media write failed, storing null reference");
            return None;
        }

        info!(
            bucket = bucket.as_str(),
            name = %name,
            bytes = bytes.len(),
            "Media object stored"
        );
        Some(self.signed_ref(bucket, &name))
    }

    /// Build a signed, expiring reference for a stored object.
    pub fn signed_ref(&self, bucket: Bucket, name: &str) -> String {
        let expires = Utc::now().timestamp() + self.url_ttl_seconds as i64;
        let sig = self.signature(bucket, name, expires);
        format!(
            "/media/{}/{}?expires={}&sig={}",
            bucket.as_str(),
            name,
            expires,
            sig
        )
    }

    /// Verify a reference's signature and expiry.
    pub fn verify(&self, bucket: Bucket, name: &str, expires: i64, sig: &str) -> bool {
        if expires < Utc::now().timestamp() {
            return false;
        }
        self.signature(bucket, name, expires) == sig
    }

    /// Resolve an object name to its on-disk path. Rejects names that could
    /// escape the bucket directory.
    pub fn object_path(&self, bucket: Bucket, name: &str) -> Option<PathBuf> {
        if name.is_empty()
            || name.contains('/')
            || name.contains('\\')
            || name.contains("..")
        {
            return None;
        }
        Some(self.media_root.join(bucket.as_str()).join(name))
    }

    fn signature(&self, bucket: Bucket, name: &str, expires: i64) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.secret.as_bytes());
        hasher.update(bucket.as_str().as_bytes());
        hasher.update(name.as_bytes());
        hasher.update(expires.to_string().as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

/// Strip a `data:<mime>;base64,` prefix if present
fn strip_data_url_prefix(data: &str) -> &str {
    if data.starts_with("data:") {
        match data.find(',') {
            Some(idx) => &data[idx + 1..],
            None => data,
        }
    } else {
        data
    }
}

/// `<unix_ms>-<6 random alphanumerics>.<ext>`
fn generate_object_name(extension: &str) -> String {
    let timestamp = Utc::now().timestamp_millis();
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(6)
        .map(char::from)
        .collect();
    format!("{}-{}.{}", timestamp, suffix.to_lowercase(), extension)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_in(dir: &Path) -> MediaStore {
        MediaStore::new(dir, "test-secret".to_string(), 3600)
    }

    #[tokio::test]
    async fn stores_decoded_bytes_and_returns_signed_ref() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());

        let payload = BASE64.encode(b"fake-wav-bytes");
        let reference = store.store(Bucket::Audio, &payload, "wav").await.unwrap();
        assert!(reference.starts_with("/media/audio/"));
        assert!(reference.contains("expires="));
        assert!(reference.contains("sig="));

        let name = reference
            .strip_prefix("/media/audio/")
            .unwrap()
            .split('?')
            .next()
            .unwrap();
        let on_disk = std::fs::read(store.object_path(Bucket::Audio, name).unwrap()).unwrap();
        assert_eq!(on_disk, b"fake-wav-bytes");
    }

    #[tokio::test]
    async fn strips_data_url_prefix_before_decode() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());

        let payload = format!("data:image/jpeg;base64,{}", BASE64.encode(b"jpeg-bytes"));
        let reference = store.store(Bucket::Images, &payload, "jpg").await;
        assert!(reference.is_some());
    }

    #[tokio::test]
    async fn invalid_base64_yields_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        assert!(store.store(Bucket::Audio, "@@not-base64@@", "wav").await.is_none());
    }

    #[tokio::test]
    async fn unwritable_root_yields_none() {
        let dir = tempfile::tempdir().unwrap();
        // A regular file where the media root should be: create_dir_all fails
        let blocker = dir.path().join("blocked");
        std::fs::write(&blocker, b"x").unwrap();
        let store = store_in(&blocker);

        let payload = BASE64.encode(b"bytes");
        assert!(store.store(Bucket::Audio, &payload, "wav").await.is_none());
    }

    #[tokio::test]
    async fn successive_stores_get_distinct_names() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        let payload = BASE64.encode(b"bytes");

        let first = store.store(Bucket::Audio, &payload, "wav").await.unwrap();
        let second = store.store(Bucket::Audio, &payload, "wav").await.unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn signed_ref_verifies_and_rejects_tampering() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());

        let expires = Utc::now().timestamp() + 600;
        let sig = store.signature(Bucket::Images, "a.jpg", expires);
        assert!(store.verify(Bucket::Images, "a.jpg", expires, &sig));
        assert!(!store.verify(Bucket::Images, "b.jpg", expires, &sig));
        assert!(!store.verify(Bucket::Images, "a.jpg", expires + 1, &sig));
        assert!(!store.verify(Bucket::Audio, "a.jpg", expires, &sig));
    }

    #[test]
    fn expired_reference_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());

        let expires = Utc::now().timestamp() - 1;
        let sig = store.signature(Bucket::Audio, "a.wav", expires);
        assert!(!store.verify(Bucket::Audio, "a.wav", expires, &sig));
    }

    #[test]
    fn object_path_rejects_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        assert!(store.object_path(Bucket::Audio, "../escape.wav").is_none());
        assert!(store.object_path(Bucket::Audio, "a/b.wav").is_none());
        assert!(store.object_path(Bucket::Audio, "").is_none());
        assert!(store.object_path(Bucket::Audio, "ok.wav").is_some());
    }
}
