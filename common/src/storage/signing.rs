use std::{fmt, sync::Arc, time::Duration};

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use url::Url;

use super::blob::{PresignedLink, StorageError};

type HmacSha256 = Hmac<Sha256>;

/// Path segments, below the public base URL, where locally signed blobs are served.
pub const BLOB_ROUTE_SEGMENTS: [&str; 3] = ["api", "v1", "blobs"];

/// Signs read links for backends that cannot presign on their own (memory and local disk).
///
/// Links carry `expires`, `filename` and an HMAC-SHA256 `signature` over the key, the expiry
/// and the file name, so none of them can be altered without invalidating the link.
#[derive(Clone)]
pub struct LocalSigner {
    secret: Arc<[u8]>,
    base_url: Url,
}

impl fmt::Debug for LocalSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalSigner")
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl LocalSigner {
    pub fn new(secret: &[u8], public_base_url: &str) -> Result<Self, StorageError> {
        if secret.is_empty() {
            return Err(StorageError::Signing("signing secret must not be empty".into()));
        }
        let base_url = Url::parse(public_base_url)
            .map_err(|e| StorageError::Signing(format!("invalid public base url: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(StorageError::Signing(
                "public base url cannot carry a path".into(),
            ));
        }

        Ok(Self {
            secret: Arc::from(secret),
            base_url,
        })
    }

    pub fn sign(
        &self,
        key: &str,
        file_name: &str,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Result<PresignedLink, StorageError> {
        let ttl = chrono::Duration::from_std(ttl)
            .map_err(|e| StorageError::Signing(format!("invalid link ttl: {e}")))?;
        let expires_at = now
            .checked_add_signed(ttl)
            .ok_or_else(|| StorageError::Signing("link ttl overflows".into()))?;
        let expires = expires_at.timestamp();

        let signature = URL_SAFE_NO_PAD.encode(
            self.mac(key, expires, file_name)?
                .finalize()
                .into_bytes(),
        );

        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| StorageError::Signing("public base url cannot carry a path".into()))?
            .pop_if_empty()
            .extend(BLOB_ROUTE_SEGMENTS)
            .push(key);
        url.query_pairs_mut()
            .append_pair("expires", &expires.to_string())
            .append_pair("filename", file_name)
            .append_pair("signature", &signature);

        // The URL only carries whole seconds, so the reported expiry must not outlive it.
        let expires_at = DateTime::<Utc>::from_timestamp(expires, 0).unwrap_or(expires_at);

        Ok(PresignedLink { url, expires_at })
    }

    /// Checks a link minted by [`LocalSigner::sign`].
    pub fn verify(
        &self,
        key: &str,
        expires: i64,
        file_name: &str,
        signature: &str,
        now: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        let provided = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| StorageError::InvalidSignature)?;
        self.mac(key, expires, file_name)?
            .verify_slice(&provided)
            .map_err(|_| StorageError::InvalidSignature)?;

        if expires <= now.timestamp() {
            return Err(StorageError::LinkExpired);
        }

        Ok(())
    }

    fn mac(&self, key: &str, expires: i64, file_name: &str) -> Result<HmacSha256, StorageError> {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| StorageError::Signing(e.to_string()))?;
        mac.update(format!("GET\n{key}\n{expires}\n{file_name}").as_bytes());
        Ok(mac)
    }
}
