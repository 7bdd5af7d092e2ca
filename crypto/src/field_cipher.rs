use crate::error::{CryptoError, CryptoResult};
use aes_gcm::{
    aead::{Aead, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use rand::RngCore;
use serde_json::Value;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Marker prefix of every sealed value
const SEALED_PREFIX: &str = "enc:";

/// Key object used when a JSON document is sealed
const SEALED_JSON_KEY: &str = "$sealed";

const KEY_LEN: usize = 32;
const NONCE_LEN: usize = 12;

/// AES-256-GCM cipher for individual record fields
///
/// The key is zeroized when the cipher is dropped.
#[derive(ZeroizeOnDrop)]
pub struct FieldCipher {
    #[zeroize(skip)]
    cipher: Aes256Gcm,
    key: [u8; KEY_LEN],
    #[zeroize(skip)]
    key_version: u32,
}

impl std::fmt::Debug for FieldCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldCipher")
            .field("key_version", &self.key_version)
            .finish_non_exhaustive()
    }
}

impl FieldCipher {
    /// Create a cipher from a raw 32-byte key
    pub fn new(key: [u8; KEY_LEN]) -> CryptoResult<Self> {
        let cipher = Aes256Gcm::new_from_slice(&key)
            .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;

        Ok(Self {
            cipher,
            key,
            key_version: 1,
        })
    }

    /// Create a cipher from a base64-encoded 32-byte key
    pub fn from_base64(key_b64: &str) -> CryptoResult<Self> {
        let mut key_bytes = BASE64
            .decode(key_b64.trim())
            .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;

        if key_bytes.len() != KEY_LEN {
            let got = key_bytes.len();
            key_bytes.zeroize();
            return Err(CryptoError::InvalidKeyLength {
                expected: KEY_LEN,
                got,
            });
        }

        let mut key = [0u8; KEY_LEN];
        key.copy_from_slice(&key_bytes);
        key_bytes.zeroize();

        Self::new(key)
    }

    pub fn with_version(mut self, version: u32) -> Self {
        self.key_version = version;
        self
    }

    pub fn version(&self) -> u32 {
        self.key_version
    }

    /// Generate a random key
    pub fn generate_key() -> [u8; KEY_LEN] {
        let mut key = [0u8; KEY_LEN];
        OsRng.fill_bytes(&mut key);
        key
    }

    /// Generate a random key encoded as base64, suitable for `ENCRYPTION_KEY`
    pub fn generate_key_base64() -> String {
        BASE64.encode(Self::generate_key())
    }

    /// Whether a stored string carries the sealed marker
    pub fn is_sealed(value: &str) -> bool {
        value.starts_with(SEALED_PREFIX)
    }

    /// Seal a string value
    pub fn seal_str(&self, plaintext: &str) -> CryptoResult<String> {
        self.seal_bytes(plaintext.as_bytes())
    }

    /// Open a sealed string; plaintext values pass through unchanged
    pub fn open_str(&self, stored: &str) -> CryptoResult<String> {
        if !Self::is_sealed(stored) {
            return Ok(stored.to_string());
        }
        let bytes = self.open_bytes(stored)?;
        String::from_utf8(bytes).map_err(|_| CryptoError::InvalidUtf8)
    }

    /// Seal a JSON document into `{"$sealed": "enc:..."}`
    pub fn seal_json(&self, value: &Value) -> CryptoResult<Value> {
        let serialized = serde_json::to_vec(value)?;
        let sealed = self.seal_bytes(&serialized)?;
        let mut wrapper = serde_json::Map::new();
        wrapper.insert(SEALED_JSON_KEY.to_string(), Value::String(sealed));
        Ok(Value::Object(wrapper))
    }

    /// Open a JSON document produced by [`seal_json`](Self::seal_json);
    /// any other document passes through unchanged
    pub fn open_json(&self, value: &Value) -> CryptoResult<Value> {
        let Some(sealed) = value
            .as_object()
            .filter(|map| map.len() == 1)
            .and_then(|map| map.get(SEALED_JSON_KEY))
            .and_then(Value::as_str)
        else {
            return Ok(value.clone());
        };

        let bytes = self.open_bytes(sealed)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    fn seal_bytes(&self, plaintext: &[u8]) -> CryptoResult<String> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(nonce, plaintext)
            .map_err(|_| CryptoError::EncryptionFailed)?;

        Ok(format!(
            "{SEALED_PREFIX}v{}:{}:{}",
            self.key_version,
            BASE64.encode(nonce_bytes),
            BASE64.encode(ciphertext)
        ))
    }

    fn open_bytes(&self, sealed: &str) -> CryptoResult<Vec<u8>> {
        let body = sealed
            .strip_prefix(SEALED_PREFIX)
            .ok_or(CryptoError::InvalidFormat)?;

        let mut parts = body.split(':');
        let (Some(version), Some(nonce_b64), Some(ciphertext_b64), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(CryptoError::InvalidFormat);
        };

        let version = version
            .strip_prefix('v')
            .and_then(|v| v.parse::<u32>().ok())
            .ok_or(CryptoError::InvalidFormat)?;

        if version != self.key_version {
            return Err(CryptoError::UnsupportedKeyVersion {
                version,
                supported: self.key_version,
            });
        }

        let nonce_bytes = BASE64
            .decode(nonce_b64)
            .map_err(|_| CryptoError::InvalidFormat)?;
        if nonce_bytes.len() != NONCE_LEN {
            return Err(CryptoError::InvalidNonce(nonce_bytes.len()));
        }

        let ciphertext = BASE64
            .decode(ciphertext_b64)
            .map_err(|_| CryptoError::InvalidFormat)?;

        self.cipher
            .decrypt(Nonce::from_slice(&nonce_bytes), ciphertext.as_ref())
            .map_err(|_| CryptoError::DecryptionFailed)
    }
}
