use thiserror::Error;

#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("Encryption failed")]
    EncryptionFailed,

    #[error("Decryption failed: authentication tag mismatch or wrong key")]
    DecryptionFailed,

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Invalid key length: expected {expected}, got {got}")]
    InvalidKeyLength { expected: usize, got: usize },

    #[error("Unsupported key version {version}, only version {supported} is supported")]
    UnsupportedKeyVersion { version: u32, supported: u32 },

    #[error("Invalid sealed value format")]
    InvalidFormat,

    #[error("Invalid nonce length: {0}")]
    InvalidNonce(usize),

    #[error("Decrypted value is not valid UTF-8")]
    InvalidUtf8,

    #[error("Sealed JSON value could not be decoded: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

pub type CryptoResult<T> = Result<T, CryptoError>;
