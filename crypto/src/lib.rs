//! Field-level encryption for sensitive health record values.
//!
//! Values are sealed with AES-256-GCM under a single configured key and
//! stored as self-describing strings:
//!
//! ```text
//! enc:v{version}:{nonce_b64}:{ciphertext_b64}
//! ```
//!
//! The `enc:` prefix lets readers tell sealed values from plaintext written
//! before a key was configured, so [`FieldCipher::open_str`] passes plaintext
//! through unchanged.
//!
//! # Example
//!
//! ```rust
//! use crypto::FieldCipher;
//!
//! let cipher = FieldCipher::new(FieldCipher::generate_key()).unwrap();
//! let sealed = cipher.seal_str("Type 2 diabetes").unwrap();
//! assert!(FieldCipher::is_sealed(&sealed));
//! assert_eq!(cipher.open_str(&sealed).unwrap(), "Type 2 diabetes");
//! ```

pub mod error;
pub mod field_cipher;

pub use error::*;
pub use field_cipher::FieldCipher;
