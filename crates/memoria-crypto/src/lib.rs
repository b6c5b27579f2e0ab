//! # memoria-crypto
//!
//! Cryptographic primitives for memoria journals.
//!
//! ## Cryptographic Primitives
//!
//! - **Key derivation**: Argon2id with versioned, persisted parameters
//! - **Password verifier**: Argon2id PHC string with an independent salt
//! - **Symmetric cipher**: AES-256-GCM (AEAD) with caller-supplied context
//! - **Random generation**: ChaCha20-based CSPRNG (`rand::thread_rng`)
//!
//! ## Examples
//!
//! ### Unlock and seal
//!
//! ```rust
//! use memoria_crypto::{generate_salt, KdfDescriptor, KdfParams, Session};
//!
//! let salt = generate_salt();
//! let kdf = KdfDescriptor::current(KdfParams::new(1024, 1, 1));
//! let session = Session::derive(b"Tr0ub4dor&3", &salt, kdf).unwrap();
//!
//! let envelope = session.seal(b"Body", b"memoria:entry:42:content").unwrap();
//! let plaintext = session.open(&envelope, b"memoria:entry:42:content").unwrap();
//! assert_eq!(plaintext, b"Body");
//! ```
//!
//! ### Password checks
//!
//! ```rust
//! use memoria_crypto::{hash_password, password_strength, verify_password, KdfParams};
//!
//! assert!(password_strength("Tr0ub4dor&3") >= 60);
//!
//! let verifier = hash_password("Tr0ub4dor&3", &KdfParams::new(1024, 1, 1)).unwrap();
//! assert!(verify_password("Tr0ub4dor&3", &verifier).unwrap());
//! assert!(!verify_password("guess", &verifier).unwrap());
//! ```

pub mod cipher;
pub mod detect;
pub mod envelope;
pub mod error;
pub mod format;
pub mod kdf;
pub mod session;
pub mod strength;
pub mod verifier;

// Re-export commonly used types
pub use cipher::{generate_salt, SALT_LEN};
pub use detect::{detect_format, is_sealed};
pub use envelope::{Envelope, ALGORITHM, ENVELOPE_VERSION};
pub use error::{CryptoError, CryptoResult};
pub use format::{base64_decode, base64_decode_array, base64_encode, BlobFormat};
pub use kdf::{derive_key, DerivedKey, KdfAlgorithm, KdfDescriptor, KdfParams, KDF_VERSION};
pub use session::Session;
pub use strength::{check_strength, generate_secure_password, password_strength};
pub use verifier::{hash_password, verify_password};
