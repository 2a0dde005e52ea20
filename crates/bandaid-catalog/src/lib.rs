//! Fixed, compiled pattern catalog — the first layer of the validation
//! pipeline.
//!
//! ```rust
//! use bandaid_catalog::PatternCatalog;
//!
//! let catalog = PatternCatalog::new("/nonexistent/path-for-doctest.txt");
//! let detections = catalog.detect("Send 2 ETH to 0x742d35Cc6634C0532925a3b844Bc454e4438f44e");
//! assert!(!detections.is_empty());
//! ```

mod bip39;
mod catalog;
mod error;
mod patterns;
mod redact;

pub use bip39::{detect_seed_phrase, Bip39Wordlist};
pub use catalog::{default_wordlist_path, PatternCatalog};
pub use error::CatalogError;
pub use patterns::{detect_api_key, detect_blockchain_address, detect_private_key, detect_prompt_injection};
pub use redact::{
    mask_sensitive_value, redact_address, redact_all, redact_api_key, redact_blockchain_address,
    redact_by_threat_type, redact_credit_card, redact_email, redact_phone, redact_pii, redact_private_key,
    redact_secrets, redact_seed_phrase, redact_ssn,
};
