//! Platform Crate - Technical Infrastructure
//!
//! Shared technical foundations with no domain knowledge:
//! - Cryptographic utilities (random tokens, SHA-256, HMAC, Base64)
//! - Password hashing (Argon2id, NIST SP 800-63B policy)
//! - Cookie handling and client fingerprinting
//! - Rate limiting contract
//! - JWT encoding and verification
//! - Transactional mail

pub mod client;
pub mod cookie;
pub mod crypto;
pub mod jwt;
pub mod mail;
pub mod password;
pub mod rate_limit;
