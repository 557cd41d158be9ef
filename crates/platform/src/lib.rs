//! Platform Crate - Technical Infrastructure
//!
//! This crate provides shared technical foundations:
//! - Cryptographic utilities (SHA-256, random tokens, Base64)
//! - Password hashing (Argon2id, NIST SP 800-63B compliant)
//! - Shared low-latency store abstraction with atomic TTL primitives

pub mod crypto;
pub mod password;
pub mod store;
