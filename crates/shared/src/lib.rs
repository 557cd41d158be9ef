//! Shared Kernel - Domain-crossing minimal core
//!
//! This crate contains the "smallest core" of vocabulary shared across the
//! authentication workspace:
//! - Common error types and result aliases
//!
//! **Design Principle**: Only include things that are "hard to change"
//! and have consistent meaning across all domains.

pub mod error {
    pub mod app_error;
    pub mod kind;
}
