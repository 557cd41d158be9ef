//! Domain entities

pub mod identity;

pub use identity::Identity;
