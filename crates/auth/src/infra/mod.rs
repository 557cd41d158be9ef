//! Infrastructure implementations of the domain and platform traits

pub mod memory;
pub mod redis;

pub use memory::MemoryCredentialRepository;
pub use redis::RedisTtlStore;
