//! Storage module for deployment persistence

pub mod persistence;

pub use persistence::{Storage, StorageConfig, StorageError, StorageStats};
