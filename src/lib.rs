//! Message Merge - Backup Message and Contact Resolution
//!
//! A Rust library for extracting messages and contacts from device backups
//! and chat exports, and merging them into a single denormalized table that
//! joins each message to the identity of its sender or recipient.
//!
//! # Features
//!
//! - Identifier normalization for phone numbers and emails
//! - Message → participant → contact joins with an explicit duplicate policy
//! - Fan-out of group messages into one row per recipient
//! - Data-quality reporting: duplicate joins and unresolved identifiers are
//!   counted, not silently absorbed

/// Relational backup adapters
pub mod backup;
/// Configuration management
pub mod config;
/// Error types
pub mod error;
/// Display name collapsing
pub mod identity;
/// Logging setup and utilities
pub mod logging;
/// The merge engine
pub mod merge;
/// Metrics collection
pub mod metrics;
/// Data models and structures
pub mod models;
/// Identifier normalization
pub mod normalize;
/// Typed identity lookup
pub mod resolve;
/// Adapter contracts for message, participant and contact sources
pub mod sources;
/// Input validation
pub mod validation;

// Re-export key components for easier access
pub use error::{MergeError, Result};
pub use merge::{ContactIndex, MergeEngine};
pub use models::{
    AddressBookEntry, ContactRecord, DuplicatePolicy, MergeOptions, MergeOutput, MergeReport,
    RawMessage, ResolvedMessage,
};
pub use normalize::IdentifierNormalizer;
