//! Common types module for the restaurant ordering backend.
//!
//! This module defines the domain records, request/response payloads and
//! validation helpers shared by every crate in the workspace. Keeping them in
//! one place guarantees that storage, core services and the HTTP layer agree
//! on the exact shape of an order, a menu item or a user.

/// API types for HTTP endpoints and error rendering.
pub mod api;
/// Restaurant and menu catalog records.
pub mod catalog;
/// Monetary amount validation.
pub mod money;
/// Order and order item records plus the status sequence.
pub mod order;
/// Registry trait for named, configurable implementations.
pub mod registry;
/// Redacting wrapper for secrets such as passwords and signing keys.
pub mod secret_string;
/// Storage namespaces.
pub mod storage;
/// User accounts and roles.
pub mod user;
/// Configuration validation types for implementation-specific TOML tables.
pub mod validation;

pub use api::*;
pub use catalog::*;
pub use money::{to_money, validate_money, MAX_MONEY_SCALE};
pub use order::*;
pub use registry::ImplementationRegistry;
pub use secret_string::SecretString;
pub use storage::*;
pub use user::*;
pub use validation::*;
