//! State management for orders.
//!
//! Provides the order lifecycle: atomic creation with line items, the
//! forward-only status sequence, cancellation and deletion.

pub mod order;

pub use order::{next_status, OrderError, OrderLifecycle};
