//! Core services of the restaurant ordering backend.
//!
//! The [`state`] module holds the order lifecycle: atomic creation of an order
//! with its items, status advancement, cancellation, updates and deletion.
//! Around it sit the restaurant and menu catalog, user accounts, and the
//! builder that wires everything onto one storage backend.

pub mod builder;
pub mod catalog;
pub mod engine;
pub mod state;
pub mod users;

pub use builder::{BackendBuilder, BuilderError};
pub use catalog::{CatalogError, MenuCatalog, MenuService, RestaurantService};
pub use engine::RestaurantBackend;
pub use state::{next_status, OrderError, OrderLifecycle};
pub use users::{UserError, UserService};
