//! Restaurants and their menus.
//!
//! Plain record management plus the [`MenuCatalog`] lookup the order
//! lifecycle uses to check ordered items. Deletions cascade to dependent
//! menu items, orders and order items inside one storage transaction.

pub mod menu;
pub mod restaurant;

pub use menu::MenuService;
pub use restaurant::RestaurantService;

use async_trait::async_trait;
use restaurant_storage::StorageError;
use restaurant_types::MenuItem;
use thiserror::Error;
use uuid::Uuid;

/// Errors that can occur while managing the catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
	#[error("Restaurant not found: {0}")]
	RestaurantNotFound(Uuid),
	#[error("Menu item not found: {0}")]
	MenuItemNotFound(Uuid),
	#[error("Validation error: {0}")]
	Validation(String),
	#[error("Persistence error: {0}")]
	Persistence(String),
}

impl From<StorageError> for CatalogError {
	fn from(err: StorageError) -> Self {
		CatalogError::Persistence(err.to_string())
	}
}

/// Read access to current menu items.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MenuCatalog: Send + Sync {
	async fn menu_item(&self, id: Uuid) -> Result<MenuItem, CatalogError>;
}

/// Rejects blank values for required text fields.
pub(crate) fn require_text(field: &str, value: &str) -> Result<(), CatalogError> {
	if value.trim().is_empty() {
		Err(CatalogError::Validation(format!("{} cannot be empty", field)))
	} else {
		Ok(())
	}
}
