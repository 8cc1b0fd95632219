//! Builder for assembling a [`RestaurantBackend`] from configuration.
//!
//! The storage backend is chosen by name from a map of factory functions, so
//! the binary decides which implementations are available.

use crate::catalog::MenuService;
use crate::engine::RestaurantBackend;
use crate::state::OrderLifecycle;
use restaurant_config::Config;
use restaurant_storage::{StorageFactory, StorageService};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur during backend construction.
#[derive(Debug, Error)]
pub enum BuilderError {
	#[error("Configuration error: {0}")]
	Config(String),
	#[error("Missing required component: {0}")]
	MissingComponent(String),
}

/// Builder for constructing a [`RestaurantBackend`].
pub struct BackendBuilder {
	config: Config,
}

impl BackendBuilder {
	pub fn new(config: Config) -> Self {
		Self { config }
	}

	/// Creates the primary storage, wires the services and creates the
	/// bootstrap administrator when one is configured.
	pub async fn build(
		self,
		storage_factories: &HashMap<String, StorageFactory>,
	) -> Result<RestaurantBackend, BuilderError> {
		let primary = &self.config.storage.primary;
		let factory = storage_factories.get(primary).ok_or_else(|| {
			BuilderError::MissingComponent(format!("storage implementation '{}'", primary))
		})?;
		let storage_config = self.config.storage.implementations.get(primary).ok_or_else(|| {
			BuilderError::Config(format!("No configuration for storage '{}'", primary))
		})?;

		let backend = factory(storage_config).map_err(|e| {
			tracing::error!(
				component = "storage",
				implementation = %primary,
				error = %e,
				"Failed to create storage implementation"
			);
			BuilderError::Config(format!(
				"Failed to create storage implementation '{}': {}",
				primary, e
			))
		})?;
		tracing::info!(component = "storage", implementation = %primary, "Loaded");

		for name in self.config.storage.implementations.keys() {
			if name != primary {
				tracing::debug!(component = "storage", implementation = %name, "Configured but not primary");
			}
		}

		let storage = Arc::new(StorageService::new(backend));
		let menu = Arc::new(MenuService::new(storage.clone()));

		let mut orders = OrderLifecycle::new(storage.clone());
		if self.config.orders.check_menu_items {
			orders = orders.with_menu_catalog(menu.clone());
			tracing::info!(component = "orders", "Menu item checks enabled");
		}

		let backend = RestaurantBackend::new(self.config, storage, Arc::new(orders), menu);

		if let Some(admin) = &backend.config().auth.bootstrap_admin {
			let created = backend.users().ensure_admin(admin).await.map_err(|e| {
				BuilderError::Config(format!("Failed to create bootstrap admin: {}", e))
			})?;
			if created {
				tracing::info!(component = "users", "Bootstrap admin created");
			}
		}

		Ok(backend)
	}
}
