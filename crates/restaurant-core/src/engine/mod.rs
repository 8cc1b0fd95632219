//! The assembled restaurant backend.
//!
//! [`RestaurantBackend`] owns the services the HTTP layer calls into. All of
//! them share one storage service. Build it with
//! [`BackendBuilder`](crate::BackendBuilder).

use crate::catalog::{MenuService, RestaurantService};
use crate::state::OrderLifecycle;
use crate::users::UserService;
use restaurant_auth::TokenIssuer;
use restaurant_config::Config;
use restaurant_storage::{StorageError, StorageService};
use restaurant_types::StorageKey;
use std::sync::Arc;

/// Key probed by the health check. It never exists.
const HEALTH_PROBE_ID: &str = "health-probe";

/// Services of a running backend.
#[derive(Clone)]
pub struct RestaurantBackend {
	config: Config,
	storage: Arc<StorageService>,
	orders: Arc<OrderLifecycle>,
	restaurants: Arc<RestaurantService>,
	menu: Arc<MenuService>,
	users: Arc<UserService>,
	tokens: Arc<TokenIssuer>,
}

impl RestaurantBackend {
	pub fn new(
		config: Config,
		storage: Arc<StorageService>,
		orders: Arc<OrderLifecycle>,
		menu: Arc<MenuService>,
	) -> Self {
		let tokens = Arc::new(TokenIssuer::new(&config.auth));
		Self {
			restaurants: Arc::new(RestaurantService::new(storage.clone())),
			users: Arc::new(UserService::new(storage.clone())),
			config,
			storage,
			orders,
			menu,
			tokens,
		}
	}

	pub fn config(&self) -> &Config {
		&self.config
	}

	pub fn orders(&self) -> &Arc<OrderLifecycle> {
		&self.orders
	}

	pub fn restaurants(&self) -> &Arc<RestaurantService> {
		&self.restaurants
	}

	pub fn menu(&self) -> &Arc<MenuService> {
		&self.menu
	}

	pub fn users(&self) -> &Arc<UserService> {
		&self.users
	}

	pub fn tokens(&self) -> &Arc<TokenIssuer> {
		&self.tokens
	}

	/// Checks that the storage backend answers a lookup.
	pub async fn health_check(&self) -> Result<(), StorageError> {
		self.storage
			.exists(StorageKey::Restaurants, HEALTH_PROBE_ID)
			.await
			.map(|_| ())
			.inspect_err(|e| tracing::warn!(error = %e, "Storage health check failed"))
	}
}
