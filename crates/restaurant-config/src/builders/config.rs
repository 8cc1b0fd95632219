//! Configuration builder for tests and local development.

use crate::{
	ApiConfig, AuthConfig, BootstrapAdmin, Config, OrdersConfig, ServiceConfig, StorageConfig,
};
use restaurant_types::SecretString;
use std::collections::HashMap;

/// Builder for creating `Config` instances with a fluent API.
///
/// Defaults to an in-memory store, a fixed test secret and no API section.
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
	service_id: String,
	storage_primary: String,
	storage_config: toml::Value,
	jwt_secret: String,
	token_ttl_minutes: u64,
	issuer: Option<String>,
	bootstrap_admin: Option<BootstrapAdmin>,
	check_menu_items: bool,
	api: Option<ApiConfig>,
}

impl Default for ConfigBuilder {
	fn default() -> Self {
		Self::new()
	}
}

impl ConfigBuilder {
	pub fn new() -> Self {
		Self {
			service_id: "test-restaurant".to_string(),
			storage_primary: "memory".to_string(),
			storage_config: toml::Value::Table(toml::Table::new()),
			jwt_secret: "test-secret-test-secret-test-secret!".to_string(),
			token_ttl_minutes: 60,
			issuer: None,
			bootstrap_admin: None,
			check_menu_items: false,
			api: None,
		}
	}

	pub fn service_id(mut self, id: impl Into<String>) -> Self {
		self.service_id = id.into();
		self
	}

	/// Sets the primary storage implementation and its table.
	pub fn storage(mut self, primary: impl Into<String>, config: toml::Value) -> Self {
		self.storage_primary = primary.into();
		self.storage_config = config;
		self
	}

	pub fn jwt_secret(mut self, secret: impl Into<String>) -> Self {
		self.jwt_secret = secret.into();
		self
	}

	pub fn token_ttl_minutes(mut self, minutes: u64) -> Self {
		self.token_ttl_minutes = minutes;
		self
	}

	pub fn issuer(mut self, issuer: Option<String>) -> Self {
		self.issuer = issuer;
		self
	}

	pub fn bootstrap_admin(mut self, admin: Option<BootstrapAdmin>) -> Self {
		self.bootstrap_admin = admin;
		self
	}

	pub fn check_menu_items(mut self, enabled: bool) -> Self {
		self.check_menu_items = enabled;
		self
	}

	pub fn api(mut self, api: Option<ApiConfig>) -> Self {
		self.api = api;
		self
	}

	/// Builds the `Config`. No validation is applied.
	pub fn build(self) -> Config {
		Config {
			service: ServiceConfig {
				id: self.service_id,
			},
			storage: StorageConfig {
				implementations: HashMap::from([(self.storage_primary.clone(), self.storage_config)]),
				primary: self.storage_primary,
			},
			auth: AuthConfig {
				jwt_secret: SecretString::from(self.jwt_secret),
				token_ttl_minutes: self.token_ttl_minutes,
				issuer: self.issuer,
				bootstrap_admin: self.bootstrap_admin,
			},
			orders: OrdersConfig {
				check_menu_items: self.check_menu_items,
			},
			api: self.api,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_default_build_passes_validation() {
		let config = ConfigBuilder::new().build();
		assert!(config.validate().is_ok());
		assert!(config.storage.implementations.contains_key("memory"));
	}

	#[test]
	fn test_overrides() {
		let config = ConfigBuilder::new()
			.service_id("pizzeria")
			.check_menu_items(true)
			.api(Some(ApiConfig::default()))
			.build();

		assert_eq!(config.service.id, "pizzeria");
		assert!(config.orders.check_menu_items);
		assert!(config.enabled_api().is_some());
	}
}
