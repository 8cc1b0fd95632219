//! Main entry point for the restaurant ordering backend.
//!
//! Loads the configuration, picks the storage implementation it names,
//! assembles the backend and serves the HTTP API.

use clap::Parser;
use restaurant_config::Config;
use restaurant_core::{BackendBuilder, RestaurantBackend};
use std::path::PathBuf;
use std::sync::Arc;

mod apis;
mod server;

use restaurant_storage::implementations::file::create_storage as create_file_storage;
use restaurant_storage::implementations::memory::create_storage as create_memory_storage;

/// Command-line arguments for the backend.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file
	#[arg(short, long, default_value = "config.toml")]
	config: PathBuf,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "info")]
	log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	use tracing_subscriber::{fmt, EnvFilter};

	// RUST_LOG wins over --log-level
	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

	fmt()
		.with_env_filter(env_filter)
		.with_thread_ids(true)
		.with_target(true)
		.init();

	tracing::info!("Started restaurant backend");

	let config = Config::from_file(&args.config.to_string_lossy()).await?;
	tracing::info!("Loaded configuration [{}]", config.service.id);

	let backend = Arc::new(build_backend(config.clone()).await?);

	match config.enabled_api() {
		Some(api_config) => server::start_server(api_config.clone(), backend).await?,
		None => tracing::warn!("API server disabled in configuration, nothing to serve"),
	}

	tracing::info!("Stopped restaurant backend");
	Ok(())
}

/// Macro to create a factory HashMap with the appropriate type aliases
macro_rules! create_factory_map {
	($interface:path, $error:path, $( $name:literal => $factory:expr ),* $(,)?) => {{
		let mut factories = std::collections::HashMap::new();
		$(
			factories.insert(
				$name.to_string(),
				$factory as fn(&toml::Value) -> Result<Box<dyn $interface>, $error>
			);
		)*
		factories
	}};
}

/// Builds the backend with every storage implementation compiled in.
async fn build_backend(config: Config) -> Result<RestaurantBackend, Box<dyn std::error::Error>> {
	let storage_factories = create_factory_map!(
		restaurant_storage::StorageInterface,
		restaurant_storage::StorageError,
		"file" => create_file_storage,
		"memory" => create_memory_storage,
	);

	Ok(BackendBuilder::new(config).build(&storage_factories).await?)
}

#[cfg(test)]
mod tests {
	use super::*;
	use tempfile::tempdir;

	#[test]
	fn test_create_factory_map_macro() {
		let factories = create_factory_map!(
			restaurant_storage::StorageInterface,
			restaurant_storage::StorageError,
			"memory" => create_memory_storage,
		);

		assert_eq!(factories.len(), 1);
		assert!(factories.contains_key("memory"));
	}

	#[test]
	fn test_args_defaults() {
		let args = Args::parse_from(["restaurant-backend"]);
		assert_eq!(args.config, PathBuf::from("config.toml"));
		assert_eq!(args.log_level, "info");

		let args = Args::parse_from(["restaurant-backend", "-c", "prod.toml", "-l", "debug"]);
		assert_eq!(args.config, PathBuf::from("prod.toml"));
		assert_eq!(args.log_level, "debug");
	}

	#[tokio::test]
	async fn test_build_backend_from_file_config() {
		let temp_dir = tempdir().expect("Failed to create temp dir");
		let data_dir = temp_dir.path().join("data");
		let config_path = temp_dir.path().join("config.toml");

		let config_content = format!(
			r#"
[service]
id = "test-file-backend"

[storage]
primary = "file"

[storage.implementations.file]
storage_path = "{}"

[auth]
jwt_secret = "0123456789abcdef0123456789abcdef"

[api]
enabled = false
"#,
			data_dir.display()
		);
		std::fs::write(&config_path, config_content).unwrap();

		let config = Config::from_file(config_path.to_str().unwrap())
			.await
			.unwrap();
		let backend = build_backend(config).await.unwrap();

		assert_eq!(backend.config().service.id, "test-file-backend");
		assert!(backend.config().enabled_api().is_none());
		assert!(backend.health_check().await.is_ok());
	}
}
