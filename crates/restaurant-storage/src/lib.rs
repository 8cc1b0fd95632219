//! Storage module for the restaurant backend.
//!
//! This module provides the persistence layer: a low-level byte-oriented
//! [`StorageInterface`] with interchangeable backends (in-memory, file-based),
//! and the typed [`StorageService`] on top of it. Multi-record writes go
//! through a [`Transaction`], which buffers every change and hands the whole
//! batch to the backend on commit so it is applied entirely or not at all.

use async_trait::async_trait;
use restaurant_types::{ConfigSchema, ImplementationRegistry, StorageKey};
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod file;
	pub mod memory;
}

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
	/// Error that occurs when a requested item is not found.
	#[error("Not found")]
	NotFound,
	/// Error that occurs during serialization/deserialization.
	#[error("Serialization error: {0}")]
	Serialization(String),
	/// Error that occurs in the storage backend.
	#[error("Backend error: {0}")]
	Backend(String),
	/// Error that occurs during configuration validation.
	#[error("Configuration error: {0}")]
	Configuration(String),
}

/// A single write inside an atomic batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOperation {
	/// Create or overwrite `key` with `value`.
	Put { key: String, value: Vec<u8> },
	/// Remove `key`. Removing a missing key is not an error.
	Delete { key: String },
}

impl BatchOperation {
	pub fn key(&self) -> &str {
		match self {
			BatchOperation::Put { key, .. } | BatchOperation::Delete { key } => key,
		}
	}
}

/// Trait defining the low-level interface for storage backends.
///
/// Keys have the form `namespace:id`. Backends must make
/// [`apply_batch`](StorageInterface::apply_batch) atomic: after it returns
/// either every operation is visible or none is.
#[async_trait]
pub trait StorageInterface: Send + Sync {
	/// Retrieves raw bytes for the given key.
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError>;

	/// Stores raw bytes under the given key.
	async fn set_bytes(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError>;

	/// Deletes the value associated with the given key.
	async fn delete(&self, key: &str) -> Result<(), StorageError>;

	/// Checks if a key exists in storage.
	async fn exists(&self, key: &str) -> Result<bool, StorageError>;

	/// Returns the ids stored under `namespace`, without the namespace prefix.
	async fn list_ids(&self, namespace: &str) -> Result<Vec<String>, StorageError>;

	/// Applies all operations atomically.
	async fn apply_batch(&self, operations: Vec<BatchOperation>) -> Result<(), StorageError>;

	/// Returns the configuration schema for validation.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;
}

/// Type alias for storage factory functions.
pub type StorageFactory = fn(&toml::Value) -> Result<Box<dyn StorageInterface>, StorageError>;

/// Registry trait for storage implementations.
pub trait StorageRegistry: ImplementationRegistry<Factory = StorageFactory> {}

/// Get all registered storage implementations.
///
/// Returns a vector of (name, factory) tuples used to populate the factory
/// map the backend builder selects from.
pub fn get_all_implementations() -> Vec<(&'static str, StorageFactory)> {
	use implementations::{file, memory};

	vec![
		(file::Registry::NAME, file::Registry::factory()),
		(memory::Registry::NAME, memory::Registry::factory()),
	]
}

fn storage_key(namespace: &str, id: &str) -> String {
	format!("{}:{}", namespace, id)
}

fn to_bytes<T: Serialize>(data: &T) -> Result<Vec<u8>, StorageError> {
	serde_json::to_vec(data).map_err(|e| StorageError::Serialization(e.to_string()))
}

/// High-level storage service that provides typed operations.
///
/// Wraps a backend and serializes records as JSON.
pub struct StorageService {
	/// The underlying storage backend implementation.
	backend: Box<dyn StorageInterface>,
}

impl StorageService {
	/// Creates a new StorageService with the specified backend.
	pub fn new(backend: Box<dyn StorageInterface>) -> Self {
		Self { backend }
	}

	/// Stores a serializable value, creating or overwriting it.
	pub async fn store<T: Serialize>(
		&self,
		namespace: StorageKey,
		id: &str,
		data: &T,
	) -> Result<(), StorageError> {
		let key = storage_key(namespace.as_str(), id);
		self.backend.set_bytes(&key, to_bytes(data)?).await
	}

	/// Retrieves and deserializes a value from storage.
	pub async fn retrieve<T: DeserializeOwned>(
		&self,
		namespace: StorageKey,
		id: &str,
	) -> Result<T, StorageError> {
		let key = storage_key(namespace.as_str(), id);
		let bytes = self.backend.get_bytes(&key).await?;
		serde_json::from_slice(&bytes).map_err(|e| StorageError::Serialization(e.to_string()))
	}

	/// Updates an existing value in storage.
	///
	/// Unlike [`store`](Self::store) this fails with `NotFound` when the key
	/// does not exist yet.
	pub async fn update<T: Serialize>(
		&self,
		namespace: StorageKey,
		id: &str,
		data: &T,
	) -> Result<(), StorageError> {
		let key = storage_key(namespace.as_str(), id);

		if !self.backend.exists(&key).await? {
			return Err(StorageError::NotFound);
		}

		self.backend.set_bytes(&key, to_bytes(data)?).await
	}

	/// Removes a value from storage.
	pub async fn remove(&self, namespace: StorageKey, id: &str) -> Result<(), StorageError> {
		let key = storage_key(namespace.as_str(), id);
		self.backend.delete(&key).await
	}

	/// Checks if a value exists in storage.
	pub async fn exists(&self, namespace: StorageKey, id: &str) -> Result<bool, StorageError> {
		let key = storage_key(namespace.as_str(), id);
		self.backend.exists(&key).await
	}

	/// Loads every record of a namespace.
	///
	/// Records removed between listing and loading are skipped.
	pub async fn list<T: DeserializeOwned>(
		&self,
		namespace: StorageKey,
	) -> Result<Vec<T>, StorageError> {
		let ids = self.backend.list_ids(namespace.as_str()).await?;
		let mut records = Vec::with_capacity(ids.len());
		for id in ids {
			match self.retrieve(namespace, &id).await {
				Ok(record) => records.push(record),
				Err(StorageError::NotFound) => continue,
				Err(e) => return Err(e),
			}
		}
		Ok(records)
	}

	/// Starts a transaction. Nothing is written until it is committed.
	pub fn begin(&self) -> Transaction<'_> {
		Transaction {
			backend: self.backend.as_ref(),
			operations: Vec::new(),
		}
	}
}

/// Buffered set of writes applied atomically on [`commit`](Transaction::commit).
///
/// Dropping a transaction without committing discards it. Writing the same
/// key twice keeps only the last operation.
#[must_use = "a transaction does nothing until committed"]
pub struct Transaction<'a> {
	backend: &'a dyn StorageInterface,
	operations: Vec<BatchOperation>,
}

impl Transaction<'_> {
	fn push(&mut self, operation: BatchOperation) {
		self.operations.retain(|op| op.key() != operation.key());
		self.operations.push(operation);
	}

	/// Queues a serialized value for `namespace:id`.
	pub fn store<T: Serialize>(
		&mut self,
		namespace: StorageKey,
		id: &str,
		data: &T,
	) -> Result<(), StorageError> {
		let value = to_bytes(data)?;
		self.push(BatchOperation::Put {
			key: storage_key(namespace.as_str(), id),
			value,
		});
		Ok(())
	}

	/// Queues removal of `namespace:id`.
	pub fn remove(&mut self, namespace: StorageKey, id: &str) {
		self.push(BatchOperation::Delete {
			key: storage_key(namespace.as_str(), id),
		});
	}

	/// Number of queued operations.
	pub fn len(&self) -> usize {
		self.operations.len()
	}

	pub fn is_empty(&self) -> bool {
		self.operations.is_empty()
	}

	/// Applies every queued operation atomically.
	pub async fn commit(self) -> Result<(), StorageError> {
		if self.operations.is_empty() {
			return Ok(());
		}
		let count = self.operations.len();
		self.backend.apply_batch(self.operations).await?;
		tracing::trace!(operations = count, "Committed storage transaction");
		Ok(())
	}

	/// Discards every queued operation.
	pub fn rollback(self) {
		tracing::trace!(operations = self.operations.len(), "Rolled back storage transaction");
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use implementations::memory::MemoryStorage;
	use serde::Deserialize;

	#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
	struct Dish {
		name: String,
		cents: u32,
	}

	fn service() -> StorageService {
		StorageService::new(Box::new(MemoryStorage::new()))
	}

	fn dish(name: &str) -> Dish {
		Dish {
			name: name.to_string(),
			cents: 500,
		}
	}

	#[tokio::test]
	async fn test_typed_round_trip_and_update() {
		let storage = service();
		storage
			.store(StorageKey::MenuItems, "a", &dish("soup"))
			.await
			.unwrap();

		let loaded: Dish = storage.retrieve(StorageKey::MenuItems, "a").await.unwrap();
		assert_eq!(loaded, dish("soup"));

		storage
			.update(StorageKey::MenuItems, "a", &dish("stew"))
			.await
			.unwrap();
		let loaded: Dish = storage.retrieve(StorageKey::MenuItems, "a").await.unwrap();
		assert_eq!(loaded.name, "stew");
	}

	#[tokio::test]
	async fn test_update_missing_key_is_not_found() {
		let storage = service();
		let result = storage
			.update(StorageKey::Orders, "missing", &dish("x"))
			.await;
		assert!(matches!(result, Err(StorageError::NotFound)));
	}

	#[tokio::test]
	async fn test_list_is_scoped_to_namespace() {
		let storage = service();
		storage.store(StorageKey::Orders, "1", &dish("a")).await.unwrap();
		storage.store(StorageKey::Orders, "2", &dish("b")).await.unwrap();
		storage
			.store(StorageKey::OrderItems, "3", &dish("c"))
			.await
			.unwrap();

		let mut orders: Vec<Dish> = storage.list(StorageKey::Orders).await.unwrap();
		orders.sort_by(|a, b| a.name.cmp(&b.name));
		assert_eq!(orders, vec![dish("a"), dish("b")]);
	}

	#[tokio::test]
	async fn test_transaction_commit_applies_all_operations() {
		let storage = service();
		storage.store(StorageKey::Orders, "old", &dish("old")).await.unwrap();

		let mut tx = storage.begin();
		tx.store(StorageKey::Orders, "new", &dish("new")).unwrap();
		tx.store(StorageKey::OrderItems, "i1", &dish("item")).unwrap();
		tx.remove(StorageKey::Orders, "old");
		assert_eq!(tx.len(), 3);
		tx.commit().await.unwrap();

		assert!(storage.exists(StorageKey::Orders, "new").await.unwrap());
		assert!(storage.exists(StorageKey::OrderItems, "i1").await.unwrap());
		assert!(!storage.exists(StorageKey::Orders, "old").await.unwrap());
	}

	#[tokio::test]
	async fn test_transaction_rollback_writes_nothing() {
		let storage = service();

		let mut tx = storage.begin();
		tx.store(StorageKey::Orders, "1", &dish("a")).unwrap();
		tx.rollback();

		assert!(!storage.exists(StorageKey::Orders, "1").await.unwrap());
	}

	#[tokio::test]
	async fn test_transaction_keeps_last_operation_per_key() {
		let storage = service();

		let mut tx = storage.begin();
		tx.store(StorageKey::Orders, "1", &dish("first")).unwrap();
		tx.store(StorageKey::Orders, "1", &dish("second")).unwrap();
		assert_eq!(tx.len(), 1);
		tx.commit().await.unwrap();

		let loaded: Dish = storage.retrieve(StorageKey::Orders, "1").await.unwrap();
		assert_eq!(loaded.name, "second");
	}
}
