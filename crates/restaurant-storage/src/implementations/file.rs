//! File-based storage backend.
//!
//! Each record lives in its own file at `<storage_path>/<namespace>/<id>.bin`,
//! prefixed with a small versioned header. Single writes go through a temp
//! file and a rename. Batches stage every new file first, then swap them in
//! while holding an exclusive lock on `<storage_path>/.lock`; if any swap
//! fails the previous contents are restored from backups.

use crate::{BatchOperation, StorageError, StorageFactory, StorageInterface, StorageRegistry};
use async_trait::async_trait;
use fs2::FileExt;
use restaurant_types::{
	ConfigSchema, Field, FieldType, ImplementationRegistry, Schema, ValidationError,
};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs;
use tokio::sync::Mutex;

const DEFAULT_STORAGE_PATH: &str = "./data/storage";
const LOCK_FILE: &str = ".lock";

/// Fixed-size record header.
///
/// Layout (16 bytes):
/// - `[0..4]`: magic bytes `RSTO`
/// - `[4..6]`: format version, little-endian `u16`
/// - `[6..16]`: reserved, zero
struct FileHeader;

impl FileHeader {
	const MAGIC: &'static [u8; 4] = b"RSTO";
	const VERSION: u16 = 1;
	const SIZE: usize = 16;

	fn encode(value: &[u8]) -> Vec<u8> {
		let mut data = Vec::with_capacity(Self::SIZE + value.len());
		data.extend_from_slice(Self::MAGIC);
		data.extend_from_slice(&Self::VERSION.to_le_bytes());
		data.resize(Self::SIZE, 0);
		data.extend_from_slice(value);
		data
	}

	fn decode(mut data: Vec<u8>) -> Result<Vec<u8>, StorageError> {
		if data.len() < Self::SIZE || &data[0..4] != Self::MAGIC {
			return Err(StorageError::Backend("Unrecognized record format".into()));
		}
		let version = u16::from_le_bytes([data[4], data[5]]);
		if version > Self::VERSION {
			return Err(StorageError::Backend(format!(
				"Unsupported record version: {}",
				version
			)));
		}
		Ok(data.split_off(Self::SIZE))
	}
}

fn backend_err(e: impl std::fmt::Display) -> StorageError {
	StorageError::Backend(e.to_string())
}

fn sanitize(part: &str) -> String {
	part.replace(['/', '\\', ':'], "_")
}

/// A staged batch step, recorded so it can be undone.
struct Swap {
	target: PathBuf,
	staged: Option<PathBuf>,
	backup: Option<PathBuf>,
	applied: bool,
}

/// File-based storage implementation.
pub struct FileStorage {
	/// Base directory path for storing files.
	base_path: PathBuf,
	/// Serializes batches within this process; the lock file covers others.
	batch_guard: Mutex<()>,
	/// Source of unique temp file names.
	sequence: AtomicU64,
}

impl FileStorage {
	/// Creates a new FileStorage rooted at `base_path`.
	pub fn new(base_path: PathBuf) -> Self {
		Self {
			base_path,
			batch_guard: Mutex::new(()),
			sequence: AtomicU64::new(0),
		}
	}

	/// Maps `namespace:id` to `<base>/<namespace>/<id>.bin`.
	fn get_file_path(&self, key: &str) -> PathBuf {
		match key.split_once(':') {
			Some((namespace, id)) => self
				.base_path
				.join(sanitize(namespace))
				.join(format!("{}.bin", sanitize(id))),
			None => self.base_path.join(format!("{}.bin", sanitize(key))),
		}
	}

	fn sibling(&self, path: &Path, suffix: &str) -> PathBuf {
		let n = self.sequence.fetch_add(1, Ordering::Relaxed);
		path.with_extension(format!("{}.{}", n, suffix))
	}

	async fn write_staged(&self, path: &Path, value: &[u8]) -> Result<PathBuf, StorageError> {
		if let Some(parent) = path.parent() {
			fs::create_dir_all(parent).await.map_err(backend_err)?;
		}
		let staged = self.sibling(path, "tmp");
		fs::write(&staged, FileHeader::encode(value))
			.await
			.map_err(backend_err)?;
		Ok(staged)
	}

	/// Takes the cross-process lock. It is released when the file is dropped.
	async fn lock(&self) -> Result<std::fs::File, StorageError> {
		let base = self.base_path.clone();
		tokio::task::spawn_blocking(move || {
			std::fs::create_dir_all(&base)?;
			let file = std::fs::OpenOptions::new()
				.create(true)
				.truncate(false)
				.write(true)
				.open(base.join(LOCK_FILE))?;
			FileExt::lock_exclusive(&file)?;
			Ok::<_, std::io::Error>(file)
		})
		.await
		.map_err(backend_err)?
		.map_err(backend_err)
	}

	/// Moves staged files into place, backing up whatever they replace.
	async fn swap_in(&self, swaps: &mut [Swap]) -> Result<(), StorageError> {
		for swap in swaps.iter_mut() {
			if fs::try_exists(&swap.target).await.map_err(backend_err)? {
				let backup = self.sibling(&swap.target, "bak");
				fs::rename(&swap.target, &backup)
					.await
					.map_err(backend_err)?;
				swap.backup = Some(backup);
			}
			if let Some(staged) = &swap.staged {
				fs::rename(staged, &swap.target)
					.await
					.map_err(backend_err)?;
			}
			swap.applied = true;
		}
		Ok(())
	}

	/// Undoes a partially applied batch.
	async fn restore(swaps: &[Swap]) {
		for swap in swaps.iter().rev() {
			if let Some(staged) = &swap.staged {
				let leftover = if swap.applied { &swap.target } else { staged };
				let _ = fs::remove_file(leftover).await;
			}
			if let Some(backup) = &swap.backup {
				if let Err(e) = fs::rename(backup, &swap.target).await {
					tracing::error!(path = ?swap.target, error = %e, "Failed to restore backup");
				}
			}
		}
	}
}

#[async_trait]
impl StorageInterface for FileStorage {
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError> {
		let path = self.get_file_path(key);
		let data = match fs::read(&path).await {
			Ok(data) => data,
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
				return Err(StorageError::NotFound)
			},
			Err(e) => return Err(backend_err(e)),
		};
		FileHeader::decode(data)
	}

	async fn set_bytes(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
		let path = self.get_file_path(key);
		let staged = self.write_staged(&path, &value).await?;
		fs::rename(&staged, &path).await.map_err(backend_err)
	}

	async fn delete(&self, key: &str) -> Result<(), StorageError> {
		let path = self.get_file_path(key);
		match fs::remove_file(&path).await {
			Ok(_) => Ok(()),
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
			Err(e) => Err(backend_err(e)),
		}
	}

	async fn exists(&self, key: &str) -> Result<bool, StorageError> {
		fs::try_exists(self.get_file_path(key))
			.await
			.map_err(backend_err)
	}

	async fn list_ids(&self, namespace: &str) -> Result<Vec<String>, StorageError> {
		let dir = self.base_path.join(sanitize(namespace));
		let mut entries = match fs::read_dir(&dir).await {
			Ok(entries) => entries,
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
			Err(e) => return Err(backend_err(e)),
		};

		let mut ids = Vec::new();
		while let Some(entry) = entries.next_entry().await.map_err(backend_err)? {
			let path = entry.path();
			if path.extension() != Some(std::ffi::OsStr::new("bin")) {
				continue;
			}
			if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
				ids.push(stem.to_string());
			}
		}
		Ok(ids)
	}

	async fn apply_batch(&self, operations: Vec<BatchOperation>) -> Result<(), StorageError> {
		let _guard = self.batch_guard.lock().await;
		let _lock = self.lock().await?;

		// Stage every new value before touching live files.
		let mut swaps = Vec::with_capacity(operations.len());
		for operation in &operations {
			let target = self.get_file_path(operation.key());
			let staged = match operation {
				BatchOperation::Put { value, .. } => match self.write_staged(&target, value).await {
					Ok(staged) => Some(staged),
					Err(e) => {
						Self::restore(&swaps).await;
						return Err(e);
					},
				},
				BatchOperation::Delete { .. } => None,
			};
			swaps.push(Swap {
				target,
				staged,
				backup: None,
				applied: false,
			});
		}

		if let Err(e) = self.swap_in(&mut swaps).await {
			tracing::warn!(error = %e, "File batch failed, restoring previous state");
			Self::restore(&swaps).await;
			return Err(e);
		}

		for backup in swaps.iter().filter_map(|swap| swap.backup.as_ref()) {
			if let Err(e) = fs::remove_file(backup).await {
				tracing::debug!(path = ?backup, error = %e, "Failed to remove backup");
			}
		}
		Ok(())
	}

	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(FileStorageSchema)
	}
}

/// Configuration schema for FileStorage.
pub struct FileStorageSchema;

impl ConfigSchema for FileStorageSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![],
			vec![
				Field::new("storage_path", FieldType::String).with_validator(|value| {
					match value.as_str() {
						Some(path) if path.trim().is_empty() => {
							Err("storage_path cannot be empty".to_string())
						},
						_ => Ok(()),
					}
				}),
			],
		);
		schema.validate(config)
	}
}

/// Factory function to create a file storage backend from configuration.
///
/// Configuration parameters:
/// - `storage_path`: base directory (default: "./data/storage")
pub fn create_storage(config: &toml::Value) -> Result<Box<dyn StorageInterface>, StorageError> {
	FileStorageSchema
		.validate(config)
		.map_err(|e| StorageError::Configuration(e.to_string()))?;

	let storage_path = config
		.get("storage_path")
		.and_then(|v| v.as_str())
		.unwrap_or(DEFAULT_STORAGE_PATH);

	Ok(Box::new(FileStorage::new(PathBuf::from(storage_path))))
}

/// Registry for the file storage implementation.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "file";
	type Factory = StorageFactory;

	fn factory() -> Self::Factory {
		create_storage
	}
}

impl StorageRegistry for Registry {}

#[cfg(test)]
mod tests {
	use super::*;
	use tempfile::TempDir;

	fn storage(dir: &TempDir) -> FileStorage {
		FileStorage::new(dir.path().to_path_buf())
	}

	#[tokio::test]
	async fn test_round_trip_uses_namespace_directories() {
		let dir = TempDir::new().unwrap();
		let storage = storage(&dir);

		storage.set_bytes("orders:abc", b"{}".to_vec()).await.unwrap();

		assert!(dir.path().join("orders").join("abc.bin").exists());
		assert_eq!(storage.get_bytes("orders:abc").await.unwrap(), b"{}".to_vec());
		assert_eq!(storage.list_ids("orders").await.unwrap(), vec!["abc".to_string()]);
		assert!(storage.list_ids("users").await.unwrap().is_empty());
	}

	#[tokio::test]
	async fn test_missing_and_deleted_keys() {
		let dir = TempDir::new().unwrap();
		let storage = storage(&dir);

		assert!(matches!(
			storage.get_bytes("orders:none").await,
			Err(StorageError::NotFound)
		));
		storage.delete("orders:none").await.unwrap();

		storage.set_bytes("orders:x", vec![1]).await.unwrap();
		storage.delete("orders:x").await.unwrap();
		assert!(!storage.exists("orders:x").await.unwrap());
	}

	#[tokio::test]
	async fn test_rejects_foreign_file_format() {
		let dir = TempDir::new().unwrap();
		let storage = storage(&dir);
		std::fs::create_dir_all(dir.path().join("orders")).unwrap();
		std::fs::write(dir.path().join("orders").join("raw.bin"), b"plain").unwrap();

		assert!(matches!(
			storage.get_bytes("orders:raw").await,
			Err(StorageError::Backend(_))
		));
	}

	#[tokio::test]
	async fn test_batch_applies_and_leaves_no_temp_files() {
		let dir = TempDir::new().unwrap();
		let storage = storage(&dir);
		storage.set_bytes("orders:old", vec![0]).await.unwrap();
		storage.set_bytes("orders:keep", vec![9]).await.unwrap();

		storage
			.apply_batch(vec![
				BatchOperation::Put {
					key: "orders:new".into(),
					value: vec![1],
				},
				BatchOperation::Put {
					key: "orders:keep".into(),
					value: vec![2],
				},
				BatchOperation::Delete {
					key: "orders:old".into(),
				},
			])
			.await
			.unwrap();

		assert_eq!(storage.get_bytes("orders:new").await.unwrap(), vec![1]);
		assert_eq!(storage.get_bytes("orders:keep").await.unwrap(), vec![2]);
		assert!(!storage.exists("orders:old").await.unwrap());

		let leftovers: Vec<_> = std::fs::read_dir(dir.path().join("orders"))
			.unwrap()
			.filter_map(|e| e.ok())
			.filter(|e| e.path().extension() != Some(std::ffi::OsStr::new("bin")))
			.collect();
		assert!(leftovers.is_empty());
	}

	#[tokio::test]
	async fn test_failed_batch_restores_previous_state() {
		let dir = TempDir::new().unwrap();
		let storage = storage(&dir);
		storage.set_bytes("orders:a", vec![1]).await.unwrap();

		// A directory where a namespace directory must be created blocks staging.
		std::fs::write(dir.path().join("order_items"), b"not a dir").unwrap();

		let result = storage
			.apply_batch(vec![
				BatchOperation::Put {
					key: "orders:a".into(),
					value: vec![2],
				},
				BatchOperation::Put {
					key: "order_items:i".into(),
					value: vec![3],
				},
			])
			.await;

		assert!(result.is_err());
		assert_eq!(storage.get_bytes("orders:a").await.unwrap(), vec![1]);
		let names: Vec<_> = std::fs::read_dir(dir.path().join("orders"))
			.unwrap()
			.filter_map(|e| e.ok())
			.map(|e| e.file_name())
			.collect();
		assert_eq!(names, vec![std::ffi::OsString::from("a.bin")]);
	}

	#[test]
	fn test_schema_rejects_empty_path() {
		let config: toml::Value = toml::from_str("storage_path = \"  \"").unwrap();
		assert!(create_storage(&config).is_err());
		let config: toml::Value = toml::from_str("storage_path = \"/tmp/x\"").unwrap();
		assert!(create_storage(&config).is_ok());
	}
}
