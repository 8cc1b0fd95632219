//! Registry trait for named, configurable implementations.

/// Ties an implementation to the name used for it in configuration files
/// and to the factory that builds it.
///
/// For example the in-memory storage backend registers as `"memory"`, which
/// matches `[storage.implementations.memory]`.
pub trait ImplementationRegistry {
	/// Configuration name of the implementation.
	const NAME: &'static str;

	/// Factory signature for this family of implementations.
	type Factory;

	/// Returns the factory that creates the implementation from its TOML table.
	fn factory() -> Self::Factory;
}
