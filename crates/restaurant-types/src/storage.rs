//! Storage-related types for the restaurant backend.

use std::str::FromStr;

/// Storage namespaces, one per record type.
///
/// Replaces string literals in storage calls with typed variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKey {
	/// Restaurant records.
	Restaurants,
	/// Menu items, keyed by menu item id.
	MenuItems,
	/// User accounts.
	Users,
	/// Order rows without their line items.
	Orders,
	/// Order line items, keyed by item id.
	OrderItems,
}

impl StorageKey {
	/// Returns the string representation of the storage key.
	pub fn as_str(&self) -> &'static str {
		match self {
			StorageKey::Restaurants => "restaurants",
			StorageKey::MenuItems => "menu_items",
			StorageKey::Users => "users",
			StorageKey::Orders => "orders",
			StorageKey::OrderItems => "order_items",
		}
	}

	/// Returns an iterator over all StorageKey variants.
	pub fn all() -> impl Iterator<Item = Self> {
		[
			Self::Restaurants,
			Self::MenuItems,
			Self::Users,
			Self::Orders,
			Self::OrderItems,
		]
		.into_iter()
	}
}

impl FromStr for StorageKey {
	type Err = ();

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::all().find(|key| key.as_str() == s).ok_or(())
	}
}

impl From<StorageKey> for &'static str {
	fn from(key: StorageKey) -> Self {
		key.as_str()
	}
}
