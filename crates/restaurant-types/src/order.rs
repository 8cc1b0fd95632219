//! Order processing types for the restaurant backend.
//!
//! An order belongs to a restaurant, optionally to a user, and owns one or
//! more line items. Each line item snapshots the unit price it was ordered at,
//! so later menu price changes never alter an existing order.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Status of an order in the kitchen.
///
/// Orders move forward one step at a time through
/// `pending -> preparing -> ready -> completed`. `cancelled` can be reached
/// from anywhere. `completed` and `cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
	/// Order has been placed and awaits the kitchen.
	#[default]
	Pending,
	/// Kitchen is preparing the order.
	Preparing,
	/// Order is ready for pickup or delivery.
	Ready,
	/// Order has been handed over.
	Completed,
	/// Order was cancelled.
	Cancelled,
}

impl OrderStatus {
	/// Returns the wire representation of the status.
	pub fn as_str(&self) -> &'static str {
		match self {
			OrderStatus::Pending => "pending",
			OrderStatus::Preparing => "preparing",
			OrderStatus::Ready => "ready",
			OrderStatus::Completed => "completed",
			OrderStatus::Cancelled => "cancelled",
		}
	}

	/// Returns true when no further transition is permitted.
	pub fn is_terminal(&self) -> bool {
		matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
	}

	/// Returns an iterator over all statuses in lifecycle order.
	pub fn all() -> impl Iterator<Item = Self> {
		[
			Self::Pending,
			Self::Preparing,
			Self::Ready,
			Self::Completed,
			Self::Cancelled,
		]
		.into_iter()
	}
}

impl fmt::Display for OrderStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Error returned when parsing an unknown status string.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown order status: {0}")]
pub struct ParseOrderStatusError(pub String);

impl FromStr for OrderStatus {
	type Err = ParseOrderStatusError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::all()
			.find(|status| status.as_str() == s)
			.ok_or_else(|| ParseOrderStatusError(s.to_string()))
	}
}

/// A fully materialized order together with its line items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
	/// Unique identifier for this order.
	pub id: Uuid,
	/// Restaurant the order was placed at. Immutable after creation.
	pub restaurant_id: Uuid,
	/// Owning user, cleared when the user is removed.
	pub user_id: Option<Uuid>,
	/// Optional display name, e.g. the name called out at the counter.
	pub name: Option<String>,
	/// Current status of the order.
	pub status: OrderStatus,
	/// Timestamp when this order was created.
	pub created_at: DateTime<Utc>,
	/// Timestamp when this order was last modified.
	pub updated_at: DateTime<Utc>,
	/// Line items, in the order they were submitted.
	#[serde(rename = "order_items")]
	pub items: Vec<OrderItem>,
}

impl Order {
	/// Sum of `quantity * price` over all line items.
	pub fn total(&self) -> Decimal {
		self.items.iter().map(OrderItem::subtotal).sum()
	}
}

/// A priced, quantified line within an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
	/// Unique identifier for this line item.
	pub id: Uuid,
	/// Parent order.
	pub order_id: Uuid,
	/// Menu item this line refers to.
	pub menu_item_id: Uuid,
	/// Number of units, always at least one.
	pub quantity: u32,
	/// Unit price captured when the order was created.
	pub price: Decimal,
	/// Timestamp when this line item was created.
	pub created_at: DateTime<Utc>,
}

impl OrderItem {
	/// Returns `quantity * price`.
	pub fn subtotal(&self) -> Decimal {
		self.price * Decimal::from(self.quantity)
	}
}

/// Request payload for creating an order with its items.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrder {
	pub restaurant_id: Uuid,
	#[serde(default)]
	pub user_id: Option<Uuid>,
	#[serde(default)]
	pub name: Option<String>,
	#[serde(rename = "order_items", alias = "items", default)]
	pub items: Vec<NewOrderItem>,
}

/// One requested line of a new order.
///
/// The quantity is signed so that negative input reaches validation and is
/// reported as such instead of failing deserialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrderItem {
	pub menu_item_id: Uuid,
	pub quantity: i64,
	pub price: Decimal,
}

/// Partial update of an order.
///
/// The outer `Option` tells whether a field was sent at all. An explicit
/// `null` arrives as `Some(None)` and clears the field. The restaurant
/// reference is absent since it cannot change.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderUpdate {
	#[serde(
		default,
		deserialize_with = "present",
		skip_serializing_if = "Option::is_none"
	)]
	pub name: Option<Option<String>>,
	#[serde(default)]
	pub status: Option<OrderStatus>,
	#[serde(
		default,
		deserialize_with = "present",
		skip_serializing_if = "Option::is_none"
	)]
	pub user_id: Option<Option<Uuid>>,
}

/// Marks a field that appeared in the payload, even as `null`.
fn present<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
	T: Deserialize<'de>,
	D: Deserializer<'de>,
{
	Option::<T>::deserialize(deserializer).map(Some)
}

impl OrderUpdate {
	/// Returns true when the update would not change anything.
	pub fn is_empty(&self) -> bool {
		self.name.is_none() && self.status.is_none() && self.user_id.is_none()
	}
}

/// Optional filters for listing orders.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderFilter {
	#[serde(default)]
	pub restaurant_id: Option<Uuid>,
	#[serde(default)]
	pub user_id: Option<Uuid>,
	#[serde(default)]
	pub status: Option<OrderStatus>,
}

impl OrderFilter {
	/// Returns true if `order` satisfies every filter that is set.
	pub fn matches(&self, order: &Order) -> bool {
		self.restaurant_id.is_none_or(|id| order.restaurant_id == id)
			&& self.user_id.is_none_or(|id| order.user_id == Some(id))
			&& self.status.is_none_or(|status| order.status == status)
	}
}
