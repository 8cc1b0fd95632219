//! Order lifecycle management.
//!
//! Creates an order together with its line items as one atomic unit and moves
//! it along the fixed sequence pending -> preparing -> ready -> completed.
//! Cancellation is available from any status. Every mutation refreshes
//! `updated_at`.

use crate::catalog::{CatalogError, MenuCatalog};
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use restaurant_storage::{StorageError, StorageService, Transaction};
use restaurant_types::{
	to_money, validate_money, NewOrder, NewOrderItem, Order, OrderFilter, OrderItem, OrderStatus,
	OrderUpdate, StorageKey,
};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// Errors that can occur while managing orders.
#[derive(Debug, Error)]
pub enum OrderError {
	#[error("{entity} not found: {id}")]
	NotFound { entity: &'static str, id: Uuid },
	#[error("Cannot advance order with status {from}")]
	InvalidTransition { from: OrderStatus },
	#[error("Validation error: {0}")]
	Validation(String),
	#[error("Persistence error: {0}")]
	Persistence(String),
}

impl From<StorageError> for OrderError {
	fn from(err: StorageError) -> Self {
		OrderError::Persistence(err.to_string())
	}
}

/// Order row as persisted. Line items are stored in their own namespace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct OrderRecord {
	pub id: Uuid,
	pub restaurant_id: Uuid,
	pub user_id: Option<Uuid>,
	pub name: Option<String>,
	pub status: OrderStatus,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
	pub item_ids: Vec<Uuid>,
}

impl OrderRecord {
	fn into_order(self, items: Vec<OrderItem>) -> Order {
		Order {
			id: self.id,
			restaurant_id: self.restaurant_id,
			user_id: self.user_id,
			name: self.name,
			status: self.status,
			created_at: self.created_at,
			updated_at: self.updated_at,
			items,
		}
	}
}

// Forward-only sequence; terminal statuses have no entry.
static SUCCESSORS: Lazy<HashMap<OrderStatus, OrderStatus>> = Lazy::new(|| {
	HashMap::from([
		(OrderStatus::Pending, OrderStatus::Preparing),
		(OrderStatus::Preparing, OrderStatus::Ready),
		(OrderStatus::Ready, OrderStatus::Completed),
	])
});

/// Returns the status that follows `status`, if any.
pub fn next_status(status: OrderStatus) -> Option<OrderStatus> {
	SUCCESSORS.get(&status).copied()
}

fn not_found(id: Uuid) -> OrderError {
	OrderError::NotFound { entity: "Order", id }
}

fn validated_quantity(index: usize, item: &NewOrderItem) -> Result<u32, OrderError> {
	if item.quantity < 1 {
		return Err(OrderError::Validation(format!(
			"order_items[{}].quantity must be at least 1, got {}",
			index, item.quantity
		)));
	}
	u32::try_from(item.quantity).map_err(|_| {
		OrderError::Validation(format!(
			"order_items[{}].quantity {} is too large",
			index, item.quantity
		))
	})
}

fn validate_new_order(new_order: &NewOrder) -> Result<Vec<u32>, OrderError> {
	if new_order.items.is_empty() {
		return Err(OrderError::Validation(
			"An order needs at least one item".into(),
		));
	}
	new_order
		.items
		.iter()
		.enumerate()
		.map(|(index, item)| {
			validate_money(&item.price).map_err(|message| {
				OrderError::Validation(format!("order_items[{}].price: {}", index, message))
			})?;
			validated_quantity(index, item)
		})
		.collect()
}

/// Manages order creation, status transitions and deletion.
pub struct OrderLifecycle {
	storage: Arc<StorageService>,
	/// Consulted on creation when set.
	catalog: Option<Arc<dyn MenuCatalog>>,
}

impl OrderLifecycle {
	pub fn new(storage: Arc<StorageService>) -> Self {
		Self {
			storage,
			catalog: None,
		}
	}

	/// Checks ordered items against the menu on creation.
	pub fn with_menu_catalog(mut self, catalog: Arc<dyn MenuCatalog>) -> Self {
		self.catalog = Some(catalog);
		self
	}

	/// Creates an order and all of its items in one transaction.
	///
	/// Prices are taken from the request as the snapshot for each line. All
	/// input is validated before anything is written.
	pub async fn create_order(&self, new_order: NewOrder) -> Result<Order, OrderError> {
		let quantities = validate_new_order(&new_order)?;
		self.check_references(&new_order).await?;

		let now = Utc::now();
		let order_id = Uuid::new_v4();
		let items: Vec<OrderItem> = new_order
			.items
			.iter()
			.zip(quantities)
			.map(|(item, quantity)| OrderItem {
				id: Uuid::new_v4(),
				order_id,
				menu_item_id: item.menu_item_id,
				quantity,
				price: to_money(item.price),
				created_at: now,
			})
			.collect();

		let record = OrderRecord {
			id: order_id,
			restaurant_id: new_order.restaurant_id,
			user_id: new_order.user_id,
			name: new_order.name,
			status: OrderStatus::default(),
			created_at: now,
			updated_at: now,
			item_ids: items.iter().map(|item| item.id).collect(),
		};

		let mut tx = self.storage.begin();
		for item in &items {
			tx.store(StorageKey::OrderItems, &item.id.to_string(), item)?;
		}
		tx.store(StorageKey::Orders, &order_id.to_string(), &record)?;
		tx.commit().await.map_err(|e| {
			tracing::warn!(order_id = %order_id, error = %e, "Failed to persist new order");
			OrderError::from(e)
		})?;

		tracing::info!(
			order_id = %order_id,
			restaurant_id = %record.restaurant_id,
			items = items.len(),
			"Order created"
		);
		Ok(record.into_order(items))
	}

	/// Moves an order one step forward in the status sequence.
	pub async fn advance_order(&self, order_id: Uuid) -> Result<Order, OrderError> {
		let order = self
			.update_order_with(order_id, |record| {
				let next = next_status(record.status).ok_or(OrderError::InvalidTransition {
					from: record.status,
				})?;
				record.status = next;
				Ok(())
			})
			.await?;

		tracing::info!(order_id = %order_id, status = %order.status, "Order advanced");
		Ok(order)
	}

	/// Sets the order to `cancelled` regardless of its current status.
	///
	/// Cancelling a cancelled order changes nothing and returns it as is.
	pub async fn cancel_order(&self, order_id: Uuid) -> Result<Order, OrderError> {
		let mut record = self.load_record(order_id).await?;
		if record.status == OrderStatus::Cancelled {
			tracing::debug!(order_id = %order_id, "Order already cancelled");
			return self.materialize(record).await;
		}

		let previous = record.status;
		record.status = OrderStatus::Cancelled;
		let order = self.save(record).await?;
		tracing::info!(order_id = %order_id, previous = %previous, "Order cancelled");
		Ok(order)
	}

	/// Applies the provided fields of `update`.
	///
	/// A status given here is written as is, without the transition rules of
	/// [`advance_order`](Self::advance_order).
	pub async fn update_order(
		&self,
		order_id: Uuid,
		update: OrderUpdate,
	) -> Result<Order, OrderError> {
		if update.is_empty() {
			return self.get_order(order_id).await;
		}
		if let Some(Some(user_id)) = update.user_id {
			self.ensure_exists(StorageKey::Users, "User", user_id)
				.await?;
		}

		let order = self
			.update_order_with(order_id, |record| {
				if let Some(name) = update.name {
					record.name = name;
				}
				if let Some(status) = update.status {
					if status != record.status {
						tracing::info!(
							order_id = %order_id,
							from = %record.status,
							to = %status,
							"Order status overwritten by direct update"
						);
					}
					record.status = status;
				}
				if let Some(user_id) = update.user_id {
					record.user_id = user_id;
				}
				Ok(())
			})
			.await?;

		tracing::info!(order_id = %order_id, "Order updated");
		Ok(order)
	}

	/// Deletes an order together with all of its items.
	pub async fn delete_order(&self, order_id: Uuid) -> Result<(), OrderError> {
		let record = self.load_record(order_id).await?;

		let mut tx = self.storage.begin();
		queue_order_removal(&mut tx, &record);
		tx.commit().await?;

		tracing::info!(order_id = %order_id, items = record.item_ids.len(), "Order deleted");
		Ok(())
	}

	pub async fn get_order(&self, order_id: Uuid) -> Result<Order, OrderError> {
		let record = self.load_record(order_id).await?;
		self.materialize(record).await
	}

	pub async fn get_order_item(&self, item_id: Uuid) -> Result<OrderItem, OrderError> {
		match self
			.storage
			.retrieve(StorageKey::OrderItems, &item_id.to_string())
			.await
		{
			Err(StorageError::NotFound) => Err(OrderError::NotFound {
				entity: "Order item",
				id: item_id,
			}),
			other => Ok(other?),
		}
	}

	/// Lists orders matching `filter`, oldest first.
	pub async fn list_orders(&self, filter: &OrderFilter) -> Result<Vec<Order>, OrderError> {
		let mut records: Vec<OrderRecord> = self.storage.list(StorageKey::Orders).await?;
		records.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));

		let mut orders = Vec::with_capacity(records.len());
		for record in records {
			let order = self.materialize(record).await?;
			if filter.matches(&order) {
				orders.push(order);
			}
		}
		tracing::debug!(count = orders.len(), "Listed orders");
		Ok(orders)
	}

	/// Loads an order, applies `updater` and persists the result.
	async fn update_order_with<F>(&self, order_id: Uuid, updater: F) -> Result<Order, OrderError>
	where
		F: FnOnce(&mut OrderRecord) -> Result<(), OrderError>,
	{
		let mut record = self.load_record(order_id).await?;
		updater(&mut record)?;
		self.save(record).await
	}

	async fn save(&self, mut record: OrderRecord) -> Result<Order, OrderError> {
		record.updated_at = Utc::now();
		match self
			.storage
			.update(StorageKey::Orders, &record.id.to_string(), &record)
			.await
		{
			Err(StorageError::NotFound) => return Err(not_found(record.id)),
			other => other?,
		}
		self.materialize(record).await
	}

	async fn load_record(&self, order_id: Uuid) -> Result<OrderRecord, OrderError> {
		match self
			.storage
			.retrieve(StorageKey::Orders, &order_id.to_string())
			.await
		{
			Err(StorageError::NotFound) => Err(not_found(order_id)),
			other => Ok(other?),
		}
	}

	async fn materialize(&self, record: OrderRecord) -> Result<Order, OrderError> {
		let mut items = Vec::with_capacity(record.item_ids.len());
		for item_id in &record.item_ids {
			match self
				.storage
				.retrieve::<OrderItem>(StorageKey::OrderItems, &item_id.to_string())
				.await
			{
				Ok(item) => items.push(item),
				Err(StorageError::NotFound) => {
					tracing::warn!(order_id = %record.id, item_id = %item_id, "Order item missing");
				},
				Err(e) => return Err(e.into()),
			}
		}
		Ok(record.into_order(items))
	}

	async fn ensure_exists(
		&self,
		namespace: StorageKey,
		entity: &str,
		id: Uuid,
	) -> Result<(), OrderError> {
		if self.storage.exists(namespace, &id.to_string()).await? {
			Ok(())
		} else {
			Err(OrderError::Validation(format!("{} {} does not exist", entity, id)))
		}
	}

	/// Referenced restaurant, user and menu items must exist. With a menu
	/// catalog, items must also belong to the restaurant and be available.
	async fn check_references(&self, new_order: &NewOrder) -> Result<(), OrderError> {
		self.ensure_exists(StorageKey::Restaurants, "Restaurant", new_order.restaurant_id)
			.await?;
		if let Some(user_id) = new_order.user_id {
			self.ensure_exists(StorageKey::Users, "User", user_id)
				.await?;
		}

		let Some(catalog) = &self.catalog else {
			for item in &new_order.items {
				self.ensure_exists(StorageKey::MenuItems, "Menu item", item.menu_item_id)
					.await?;
			}
			return Ok(());
		};

		for item in &new_order.items {
			let menu_item = catalog
				.menu_item(item.menu_item_id)
				.await
				.map_err(|e| match e {
					CatalogError::MenuItemNotFound(id) => {
						OrderError::Validation(format!("Menu item {} does not exist", id))
					},
					other => OrderError::Persistence(other.to_string()),
				})?;
			if menu_item.restaurant_id != new_order.restaurant_id {
				return Err(OrderError::Validation(format!(
					"Menu item {} is not offered by restaurant {}",
					menu_item.id, new_order.restaurant_id
				)));
			}
			if !menu_item.available {
				return Err(OrderError::Validation(format!(
					"Menu item {} is not available",
					menu_item.id
				)));
			}
		}
		Ok(())
	}
}

/// Queues removal of an order and all of its items.
pub(crate) fn queue_order_removal(tx: &mut Transaction<'_>, record: &OrderRecord) {
	for item_id in &record.item_ids {
		tx.remove(StorageKey::OrderItems, &item_id.to_string());
	}
	tx.remove(StorageKey::Orders, &record.id.to_string());
}

/// Queues removal of every order item that refers to one of `menu_item_ids`
/// and detaches those items from their orders. Returns the number of items.
pub(crate) async fn queue_menu_item_detach(
	storage: &StorageService,
	tx: &mut Transaction<'_>,
	menu_item_ids: &HashSet<Uuid>,
) -> Result<usize, StorageError> {
	let items: Vec<OrderItem> = storage.list(StorageKey::OrderItems).await?;

	let mut by_order: HashMap<Uuid, HashSet<Uuid>> = HashMap::new();
	for item in items
		.iter()
		.filter(|item| menu_item_ids.contains(&item.menu_item_id))
	{
		by_order.entry(item.order_id).or_default().insert(item.id);
		tx.remove(StorageKey::OrderItems, &item.id.to_string());
	}

	let now = Utc::now();
	let mut removed = 0;
	for (order_id, detached) in by_order {
		removed += detached.len();
		let mut record: OrderRecord =
			match storage.retrieve(StorageKey::Orders, &order_id.to_string()).await {
				Ok(record) => record,
				Err(StorageError::NotFound) => continue,
				Err(e) => return Err(e),
			};
		record.item_ids.retain(|id| !detached.contains(id));
		record.updated_at = now;
		tx.store(StorageKey::Orders, &order_id.to_string(), &record)?;
	}
	Ok(removed)
}

/// Queues clearing the user reference on every order of `user_id`.
pub(crate) async fn queue_user_detach(
	storage: &StorageService,
	tx: &mut Transaction<'_>,
	user_id: Uuid,
) -> Result<usize, StorageError> {
	let records: Vec<OrderRecord> = storage.list(StorageKey::Orders).await?;
	let now = Utc::now();
	let mut detached = 0;
	for mut record in records
		.into_iter()
		.filter(|record| record.user_id == Some(user_id))
	{
		record.user_id = None;
		record.updated_at = now;
		tx.store(StorageKey::Orders, &record.id.to_string(), &record)?;
		detached += 1;
	}
	Ok(detached)
}

/// Loads the stored rows of every order placed at `restaurant_id`.
pub(crate) async fn restaurant_orders(
	storage: &StorageService,
	restaurant_id: Uuid,
) -> Result<Vec<OrderRecord>, StorageError> {
	let records: Vec<OrderRecord> = storage.list(StorageKey::Orders).await?;
	Ok(records
		.into_iter()
		.filter(|record| record.restaurant_id == restaurant_id)
		.collect())
}
