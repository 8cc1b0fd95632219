//! Menu items of a restaurant.

use super::{require_text, CatalogError, MenuCatalog};
use crate::state::order::queue_menu_item_detach;
use async_trait::async_trait;
use chrono::Utc;
use restaurant_storage::{StorageError, StorageService};
use restaurant_types::{to_money, validate_money, MenuItem, MenuItemUpdate, NewMenuItem, StorageKey};
use rust_decimal::Decimal;
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

fn validate_price(price: &Decimal) -> Result<(), CatalogError> {
	validate_money(price).map_err(|message| CatalogError::Validation(format!("price: {}", message)))
}

pub struct MenuService {
	storage: Arc<StorageService>,
}

impl MenuService {
	pub fn new(storage: Arc<StorageService>) -> Self {
		Self { storage }
	}

	async fn ensure_restaurant(&self, restaurant_id: Uuid) -> Result<(), CatalogError> {
		if self
			.storage
			.exists(StorageKey::Restaurants, &restaurant_id.to_string())
			.await?
		{
			Ok(())
		} else {
			Err(CatalogError::RestaurantNotFound(restaurant_id))
		}
	}

	/// Menu of a restaurant, ordered by name.
	pub async fn list(&self, restaurant_id: Uuid) -> Result<Vec<MenuItem>, CatalogError> {
		self.ensure_restaurant(restaurant_id).await?;
		let mut items: Vec<MenuItem> = self
			.storage
			.list::<MenuItem>(StorageKey::MenuItems)
			.await?
			.into_iter()
			.filter(|item| item.restaurant_id == restaurant_id)
			.collect();
		items.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
		Ok(items)
	}

	/// Fetches an item of the given restaurant.
	pub async fn get(&self, restaurant_id: Uuid, item_id: Uuid) -> Result<MenuItem, CatalogError> {
		let item = self.menu_item(item_id).await?;
		if item.restaurant_id != restaurant_id {
			return Err(CatalogError::MenuItemNotFound(item_id));
		}
		Ok(item)
	}

	pub async fn create(
		&self,
		restaurant_id: Uuid,
		new: NewMenuItem,
	) -> Result<MenuItem, CatalogError> {
		require_text("name", &new.name)?;
		validate_price(&new.price)?;
		self.ensure_restaurant(restaurant_id).await?;

		let item = MenuItem {
			id: Uuid::new_v4(),
			restaurant_id,
			name: new.name,
			description: new.description,
			price: to_money(new.price),
			image_url: new.image_url,
			category: new.category,
			available: new.available,
			created_at: Utc::now(),
		};
		self.storage
			.store(StorageKey::MenuItems, &item.id.to_string(), &item)
			.await?;

		tracing::info!(
			restaurant_id = %restaurant_id,
			menu_item_id = %item.id,
			price = %item.price,
			"Menu item created"
		);
		Ok(item)
	}

	/// Applies the provided fields. Existing order items keep their prices.
	pub async fn update(
		&self,
		restaurant_id: Uuid,
		item_id: Uuid,
		mut update: MenuItemUpdate,
	) -> Result<MenuItem, CatalogError> {
		if let Some(name) = &update.name {
			require_text("name", name)?;
		}
		if let Some(price) = update.price {
			validate_price(&price)?;
			update.price = Some(to_money(price));
		}

		let mut item = self.get(restaurant_id, item_id).await?;
		update.apply(&mut item);
		self.storage
			.update(StorageKey::MenuItems, &item_id.to_string(), &item)
			.await
			.map_err(|e| match e {
				StorageError::NotFound => CatalogError::MenuItemNotFound(item_id),
				other => other.into(),
			})?;

		tracing::info!(menu_item_id = %item_id, "Menu item updated");
		Ok(item)
	}

	/// Deletes an item together with every order item that refers to it.
	pub async fn delete(&self, restaurant_id: Uuid, item_id: Uuid) -> Result<(), CatalogError> {
		self.get(restaurant_id, item_id).await?;

		let mut tx = self.storage.begin();
		let detached =
			queue_menu_item_detach(&self.storage, &mut tx, &HashSet::from([item_id])).await?;
		tx.remove(StorageKey::MenuItems, &item_id.to_string());
		tx.commit().await?;

		tracing::info!(
			menu_item_id = %item_id,
			order_items = detached,
			"Menu item deleted"
		);
		Ok(())
	}
}

#[async_trait]
impl MenuCatalog for MenuService {
	async fn menu_item(&self, id: Uuid) -> Result<MenuItem, CatalogError> {
		match self
			.storage
			.retrieve(StorageKey::MenuItems, &id.to_string())
			.await
		{
			Err(StorageError::NotFound) => Err(CatalogError::MenuItemNotFound(id)),
			other => Ok(other?),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::state::order::tests::{dec, Fixture};
	use crate::state::OrderLifecycle;
	use restaurant_types::{MenuCategory, OrderStatus};

	fn espresso(price: &str) -> NewMenuItem {
		NewMenuItem {
			name: "Espresso".into(),
			description: None,
			price: dec(price),
			image_url: None,
			category: MenuCategory::Drink,
			available: true,
		}
	}

	#[tokio::test]
	async fn test_crud_scoped_to_restaurant() {
		let fx = Fixture::new().await;
		let menu = MenuService::new(fx.storage.clone());

		let created = menu.create(fx.restaurant_id, espresso("2.50")).await.unwrap();
		assert_eq!(menu.list(fx.restaurant_id).await.unwrap().len(), 3);
		assert_eq!(menu.get(fx.restaurant_id, created.id).await.unwrap(), created);
		assert!(matches!(
			menu.get(Uuid::new_v4(), created.id).await,
			Err(CatalogError::MenuItemNotFound(_))
		));
		assert!(matches!(
			menu.list(Uuid::new_v4()).await,
			Err(CatalogError::RestaurantNotFound(_))
		));

		let updated = menu
			.update(fx.restaurant_id, created.id, MenuItemUpdate {
				available: Some(false),
				..Default::default()
			})
			.await
			.unwrap();
		assert!(!updated.available);
		assert_eq!(updated.price, dec("2.50"));
	}

	#[tokio::test]
	async fn test_price_validation() {
		let fx = Fixture::new().await;
		let menu = MenuService::new(fx.storage.clone());

		assert!(matches!(
			menu.create(fx.restaurant_id, espresso("-1")).await,
			Err(CatalogError::Validation(_))
		));
		assert!(matches!(
			menu.update(fx.restaurant_id, fx.item_a, MenuItemUpdate {
				price: Some(dec("1.999")),
				..Default::default()
			})
			.await,
			Err(CatalogError::Validation(_))
		));
		assert!(matches!(
			menu.create(Uuid::new_v4(), espresso("1.00")).await,
			Err(CatalogError::RestaurantNotFound(_))
		));
	}

	#[tokio::test]
	async fn test_delete_detaches_order_items() {
		let fx = Fixture::new().await;
		let lifecycle = fx.lifecycle();
		let menu = MenuService::new(fx.storage.clone());
		let order = lifecycle.create_order(fx.two_item_order()).await.unwrap();

		menu.delete(fx.restaurant_id, fx.item_a).await.unwrap();

		let remaining = lifecycle.get_order(order.id).await.unwrap();
		assert_eq!(remaining.items.len(), 1);
		assert_eq!(remaining.items[0].menu_item_id, fx.item_b);
		assert_eq!(remaining.status, OrderStatus::Pending);
		assert!(remaining.updated_at >= order.updated_at);
		assert!(lifecycle.get_order_item(order.items[0].id).await.is_err());
		assert!(matches!(
			menu.menu_item(fx.item_a).await,
			Err(CatalogError::MenuItemNotFound(_))
		));
	}

	#[tokio::test]
	async fn test_serves_as_catalog_for_order_creation() {
		let fx = Fixture::new().await;
		let menu = Arc::new(MenuService::new(fx.storage.clone()));
		menu.update(fx.restaurant_id, fx.item_b, MenuItemUpdate {
			available: Some(false),
			..Default::default()
		})
		.await
		.unwrap();

		let lifecycle = OrderLifecycle::new(fx.storage.clone()).with_menu_catalog(menu);
		let result = lifecycle.create_order(fx.two_item_order()).await;
		assert!(result.is_err());
		assert_eq!(fx.count(StorageKey::Orders).await, 0);
	}
}
