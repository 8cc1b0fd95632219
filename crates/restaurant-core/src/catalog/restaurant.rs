//! Restaurant records.

use super::{require_text, CatalogError};
use crate::state::order::{queue_menu_item_detach, queue_order_removal, restaurant_orders};
use chrono::Utc;
use restaurant_storage::{StorageError, StorageService};
use restaurant_types::{MenuItem, NewRestaurant, Restaurant, RestaurantUpdate, StorageKey};
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

fn validate_new(restaurant: &NewRestaurant) -> Result<(), CatalogError> {
	require_text("name", &restaurant.name)?;
	require_text("address", &restaurant.address)?;
	require_text("city", &restaurant.city)?;
	require_text("state", &restaurant.state)?;
	require_text("zip_code", &restaurant.zip_code)
}

fn validate_update(update: &RestaurantUpdate) -> Result<(), CatalogError> {
	for (field, value) in [
		("name", &update.name),
		("address", &update.address),
		("city", &update.city),
		("state", &update.state),
		("zip_code", &update.zip_code),
	] {
		if let Some(value) = value {
			require_text(field, value)?;
		}
	}
	Ok(())
}

pub struct RestaurantService {
	storage: Arc<StorageService>,
}

impl RestaurantService {
	pub fn new(storage: Arc<StorageService>) -> Self {
		Self { storage }
	}

	/// All restaurants, oldest first.
	pub async fn list(&self) -> Result<Vec<Restaurant>, CatalogError> {
		let mut restaurants: Vec<Restaurant> = self.storage.list(StorageKey::Restaurants).await?;
		restaurants.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
		Ok(restaurants)
	}

	pub async fn get(&self, id: Uuid) -> Result<Restaurant, CatalogError> {
		match self
			.storage
			.retrieve(StorageKey::Restaurants, &id.to_string())
			.await
		{
			Err(StorageError::NotFound) => Err(CatalogError::RestaurantNotFound(id)),
			other => Ok(other?),
		}
	}

	pub async fn create(&self, new: NewRestaurant) -> Result<Restaurant, CatalogError> {
		validate_new(&new)?;

		let restaurant = Restaurant {
			id: Uuid::new_v4(),
			name: new.name,
			phone: new.phone,
			address: new.address,
			city: new.city,
			state: new.state,
			zip_code: new.zip_code,
			description: new.description,
			created_at: Utc::now(),
		};
		self.storage
			.store(
				StorageKey::Restaurants,
				&restaurant.id.to_string(),
				&restaurant,
			)
			.await?;

		tracing::info!(restaurant_id = %restaurant.id, name = %restaurant.name, "Restaurant created");
		Ok(restaurant)
	}

	pub async fn update(
		&self,
		id: Uuid,
		update: RestaurantUpdate,
	) -> Result<Restaurant, CatalogError> {
		validate_update(&update)?;
		let mut restaurant = self.get(id).await?;
		update.apply(&mut restaurant);

		self.storage
			.update(StorageKey::Restaurants, &id.to_string(), &restaurant)
			.await
			.map_err(|e| match e {
				StorageError::NotFound => CatalogError::RestaurantNotFound(id),
				other => other.into(),
			})?;

		tracing::info!(restaurant_id = %id, "Restaurant updated");
		Ok(restaurant)
	}

	/// Deletes a restaurant with its menu, its orders and their items.
	///
	/// Order items elsewhere that refer to this menu are removed as well.
	pub async fn delete(&self, id: Uuid) -> Result<(), CatalogError> {
		self.get(id).await?;

		let menu: Vec<MenuItem> = self.storage.list(StorageKey::MenuItems).await?;
		let menu_ids: HashSet<Uuid> = menu
			.iter()
			.filter(|item| item.restaurant_id == id)
			.map(|item| item.id)
			.collect();
		let orders = restaurant_orders(&self.storage, id).await?;

		let mut tx = self.storage.begin();
		// Detach first so that removing whole orders below takes precedence.
		queue_menu_item_detach(&self.storage, &mut tx, &menu_ids).await?;
		for order in &orders {
			queue_order_removal(&mut tx, order);
		}
		for menu_id in &menu_ids {
			tx.remove(StorageKey::MenuItems, &menu_id.to_string());
		}
		tx.remove(StorageKey::Restaurants, &id.to_string());
		tx.commit().await?;

		tracing::info!(
			restaurant_id = %id,
			menu_items = menu_ids.len(),
			orders = orders.len(),
			"Restaurant deleted"
		);
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::state::order::tests::{line, menu_item, Fixture};
	use restaurant_types::NewOrder;

	fn new_restaurant(name: &str) -> NewRestaurant {
		NewRestaurant {
			name: name.into(),
			phone: Some("555-0100".into()),
			address: "1 Main St".into(),
			city: "Springfield".into(),
			state: "IL".into(),
			zip_code: "62701".into(),
			description: None,
		}
	}

	#[tokio::test]
	async fn test_crud() {
		let fx = Fixture::new().await;
		let service = RestaurantService::new(fx.storage.clone());

		let created = service.create(new_restaurant("Noodle Bar")).await.unwrap();
		assert_eq!(service.get(created.id).await.unwrap(), created);
		assert_eq!(service.list().await.unwrap().len(), 2);

		let updated = service
			.update(created.id, RestaurantUpdate {
				description: Some("Hand-pulled noodles".into()),
				..Default::default()
			})
			.await
			.unwrap();
		assert_eq!(updated.name, "Noodle Bar");
		assert_eq!(updated.description.as_deref(), Some("Hand-pulled noodles"));

		assert!(matches!(
			service.get(Uuid::new_v4()).await,
			Err(CatalogError::RestaurantNotFound(_))
		));
	}

	#[tokio::test]
	async fn test_blank_fields_rejected() {
		let fx = Fixture::new().await;
		let service = RestaurantService::new(fx.storage.clone());

		assert!(matches!(
			service.create(new_restaurant("  ")).await,
			Err(CatalogError::Validation(_))
		));
		assert!(matches!(
			service
				.update(fx.restaurant_id, RestaurantUpdate {
					city: Some(String::new()),
					..Default::default()
				})
				.await,
			Err(CatalogError::Validation(_))
		));
	}

	#[tokio::test]
	async fn test_delete_cascades_to_menu_and_orders() {
		let fx = Fixture::new().await;
		let lifecycle = fx.lifecycle();
		let service = RestaurantService::new(fx.storage.clone());

		// A second restaurant whose order also refers to item_a.
		let other = service.create(new_restaurant("Other")).await.unwrap();
		let other_item = Uuid::new_v4();
		fx.storage
			.store(
				StorageKey::MenuItems,
				&other_item.to_string(),
				&menu_item(other_item, other.id, "2.00"),
			)
			.await
			.unwrap();
		let mixed = lifecycle
			.create_order(NewOrder {
				restaurant_id: other.id,
				user_id: None,
				name: None,
				items: vec![line(other_item, 1, "2.00"), line(fx.item_a, 1, "5.00")],
			})
			.await
			.unwrap();
		let doomed = lifecycle.create_order(fx.two_item_order()).await.unwrap();

		service.delete(fx.restaurant_id).await.unwrap();

		assert!(service.get(fx.restaurant_id).await.is_err());
		assert!(lifecycle.get_order(doomed.id).await.is_err());
		assert_eq!(fx.count(StorageKey::MenuItems).await, 1);

		let survivor = lifecycle.get_order(mixed.id).await.unwrap();
		assert_eq!(survivor.items.len(), 1);
		assert_eq!(survivor.items[0].menu_item_id, other_item);
		assert_eq!(fx.count(StorageKey::OrderItems).await, 1);
	}

	#[tokio::test]
	async fn test_delete_missing() {
		let fx = Fixture::new().await;
		let service = RestaurantService::new(fx.storage.clone());
		assert!(matches!(
			service.delete(Uuid::new_v4()).await,
			Err(CatalogError::RestaurantNotFound(_))
		));
	}
}
