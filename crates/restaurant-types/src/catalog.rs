//! Restaurant and menu catalog records.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// A restaurant accepting orders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Restaurant {
	pub id: Uuid,
	pub name: String,
	#[serde(default)]
	pub phone: Option<String>,
	pub address: String,
	pub city: String,
	pub state: String,
	pub zip_code: String,
	#[serde(default)]
	pub description: Option<String>,
	pub created_at: DateTime<Utc>,
}

/// Request payload for creating a restaurant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRestaurant {
	pub name: String,
	#[serde(default)]
	pub phone: Option<String>,
	pub address: String,
	pub city: String,
	pub state: String,
	pub zip_code: String,
	#[serde(default)]
	pub description: Option<String>,
}

/// Partial update of a restaurant.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RestaurantUpdate {
	#[serde(default)]
	pub name: Option<String>,
	#[serde(default)]
	pub phone: Option<String>,
	#[serde(default)]
	pub address: Option<String>,
	#[serde(default)]
	pub city: Option<String>,
	#[serde(default)]
	pub state: Option<String>,
	#[serde(default)]
	pub zip_code: Option<String>,
	#[serde(default)]
	pub description: Option<String>,
}

impl RestaurantUpdate {
	/// Applies every provided field to `restaurant`.
	pub fn apply(self, restaurant: &mut Restaurant) {
		if let Some(name) = self.name {
			restaurant.name = name;
		}
		if let Some(phone) = self.phone {
			restaurant.phone = Some(phone);
		}
		if let Some(address) = self.address {
			restaurant.address = address;
		}
		if let Some(city) = self.city {
			restaurant.city = city;
		}
		if let Some(state) = self.state {
			restaurant.state = state;
		}
		if let Some(zip_code) = self.zip_code {
			restaurant.zip_code = zip_code;
		}
		if let Some(description) = self.description {
			restaurant.description = Some(description);
		}
	}
}

/// Menu section a dish belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MenuCategory {
	Food,
	Drink,
	Other,
}

impl fmt::Display for MenuCategory {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			MenuCategory::Food => write!(f, "food"),
			MenuCategory::Drink => write!(f, "drink"),
			MenuCategory::Other => write!(f, "other"),
		}
	}
}

/// A dish or drink offered by a restaurant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuItem {
	pub id: Uuid,
	pub restaurant_id: Uuid,
	pub name: String,
	#[serde(default)]
	pub description: Option<String>,
	/// Current price. Existing order items keep their own snapshot.
	pub price: Decimal,
	#[serde(default)]
	pub image_url: Option<String>,
	pub category: MenuCategory,
	pub available: bool,
	pub created_at: DateTime<Utc>,
}

fn default_available() -> bool {
	true
}

/// Request payload for adding a menu item to a restaurant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMenuItem {
	pub name: String,
	#[serde(default)]
	pub description: Option<String>,
	pub price: Decimal,
	#[serde(default)]
	pub image_url: Option<String>,
	pub category: MenuCategory,
	#[serde(default = "default_available")]
	pub available: bool,
}

/// Partial update of a menu item.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MenuItemUpdate {
	#[serde(default)]
	pub name: Option<String>,
	#[serde(default)]
	pub description: Option<String>,
	#[serde(default)]
	pub price: Option<Decimal>,
	#[serde(default)]
	pub image_url: Option<String>,
	#[serde(default)]
	pub category: Option<MenuCategory>,
	#[serde(default)]
	pub available: Option<bool>,
}

impl MenuItemUpdate {
	/// Applies every provided field to `item`.
	pub fn apply(self, item: &mut MenuItem) {
		if let Some(name) = self.name {
			item.name = name;
		}
		if let Some(description) = self.description {
			item.description = Some(description);
		}
		if let Some(price) = self.price {
			item.price = price;
		}
		if let Some(image_url) = self.image_url {
			item.image_url = Some(image_url);
		}
		if let Some(category) = self.category {
			item.category = category;
		}
		if let Some(available) = self.available {
			item.available = available;
		}
	}
}
