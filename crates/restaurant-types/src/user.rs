//! User accounts and roles.

use crate::SecretString;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Role of an authenticated caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
	/// Full access to every resource.
	Admin,
	/// Staff member who manages menus and moves orders through the kitchen.
	RestaurantWorker,
	/// Guest who places and follows their own orders.
	#[default]
	Customer,
}

impl Role {
	pub fn as_str(&self) -> &'static str {
		match self {
			Role::Admin => "admin",
			Role::RestaurantWorker => "restaurant_worker",
			Role::Customer => "customer",
		}
	}
}

impl fmt::Display for Role {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for Role {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"admin" => Ok(Role::Admin),
			"restaurant_worker" => Ok(Role::RestaurantWorker),
			"customer" => Ok(Role::Customer),
			other => Err(format!("Unknown role: {}", other)),
		}
	}
}

/// Stored user record, including the password hash.
///
/// Never return this type from an endpoint; convert it to [`UserProfile`].
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
	pub id: Uuid,
	pub name: String,
	pub email: String,
	/// PHC-formatted password hash.
	pub password_hash: String,
	pub role: Role,
	/// Deactivated users cannot log in.
	pub active: bool,
	#[serde(default)]
	pub address: Option<String>,
	#[serde(default)]
	pub city: Option<String>,
	#[serde(default)]
	pub state: Option<String>,
	#[serde(default)]
	pub zip_code: Option<String>,
	pub created_at: DateTime<Utc>,
}

impl fmt::Debug for User {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("User")
			.field("id", &self.id)
			.field("email", &self.email)
			.field("role", &self.role)
			.field("active", &self.active)
			.finish_non_exhaustive()
	}
}

/// Public view of a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
	pub id: Uuid,
	pub name: String,
	pub email: String,
	pub role: Role,
	pub active: bool,
	pub address: Option<String>,
	pub city: Option<String>,
	pub state: Option<String>,
	pub zip_code: Option<String>,
	pub created_at: DateTime<Utc>,
}

impl From<&User> for UserProfile {
	fn from(user: &User) -> Self {
		Self {
			id: user.id,
			name: user.name.clone(),
			email: user.email.clone(),
			role: user.role,
			active: user.active,
			address: user.address.clone(),
			city: user.city.clone(),
			state: user.state.clone(),
			zip_code: user.zip_code.clone(),
			created_at: user.created_at,
		}
	}
}

fn default_active() -> bool {
	true
}

/// Request payload for creating a user.
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
	pub name: String,
	pub email: String,
	pub password: SecretString,
	#[serde(default, alias = "user_type")]
	pub role: Role,
	#[serde(default = "default_active")]
	pub active: bool,
	#[serde(default)]
	pub address: Option<String>,
	#[serde(default)]
	pub city: Option<String>,
	#[serde(default)]
	pub state: Option<String>,
	#[serde(default)]
	pub zip_code: Option<String>,
}

/// Partial update of a user. The password has its own endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserUpdate {
	#[serde(default)]
	pub name: Option<String>,
	#[serde(default)]
	pub email: Option<String>,
	#[serde(default, alias = "user_type")]
	pub role: Option<Role>,
	#[serde(default)]
	pub active: Option<bool>,
	#[serde(default)]
	pub address: Option<String>,
	#[serde(default)]
	pub city: Option<String>,
	#[serde(default)]
	pub state: Option<String>,
	#[serde(default)]
	pub zip_code: Option<String>,
}

impl UserUpdate {
	/// Applies every provided field to `user`.
	pub fn apply(self, user: &mut User) {
		if let Some(name) = self.name {
			user.name = name;
		}
		if let Some(email) = self.email {
			user.email = email;
		}
		if let Some(role) = self.role {
			user.role = role;
		}
		if let Some(active) = self.active {
			user.active = active;
		}
		if let Some(address) = self.address {
			user.address = Some(address);
		}
		if let Some(city) = self.city {
			user.city = Some(city);
		}
		if let Some(state) = self.state {
			user.state = Some(state);
		}
		if let Some(zip_code) = self.zip_code {
			user.zip_code = Some(zip_code);
		}
	}
}

/// Request payload for changing one's own password.
#[derive(Debug, Clone, Deserialize)]
pub struct PasswordChange {
	pub old_password: SecretString,
	pub new_password: SecretString,
}

/// Login request.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
	pub email: String,
	pub password: SecretString,
}

/// Issued bearer token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
	pub access_token: String,
	pub token_type: String,
	/// Lifetime of the token in seconds.
	pub expires_in: u64,
}

/// Optional filter for listing users.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserFilter {
	#[serde(default, alias = "user_type")]
	pub role: Option<Role>,
}
