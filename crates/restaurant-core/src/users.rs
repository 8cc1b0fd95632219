//! User accounts.
//!
//! E-mail addresses are unique ignoring case and are stored lower-cased.
//! Password hashes stay inside this module; every operation returns a
//! [`UserProfile`].

use crate::state::order::queue_user_detach;
use chrono::Utc;
use restaurant_auth::{hash_password, verify_password, AuthError};
use restaurant_config::BootstrapAdmin;
use restaurant_storage::{StorageError, StorageService};
use restaurant_types::{
	NewUser, PasswordChange, Role, SecretString, StorageKey, User, UserFilter, UserProfile,
	UserUpdate,
};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// Shortest accepted password, in characters.
pub const MIN_PASSWORD_LEN: usize = 8;

/// Errors that can occur while managing users.
#[derive(Debug, Error)]
pub enum UserError {
	#[error("User not found: {0}")]
	NotFound(Uuid),
	#[error("E-mail already registered: {0}")]
	DuplicateEmail(String),
	#[error("Validation error: {0}")]
	Validation(String),
	#[error("Invalid credentials")]
	InvalidCredentials,
	#[error("Hashing error: {0}")]
	Hashing(String),
	#[error("Persistence error: {0}")]
	Persistence(String),
}

impl From<StorageError> for UserError {
	fn from(err: StorageError) -> Self {
		UserError::Persistence(err.to_string())
	}
}

impl From<AuthError> for UserError {
	fn from(err: AuthError) -> Self {
		match err {
			AuthError::Hashing(message) | AuthError::Signing(message) => UserError::Hashing(message),
			_ => UserError::InvalidCredentials,
		}
	}
}

/// Runs argon2 hashing off the async worker threads.
async fn hash_blocking(password: &SecretString) -> Result<String, UserError> {
	let password = password.clone();
	tokio::task::spawn_blocking(move || hash_password(&password))
		.await
		.map_err(|e| UserError::Hashing(e.to_string()))?
		.map_err(UserError::from)
}

async fn verify_blocking(password: &SecretString, hash: &str) -> Result<bool, UserError> {
	let password = password.clone();
	let hash = hash.to_string();
	tokio::task::spawn_blocking(move || verify_password(&password, &hash))
		.await
		.map_err(|e| UserError::Hashing(e.to_string()))
}

fn normalize_email(email: &str) -> Result<String, UserError> {
	let email = email.trim().to_lowercase();
	match email.split_once('@') {
		Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(email),
		_ => Err(UserError::Validation(format!(
			"'{}' is not a valid e-mail address",
			email
		))),
	}
}

fn validate_name(name: &str) -> Result<(), UserError> {
	if name.trim().is_empty() {
		return Err(UserError::Validation("name cannot be empty".into()));
	}
	Ok(())
}

fn validate_password(password: &SecretString) -> Result<(), UserError> {
	if password.with_exposed(|plain| plain.chars().count()) < MIN_PASSWORD_LEN {
		return Err(UserError::Validation(format!(
			"password must be at least {} characters",
			MIN_PASSWORD_LEN
		)));
	}
	Ok(())
}

pub struct UserService {
	storage: Arc<StorageService>,
}

impl UserService {
	pub fn new(storage: Arc<StorageService>) -> Self {
		Self { storage }
	}

	async fn load(&self, id: Uuid) -> Result<User, UserError> {
		match self
			.storage
			.retrieve(StorageKey::Users, &id.to_string())
			.await
		{
			Err(StorageError::NotFound) => Err(UserError::NotFound(id)),
			other => Ok(other?),
		}
	}

	async fn find_by_email(&self, email: &str) -> Result<Option<User>, UserError> {
		let users: Vec<User> = self.storage.list(StorageKey::Users).await?;
		Ok(users.into_iter().find(|user| user.email == email))
	}

	async fn ensure_email_free(&self, email: &str, owner: Option<Uuid>) -> Result<(), UserError> {
		match self.find_by_email(email).await? {
			Some(existing) if Some(existing.id) != owner => {
				Err(UserError::DuplicateEmail(email.to_string()))
			},
			_ => Ok(()),
		}
	}

	async fn save(&self, user: &User) -> Result<(), UserError> {
		self.storage
			.update(StorageKey::Users, &user.id.to_string(), user)
			.await
			.map_err(|e| match e {
				StorageError::NotFound => UserError::NotFound(user.id),
				other => other.into(),
			})
	}

	/// All users, oldest first, optionally restricted to one role.
	pub async fn list(&self, filter: &UserFilter) -> Result<Vec<UserProfile>, UserError> {
		let mut users: Vec<User> = self.storage.list(StorageKey::Users).await?;
		users.retain(|user| filter.role.is_none_or(|role| user.role == role));
		users.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
		Ok(users.iter().map(UserProfile::from).collect())
	}

	pub async fn get(&self, id: Uuid) -> Result<UserProfile, UserError> {
		Ok(UserProfile::from(&self.load(id).await?))
	}

	pub async fn create(&self, new: NewUser) -> Result<UserProfile, UserError> {
		validate_name(&new.name)?;
		let email = normalize_email(&new.email)?;
		validate_password(&new.password)?;
		self.ensure_email_free(&email, None).await?;

		let user = User {
			id: Uuid::new_v4(),
			name: new.name,
			email,
			password_hash: hash_blocking(&new.password).await?,
			role: new.role,
			active: new.active,
			address: new.address,
			city: new.city,
			state: new.state,
			zip_code: new.zip_code,
			created_at: Utc::now(),
		};
		self.storage
			.store(StorageKey::Users, &user.id.to_string(), &user)
			.await?;

		tracing::info!(user_id = %user.id, role = %user.role, "User created");
		Ok(UserProfile::from(&user))
	}

	pub async fn update(&self, id: Uuid, mut update: UserUpdate) -> Result<UserProfile, UserError> {
		if let Some(name) = &update.name {
			validate_name(name)?;
		}
		if let Some(email) = update.email.take() {
			let email = normalize_email(&email)?;
			self.ensure_email_free(&email, Some(id)).await?;
			update.email = Some(email);
		}

		let mut user = self.load(id).await?;
		let previous_role = user.role;
		update.apply(&mut user);
		self.save(&user).await?;

		if user.role != previous_role {
			tracing::info!(user_id = %id, from = %previous_role, to = %user.role, "User role changed");
		} else {
			tracing::info!(user_id = %id, "User updated");
		}
		Ok(UserProfile::from(&user))
	}

	/// Replaces the password after checking the current one.
	pub async fn change_password(&self, id: Uuid, change: &PasswordChange) -> Result<(), UserError> {
		let mut user = self.load(id).await?;
		if !verify_blocking(&change.old_password, &user.password_hash).await? {
			tracing::warn!(user_id = %id, "Password change with wrong current password");
			return Err(UserError::InvalidCredentials);
		}
		validate_password(&change.new_password)?;

		user.password_hash = hash_blocking(&change.new_password).await?;
		self.save(&user).await?;
		tracing::info!(user_id = %id, "Password changed");
		Ok(())
	}

	/// Checks a login. Unknown e-mail, wrong password and deactivated
	/// accounts all yield [`UserError::InvalidCredentials`].
	pub async fn authenticate(
		&self,
		email: &str,
		password: &SecretString,
	) -> Result<UserProfile, UserError> {
		let email = email.trim().to_lowercase();
		let Some(user) = self.find_by_email(&email).await? else {
			tracing::warn!("Login for unknown e-mail");
			return Err(UserError::InvalidCredentials);
		};
		if !verify_blocking(password, &user.password_hash).await? {
			tracing::warn!(user_id = %user.id, "Login with wrong password");
			return Err(UserError::InvalidCredentials);
		}
		if !user.active {
			tracing::warn!(user_id = %user.id, "Login of deactivated user");
			return Err(UserError::InvalidCredentials);
		}
		tracing::debug!(user_id = %user.id, "Login succeeded");
		Ok(UserProfile::from(&user))
	}

	/// Deletes a user. Their orders stay, without a user reference.
	pub async fn delete(&self, id: Uuid) -> Result<(), UserError> {
		self.load(id).await?;

		let mut tx = self.storage.begin();
		let orders = queue_user_detach(&self.storage, &mut tx, id).await?;
		tx.remove(StorageKey::Users, &id.to_string());
		tx.commit().await?;

		tracing::info!(user_id = %id, orders, "User deleted");
		Ok(())
	}

	/// Creates the configured administrator unless its e-mail is taken.
	///
	/// Returns true when an account was created.
	pub async fn ensure_admin(&self, admin: &BootstrapAdmin) -> Result<bool, UserError> {
		let email = normalize_email(&admin.email)?;
		if let Some(existing) = self.find_by_email(&email).await? {
			if existing.role != Role::Admin {
				tracing::warn!(
					user_id = %existing.id,
					"Bootstrap admin e-mail belongs to a non-admin user"
				);
			}
			return Ok(false);
		}

		self.create(NewUser {
			name: admin.name.clone(),
			email,
			password: admin.password.clone(),
			role: Role::Admin,
			active: true,
			address: None,
			city: None,
			state: None,
			zip_code: None,
		})
		.await?;
		Ok(true)
	}
}
