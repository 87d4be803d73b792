//! User model and account operations for the Portal backend.
//!
//! Implements user CRUD, name search, and password hashing. Users are the
//! single business entity of the system: an account with a globally unique
//! email, an optional Argon2 password hash, and an active flag.
//!
//! The `password` column is write-only from this crate's perspective — no
//! query here ever selects it into a [`User`], so handlers cannot leak it.

use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during user operations.
#[derive(Debug, Error)]
pub enum UserError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("user not found: {0}")]
    NotFound(i64),
    #[error("email already registered: {0}")]
    EmailTaken(String),
    #[error("password hashing failed: {0}")]
    PasswordHash(String),
}

/// A user account. Never carries the password hash.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    /// Internal database ID.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Globally unique email address.
    pub email: String,
    /// Whether the account is active.
    pub is_active: bool,
    /// Creation timestamp (ISO 8601).
    pub created_at: String,
    /// Last mutation timestamp (ISO 8601), refreshed by trigger.
    pub updated_at: String,
}

/// Parameters for creating a new user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    /// Plaintext password; hashed before it reaches the database.
    pub password: Option<String>,
    pub is_active: bool,
}

/// Parameters for a partial user update. `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub is_active: Option<bool>,
}

const USER_COLUMNS: &str = "id, name, email, is_active, created_at, updated_at";

/// Creates a new user and returns the stored row.
///
/// A supplied password is hashed with Argon2 before insert. Fails with
/// [`UserError::EmailTaken`] if the email is already registered.
pub fn create_user(conn: &Connection, params: &NewUser) -> Result<User, UserError> {
    let existing: Option<i64> = conn
        .query_row(
            "SELECT id FROM users WHERE email = ?1",
            [&params.email],
            |row| row.get(0),
        )
        .optional()?;
    if existing.is_some() {
        return Err(UserError::EmailTaken(params.email.clone()));
    }

    let password_hash = params
        .password
        .as_deref()
        .map(hash_password)
        .transpose()?;

    conn.execute(
        "INSERT INTO users (name, email, password, is_active) VALUES (?1, ?2, ?3, ?4)",
        params![params.name, params.email, password_hash, params.is_active],
    )?;
    let id = conn.last_insert_rowid();

    tracing::info!(user_id = id, email = %params.email, "created user");
    get_user(conn, id)
}

/// Retrieves a user by ID.
pub fn get_user(conn: &Connection, id: i64) -> Result<User, UserError> {
    conn.query_row(
        &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
        [id],
        map_row_to_user,
    )
    .optional()?
    .ok_or(UserError::NotFound(id))
}

/// Lists users, newest first, with limit/offset pagination.
pub fn list_users(conn: &Connection, limit: u32, offset: u32) -> Result<Vec<User>, UserError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {USER_COLUMNS} FROM users
         ORDER BY created_at DESC, id DESC
         LIMIT ?1 OFFSET ?2"
    ))?;

    let rows = stmt.query_map(params![limit, offset], map_row_to_user)?;
    let mut users = Vec::new();
    for row in rows {
        users.push(row?);
    }
    Ok(users)
}

/// Updates a user with a single dynamically-built UPDATE statement.
///
/// Only fields that are `Some` in `patch` are modified. Changing the email
/// to one owned by another user fails with [`UserError::EmailTaken`].
/// Returns the row as stored after the update.
pub fn update_user(conn: &Connection, id: i64, patch: &UserPatch) -> Result<User, UserError> {
    // Existence check up front so an empty patch still yields NotFound for
    // missing users.
    let current = get_user(conn, id)?;

    if let Some(email) = &patch.email {
        if *email != current.email {
            let owner: Option<i64> = conn
                .query_row("SELECT id FROM users WHERE email = ?1", [email], |row| {
                    row.get(0)
                })
                .optional()?;
            if owner.is_some_and(|owner_id| owner_id != id) {
                return Err(UserError::EmailTaken(email.clone()));
            }
        }
    }

    let mut set_parts: Vec<String> = Vec::new();
    let mut values: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();
    let mut idx = 1usize;

    if let Some(name) = &patch.name {
        set_parts.push(format!("name = ?{}", idx));
        values.push(Box::new(name.clone()));
        idx += 1;
    }
    if let Some(email) = &patch.email {
        set_parts.push(format!("email = ?{}", idx));
        values.push(Box::new(email.clone()));
        idx += 1;
    }
    if let Some(is_active) = patch.is_active {
        set_parts.push(format!("is_active = ?{}", idx));
        values.push(Box::new(is_active));
        idx += 1;
    }

    if set_parts.is_empty() {
        return Ok(current);
    }

    let sql = format!(
        "UPDATE users SET {} WHERE id = ?{}",
        set_parts.join(", "),
        idx
    );
    values.push(Box::new(id));

    let sql_params: Vec<&dyn rusqlite::types::ToSql> = values.iter().map(|v| v.as_ref()).collect();
    conn.execute(&sql, sql_params.as_slice())?;

    tracing::info!(user_id = id, "updated user");
    get_user(conn, id)
}

/// Deletes a user. Fails with [`UserError::NotFound`] if no row was deleted.
pub fn delete_user(conn: &Connection, id: i64) -> Result<(), UserError> {
    let count = conn.execute("DELETE FROM users WHERE id = ?1", [id])?;
    if count == 0 {
        return Err(UserError::NotFound(id));
    }
    tracing::info!(user_id = id, "deleted user");
    Ok(())
}

/// Searches users by name substring.
pub fn search_users(conn: &Connection, term: &str, limit: u32) -> Result<Vec<User>, UserError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {USER_COLUMNS} FROM users
         WHERE name LIKE ?1
         ORDER BY name ASC
         LIMIT ?2"
    ))?;

    let pattern = format!("%{term}%");
    let rows = stmt.query_map(params![pattern, limit], map_row_to_user)?;
    let mut users = Vec::new();
    for row in rows {
        users.push(row?);
    }
    Ok(users)
}

/// Verifies a plaintext password against a stored Argon2 hash.
pub fn verify_password(password: &str, stored_hash: &str) -> Result<bool, UserError> {
    use argon2::password_hash::{PasswordHash, PasswordVerifier as _};

    let parsed =
        PasswordHash::new(stored_hash).map_err(|e| UserError::PasswordHash(e.to_string()))?;
    Ok(argon2::Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

fn hash_password(password: &str) -> Result<String, UserError> {
    use argon2::password_hash::{PasswordHasher as _, SaltString};
    use rand::RngCore;

    let mut salt_bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut salt_bytes);
    let salt =
        SaltString::encode_b64(&salt_bytes).map_err(|e| UserError::PasswordHash(e.to_string()))?;

    argon2::Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| UserError::PasswordHash(e.to_string()))
}

fn map_row_to_user(row: &Row) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        is_active: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}
