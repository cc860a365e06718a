//! Local user accounts.
//!
//! Accounts live in a registry keyed by an opaque id. The "current user" is a
//! lightweight pointer (username + email) into that registry. Passwords are
//! kept exactly as entered so existing registries stay readable.

use crate::stats::Aggregates;
use crate::storage::{KeyValueStore, Storage, StoreError};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserAccount {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub times: Vec<f64>,
}

pub type UserRegistry = BTreeMap<String, UserAccount>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    pub username: String,
    pub email: String,
}

#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("User already exists")]
    AlreadyExists,
    #[error("Passwords do not match")]
    PasswordMismatch,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A user's stored times with their summary
#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    pub username: String,
    pub times: Vec<f64>,
    pub aggregates: Aggregates,
}

fn find_by_email<'a>(registry: &'a UserRegistry, email: &str) -> Option<(&'a String, &'a UserAccount)> {
    registry.iter().find(|(_, account)| account.email == email)
}

fn fresh_id(registry: &UserRegistry) -> String {
    let mut stamp = Utc::now().timestamp_millis();
    loop {
        let id = format!("user_{}", stamp);
        if !registry.contains_key(&id) {
            return id;
        }
        stamp += 1;
    }
}

pub fn sign_up<S: KeyValueStore>(
    storage: &mut Storage<S>,
    username: &str,
    email: &str,
    password: &str,
    confirm_password: &str,
) -> Result<CurrentUser, AccountError> {
    if password != confirm_password {
        return Err(AccountError::PasswordMismatch);
    }

    let mut registry = storage.load_user_registry();
    if registry
        .values()
        .any(|account| account.email == email || account.username == username)
    {
        return Err(AccountError::AlreadyExists);
    }

    let id = fresh_id(&registry);
    registry.insert(
        id.clone(),
        UserAccount {
            username: username.to_string(),
            email: email.to_string(),
            password: password.to_string(),
            times: Vec::new(),
        },
    );
    storage.save_user_registry(&registry)?;

    let current = CurrentUser {
        username: username.to_string(),
        email: email.to_string(),
    };
    storage.save_current_user(&current)?;
    log::info!("registered {} as {}", username, id);

    Ok(current)
}

pub fn log_in<S: KeyValueStore>(
    storage: &mut Storage<S>,
    email: &str,
    password: &str,
) -> Result<CurrentUser, AccountError> {
    let registry = storage.load_user_registry();
    let current = match find_by_email(&registry, email) {
        Some((_, account)) if account.password == password => CurrentUser {
            username: account.username.clone(),
            email: email.to_string(),
        },
        _ => return Err(AccountError::InvalidCredentials),
    };

    storage.save_current_user(&current)?;
    log::info!("{} logged in", current.username);
    Ok(current)
}

pub fn log_out<S: KeyValueStore>(storage: &mut Storage<S>) -> Result<(), AccountError> {
    storage.clear_current_user()?;
    Ok(())
}

/// Append a solve time to the account behind `current`. Unknown accounts are
/// skipped; returns whether anything was written.
pub fn record_time<S: KeyValueStore>(
    storage: &mut Storage<S>,
    current: &CurrentUser,
    time: f64,
) -> Result<bool, AccountError> {
    let mut registry = storage.load_user_registry();
    let Some(account) = registry
        .values_mut()
        .find(|account| account.email == current.email)
    else {
        log::debug!("no account for {}, time not recorded", current.email);
        return Ok(false);
    };

    account.times.push(time);
    storage.save_user_registry(&registry)?;
    Ok(true)
}

pub fn profile<S: KeyValueStore>(storage: &Storage<S>, current: &CurrentUser) -> Profile {
    let registry = storage.load_user_registry();
    let times = find_by_email(&registry, &current.email)
        .map(|(_, account)| account.times.clone())
        .unwrap_or_default();

    Profile {
        username: current.username.clone(),
        aggregates: Aggregates::recompute(&times),
        times,
    }
}
