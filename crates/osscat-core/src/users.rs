//! ---
//! osscat_section: "01-core-functionality"
//! osscat_subsection: "module"
//! osscat_type: "source"
//! osscat_scope: "code"
//! osscat_description: "Governance services over the catalog store."
//! osscat_version: "v0.0.0-prealpha"
//! osscat_owner: "tbd"
//! ---
use std::fmt;
use std::io;

use osscat_common::time;
use osscat_governance::{AuditAction, AuditEntity, NewAuditEntry};
use osscat_security::{CredentialHasher, Role, RoleSet, User};
use osscat_store::{audit_logs, users, Store, StoreError, StoreTx, UserFilter};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::ServiceError;

const BOOTSTRAP_ACTOR: &str = "system";
const GENERATED_PASSWORD_LEN: usize = 16;

fn default_active() -> bool {
    true
}

/// Request to create a user. The password is hashed before it is stored.
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUserRequest {
    pub username: String,
    pub password: String,
    pub roles: Vec<Role>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default = "default_active")]
    pub active: bool,
}

impl fmt::Debug for NewUserRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewUserRequest")
            .field("username", &self.username)
            .field("roles", &self.roles)
            .field("active", &self.active)
            .finish_non_exhaustive()
    }
}

/// Partial update. `None` leaves the field unchanged.
#[derive(Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPatch {
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub roles: Option<Vec<Role>>,
    #[serde(default)]
    pub active: Option<bool>,
}

fn role_set(roles: &[Role]) -> Result<RoleSet, ServiceError> {
    RoleSet::new(roles.iter().copied())
        .map_err(|err| ServiceError::InvalidInput(err.to_string()))
}

fn require_password(password: &str) -> Result<(), ServiceError> {
    if password.is_empty() {
        return Err(ServiceError::InvalidInput("password must not be empty".into()));
    }
    Ok(())
}

fn generate_password() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(GENERATED_PASSWORD_LEN)
        .map(char::from)
        .collect()
}

/// User management. Every mutation is audited against entity `USER`.
#[derive(Clone)]
pub struct UserAdmin {
    store: Store,
    hasher: CredentialHasher,
}

impl UserAdmin {
    pub fn new(store: Store, hasher: CredentialHasher) -> Self {
        Self { store, hasher }
    }

    pub async fn list(&self, filter: &UserFilter) -> Result<Vec<User>, ServiceError> {
        Ok(users::search(self.store.pool(), filter).await?)
    }

    pub async fn get(&self, id: Uuid) -> Result<User, ServiceError> {
        users::get(self.store.pool(), id)
            .await?
            .ok_or(ServiceError::NotFound("user"))
    }

    pub async fn create(&self, request: &NewUserRequest, actor: &str) -> Result<User, ServiceError> {
        let username = request.username.trim();
        if username.is_empty() {
            return Err(ServiceError::InvalidInput("username must not be empty".into()));
        }
        require_password(&request.password)?;
        let roles = role_set(&request.roles)?;
        let now = time::now();
        let user = User {
            id: Uuid::new_v4(),
            username: username.to_owned(),
            display_name: request.display_name.clone(),
            email: request.email.clone(),
            roles,
            active: request.active,
            credential: self.hasher.hash(&request.password)?,
            created_at: now,
            updated_at: now,
        };
        self.insert_audited(&user, actor).await?;
        Ok(user)
    }

    async fn insert_audited(&self, user: &User, actor: &str) -> Result<(), ServiceError> {
        let mut tx = self.store.begin().await?;
        stage_insert(&mut tx, user, actor).await?;
        tx.commit().await.map_err(StoreError::from)?;
        info!(user_id = %user.id, username = %user.username, actor, "user created");
        Ok(())
    }

    /// Apply the set fields. The audit summary names them; the password
    /// appears only as a field name.
    pub async fn update(&self, id: Uuid, patch: &UserPatch, actor: &str) -> Result<User, ServiceError> {
        let roles = patch.roles.as_deref().map(role_set).transpose()?;
        let credential = match &patch.password {
            Some(password) => {
                require_password(password)?;
                Some(self.hasher.hash(password)?)
            }
            None => None,
        };

        let now = time::now();
        let mut tx = self.store.begin().await?;
        let mut user = users::get(&mut *tx, id)
            .await?
            .ok_or(ServiceError::NotFound("user"))?;

        let mut changed = Vec::new();
        if let Some(display_name) = &patch.display_name {
            user.display_name = Some(display_name.clone());
            changed.push("displayName");
        }
        if let Some(email) = &patch.email {
            user.email = Some(email.clone());
            changed.push("email");
        }
        if let Some(credential) = credential {
            user.credential = credential;
            changed.push("password");
        }
        if let Some(roles) = roles {
            user.roles = roles;
            changed.push("roles");
        }
        if let Some(active) = patch.active {
            user.active = active;
            changed.push("active");
        }
        user.updated_at = now;

        users::update(&mut *tx, &user).await?;
        let entry = NewAuditEntry::new(AuditEntity::User, id, AuditAction::UserUpdate, actor)
            .with_summary(format!("changed={}", changed.join(",")));
        audit_logs::record(&mut *tx, &entry, now).await?;
        tx.commit().await.map_err(StoreError::from)?;
        info!(user_id = %id, actor, changed = ?changed, "user updated");
        Ok(user)
    }

    pub async fn delete(&self, id: Uuid, actor: &str) -> Result<(), ServiceError> {
        let now = time::now();
        let mut tx = self.store.begin().await?;
        let user = users::get(&mut *tx, id)
            .await?
            .ok_or(ServiceError::NotFound("user"))?;
        users::delete(&mut *tx, id).await?;
        let entry = NewAuditEntry::new(AuditEntity::User, id, AuditAction::UserDelete, actor)
            .with_summary(format!("username={}", user.username));
        audit_logs::record(&mut *tx, &entry, now).await?;
        tx.commit().await.map_err(StoreError::from)?;
        info!(user_id = %id, actor, "user deleted");
        Ok(())
    }

    /// Create the initial administrator if no user has `username`.
    ///
    /// Returns the generated plaintext password exactly once, when the
    /// account was created; `None` if it already existed.
    pub async fn ensure_admin(&self, username: &str) -> Result<Option<String>, ServiceError> {
        let mut generated = None;
        self.ensure_admin_with(username, |password| {
            generated = Some(password.to_owned());
            Ok(())
        })
        .await?;
        Ok(generated)
    }

    /// Like [`ensure_admin`](Self::ensure_admin), handing the password to
    /// `deliver` before the account is committed.
    ///
    /// If `deliver` fails nothing is stored, so the next start retries with
    /// a fresh password. Returns whether the account was created.
    pub async fn ensure_admin_with<F>(&self, username: &str, deliver: F) -> Result<bool, ServiceError>
    where
        F: FnOnce(&str) -> io::Result<()>,
    {
        if users::find_by_username(self.store.pool(), username).await?.is_some() {
            return Ok(false);
        }
        let password = generate_password();
        let now = time::now();
        let admin = User {
            id: Uuid::new_v4(),
            username: username.to_owned(),
            display_name: Some("Administrator".to_owned()),
            email: None,
            roles: RoleSet::single(Role::Admin),
            active: true,
            credential: self.hasher.hash(&password)?,
            created_at: now,
            updated_at: now,
        };
        let mut tx = self.store.begin().await?;
        match stage_insert(&mut tx, &admin, BOOTSTRAP_ACTOR).await {
            Ok(()) => {}
            // Another instance created it first.
            Err(ServiceError::InvalidInput(_)) => {
                warn!(username, "initial admin already created concurrently");
                return Ok(false);
            }
            Err(err) => return Err(err),
        }
        deliver(&password).map_err(|err| ServiceError::Bootstrap(err.to_string()))?;
        tx.commit().await.map_err(StoreError::from)?;
        info!(user_id = %admin.id, username, actor = BOOTSTRAP_ACTOR, "user created");
        Ok(true)
    }
}

/// Insert `user` and its `USER_CREATE` entry inside `tx`.
async fn stage_insert(
    tx: &mut StoreTx,
    user: &User,
    actor: &str,
) -> Result<(), ServiceError> {
    users::insert(&mut **tx, user).await?;
    let roles: Vec<&str> = user.roles.iter().map(|role| role.as_str()).collect();
    let entry = NewAuditEntry::new(AuditEntity::User, user.id, AuditAction::UserCreate, actor)
        .with_summary(format!(
            "username={} roles={} active={}",
            user.username,
            roles.join(","),
            user.active
        ));
    audit_logs::record(&mut **tx, &entry, user.created_at).await?;
    Ok(())
}
