//! ---
//! osscat_section: "01-core-functionality"
//! osscat_subsection: "module"
//! osscat_type: "source"
//! osscat_scope: "code"
//! osscat_description: "Governance services over the catalog store."
//! osscat_version: "v0.0.0-prealpha"
//! osscat_owner: "tbd"
//! ---
use std::sync::Arc;

use once_cell::sync::OnceCell;
use osscat_common::time;
use osscat_governance::{AuditAction, AuditEntity, NewAuditEntry};
use osscat_security::{
    CredentialHasher, IssuedToken, PasswordDigest, SecurityMetrics, TokenClaims, TokenService,
    User,
};
use osscat_store::{audit_logs, users, Store};
use tracing::{debug, info, warn};

use crate::ServiceError;

const DECOY_SECRET: &str = "osscat-decoy-credential";

/// Login, bearer verification, logout, and self lookup.
#[derive(Clone)]
pub struct AuthService {
    store: Store,
    hasher: CredentialHasher,
    tokens: TokenService,
    metrics: Option<SecurityMetrics>,
    /// Verified against when the username is unknown.
    decoy: Arc<OnceCell<PasswordDigest>>,
}

impl AuthService {
    pub fn new(
        store: Store,
        hasher: CredentialHasher,
        tokens: TokenService,
        metrics: Option<SecurityMetrics>,
    ) -> Self {
        let decoy = OnceCell::new();
        if let Ok(digest) = hasher.hash(DECOY_SECRET) {
            let _ = decoy.set(digest);
        }
        Self {
            store,
            hasher,
            tokens,
            metrics,
            decoy: Arc::new(decoy),
        }
    }

    /// Run one verification against the decoy digest so an unknown
    /// username costs the same as a wrong password.
    fn verify_decoy(&self, password: &str) {
        match self.decoy.get_or_try_init(|| self.hasher.hash(DECOY_SECRET)) {
            Ok(digest) => {
                let _ = self.hasher.verify(digest, password);
            }
            Err(err) => debug!(error = %err, "decoy digest unavailable"),
        }
    }

    fn record_failure(&self) {
        if let Some(metrics) = &self.metrics {
            metrics.inc_login_failure();
        }
    }

    /// Check the password against the stored digest and issue a token.
    ///
    /// An unknown user and a wrong password fail identically. An inactive
    /// user is rejected even with the right password.
    pub async fn login(&self, username: &str, password: &str) -> Result<IssuedToken, ServiceError> {
        if let Some(metrics) = &self.metrics {
            metrics.inc_login_attempt();
        }
        let Some(user) = users::find_by_username(self.store.pool(), username).await? else {
            self.verify_decoy(password);
            self.record_failure();
            warn!(username, "login rejected: unknown user");
            return Err(ServiceError::InvalidCredential);
        };
        if !user.active {
            self.record_failure();
            warn!(username, user_id = %user.id, "login rejected: user disabled");
            return Err(ServiceError::UserDisabled);
        }
        if !self.hasher.verify(&user.credential, password)? {
            self.record_failure();
            warn!(username, user_id = %user.id, "login rejected: bad password");
            return Err(ServiceError::InvalidCredential);
        }
        let issued = self.tokens.issue(&user)?;
        info!(username, user_id = %user.id, expires_in = issued.expires_in, "login succeeded");
        Ok(issued)
    }

    /// Verify a bearer token. Every failure is an authentication failure.
    pub fn verify(&self, token: &str) -> Result<TokenClaims, ServiceError> {
        self.tokens.verify(token).map_err(|err| {
            if let Some(metrics) = &self.metrics {
                metrics.inc_token_rejection();
            }
            debug!(error = %err, "bearer token rejected");
            ServiceError::from(err)
        })
    }

    /// Tokens are stateless; logging out only leaves a trail entry.
    pub async fn logout(&self, claims: &TokenClaims) -> Result<(), ServiceError> {
        let entry = NewAuditEntry::new(
            AuditEntity::User,
            &claims.sub,
            AuditAction::Logout,
            &claims.username,
        );
        audit_logs::record(self.store.pool(), &entry, time::now()).await?;
        info!(username = %claims.username, "logout recorded");
        Ok(())
    }

    /// The caller's own record. Deleted since the token was issued means not found.
    pub async fn me(&self, claims: &TokenClaims) -> Result<User, ServiceError> {
        let id = claims.user_id()?;
        users::get(self.store.pool(), id)
            .await?
            .ok_or(ServiceError::NotFound("user"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fast_hasher, store};
    use osscat_governance::AuditFilter;
    use osscat_security::{Role, RoleSet};
    use prometheus::Registry;
    use std::time::Duration;
    use uuid::Uuid;

    const SECRET: &[u8] = b"0123456789abcdef0123456789abcdef";

    async fn service_with(active: bool) -> (AuthService, SecurityMetrics, User) {
        let store = store().await;
        let hasher = fast_hasher();
        let now = time::now();
        let user = User {
            id: Uuid::new_v4(),
            username: "alice".into(),
            display_name: None,
            email: None,
            roles: RoleSet::single(Role::Editor),
            active,
            credential: hasher.hash("correct horse").unwrap(),
            created_at: now,
            updated_at: now,
        };
        users::insert(store.pool(), &user).await.unwrap();
        let metrics = SecurityMetrics::new(Arc::new(Registry::new())).unwrap();
        let service = AuthService::new(
            store,
            hasher,
            TokenService::new(SECRET, Duration::from_secs(60)),
            Some(metrics.clone()),
        );
        (service, metrics, user)
    }

    #[tokio::test]
    async fn login_issues_verifiable_token() {
        let (auth, _, user) = service_with(true).await;
        let issued = auth.login("alice", "correct horse").await.unwrap();
        assert_eq!(issued.expires_in, 60);
        let claims = auth.verify(&issued.access_token).unwrap();
        assert_eq!(claims.sub, user.id.to_string());
        assert_eq!(claims.roles, vec![Role::Editor]);
        assert_eq!(auth.me(&claims).await.unwrap().username, "alice");
    }

    #[tokio::test]
    async fn unknown_user_and_bad_password_look_the_same() {
        let (auth, _, _) = service_with(true).await;
        let unknown = auth.login("mallory", "correct horse").await.unwrap_err();
        let wrong = auth.login("alice", "battery staple").await.unwrap_err();
        assert_eq!(unknown.code(), "INVALID_CREDENTIAL");
        assert_eq!(wrong.code(), unknown.code());
        assert_eq!(wrong.status_code(), 401);
    }

    #[tokio::test]
    async fn unknown_user_still_pays_for_a_verification() {
        let (auth, metrics, _) = service_with(true).await;
        let decoy = auth.decoy.get().unwrap().clone();
        assert!(decoy.as_str().starts_with("$argon2id$"));
        assert!(decoy.as_str().contains("m=1024"));
        assert!(!fast_hasher().verify(&decoy, "correct horse").unwrap());

        let err = auth.login("mallory", "correct horse").await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidCredential));
        assert_eq!(auth.decoy.get(), Some(&decoy));
        let families = metrics.registry().gather();
        let counter = |name: &str| {
            families
                .iter()
                .find(|family| family.get_name() == name)
                .map(|family| family.get_metric()[0].get_counter().get_value())
                .unwrap()
        };
        assert_eq!(counter("login_attempts_total"), 1.0);
        assert_eq!(counter("login_failures_total"), 1.0);
    }

    #[tokio::test]
    async fn disabled_user_cannot_log_in() {
        let (auth, _, _) = service_with(false).await;
        let err = auth.login("alice", "correct horse").await.unwrap_err();
        assert!(matches!(err, ServiceError::UserDisabled));
        assert_eq!(err.status_code(), 403);
    }

    #[tokio::test]
    async fn plaintext_stored_credential_is_never_accepted() {
        let (auth, _, user) = service_with(true).await;
        let mut plain = user.clone();
        plain.credential = PasswordDigest::from_stored("correct horse");
        users::update(auth.store.pool(), &plain).await.unwrap();
        let err = auth.login("alice", "correct horse").await.unwrap_err();
        assert_eq!(err.status_code(), 500);
    }

    #[tokio::test]
    async fn rejected_tokens_are_unauthenticated() {
        let (auth, metrics, _) = service_with(true).await;
        let err = auth.verify("not.a.token").unwrap_err();
        assert_eq!(err.code(), "UNAUTHENTICATED");
        let families = metrics.registry().gather();
        let rejections = families
            .iter()
            .find(|family| family.get_name() == "token_rejections_total")
            .unwrap();
        assert_eq!(rejections.get_metric()[0].get_counter().get_value(), 1.0);
    }

    #[tokio::test]
    async fn logout_is_audited() {
        let (auth, _, user) = service_with(true).await;
        let issued = auth.login("alice", "correct horse").await.unwrap();
        let claims = auth.verify(&issued.access_token).unwrap();
        auth.logout(&claims).await.unwrap();
        let logs = audit_logs::search(
            auth.store.pool(),
            &AuditFilter::entity(AuditEntity::User, user.id),
        )
        .await
        .unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].action, "LOGOUT");
        assert_eq!(logs[0].user_name, "alice");
    }
}
