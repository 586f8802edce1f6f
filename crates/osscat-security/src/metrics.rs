//! ---
//! osscat_section: "06-security-access-control"
//! osscat_subsection: "module"
//! osscat_type: "source"
//! osscat_scope: "code"
//! osscat_description: "Credentials, bearer tokens, and role-based access control."
//! osscat_version: "v0.0.0-prealpha"
//! osscat_owner: "tbd"
//! ---
use prometheus::{IntCounter, Registry};
use std::sync::Arc;

/// Security metrics exported via Prometheus.
#[derive(Clone)]
pub struct SecurityMetrics {
    registry: Arc<Registry>,
    login_attempts_total: IntCounter,
    login_failures_total: IntCounter,
    token_rejections_total: IntCounter,
    rbac_denials_total: IntCounter,
}

impl SecurityMetrics {
    /// Register metrics with the provided registry.
    pub fn new(registry: Arc<Registry>) -> anyhow::Result<Self> {
        let login_attempts_total =
            IntCounter::new("login_attempts_total", "Total login attempts")?;
        let login_failures_total =
            IntCounter::new("login_failures_total", "Rejected login attempts")?;
        let token_rejections_total = IntCounter::new(
            "token_rejections_total",
            "Bearer tokens rejected as expired, malformed, or badly signed",
        )?;
        let rbac_denials_total =
            IntCounter::new("rbac_denials_total", "Access denials due to RBAC policies")?;

        registry.register(Box::new(login_attempts_total.clone()))?;
        registry.register(Box::new(login_failures_total.clone()))?;
        registry.register(Box::new(token_rejections_total.clone()))?;
        registry.register(Box::new(rbac_denials_total.clone()))?;

        Ok(Self {
            registry,
            login_attempts_total,
            login_failures_total,
            token_rejections_total,
            rbac_denials_total,
        })
    }

    /// Access the underlying registry.
    pub fn registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }

    /// Increment login attempts.
    pub fn inc_login_attempt(&self) {
        self.login_attempts_total.inc();
    }

    /// Increment login failures.
    pub fn inc_login_failure(&self) {
        self.login_failures_total.inc();
    }

    /// Increment rejected bearer tokens.
    pub fn inc_token_rejection(&self) {
        self.token_rejections_total.inc();
    }

    /// Increment RBAC denials.
    pub fn inc_rbac_denial(&self) {
        self.rbac_denials_total.inc();
    }
}
