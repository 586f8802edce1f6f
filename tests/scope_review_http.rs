//! ---
//! osscat_section: "15-testing-qa-runbook"
//! osscat_subsection: "integration-tests"
//! osscat_type: "source"
//! osscat_scope: "code"
//! osscat_description: "Integration and validation tests for the OSS catalog stack."
//! osscat_version: "v0.0.0-prealpha"
//! osscat_owner: "tbd"
//! ---
use std::sync::Arc;
use std::time::Duration;

use osscat_api::{spawn_api_server, ApiServer, ApiState};
use osscat_common::config::DatabaseConfig;
use osscat_core::Services;
use osscat_security::{CredentialHasher, RbacGate, SecurityMetrics, TokenService};
use osscat_store::Store;
use reqwest::{Client, RequestBuilder, Response};
use serde_json::{json, Value};
use tempfile::TempDir;

const SECRET: &[u8] = b"integration-secret-integration-secret";

struct Stack {
    _dir: TempDir,
    server: ApiServer,
    client: Client,
    base: String,
    admin_password: String,
}

impl Stack {
    async fn start() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::connect(&DatabaseConfig {
            url: format!("sqlite://{}", dir.path().join("catalog.db").display()),
            max_connections: 4,
        })
        .await
        .unwrap();
        let registry = Arc::new(prometheus::Registry::new());
        let metrics = SecurityMetrics::new(registry.clone()).unwrap();
        let services = Services::new(
            store,
            CredentialHasher::with_params(1024, 1, 1).unwrap(),
            TokenService::new(SECRET, Duration::from_secs(600)),
            Some(metrics.clone()),
        );
        let admin_password = services.users.ensure_admin("admin").await.unwrap().unwrap();
        let state = ApiState::new(services, RbacGate::new(Some(metrics)), Some(registry));
        let server = spawn_api_server(Arc::new(state), "127.0.0.1:0".parse().unwrap()).unwrap();
        let base = format!("http://{}", server.addr());
        Self {
            _dir: dir,
            server,
            client: Client::new(),
            base,
            admin_password,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    async fn login(&self, username: &str, password: &str) -> String {
        let resp = self
            .client
            .post(self.url("/auth/login"))
            .json(&json!({ "username": username, "password": password }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status().as_u16(), 200, "login {username}");
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["expiresIn"], 600);
        body["accessToken"].as_str().unwrap().to_owned()
    }

    async fn create_user(&self, admin: &str, username: &str, role: &str) {
        let resp = self
            .client
            .post(self.url("/users"))
            .bearer_auth(admin)
            .json(&json!({
                "username": username,
                "password": format!("{username}-pass"),
                "roles": [role],
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status().as_u16(), 201);
    }
}

async fn send(builder: RequestBuilder) -> Response {
    builder.send().await.unwrap()
}

async fn json_ok(builder: RequestBuilder, status: u16) -> Value {
    let resp = send(builder).await;
    assert_eq!(resp.status().as_u16(), status);
    resp.json().await.unwrap()
}

#[tokio::test]
async fn scope_review_lifecycle_over_http() {
    let stack = Stack::start().await;
    let admin = stack.login("admin", &stack.admin_password).await;
    stack.create_user(&admin, "alice", "EDITOR").await;
    stack.create_user(&admin, "victor", "VIEWER").await;
    let alice = stack.login("alice", "alice-pass").await;
    let victor = stack.login("victor", "victor-pass").await;

    // Only admins change the policy.
    let resp = send(
        stack
            .client
            .patch(stack.url("/scope/policy"))
            .bearer_auth(&alice)
            .json(&json!({ "serverEnvIncluded": true })),
    )
    .await;
    assert_eq!(resp.status().as_u16(), 403);

    let policy = json_ok(
        stack
            .client
            .patch(stack.url("/scope/policy"))
            .bearer_auth(&admin)
            .json(&json!({
                "runtimeRequiredDefaultInScope": false,
                "serverEnvIncluded": true
            })),
        200,
    )
    .await;
    assert_eq!(policy["serverEnvIncluded"], true);
    assert_eq!(policy["autoMarkForksInScope"], false);
    assert_eq!(policy["updatedBy"], "admin");

    let policy = json_ok(
        stack
            .client
            .get(stack.url("/scope/policy"))
            .bearer_auth(&victor),
        200,
    )
    .await;
    assert_eq!(policy["runtimeRequiredDefaultInScope"], false);

    let project = json_ok(
        stack
            .client
            .post(stack.url("/projects"))
            .bearer_auth(&alice)
            .json(&json!({ "projectCode": "PRJ-001", "name": "Customer Portal" })),
        201,
    )
    .await;
    let project_id = project["id"].as_str().unwrap().to_owned();

    let component = json_ok(
        stack
            .client
            .post(stack.url("/oss"))
            .bearer_auth(&alice)
            .json(&json!({ "name": "Left_Pad" })),
        201,
    )
    .await;
    assert_eq!(component["normalizedName"], "left-pad");
    let oss_id = component["id"].as_str().unwrap().to_owned();

    let version = json_ok(
        stack
            .client
            .post(stack.url(&format!("/oss/{oss_id}/versions")))
            .bearer_auth(&alice)
            .json(&json!({ "version": "1.3.0", "licenseExpressionRaw": "MIT" })),
        201,
    )
    .await;
    assert_eq!(version["reviewStatus"], "DRAFT");
    let version_id = version["id"].as_str().unwrap().to_owned();

    let usages_url = stack.url(&format!("/projects/{project_id}/usages"));
    let mut statuses = Vec::new();
    for role in ["RUNTIME_REQUIRED", "SERVER_ENV", "DEV_ONLY"] {
        let usage = json_ok(
            stack
                .client
                .post(&usages_url)
                .bearer_auth(&alice)
                .json(&json!({ "ossVersionId": version_id, "usageRole": role })),
            201,
        )
        .await;
        assert!(usage["evaluatedAt"].is_null());
        assert!(usage["evaluatedBy"].is_null());
        statuses.push((usage["id"].as_str().unwrap().to_owned(), usage["scopeStatus"].clone()));
    }
    assert_eq!(statuses[0].1, "REVIEW_NEEDED");
    assert_eq!(statuses[1].1, "IN_SCOPE");
    assert_eq!(statuses[2].1, "OUT_SCOPE");
    let runtime_usage = statuses[0].0.clone();

    // Viewers read but never override.
    let resp = send(
        stack
            .client
            .patch(stack.url(&format!(
                "/projects/{project_id}/usages/{runtime_usage}/scope"
            )))
            .bearer_auth(&victor)
            .json(&json!({ "scopeStatus": "IN_SCOPE" })),
    )
    .await;
    assert_eq!(resp.status().as_u16(), 403);

    let overridden = json_ok(
        stack
            .client
            .patch(stack.url(&format!(
                "/projects/{project_id}/usages/{runtime_usage}/scope"
            )))
            .bearer_auth(&alice)
            .json(&json!({ "scopeStatus": "IN_SCOPE", "reasonNote": "linked into the shipped binary" })),
        200,
    )
    .await;
    assert_eq!(overridden["scopeStatus"], "IN_SCOPE");
    assert_eq!(overridden["evaluatedBy"], "alice");
    assert_eq!(overridden["inclusionNote"], "linked into the shipped binary");
    assert!(!overridden["evaluatedAt"].is_null());

    let in_scope = json_ok(
        stack
            .client
            .get(&usages_url)
            .bearer_auth(&victor)
            .query(&[("scopeStatus", "IN_SCOPE")]),
        200,
    )
    .await;
    assert_eq!(in_scope.as_array().unwrap().len(), 2);

    let trail = json_ok(
        stack
            .client
            .get(stack.url("/audit"))
            .bearer_auth(&alice)
            .query(&[("entityType", "PROJECT_USAGE"), ("entityId", runtime_usage.as_str())]),
        200,
    )
    .await;
    let trail = trail.as_array().unwrap();
    assert_eq!(trail.len(), 1);
    assert_eq!(trail[0]["action"], "SCOPE_OVERRIDE");
    assert_eq!(trail[0]["userName"], "alice");

    let policy_trail = json_ok(
        stack
            .client
            .get(stack.url("/audit"))
            .bearer_auth(&admin)
            .query(&[("entityType", "SCOPE_POLICY")]),
        200,
    )
    .await;
    assert_eq!(policy_trail.as_array().unwrap().len(), 1);

    // Project removal is admin-only and cascades to usages.
    let resp = send(
        stack
            .client
            .delete(stack.url(&format!("/projects/{project_id}")))
            .bearer_auth(&alice),
    )
    .await;
    assert_eq!(resp.status().as_u16(), 403);
    let resp = send(
        stack
            .client
            .delete(stack.url(&format!("/projects/{project_id}")))
            .bearer_auth(&admin),
    )
    .await;
    assert_eq!(resp.status().as_u16(), 204);

    let problem = json_ok(
        stack.client.get(&usages_url).bearer_auth(&admin),
        404,
    )
    .await;
    assert_eq!(problem["code"], "NOT_FOUND");
    assert_eq!(problem["status"], 404);

    stack.server.shutdown().await.unwrap();
}

#[tokio::test]
async fn version_review_and_user_admin_over_http() {
    let stack = Stack::start().await;
    let admin = stack.login("admin", &stack.admin_password).await;
    stack.create_user(&admin, "erin", "EDITOR").await;
    let erin = stack.login("erin", "erin-pass").await;

    let component = json_ok(
        stack
            .client
            .post(stack.url("/oss"))
            .bearer_auth(&erin)
            .json(&json!({ "name": "serde" })),
        201,
    )
    .await;
    let oss_id = component["id"].as_str().unwrap().to_owned();
    let version = json_ok(
        stack
            .client
            .post(stack.url(&format!("/oss/{oss_id}/versions")))
            .bearer_auth(&erin)
            .json(&json!({ "version": "1.0.200" })),
        201,
    )
    .await;
    let version_id = version["id"].as_str().unwrap().to_owned();

    let reviewed = json_ok(
        stack
            .client
            .patch(stack.url(&format!("/oss/{oss_id}/versions/{version_id}/review")))
            .bearer_auth(&erin)
            .json(&json!({ "reviewStatus": "VERIFIED", "note": "license text checked" })),
        200,
    )
    .await;
    assert_eq!(reviewed["reviewStatus"], "VERIFIED");
    assert!(!reviewed["lastReviewedAt"].is_null());

    let fetched = json_ok(
        stack
            .client
            .get(stack.url(&format!("/oss/{oss_id}/versions/{version_id}")))
            .bearer_auth(&erin),
        200,
    )
    .await;
    assert_eq!(fetched["reviewStatus"], "VERIFIED");

    // Editors cannot manage users.
    let resp = send(stack.client.get(stack.url("/users")).bearer_auth(&erin)).await;
    assert_eq!(resp.status().as_u16(), 403);

    let users = json_ok(
        stack
            .client
            .get(stack.url("/users"))
            .bearer_auth(&admin)
            .query(&[("role", "EDITOR")]),
        200,
    )
    .await;
    let users = users.as_array().unwrap();
    assert_eq!(users.len(), 1);
    let erin_id = users[0]["id"].as_str().unwrap().to_owned();

    let updated = json_ok(
        stack
            .client
            .patch(stack.url(&format!("/users/{erin_id}")))
            .bearer_auth(&admin)
            .json(&json!({ "active": false })),
        200,
    )
    .await;
    assert_eq!(updated["active"], false);

    let resp = send(
        stack
            .client
            .post(stack.url("/auth/login"))
            .json(&json!({ "username": "erin", "password": "erin-pass" })),
    )
    .await;
    assert_eq!(resp.status().as_u16(), 403);
    let problem: Value = resp.json().await.unwrap();
    assert_eq!(problem["code"], "USER_DISABLED");

    let resp = send(
        stack
            .client
            .delete(stack.url(&format!("/users/{erin_id}")))
            .bearer_auth(&admin),
    )
    .await;
    assert_eq!(resp.status().as_u16(), 204);

    let trail = json_ok(
        stack
            .client
            .get(stack.url("/audit"))
            .bearer_auth(&admin)
            .query(&[("entityType", "USER"), ("entityId", erin_id.as_str())]),
        200,
    )
    .await;
    let actions: Vec<&str> = trail
        .as_array()
        .unwrap()
        .iter()
        .map(|entry| entry["action"].as_str().unwrap())
        .collect();
    assert_eq!(actions, ["USER_DELETE", "USER_UPDATE", "USER_CREATE"]);

    let resp = send(
        stack
            .client
            .post(stack.url("/auth/logout"))
            .bearer_auth(&admin),
    )
    .await;
    assert_eq!(resp.status().as_u16(), 204);

    stack.server.shutdown().await.unwrap();
}
