//! ---
//! osscat_section: "05-networking-external-interfaces"
//! osscat_subsection: "module"
//! osscat_type: "source"
//! osscat_scope: "code"
//! osscat_description: "HTTP surface for the OSS catalog."
//! osscat_version: "v0.0.0-prealpha"
//! osscat_owner: "tbd"
//! ---
use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use osscat_core::{NewUserRequest, UserPatch, VersionReview};
use osscat_governance::{
    AuditFilter, AuditLog, NewOssComponent, NewOssVersion, NewProject, NewUsage, OssComponent,
    OssVersion, PolicyPatch, Project, ProjectUsage, ScopeOverride, ScopePolicy, UsageFilter,
};
use osscat_security::{Action, IssuedToken, User};
use osscat_store::UserFilter;
use prometheus::TextEncoder;
use serde::Deserialize;
use tracing::warn;
use uuid::Uuid;

use crate::error::ApiError;
use crate::{ApiState, Caller};

type ApiResult<T> = Result<T, ApiError>;
type Body<T> = Result<Json<T>, JsonRejection>;
type Id<T> = Result<Path<T>, PathRejection>;
type Filter<T> = Result<Query<T>, QueryRejection>;

pub(crate) fn routes() -> Router<Arc<ApiState>> {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/me", get(me))
        .route("/scope/policy", get(get_policy).patch(patch_policy))
        .route("/projects", get(list_projects).post(create_project))
        .route("/projects/:id", get(get_project).delete(delete_project))
        .route("/projects/:id/usages", get(list_usages).post(create_usage))
        .route("/projects/:id/usages/:usage_id/scope", patch(override_scope))
        .route("/oss", post(create_component))
        .route("/oss/:id/versions", post(create_version))
        .route("/oss/:id/versions/:version_id", get(get_version))
        .route("/oss/:id/versions/:version_id/review", patch(review_version))
        .route("/audit", get(search_audit))
        .route("/users", get(list_users).post(create_user))
        .route(
            "/users/:id",
            get(get_user).patch(update_user).delete(delete_user),
        )
        .route("/metrics", get(get_metrics))
}

#[derive(Deserialize)]
struct LoginRequest {
    username: String,
    password: String,
}

async fn login(
    State(state): State<Arc<ApiState>>,
    payload: Body<LoginRequest>,
) -> ApiResult<Json<IssuedToken>> {
    let Json(request) = payload?;
    let issued = state
        .services
        .auth
        .login(&request.username, &request.password)
        .await?;
    Ok(Json(issued))
}

async fn logout(State(state): State<Arc<ApiState>>, caller: Caller) -> ApiResult<StatusCode> {
    let claims = caller.require(&state, Action::ReadSelf)?;
    state.services.auth.logout(claims).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn me(State(state): State<Arc<ApiState>>, caller: Caller) -> ApiResult<Json<User>> {
    let claims = caller.require(&state, Action::ReadSelf)?;
    Ok(Json(state.services.auth.me(claims).await?))
}

async fn get_policy(
    State(state): State<Arc<ApiState>>,
    caller: Caller,
) -> ApiResult<Json<ScopePolicy>> {
    caller.require(&state, Action::ReadCatalog)?;
    Ok(Json(state.services.policy.get().await?))
}

async fn patch_policy(
    State(state): State<Arc<ApiState>>,
    caller: Caller,
    payload: Body<PolicyPatch>,
) -> ApiResult<Json<ScopePolicy>> {
    let claims = caller.require(&state, Action::ManageScopePolicy)?;
    let Json(patch) = payload?;
    let policy = state.services.policy.upsert(&patch, &claims.username).await?;
    Ok(Json(policy))
}

async fn list_projects(
    State(state): State<Arc<ApiState>>,
    caller: Caller,
) -> ApiResult<Json<Vec<Project>>> {
    caller.require(&state, Action::ReadCatalog)?;
    Ok(Json(state.services.catalog.list_projects().await?))
}

async fn create_project(
    State(state): State<Arc<ApiState>>,
    caller: Caller,
    payload: Body<NewProject>,
) -> ApiResult<(StatusCode, Json<Project>)> {
    caller.require(&state, Action::EditCatalog)?;
    let Json(request) = payload?;
    let project = state.services.catalog.create_project(&request).await?;
    Ok((StatusCode::CREATED, Json(project)))
}

async fn get_project(
    State(state): State<Arc<ApiState>>,
    caller: Caller,
    id: Id<Uuid>,
) -> ApiResult<Json<Project>> {
    caller.require(&state, Action::ReadCatalog)?;
    let Path(id) = id?;
    Ok(Json(state.services.catalog.get_project(id).await?))
}

async fn delete_project(
    State(state): State<Arc<ApiState>>,
    caller: Caller,
    id: Id<Uuid>,
) -> ApiResult<StatusCode> {
    let claims = caller.require(&state, Action::DeleteProject)?;
    let Path(id) = id?;
    state
        .services
        .catalog
        .delete_project(id, &claims.username)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_usages(
    State(state): State<Arc<ApiState>>,
    caller: Caller,
    id: Id<Uuid>,
    filter: Filter<UsageFilter>,
) -> ApiResult<Json<Vec<ProjectUsage>>> {
    caller.require(&state, Action::ReadCatalog)?;
    let Path(project_id) = id?;
    let Query(filter) = filter?;
    let usages = state.services.scope.list_usages(project_id, &filter).await?;
    Ok(Json(usages))
}

async fn create_usage(
    State(state): State<Arc<ApiState>>,
    caller: Caller,
    id: Id<Uuid>,
    payload: Body<NewUsage>,
) -> ApiResult<(StatusCode, Json<ProjectUsage>)> {
    caller.require(&state, Action::EditCatalog)?;
    let Path(project_id) = id?;
    let Json(request) = payload?;
    let usage = state.services.scope.create_usage(project_id, &request).await?;
    Ok((StatusCode::CREATED, Json(usage)))
}

async fn override_scope(
    State(state): State<Arc<ApiState>>,
    caller: Caller,
    ids: Id<(Uuid, Uuid)>,
    payload: Body<ScopeOverride>,
) -> ApiResult<Json<ProjectUsage>> {
    let claims = caller.require(&state, Action::OverrideScope)?;
    let Path((project_id, usage_id)) = ids?;
    let Json(decision) = payload?;
    let usage = state
        .services
        .scope
        .override_scope(project_id, usage_id, &decision, &claims.username)
        .await?;
    Ok(Json(usage))
}

async fn create_component(
    State(state): State<Arc<ApiState>>,
    caller: Caller,
    payload: Body<NewOssComponent>,
) -> ApiResult<(StatusCode, Json<OssComponent>)> {
    caller.require(&state, Action::EditCatalog)?;
    let Json(request) = payload?;
    let component = state.services.catalog.create_component(&request).await?;
    Ok((StatusCode::CREATED, Json(component)))
}

async fn create_version(
    State(state): State<Arc<ApiState>>,
    caller: Caller,
    id: Id<Uuid>,
    payload: Body<NewOssVersion>,
) -> ApiResult<(StatusCode, Json<OssVersion>)> {
    caller.require(&state, Action::EditCatalog)?;
    let Path(oss_id) = id?;
    let Json(request) = payload?;
    let version = state.services.catalog.create_version(oss_id, &request).await?;
    Ok((StatusCode::CREATED, Json(version)))
}

async fn get_version(
    State(state): State<Arc<ApiState>>,
    caller: Caller,
    ids: Id<(Uuid, Uuid)>,
) -> ApiResult<Json<OssVersion>> {
    caller.require(&state, Action::ReadCatalog)?;
    let Path((oss_id, version_id)) = ids?;
    Ok(Json(state.services.catalog.get_version(oss_id, version_id).await?))
}

async fn review_version(
    State(state): State<Arc<ApiState>>,
    caller: Caller,
    ids: Id<(Uuid, Uuid)>,
    payload: Body<VersionReview>,
) -> ApiResult<Json<OssVersion>> {
    let claims = caller.require(&state, Action::ReviewVersion)?;
    let Path((oss_id, version_id)) = ids?;
    let Json(review) = payload?;
    let version = state
        .services
        .catalog
        .review_version(oss_id, version_id, &review, &claims.username)
        .await?;
    Ok(Json(version))
}

async fn search_audit(
    State(state): State<Arc<ApiState>>,
    caller: Caller,
    filter: Filter<AuditFilter>,
) -> ApiResult<Json<Vec<AuditLog>>> {
    caller.require(&state, Action::ReadAudit)?;
    let Query(filter) = filter?;
    Ok(Json(state.services.audit.search(&filter).await?))
}

async fn list_users(
    State(state): State<Arc<ApiState>>,
    caller: Caller,
    filter: Filter<UserFilter>,
) -> ApiResult<Json<Vec<User>>> {
    caller.require(&state, Action::ManageUsers)?;
    let Query(filter) = filter?;
    Ok(Json(state.services.users.list(&filter).await?))
}

async fn create_user(
    State(state): State<Arc<ApiState>>,
    caller: Caller,
    payload: Body<NewUserRequest>,
) -> ApiResult<(StatusCode, Json<User>)> {
    let claims = caller.require(&state, Action::ManageUsers)?;
    let Json(request) = payload?;
    let user = state.services.users.create(&request, &claims.username).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

async fn get_user(
    State(state): State<Arc<ApiState>>,
    caller: Caller,
    id: Id<Uuid>,
) -> ApiResult<Json<User>> {
    caller.require(&state, Action::ManageUsers)?;
    let Path(id) = id?;
    Ok(Json(state.services.users.get(id).await?))
}

async fn update_user(
    State(state): State<Arc<ApiState>>,
    caller: Caller,
    id: Id<Uuid>,
    payload: Body<UserPatch>,
) -> ApiResult<Json<User>> {
    let claims = caller.require(&state, Action::ManageUsers)?;
    let Path(id) = id?;
    let Json(patch) = payload?;
    let user = state
        .services
        .users
        .update(id, &patch, &claims.username)
        .await?;
    Ok(Json(user))
}

async fn delete_user(
    State(state): State<Arc<ApiState>>,
    caller: Caller,
    id: Id<Uuid>,
) -> ApiResult<StatusCode> {
    let claims = caller.require(&state, Action::ManageUsers)?;
    let Path(id) = id?;
    state.services.users.delete(id, &claims.username).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn get_metrics(State(state): State<Arc<ApiState>>) -> Response {
    let Some(registry) = &state.registry else {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            "metrics registry unavailable",
        )
            .into_response();
    };

    let encoder = TextEncoder::new();
    let families = registry.gather();
    match encoder.encode_to_string(&families) {
        Ok(body) => (StatusCode::OK, body).into_response(),
        Err(err) => {
            warn!(error = %err, "failed to encode metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
