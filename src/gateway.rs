// src/gateway.rs
//! Read-only HTTP view of a deployed RightsPolicyManager.
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use axum::Router;
use ethers::providers::Middleware;
use ethers::types::{Address, U256};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{
    utils, ActivePolicy, Error, FilterOpts, LogEvent, PolicyRegisteredFilter,
    RightsPolicyManagerCaller, RightsPolicyManagerErrors, RightsPolicyManagerFilterer,
};

pub struct AppState<M> {
    pub caller: RightsPolicyManagerCaller<M>,
    pub filterer: RightsPolicyManagerFilterer<M>,
    pub start_block: u64,
}

pub fn router<M: Middleware + 'static>(state: AppState<M>) -> Router {
    Router::new()
        .route("/info", get(info::<M>))
        .route("/accounts/{account}/policies", get(policies::<M>))
        .route(
            "/accounts/{account}/assets/{asset_id}/active-policy",
            get(active_policy::<M>),
        )
        .route(
            "/accounts/{account}/assets/{asset_id}/policies/{policy}/active",
            get(is_active_policy::<M>),
        )
        .route("/accounts/{account}/registrations", get(registrations::<M>))
        .with_state(Arc::new(state))
}

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Reverted(String),
    Upstream(String),
}

impl<M: Middleware> From<Error<M>> for ApiError {
    fn from(err: Error<M>) -> Self {
        if err.is_revert() {
            ApiError::Reverted(err.to_string())
        } else {
            tracing::error!(error = %err, "contract request failed");
            ApiError::Upstream(err.to_string())
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Reverted(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            ApiError::Upstream(msg) => (StatusCode::BAD_GATEWAY, msg),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

fn parse_address(value: &str) -> Result<Address, ApiError> {
    value
        .parse::<Address>()
        .map_err(|_| ApiError::BadRequest(format!("invalid address {value}")))
}

fn parse_asset_id(value: &str) -> Result<U256, ApiError> {
    utils::parse_u256(value).map_err(|e| ApiError::BadRequest(format!("invalid asset id: {e}")))
}

#[derive(Debug, Serialize)]
pub struct Info {
    pub address: Address,
    pub authority: Address,
    pub policy_authorizer: Address,
    pub rights_agreement: Address,
    pub rights_authorizer: Address,
    pub upgrade_interface_version: String,
    /// `None` when the configured address is a proxy.
    pub proxiable_uuid: Option<String>,
    pub consuming_scheduled_op: String,
}

async fn info<M: Middleware + 'static>(
    State(state): State<Arc<AppState<M>>>,
) -> Result<Json<Info>, ApiError> {
    let caller = &state.caller;
    let (authority, policy_authorizer, rights_agreement, rights_authorizer, version, scheduled_op) =
        tokio::try_join!(
            caller.authority(),
            caller.get_policy_authorizer(),
            caller.rights_agreement(),
            caller.rights_authorizer(),
            caller.upgrade_interface_version(),
            caller.is_consuming_scheduled_op(),
        )?;

    // proxiableUUID is notDelegated and reverts when called through the proxy
    let proxiable_uuid = match caller.proxiable_uuid().await {
        Ok(uuid) => Some(utils::to_hex(&uuid)),
        Err(Error::Revert(RightsPolicyManagerErrors::UUPSUnauthorizedCallContext(_))) => None,
        Err(err) => return Err(err.into()),
    };

    Ok(Json(Info {
        address: caller.address(),
        authority,
        policy_authorizer,
        rights_agreement,
        rights_authorizer,
        upgrade_interface_version: version,
        proxiable_uuid,
        consuming_scheduled_op: utils::to_hex(&scheduled_op),
    }))
}

async fn policies<M: Middleware + 'static>(
    State(state): State<Arc<AppState<M>>>,
    Path(account): Path<String>,
) -> Result<Json<Vec<Address>>, ApiError> {
    let account = parse_address(&account)?;
    Ok(Json(state.caller.get_policies(account).await?))
}

async fn active_policy<M: Middleware + 'static>(
    State(state): State<Arc<AppState<M>>>,
    Path((account, asset_id)): Path<(String, String)>,
) -> Result<Json<ActivePolicy>, ApiError> {
    let account = parse_address(&account)?;
    let asset_id = parse_asset_id(&asset_id)?;
    Ok(Json(state.caller.get_active_policy(account, asset_id).await?))
}

#[derive(Debug, Serialize)]
pub struct IsActive {
    pub active: bool,
}

async fn is_active_policy<M: Middleware + 'static>(
    State(state): State<Arc<AppState<M>>>,
    Path((account, asset_id, policy)): Path<(String, String, String)>,
) -> Result<Json<IsActive>, ApiError> {
    let account = parse_address(&account)?;
    let asset_id = parse_asset_id(&asset_id)?;
    let policy = parse_address(&policy)?;
    let active = state
        .caller
        .is_active_policy(account, asset_id, policy)
        .await?;
    Ok(Json(IsActive { active }))
}

#[derive(Debug, Default, Deserialize)]
pub struct RangeQuery {
    pub from_block: Option<u64>,
    pub to_block: Option<u64>,
}

async fn registrations<M: Middleware + 'static>(
    State(state): State<Arc<AppState<M>>>,
    Path(account): Path<String>,
    Query(range): Query<RangeQuery>,
) -> Result<Json<Vec<LogEvent<PolicyRegisteredFilter>>>, ApiError> {
    let account = parse_address(&account)?;
    let opts = FilterOpts {
        start: range.from_block.unwrap_or(state.start_block),
        end: range.to_block,
    };
    if opts.end.is_some_and(|end| end < opts.start) {
        return Err(ApiError::BadRequest("to_block is before from_block".into()));
    }
    let events = state
        .filterer
        .filter_policy_registered(opts, &[account])
        .await?;
    Ok(Json(events))
}
