//! HTTP surface for cash cards.
//!
//! Every card handler follows the same sequence: the auth middleware has
//! already resolved a `CallerIdentity`, the handler checks the card-owner
//! role, validates input, and then calls the store with `caller.name` as the
//! owner. Owner and id values in request bodies are never read.

use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::{header, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    Extension, Json, Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use rust_decimal::Decimal;
use serde::Deserialize;

use cashcard_core::{CardId, CashCard, PageError, PageRequest};

use crate::{
    auth::{auth_middleware, require_role, CallerIdentity, CARD_OWNER_ROLE},
    config::AuthConfig,
    error::{ApiError, ApiResult},
    metrics::observe,
    storage::CashCardStore,
};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn CashCardStore>,
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(store: Arc<dyn CashCardStore>) -> Self {
        Self { store, metrics: None }
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}

/// Body of create and update requests. Only `amount` is honoured.
#[derive(Debug, Deserialize)]
pub struct CashCardRequest {
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub amount: Option<Decimal>,
}

/// Raw list query values. `sort` may repeat; for `page` and `size` the last
/// value wins. Unrecognised parameters are ignored.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ListParams {
    pub page: Option<String>,
    pub size: Option<String>,
    pub sort: Vec<String>,
}

impl FromIterator<(String, String)> for ListParams {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(pairs: I) -> Self {
        let mut params = ListParams::default();
        for (name, value) in pairs {
            match name.as_str() {
                "page" => params.page = Some(value),
                "size" => params.size = Some(value),
                "sort" => params.sort.push(value),
                _ => {}
            }
        }
        params
    }
}

impl ListParams {
    pub fn page_request(&self) -> Result<PageRequest, PageError> {
        PageRequest::from_params(self.page.as_deref(), self.size.as_deref(), self.sort.as_slice())
    }
}

pub fn router(state: AppState, auth: Arc<AuthConfig>) -> Router {
    Router::new()
        .route("/cashcards", get(list_cards).post(create_card))
        .route(
            "/cashcards/:id",
            get(find_card).put(update_card).delete(delete_card),
        )
        .route_layer(middleware::from_fn(auth_middleware))
        .route("/health", get(health))
        .route("/metrics", get(render_metrics))
        .layer(Extension(auth))
        .with_state(state)
}

fn parse_card_id(raw: &str) -> ApiResult<CardId> {
    raw.parse()
        .map_err(|_| ApiError::Validation(format!("invalid card id: {}", raw)))
}

fn parse_amount(payload: Result<Json<CashCardRequest>, JsonRejection>) -> ApiResult<Decimal> {
    let Json(body) = payload.map_err(|e| ApiError::Validation(e.body_text()))?;
    body.amount
        .ok_or_else(|| ApiError::Validation("amount is required".to_string()))
}

fn get_owned(state: &AppState, caller: &CallerIdentity, raw_id: &str) -> ApiResult<CashCard> {
    require_role(caller, CARD_OWNER_ROLE)?;
    let id = parse_card_id(raw_id)?;
    state.store
        .get_for_owner(id, &caller.name)?
        .ok_or(ApiError::NotFound)
}

fn list_owned(
    state: &AppState,
    caller: &CallerIdentity,
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> ApiResult<Vec<CashCard>> {
    require_role(caller, CARD_OWNER_ROLE)?;
    let Query(pairs) = query.map_err(|e| ApiError::Validation(e.body_text()))?;
    let page = pairs.into_iter().collect::<ListParams>().page_request()?;
    tracing::debug!(
        owner = %caller.name,
        page = page.page,
        size = page.size,
        sort = %page.sort,
        "Listing cards"
    );
    Ok(state.store.list_for_owner(&caller.name, &page)?)
}

fn create_owned(
    state: &AppState,
    caller: &CallerIdentity,
    payload: Result<Json<CashCardRequest>, JsonRejection>,
) -> ApiResult<CashCard> {
    require_role(caller, CARD_OWNER_ROLE)?;
    let amount = parse_amount(payload)?;
    Ok(state.store.create(amount, &caller.name)?)
}

fn update_owned(
    state: &AppState,
    caller: &CallerIdentity,
    raw_id: &str,
    payload: Result<Json<CashCardRequest>, JsonRejection>,
) -> ApiResult<CashCard> {
    require_role(caller, CARD_OWNER_ROLE)?;
    let id = parse_card_id(raw_id)?;
    let amount = parse_amount(payload)?;
    state.store
        .update_amount(id, &caller.name, amount)?
        .ok_or(ApiError::NotFound)
}

fn delete_owned(state: &AppState, caller: &CallerIdentity, raw_id: &str) -> ApiResult<()> {
    require_role(caller, CARD_OWNER_ROLE)?;
    let id = parse_card_id(raw_id)?;
    if state.store.delete_for_owner(id, &caller.name)? {
        Ok(())
    } else {
        Err(ApiError::NotFound)
    }
}

async fn find_card(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Path(raw_id): Path<String>,
) -> ApiResult<Json<CashCard>> {
    let result = get_owned(&state, &caller, &raw_id);
    observe("get", &result);
    result.map(Json)
}

async fn list_cards(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> ApiResult<Json<Vec<CashCard>>> {
    let result = list_owned(&state, &caller, query);
    observe("list", &result);
    result.map(Json)
}

async fn create_card(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    payload: Result<Json<CashCardRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let result = create_owned(&state, &caller, payload);
    observe("create", &result);

    let card = result?;
    match state.store.count_for_owner(&card.owner) {
        Ok(owned) => {
            tracing::info!(id = card.id, owner = %card.owner, owned, "Cash card created")
        }
        Err(e) => {
            tracing::warn!(id = card.id, error = %e, "Cash card created; owner count unavailable")
        }
    }
    let location = format!("/cashcards/{}", card.id);
    Ok((StatusCode::CREATED, [(header::LOCATION, location)]).into_response())
}

async fn update_card(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Path(raw_id): Path<String>,
    payload: Result<Json<CashCardRequest>, JsonRejection>,
) -> ApiResult<StatusCode> {
    let result = update_owned(&state, &caller, &raw_id, payload);
    observe("update", &result);
    result.map(|_| StatusCode::NO_CONTENT)
}

async fn delete_card(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Path(raw_id): Path<String>,
) -> ApiResult<StatusCode> {
    let result = delete_owned(&state, &caller, &raw_id);
    observe("delete", &result);
    result.map(|_| StatusCode::NO_CONTENT)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn render_metrics(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(handle) => handle.render().into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
