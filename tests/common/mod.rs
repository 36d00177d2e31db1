//! Shared helpers for the router-level test suites.

// Each test binary uses a different subset of these helpers.
#![allow(dead_code)]

use std::sync::{Arc, OnceLock};

use axum::{
    body::Body,
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use rust_decimal_macros::dec;
use serde_json::Value;
use tower::ServiceExt;

use cashcard::{
    api::{router, AppState},
    auth::CARD_OWNER_ROLE,
    config::{AuthConfig, PrincipalEntry},
    storage::{CashCardStore, InMemoryStore},
};

pub const SARAH: (&str, &str) = ("sarah1", "abc123");
pub const HANK: (&str, &str) = ("hank-owns-no-cards", "qrs456");

/// Lowest cost bcrypt accepts; keeps per-request verification cheap in tests.
const TEST_HASH_COST: u32 = 4;

pub fn principal(name: &str, password: &str, role: &str) -> PrincipalEntry {
    PrincipalEntry {
        name: name.to_string(),
        password_hash: Some(bcrypt::hash(password, TEST_HASH_COST).unwrap()),
        api_key: None,
        roles: vec![role.to_string()],
    }
}

/// The reference principals with the reference passwords.
pub fn test_auth() -> AuthConfig {
    static AUTH: OnceLock<AuthConfig> = OnceLock::new();
    AUTH.get_or_init(|| AuthConfig {
        enabled: true,
        dev_principal: "anonymous".to_string(),
        principals: vec![
            principal(SARAH.0, SARAH.1, CARD_OWNER_ROLE),
            principal(HANK.0, HANK.1, "NON-OWNER"),
        ],
    })
    .clone()
}

/// Seeds the reference data set: 99, 100 and 101 belong to sarah1,
/// 102 belongs to kumar2.
pub fn seeded_store() -> Arc<InMemoryStore> {
    let store = Arc::new(InMemoryStore::new());
    for _ in 0..98 {
        let filler = store.create(dec!(0), "filler").unwrap();
        store.delete_for_owner(filler.id, "filler").unwrap();
    }
    store.create(dec!(123.45), "sarah1").unwrap();
    store.create(dec!(1.00), "sarah1").unwrap();
    store.create(dec!(150.00), "sarah1").unwrap();
    store.create(dec!(200.00), "kumar2").unwrap();
    store
}

pub fn app_with(store: Arc<InMemoryStore>, auth: AuthConfig) -> Router {
    router(AppState::new(store), Arc::new(auth))
}

pub fn app(store: Arc<InMemoryStore>) -> Router {
    app_with(store, test_auth())
}

pub fn basic((user, pass): (&str, &str)) -> String {
    format!("Basic {}", STANDARD.encode(format!("{}:{}", user, pass)))
}

pub fn request(
    method: Method,
    uri: &str,
    who: Option<(&str, &str)>,
    body: Option<Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(who) = who {
        builder = builder.header(header::AUTHORIZATION, basic(who));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

pub async fn send_raw(app: Router, req: Request<Body>) -> (StatusCode, HeaderMap, String) {
    let response = app.oneshot(req).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
    (status, headers, String::from_utf8_lossy(&bytes).into_owned())
}

pub async fn send(app: Router, req: Request<Body>) -> (StatusCode, HeaderMap, Value) {
    let (status, headers, text) = send_raw(app, req).await;
    let body = if text.is_empty() {
        Value::Null
    } else {
        serde_json::from_str(&text).unwrap_or(Value::Null)
    };
    (status, headers, body)
}

pub fn ids(body: &Value) -> Vec<u64> {
    body.as_array()
        .unwrap()
        .iter()
        .map(|c| c["id"].as_u64().unwrap())
        .collect()
}
