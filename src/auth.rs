use axum::{
    http::{header, HeaderMap, Request},
    middleware::Next,
    response::{IntoResponse, Response},
    Extension,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use subtle::ConstantTimeEq;

use crate::{
    config::{AuthConfig, PrincipalEntry},
    error::ApiError,
};

/// The only role allowed to reach the card endpoints.
pub const CARD_OWNER_ROLE: &str = "CARD-OWNER";

/// Authenticated caller identity, available to handlers via request extensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity {
    pub name: String,
    pub roles: Vec<String>,
}

impl CallerIdentity {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum Credential {
    Basic { username: String, password: String },
    ApiKey(String),
}

fn ct_eq(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

fn decode_basic(encoded: &str) -> Result<Credential, ApiError> {
    let malformed = || ApiError::Unauthenticated("Malformed Basic credentials".to_string());
    let decoded = STANDARD
        .decode(encoded.trim())
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .ok_or_else(malformed)?;
    let (username, password) = decoded.split_once(':').ok_or_else(malformed)?;
    Ok(Credential::Basic {
        username: username.to_string(),
        password: password.to_string(),
    })
}

/// Reads a credential from `X-API-Key` or `Authorization` (Basic or Bearer).
/// Scheme names are matched case-insensitively.
pub fn extract_credential(headers: &HeaderMap) -> Result<Option<Credential>, ApiError> {
    if let Some(key) = headers.get("X-API-Key") {
        let key = key
            .to_str()
            .map_err(|_| ApiError::Unauthenticated("Malformed X-API-Key header".to_string()))?;
        return Ok(Some(Credential::ApiKey(key.to_string())));
    }

    let Some(value) = headers.get(header::AUTHORIZATION) else {
        return Ok(None);
    };
    let value = value
        .to_str()
        .map_err(|_| ApiError::Unauthenticated("Malformed Authorization header".to_string()))?;

    match value.trim().split_once(' ') {
        Some((scheme, encoded)) if scheme.eq_ignore_ascii_case("basic") => {
            decode_basic(encoded).map(Some)
        }
        Some((scheme, key)) if scheme.eq_ignore_ascii_case("bearer") => {
            Ok(Some(Credential::ApiKey(key.trim().to_string())))
        }
        _ => Ok(Some(Credential::ApiKey(value.to_string()))),
    }
}

impl PrincipalEntry {
    fn verify_password(&self, password: &str) -> bool {
        let Some(hash) = self.password_hash.as_deref() else {
            return false;
        };
        bcrypt::verify(password, hash).unwrap_or_else(|e| {
            tracing::warn!(principal = %self.name, error = %e, "Unusable password hash");
            false
        })
    }

    fn matches(&self, credential: &Credential) -> bool {
        match credential {
            Credential::Basic { username, password } => {
                ct_eq(&self.name, username) && self.verify_password(password)
            }
            Credential::ApiKey(key) => self.api_key.as_deref().is_some_and(|k| ct_eq(k, key)),
        }
    }
}

impl AuthConfig {
    pub fn authenticate(&self, credential: &Credential) -> Option<CallerIdentity> {
        self.principals
            .iter()
            .find(|entry| entry.matches(credential))
            .map(|entry| CallerIdentity {
                name: entry.name.clone(),
                roles: entry.roles.clone(),
            })
    }

    fn dev_identity(&self) -> CallerIdentity {
        CallerIdentity {
            name: self.dev_principal.clone(),
            roles: vec![CARD_OWNER_ROLE.to_string()],
        }
    }
}

/// Rejects callers that do not hold `role`. Runs before any store access.
pub fn require_role(caller: &CallerIdentity, role: &str) -> Result<(), ApiError> {
    if caller.has_role(role) {
        Ok(())
    } else {
        tracing::warn!(caller = %caller.name, required = role, "Caller lacks required role");
        Err(ApiError::NotAuthorized)
    }
}

pub async fn auth_middleware<B>(
    Extension(config): Extension<std::sync::Arc<AuthConfig>>,
    mut req: Request<B>,
    next: Next<B>,
) -> Response {
    if !config.enabled {
        req.extensions_mut().insert(config.dev_identity());
        return next.run(req).await;
    }

    let credential = match extract_credential(req.headers()) {
        Ok(Some(c)) => c,
        Ok(None) => {
            return ApiError::Unauthenticated(
                "Missing credentials. Provide Basic auth, X-API-Key header or \
                 Authorization: Bearer <key>"
                    .to_string(),
            )
            .into_response();
        }
        Err(e) => return e.into_response(),
    };

    match config.authenticate(&credential) {
        Some(identity) => {
            tracing::debug!(
                caller = %identity.name,
                roles = ?identity.roles,
                "Authenticated request"
            );
            req.extensions_mut().insert(identity);
            next.run(req).await
        }
        None => {
            tracing::warn!("Invalid credentials presented");
            ApiError::Unauthenticated("Invalid credentials".to_string()).into_response()
        }
    }
}
