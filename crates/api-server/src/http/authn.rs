use axum::extract::{Request, State};
use axum::http::header;
use axum::middleware::Next;
use axum::response::Response;
use chrono::Utc;
use sha2::{Digest, Sha256};
use tracing::warn;

use super::errors::{store_error_response, unauthorized_response};
use super::{AppState, AuthOwner};

/// Resolves the bearer token against owner sessions issued by the auth system.
pub(super) async fn owner_auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    let token = auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty());

    let Some(token) = token else {
        warn!("missing or invalid authorization header");
        return unauthorized_response();
    };

    let token_hash = hash_token(token);
    let owner_id = match state.owners.resolve_owner(&token_hash, Utc::now()).await {
        Ok(Some(owner_id)) => owner_id,
        Ok(None) => {
            warn!("bearer token did not resolve to an owner session");
            return unauthorized_response();
        }
        Err(err) => return store_error_response(err),
    };

    req.extensions_mut().insert(AuthOwner { owner_id });
    next.run(req).await
}

fn hash_token(token: &str) -> Vec<u8> {
    Sha256::digest(token.as_bytes()).to_vec()
}
