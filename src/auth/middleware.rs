//! Authentication Middleware
//! Mission: Protect API endpoints with token validation

use crate::auth::{api::AuthState, errors::AuthError};
use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use tracing::debug;

/// Header the client sends its access token in (not `Authorization: Bearer`)
pub const TOKEN_HEADER: &str = "token";

/// Auth middleware that validates the `token` header
pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let token = token_from_headers(req.headers()).ok_or(AuthError::MissingToken)?;

    let claims = state.service.jwt().validate_token(token).map_err(|e| {
        debug!(error = %e, path = %req.uri().path(), "Rejected token");
        e
    })?;

    // Handlers pick the claims up with `Extension<Claims>`
    req.extensions_mut().insert(claims);

    Ok(next.run(req).await)
}

fn token_from_headers(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(TOKEN_HEADER)
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_token_header_lookup() {
        let mut headers = HeaderMap::new();
        assert!(token_from_headers(&headers).is_none());

        headers.insert(TOKEN_HEADER, HeaderValue::from_static("   "));
        assert!(token_from_headers(&headers).is_none());

        headers.insert(TOKEN_HEADER, HeaderValue::from_static(" abc.def.ghi "));
        assert_eq!(token_from_headers(&headers), Some("abc.def.ghi"));
    }

    #[test]
    fn test_bearer_header_is_not_read() {
        let mut headers = HeaderMap::new();
        headers.insert("Authorization", HeaderValue::from_static("Bearer abc.def.ghi"));
        assert!(token_from_headers(&headers).is_none());
    }
}
