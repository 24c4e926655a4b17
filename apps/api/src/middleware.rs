use axum::extract::{Request, State};
use axum::http::{HeaderMap, Method, header};
use axum::middleware::Next;
use axum::response::Response;
use leadline_core::AppError;
use tower_sessions::Session;

use crate::auth::session_identity;
use crate::error::ApiResult;
use crate::state::AppState;

pub async fn require_auth(
    session: Session,
    mut request: Request,
    next: Next,
) -> ApiResult<Response> {
    let identity = session_identity(&session)
        .await?
        .ok_or_else(|| AppError::Unauthorized("authentication required".to_owned()))?;

    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}

pub async fn require_same_origin_for_mutations(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> ApiResult<Response> {
    if is_state_changing_method(request.method())
        && !mutation_origin_allowed(request.headers(), state.frontend_url.as_str())
    {
        return Err(AppError::Unauthorized("origin validation failed".to_owned()).into());
    }

    Ok(next.run(request).await)
}

fn mutation_origin_allowed(headers: &HeaderMap, allowed_origin: &str) -> bool {
    if headers
        .get("sec-fetch-site")
        .is_some_and(|fetch_site| fetch_site == "cross-site")
    {
        return false;
    }

    let origin = headers
        .get(header::ORIGIN)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    let referer = headers
        .get(header::REFERER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();

    origin == allowed_origin || referer.starts_with(allowed_origin)
}

fn is_state_changing_method(method: &Method) -> bool {
    matches!(
        *method,
        Method::POST | Method::PUT | Method::PATCH | Method::DELETE
    )
}

#[cfg(test)]
mod tests {
    use axum::http::{HeaderMap, HeaderValue, Method, header};

    use super::{is_state_changing_method, mutation_origin_allowed};

    const FRONTEND: &str = "http://localhost:3000";

    #[test]
    fn matching_origin_is_allowed() {
        let mut headers = HeaderMap::new();
        headers.insert(header::ORIGIN, HeaderValue::from_static(FRONTEND));
        assert!(mutation_origin_allowed(&headers, FRONTEND));
    }

    #[test]
    fn matching_referer_is_allowed() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::REFERER,
            HeaderValue::from_static("http://localhost:3000/login"),
        );
        assert!(mutation_origin_allowed(&headers, FRONTEND));
    }

    #[test]
    fn cross_site_requests_are_blocked() {
        let mut headers = HeaderMap::new();
        headers.insert(header::ORIGIN, HeaderValue::from_static(FRONTEND));
        headers.insert("sec-fetch-site", HeaderValue::from_static("cross-site"));
        assert!(!mutation_origin_allowed(&headers, FRONTEND));

        let mut foreign = HeaderMap::new();
        foreign.insert(
            header::ORIGIN,
            HeaderValue::from_static("https://evil.example"),
        );
        assert!(!mutation_origin_allowed(&foreign, FRONTEND));
        assert!(!mutation_origin_allowed(&HeaderMap::new(), FRONTEND));
    }

    #[test]
    fn only_mutations_are_checked() {
        assert!(is_state_changing_method(&Method::POST));
        assert!(is_state_changing_method(&Method::DELETE));
        assert!(!is_state_changing_method(&Method::GET));
        assert!(!is_state_changing_method(&Method::OPTIONS));
    }
}
