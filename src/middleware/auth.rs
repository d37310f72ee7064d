// src/middleware/auth.rs

use axum::{
    body::Body,
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{authorization::Bearer, Authorization, HeaderMapExt};

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::tenancy::{tenant_id_from_headers, TenantContext},
    services::auth::AuthenticatedUser,
};

fn authenticate(app_state: &AppState, request: &Request<Body>) -> Result<AuthenticatedUser, AppError> {
    let bearer = request
        .headers()
        .typed_get::<Authorization<Bearer>>()
        .ok_or(AppError::InvalidToken)?;

    app_state.auth_service.validate_token(bearer.token())
}

/// Rotas que só precisam de um usuário autenticado (sem estabelecimento).
pub async fn auth_guard(
    State(app_state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let user = authenticate(&app_state, &request)?;

    // Insere o usuário nos "extensions" da requisição
    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

/// Autentica e resolve o vínculo com o estabelecimento do X-Tenant-ID.
/// Quem não é dono nem cliente recebe 403.
pub async fn tenant_guard(
    State(app_state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let user = authenticate(&app_state, &request)?;
    let business_id = tenant_id_from_headers(request.headers())?;

    let membership = app_state
        .business_service
        .membership(user.id, business_id)
        .await?
        .ok_or_else(|| {
            tracing::warn!(user_id = %user.id, business_id = %business_id, "Acesso negado ao estabelecimento");
            AppError::Forbidden
        })?;

    let tenant_ctx = TenantContext::new(user.id, membership);
    request.extensions_mut().insert(user);
    request.extensions_mut().insert(tenant_ctx);
    Ok(next.run(request).await)
}

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or(AppError::InvalidToken)
    }
}
