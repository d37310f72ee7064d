// src/handlers/businesses.rs

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid; // params do Swagger
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{i18n::Locale, rbac::OwnerOnly, tenancy::TenantContext},
    models::business::{Business, BusinessSettings, NewBusiness, SubscriptionPlan},
    services::auth::AuthenticatedUser,
};

// ---
// Payload: CreateBusiness
// ---
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateBusinessPayload {
    #[validate(length(min = 1, message = "O nome é obrigatório."))]
    #[schema(example = "Pet Feliz Banho e Tosa")]
    pub name: String,
    #[validate(email(message = "E-mail inválido."))]
    pub email: String,
    #[validate(length(min = 1, message = "O telefone é obrigatório."))]
    pub phone: String,
    #[serde(default)]
    pub address: String,
    // Sem plano informado, o estabelecimento começa no gratuito
    pub plan: Option<SubscriptionPlan>,
}

#[utoipa::path(
    post,
    path = "/api/businesses",
    tag = "Businesses",
    request_body = CreateBusinessPayload,
    responses(
        (status = 201, description = "Estabelecimento criado; o usuário vira o dono", body = Business),
        (status = 400, description = "Dados inválidos")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_business(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    Json(payload): Json<CreateBusinessPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let new = NewBusiness {
        name: payload.name,
        email: payload.email,
        phone: payload.phone,
        address: payload.address,
        plan: payload.plan.unwrap_or(SubscriptionPlan::Free),
    };

    let business = app_state
        .business_service
        .create_business(user.id, new)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(business)))
}

#[utoipa::path(
    get,
    path = "/api/businesses",
    tag = "Businesses",
    responses(
        (status = 200, description = "Estabelecimentos do usuário logado", body = Vec<Business>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_my_businesses(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
) -> Result<impl IntoResponse, ApiError> {
    let businesses = app_state
        .business_service
        .list_my_businesses(user.id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(businesses)))
}

#[utoipa::path(
    get,
    path = "/api/settings",
    tag = "Settings",
    responses(
        (status = 200, description = "Configurações do estabelecimento atual", body = Business),
        (status = 403, description = "Usuário não pertence a este estabelecimento")
    ),
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_settings(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
) -> Result<impl IntoResponse, ApiError> {
    let business = app_state
        .business_service
        .get_business(&tenant)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(business)))
}

// ---
// Payload: UpdateSettings
// ---
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSettingsPayload {
    #[validate(length(min = 1, message = "O nome é obrigatório."))]
    pub name: String,
    #[validate(email(message = "E-mail inválido."))]
    pub email: String,
    #[validate(length(min = 1, message = "O telefone é obrigatório."))]
    pub phone: String,
    #[serde(default)]
    pub address: String,
    #[validate(url(message = "URL do logo inválida."))]
    pub logo_url: Option<String>,
    #[schema(example = "#3B82F6")]
    pub primary_color: Option<String>,
    #[schema(example = "#10B981")]
    pub secondary_color: Option<String>,
}

#[utoipa::path(
    put,
    path = "/api/settings",
    tag = "Settings",
    request_body = UpdateSettingsPayload,
    responses(
        (status = 200, description = "Configurações atualizadas", body = Business),
        (status = 400, description = "Cor ou dados inválidos"),
        (status = 403, description = "Somente o dono altera as configurações")
    ),
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_settings(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: OwnerOnly,
    Json(payload): Json<UpdateSettingsPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let settings = BusinessSettings {
        name: payload.name,
        email: payload.email,
        phone: payload.phone,
        address: payload.address,
        logo_url: payload.logo_url,
        primary_color: payload.primary_color,
        secondary_color: payload.secondary_color,
    };

    let business = app_state
        .business_service
        .update_settings(&tenant, settings)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(business)))
}
