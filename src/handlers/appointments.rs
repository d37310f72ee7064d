// src/handlers/appointments.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{NaiveDate, NaiveTime};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{i18n::Locale, rbac::OwnerOnly, tenancy::TenantContext},
    models::appointment::{Appointment, AppointmentFilter, AppointmentStatus},
    services::booking_service::BookingRequest,
};

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BookAppointmentPayload {
    pub customer_id: Uuid,
    pub pet_id: Uuid,
    pub service_id: Uuid,
    #[schema(value_type = String, format = Date, example = "2025-08-14")]
    pub appointment_date: NaiveDate,
    #[schema(value_type = String, example = "09:00:00")]
    pub start_time: NaiveTime,
    // Sem status, o agendamento nasce pendente
    pub status: Option<AppointmentStatus>,
    #[validate(length(max = 1000, message = "Observação muito longa."))]
    pub notes: Option<String>,
}

#[utoipa::path(
    post,
    path = "/api/appointments",
    tag = "Appointments",
    request_body = BookAppointmentPayload,
    responses(
        (status = 201, description = "Agendamento criado, com horário final e preço calculados", body = Appointment),
        (status = 400, description = "Dados inválidos"),
        (status = 404, description = "Cliente, pet ou serviço não encontrado"),
        (status = 409, description = "Horário ocupado ou limite mensal do plano atingido")
    ),
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja")
    ),
    security(("api_jwt" = []))
)]
pub async fn book_appointment(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: OwnerOnly,
    Json(payload): Json<BookAppointmentPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let request = BookingRequest {
        customer_id: payload.customer_id,
        pet_id: payload.pet_id,
        service_id: payload.service_id,
        date: payload.appointment_date,
        start_time: payload.start_time,
        status: payload.status,
        notes: payload.notes,
    };

    let appointment = app_state
        .booking_service
        .book(&tenant, request)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(appointment)))
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentQuery {
    /// Data inicial (inclusiva)
    pub from: Option<NaiveDate>,
    /// Data final (inclusiva)
    pub to: Option<NaiveDate>,
    pub customer_id: Option<Uuid>,
}

#[utoipa::path(
    get,
    path = "/api/appointments",
    tag = "Appointments",
    responses(
        (status = 200, description = "Agendamentos no período, por data e hora", body = Vec<Appointment>),
        (status = 400, description = "Período invertido")
    ),
    params(
        AppointmentQuery,
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_appointments(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: OwnerOnly,
    Query(query): Query<AppointmentQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let filter = AppointmentFilter {
        from: query.from,
        to: query.to,
        customer_id: query.customer_id,
    };

    let appointments = app_state
        .booking_service
        .list(&tenant, filter)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(appointments)))
}

#[utoipa::path(
    get,
    path = "/api/appointments/{id}",
    tag = "Appointments",
    responses(
        (status = 200, description = "Agendamento", body = Appointment),
        (status = 404, description = "Agendamento não encontrado")
    ),
    params(
        ("id" = Uuid, Path, description = "ID do agendamento"),
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_appointment(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: OwnerOnly,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let appointment = app_state
        .booking_service
        .get(&tenant, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(appointment)))
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReschedulePayload {
    #[schema(value_type = String, format = Date, example = "2025-08-15")]
    pub appointment_date: NaiveDate,
    #[schema(value_type = String, example = "14:30:00")]
    pub start_time: NaiveTime,
}

#[utoipa::path(
    put,
    path = "/api/appointments/{id}/schedule",
    tag = "Appointments",
    request_body = ReschedulePayload,
    responses(
        (status = 200, description = "Agendamento remarcado (mesma duração, mesmo preço)", body = Appointment),
        (status = 404, description = "Agendamento não encontrado"),
        (status = 409, description = "Novo horário ocupado ou limite mensal atingido")
    ),
    params(
        ("id" = Uuid, Path, description = "ID do agendamento"),
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja")
    ),
    security(("api_jwt" = []))
)]
pub async fn reschedule_appointment(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: OwnerOnly,
    Path(id): Path<Uuid>,
    Json(payload): Json<ReschedulePayload>,
) -> Result<impl IntoResponse, ApiError> {
    let appointment = app_state
        .booking_service
        .reschedule(&tenant, id, payload.appointment_date, payload.start_time)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(appointment)))
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChangeStatusPayload {
    pub status: AppointmentStatus,
}

#[utoipa::path(
    patch,
    path = "/api/appointments/{id}/status",
    tag = "Appointments",
    request_body = ChangeStatusPayload,
    responses(
        (status = 200, description = "Status alterado", body = Appointment),
        (status = 404, description = "Agendamento não encontrado"),
        (status = 409, description = "Transição de status não permitida")
    ),
    params(
        ("id" = Uuid, Path, description = "ID do agendamento"),
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja")
    ),
    security(("api_jwt" = []))
)]
pub async fn change_status(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: OwnerOnly,
    Path(id): Path<Uuid>,
    Json(payload): Json<ChangeStatusPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let appointment = app_state
        .booking_service
        .change_status(&tenant, id, payload.status)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(appointment)))
}
