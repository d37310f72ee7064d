// src/handlers/reports.rs

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid; // params do Swagger

use crate::{
    common::error::ApiError,
    config::AppState,
    middleware::{i18n::Locale, rbac::OwnerOnly, tenancy::TenantContext},
    models::report::{DashboardSummary, MonthlyReport, ReportMonth},
};

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct MonthQuery {
    /// Mês no formato YYYY-MM (padrão: mês atual, UTC)
    #[param(example = "2025-08")]
    pub month: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/reports/monthly",
    tag = "Reports",
    responses(
        (status = 200, description = "Agendamentos, pets atendidos e faturamento do mês", body = MonthlyReport),
        (status = 400, description = "Mês inválido")
    ),
    params(
        MonthQuery,
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja")
    ),
    security(("api_jwt" = []))
)]
pub async fn monthly_report(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: OwnerOnly,
    Query(query): Query<MonthQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let month = match query.month.as_deref() {
        Some(raw) => raw
            .parse::<ReportMonth>()
            .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?,
        None => ReportMonth::of(Utc::now().date_naive()),
    };

    let report = app_state
        .report_service
        .monthly(&tenant, month)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(report)))
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DashboardQuery {
    /// Dia de referência (padrão: hoje, UTC)
    pub date: Option<NaiveDate>,
}

#[utoipa::path(
    get,
    path = "/api/dashboard/summary",
    tag = "Dashboard",
    responses(
        (status = 200, description = "Cards do dashboard", body = DashboardSummary)
    ),
    params(
        DashboardQuery,
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja")
    ),
    security(("api_jwt" = []))
)]
pub async fn dashboard_summary(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: OwnerOnly,
    Query(query): Query<DashboardQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let today = query.date.unwrap_or_else(|| Utc::now().date_naive());

    let summary = app_state
        .report_service
        .dashboard(&tenant, today)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(summary)))
}
