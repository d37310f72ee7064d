// src/common/error.rs

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;
use uuid::Uuid;

use crate::common::i18n::I18nStore;
use crate::middleware::i18n::Locale;

// Categoria do erro. É ela que decide o status HTTP e se vale a pena tentar de novo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Conflict,
    NotFound,
    Dependency,
    Unauthorized,
    Forbidden,
    Internal,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Campo inválido: {field} ({code})")]
    InvalidInput { field: &'static str, code: &'static str },

    #[error("O horário conflita com o agendamento {conflicting_id}")]
    SlotConflict { conflicting_id: Uuid },

    #[error("Estoque insuficiente para o produto {product_id}: pedido {requested}, disponível {available}")]
    InsufficientStock {
        product_id: Uuid,
        requested: i32,
        available: i32,
    },

    #[error("Limite mensal de {limit} agendamentos atingido")]
    MonthlyLimitReached { limit: i64 },

    #[error("Transição de status inválida: {from} -> {to}")]
    InvalidStatusTransition { from: String, to: String },

    #[error("Venda já estornada")]
    SaleAlreadyVoided,

    #[error("{entity} ainda possui registros vinculados")]
    StillReferenced { entity: &'static str },

    #[error("{entity} {id} não encontrado")]
    NotFound { entity: &'static str, id: Uuid },

    #[error("Token inválido")]
    InvalidToken,

    #[error("Acesso negado a este estabelecimento")]
    Forbidden,

    #[error("Cabeçalho X-Tenant-ID ausente ou inválido")]
    MissingTenant,

    #[error("Erro de banco de dados")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Armazenamento indisponível: {0}")]
    StoreUnavailable(String),

    #[error("Tempo esgotado em {operation}")]
    Timeout { operation: &'static str },

    #[error("Erro de JWT: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),

    // Variante genérica para qualquer outro erro inesperado
    #[error("Erro interno do servidor")]
    InternalServerError(#[from] anyhow::Error),
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::ValidationError(_) | AppError::InvalidInput { .. } | AppError::MissingTenant => {
                ErrorKind::Validation
            }
            AppError::SlotConflict { .. }
            | AppError::InsufficientStock { .. }
            | AppError::MonthlyLimitReached { .. }
            | AppError::InvalidStatusTransition { .. }
            | AppError::SaleAlreadyVoided
            | AppError::StillReferenced { .. } => ErrorKind::Conflict,
            AppError::NotFound { .. } => ErrorKind::NotFound,
            AppError::DatabaseError(e) if is_constraint_violation(e) => ErrorKind::Validation,
            AppError::DatabaseError(_) | AppError::StoreUnavailable(_) | AppError::Timeout { .. } => {
                ErrorKind::Dependency
            }
            AppError::InvalidToken | AppError::JwtError(_) => ErrorKind::Unauthorized,
            AppError::Forbidden => ErrorKind::Forbidden,
            AppError::InternalServerError(_) => ErrorKind::Internal,
        }
    }

    /// Só falhas de dependência são transitórias.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Dependency
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) => StatusCode::UNPROCESSABLE_ENTITY,
            _ => match self.kind() {
                ErrorKind::Validation => StatusCode::BAD_REQUEST,
                ErrorKind::Conflict => StatusCode::CONFLICT,
                ErrorKind::NotFound => StatusCode::NOT_FOUND,
                ErrorKind::Dependency => StatusCode::SERVICE_UNAVAILABLE,
                ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
                ErrorKind::Forbidden => StatusCode::FORBIDDEN,
                ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    // Código estável usado como chave de tradução e devolvido ao frontend
    pub fn code(&self) -> &'static str {
        match self {
            AppError::ValidationError(_) => "validation_failed",
            AppError::InvalidInput { .. } => "invalid_input",
            AppError::SlotConflict { .. } => "slot_conflict",
            AppError::InsufficientStock { .. } => "insufficient_stock",
            AppError::MonthlyLimitReached { .. } => "monthly_limit_reached",
            AppError::InvalidStatusTransition { .. } => "invalid_status_transition",
            AppError::SaleAlreadyVoided => "sale_already_voided",
            AppError::StillReferenced { .. } => "still_referenced",
            AppError::NotFound { .. } => "not_found",
            AppError::InvalidToken | AppError::JwtError(_) => "invalid_token",
            AppError::Forbidden => "forbidden",
            AppError::MissingTenant => "missing_tenant",
            AppError::DatabaseError(e) if is_constraint_violation(e) => "constraint_violation",
            AppError::DatabaseError(_) | AppError::StoreUnavailable(_) => "store_unavailable",
            AppError::Timeout { .. } => "store_timeout",
            AppError::InternalServerError(_) => "internal_error",
        }
    }

    fn params(&self) -> Vec<(&'static str, String)> {
        match self {
            AppError::InvalidInput { field, code } => {
                vec![("field", field.to_string()), ("reason", code.to_string())]
            }
            AppError::InsufficientStock { available, .. } => vec![("available", available.to_string())],
            AppError::MonthlyLimitReached { limit } => vec![("limit", limit.to_string())],
            AppError::InvalidStatusTransition { from, to } => {
                vec![("from", from.clone()), ("to", to.clone())]
            }
            AppError::NotFound { entity, .. } | AppError::StillReferenced { entity } => {
                vec![("entity", entity.to_string())]
            }
            _ => Vec::new(),
        }
    }

    fn details(&self) -> Option<Value> {
        match self {
            AppError::ValidationError(errors) => {
                let mut details = serde_json::Map::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .map(|e| {
                            e.message
                                .as_ref()
                                .map(|m| m.to_string())
                                .unwrap_or_else(|| e.code.to_string())
                        })
                        .collect();
                    details.insert(field.to_string(), json!(messages));
                }
                Some(Value::Object(details))
            }
            AppError::InvalidInput { field, code } => Some(json!({ (*field): code })),
            AppError::SlotConflict { conflicting_id } => {
                Some(json!({ "conflictingAppointmentId": conflicting_id }))
            }
            AppError::InsufficientStock {
                product_id,
                requested,
                available,
            } => Some(json!({
                "productId": product_id,
                "requested": requested,
                "available": available,
            })),
            AppError::NotFound { entity, id } => Some(json!({ "entity": entity, "id": id })),
            AppError::Timeout { operation } => Some(json!({ "operation": operation, "retry": true })),
            AppError::DatabaseError(e) if is_constraint_violation(e) => None,
            AppError::DatabaseError(_) | AppError::StoreUnavailable(_) => Some(json!({ "retry": true })),
            _ => None,
        }
    }

    /// Converte o erro de domínio na resposta HTTP, já traduzida para o idioma do cliente.
    pub fn to_api_error(&self, locale: &Locale, i18n: &I18nStore) -> ApiError {
        match self.kind() {
            ErrorKind::Dependency | ErrorKind::Internal => {
                tracing::error!(code = self.code(), "Erro Interno do Servidor: {:?}", self);
            }
            ErrorKind::Conflict => tracing::warn!(code = self.code(), "{}", self),
            _ => {}
        }

        ApiError {
            status: self.status(),
            code: self.code(),
            error: i18n.translate(&locale.0, self.code(), &self.params()),
            details: self.details(),
        }
    }
}

// CHECK violado (ex.: estoque negativo) ou dado fora do domínio (SQLSTATE 22xxx):
// repetir a mesma escrita nunca vai passar.
fn is_constraint_violation(err: &sqlx::Error) -> bool {
    err.as_database_error().is_some_and(|db| {
        db.is_check_violation() || db.code().is_some_and(|code| code.starts_with("22"))
    })
}

// O corpo de erro que o frontend recebe
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub error: String,
    pub details: Option<Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut body = json!({
            "error": self.error,
            "code": self.code,
        });
        if let Some(details) = self.details {
            body["details"] = details;
        }
        (self.status, Json(body)).into_response()
    }
}

// Usado pelos middlewares, que não têm o Locale em mãos: responde no idioma padrão.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.to_api_error(&Locale::default(), I18nStore::global())
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflicts_are_distinct_from_validation() {
        let conflict = AppError::SlotConflict { conflicting_id: Uuid::new_v4() };
        let invalid = AppError::InvalidInput { field: "startTime", code: "required" };

        assert_eq!(conflict.kind(), ErrorKind::Conflict);
        assert_eq!(conflict.status(), StatusCode::CONFLICT);
        assert_eq!(invalid.kind(), ErrorKind::Validation);
        assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn only_dependency_errors_are_retryable() {
        assert!(AppError::Timeout { operation: "list_sales" }.is_retryable());
        assert!(AppError::StoreUnavailable("down".into()).is_retryable());
        assert!(!AppError::MonthlyLimitReached { limit: 30 }.is_retryable());
        assert!(!AppError::NotFound { entity: "pet", id: Uuid::nil() }.is_retryable());
    }

    #[derive(Debug)]
    struct CheckViolation;

    impl std::fmt::Display for CheckViolation {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str("new row violates check constraint \"products_stock_quantity_check\"")
        }
    }

    impl std::error::Error for CheckViolation {}

    impl sqlx::error::DatabaseError for CheckViolation {
        fn message(&self) -> &str {
            "new row violates check constraint"
        }
        fn as_error(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
            self
        }
        fn as_error_mut(&mut self) -> &mut (dyn std::error::Error + Send + Sync + 'static) {
            self
        }
        fn into_error(self: Box<Self>) -> Box<dyn std::error::Error + Send + Sync + 'static> {
            self
        }
        fn kind(&self) -> sqlx::error::ErrorKind {
            sqlx::error::ErrorKind::CheckViolation
        }
    }

    #[test]
    fn check_violations_are_not_retryable() {
        let err = AppError::DatabaseError(sqlx::Error::Database(Box::new(CheckViolation)));
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(!err.is_retryable());

        let api = err.to_api_error(&Locale("en".into()), I18nStore::global());
        assert_eq!(api.status, StatusCode::BAD_REQUEST);
        assert_eq!(api.code, "constraint_violation");
        assert!(api.details.is_none());
    }

    #[test]
    fn plain_database_failures_stay_retryable() {
        let err = AppError::DatabaseError(sqlx::Error::PoolTimedOut);
        assert_eq!(err.kind(), ErrorKind::Dependency);
        assert_eq!(err.code(), "store_unavailable");
        assert!(err.is_retryable());

        let api = err.to_api_error(&Locale::default(), I18nStore::global());
        assert_eq!(api.status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(api.details.expect("dica de retry")["retry"], true);
    }

    #[test]
    fn stock_conflict_carries_details_and_translation() {
        let product_id = Uuid::new_v4();
        let err = AppError::InsufficientStock { product_id, requested: 6, available: 5 };

        let api = err.to_api_error(&Locale("en".into()), I18nStore::global());
        assert_eq!(api.status, StatusCode::CONFLICT);
        assert_eq!(api.code, "insufficient_stock");
        assert!(api.error.contains('5'));
        let details = api.details.expect("detalhes do estoque");
        assert_eq!(details["requested"], 6);
        assert_eq!(details["available"], 5);
    }
}
