// src/middleware/tenancy.rs

use axum::{extract::FromRequestParts, http::{request::Parts, HeaderMap}};
use uuid::Uuid;

use crate::common::error::AppError;
use crate::models::business::{MemberRole, Membership};

// O nome do nosso cabeçalho HTTP customizado
pub const TENANT_ID_HEADER: &str = "x-tenant-id";

// Contexto explícito do tenant. O tenant_guard monta este valor uma única vez
// por requisição, depois de verificar o vínculo do usuário com o estabelecimento,
// e ele é repassado a toda chamada da camada de lógica.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TenantContext {
    pub business_id: Uuid,
    pub user_id: Uuid,
    pub role: MemberRole,
    pub customer_id: Option<Uuid>,
}

impl TenantContext {
    pub fn new(user_id: Uuid, membership: Membership) -> Self {
        Self {
            business_id: membership.business_id,
            user_id,
            role: membership.role,
            customer_id: membership.customer_id,
        }
    }

    pub fn owner(business_id: Uuid, user_id: Uuid) -> Self {
        Self {
            business_id,
            user_id,
            role: MemberRole::Owner,
            customer_id: None,
        }
    }

    pub fn is_owner(&self) -> bool {
        self.role == MemberRole::Owner
    }
}

/// Lê e valida o cabeçalho X-Tenant-ID.
pub fn tenant_id_from_headers(headers: &HeaderMap) -> Result<Uuid, AppError> {
    headers
        .get(TENANT_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| Uuid::parse_str(value.trim()).ok())
        .ok_or(AppError::MissingTenant)
}

impl<S> FromRequestParts<S> for TenantContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Só existe nos extensions se o tenant_guard já aprovou o acesso
        parts
            .extensions
            .get::<TenantContext>()
            .copied()
            .ok_or(AppError::MissingTenant)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn parses_tenant_header() {
        let id = Uuid::new_v4();
        let mut headers = HeaderMap::new();
        assert!(matches!(tenant_id_from_headers(&headers), Err(AppError::MissingTenant)));

        headers.insert(TENANT_ID_HEADER, HeaderValue::from_static("not-a-uuid"));
        assert!(tenant_id_from_headers(&headers).is_err());

        headers.insert(TENANT_ID_HEADER, HeaderValue::from_str(&id.to_string()).unwrap());
        assert_eq!(tenant_id_from_headers(&headers).unwrap(), id);
    }
}
