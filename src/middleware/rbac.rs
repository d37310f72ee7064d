// src/middleware/rbac.rs

use axum::{extract::FromRequestParts, http::request::Parts};
use std::marker::PhantomData;

use crate::{
    common::error::AppError,
    middleware::tenancy::TenantContext,
    models::business::MemberRole,
};

/// O papel que a rota exige dentro do estabelecimento
pub trait RoleDef: Send + Sync + 'static {
    fn role() -> MemberRole;
}

/// Extractor (guardião): só deixa passar quem tem o papel `T` no tenant atual.
pub struct RequireRole<T>(PhantomData<T>);

impl<T, S> FromRequestParts<S> for RequireRole<T>
where
    T: RoleDef,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let tenant = TenantContext::from_request_parts(parts, state).await?;

        if tenant.role != T::role() {
            tracing::warn!(
                user_id = %tenant.user_id,
                required = ?T::role(),
                "Papel insuficiente para esta rota"
            );
            return Err(AppError::Forbidden);
        }

        Ok(RequireRole(PhantomData))
    }
}

// ---
// PAPÉIS
// ---

pub struct Owner;
impl RoleDef for Owner {
    fn role() -> MemberRole { MemberRole::Owner }
}

pub struct PortalCustomer;
impl RoleDef for PortalCustomer {
    fn role() -> MemberRole { MemberRole::Customer }
}

pub type OwnerOnly = RequireRole<Owner>;
pub type CustomerOnly = RequireRole<PortalCustomer>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;
    use uuid::Uuid;

    async fn extract<T: RoleDef>(ctx: Option<TenantContext>) -> Result<RequireRole<T>, AppError> {
        let mut request = Request::builder().body(()).unwrap();
        if let Some(ctx) = ctx {
            request.extensions_mut().insert(ctx);
        }
        let (mut parts, _) = request.into_parts();
        RequireRole::<T>::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn owner_routes_reject_portal_customers() {
        let owner = TenantContext::owner(Uuid::new_v4(), Uuid::new_v4());
        let customer = TenantContext {
            role: MemberRole::Customer,
            customer_id: Some(Uuid::new_v4()),
            ..owner
        };

        assert!(extract::<Owner>(Some(owner)).await.is_ok());
        assert!(matches!(extract::<Owner>(Some(customer)).await, Err(AppError::Forbidden)));
        assert!(extract::<PortalCustomer>(Some(customer)).await.is_ok());
        assert!(matches!(extract::<Owner>(None).await, Err(AppError::MissingTenant)));
    }
}
