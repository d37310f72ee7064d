// src/common/db_utils.rs

use sqlx::{PgPool, Postgres, Transaction};

use crate::common::error::AppError;
use crate::middleware::tenancy::TenantContext;

// ---
// Helper RLS: A "Chave" para o Banco de Dados
// ---
/// Abre uma transação e define as variáveis de sessão do tenant (válidas só nela).
pub(crate) async fn begin_scoped(
    pool: &PgPool,
    tenant_ctx: &TenantContext,
) -> Result<Transaction<'static, Postgres>, AppError> {
    // O operador '?' converte automaticamente sqlx::Error -> AppError::DatabaseError
    let mut tx = pool.begin().await?;

    sqlx::query("SELECT set_config('app.tenant_id', $1, true)")
        .bind(tenant_ctx.business_id.to_string())
        .execute(&mut *tx)
        .await?;

    sqlx::query("SELECT set_config('app.user_id', $1, true)")
        .bind(tenant_ctx.user_id.to_string())
        .execute(&mut *tx)
        .await?;

    Ok(tx)
}

/// Violação de chave estrangeira vira "ainda referenciado"; o resto segue como erro de banco.
pub(crate) fn map_fk_violation(e: sqlx::Error, entity: &'static str) -> AppError {
    if let Some(db_err) = e.as_database_error() {
        if db_err.is_foreign_key_violation() {
            return AppError::StillReferenced { entity };
        }
    }
    e.into()
}
