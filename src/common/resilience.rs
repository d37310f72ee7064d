// src/common/resilience.rs

use std::future::Future;
use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};

use crate::common::error::AppError;

// Política aplicada a toda chamada ao store
#[derive(Debug, Clone, Copy)]
pub struct StorePolicy {
    pub timeout: Duration,
    pub read_retries: u32,
    pub backoff: Duration,
}

impl Default for StorePolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            read_retries: 2,
            backoff: Duration::from_millis(100),
        }
    }
}

impl StorePolicy {
    /// Escrita: uma única tentativa, com timeout.
    /// Se o future for abandonado, a transação do store não chega ao commit.
    pub async fn write<T, Fut>(&self, operation: &'static str, call: Fut) -> Result<T, AppError>
    where
        Fut: Future<Output = Result<T, AppError>>,
    {
        tokio::time::timeout(self.timeout, call)
            .await
            .map_err(|_| AppError::Timeout { operation })?
    }

    fn read_backoff(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(self.backoff)
            .with_max_times(self.read_retries as usize)
    }

    /// Leitura idempotente: repete falhas de dependência com backoff exponencial.
    pub async fn read<T, F, Fut>(&self, operation: &'static str, mut call: F) -> Result<T, AppError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, AppError>>,
    {
        let policy = *self;
        (move || {
            let attempt = call();
            async move { policy.write(operation, attempt).await }
        })
        .retry(self.read_backoff())
        .when(AppError::is_retryable)
        .notify(|err: &AppError, wait: Duration| {
            tracing::warn!(operation, ?wait, "Falha transitória no store, tentando de novo: {}", err);
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use backon::BackoffBuilder;
    use std::sync::atomic::{AtomicU32, Ordering};
    use uuid::Uuid;

    fn fast() -> StorePolicy {
        StorePolicy {
            timeout: Duration::from_millis(50),
            read_retries: 2,
            backoff: Duration::from_millis(1),
        }
    }

    #[tokio::test]
    async fn retries_dependency_errors_until_success() {
        let calls = AtomicU32::new(0);
        let result = fast()
            .read("list_products", || async {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(AppError::StoreUnavailable("conexão recusada".into()))
                } else {
                    Ok(7)
                }
            })
            .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_the_retry_budget() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = fast()
            .read("list_products", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(AppError::StoreUnavailable("fora do ar".into()))
            })
            .await;

        assert!(matches!(result, Err(AppError::StoreUnavailable(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn never_retries_domain_errors() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = fast()
            .read("find_pet", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(AppError::NotFound { entity: "pet", id: Uuid::nil() })
            })
            .await;

        assert!(matches!(result, Err(AppError::NotFound { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn backoff_starts_at_the_configured_delay_and_respects_the_budget() {
        let policy = StorePolicy {
            timeout: Duration::from_secs(1),
            read_retries: 3,
            backoff: Duration::from_millis(100),
        };
        let delays: Vec<Duration> = policy.read_backoff().build().collect();

        assert_eq!(delays.len(), 3);
        assert_eq!(delays[0], Duration::from_millis(100));
        assert!(delays.windows(2).all(|w| w[0] <= w[1]));
    }

    #[tokio::test]
    async fn slow_calls_time_out() {
        let result = fast()
            .write("commit_sale", async {
                tokio::time::sleep(Duration::from_millis(500)).await;
                Ok(())
            })
            .await;

        assert!(matches!(result, Err(AppError::Timeout { operation: "commit_sale" })));
    }
}
