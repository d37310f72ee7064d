// src/config.rs

use std::{env, str::FromStr, sync::Arc, time::Duration};

use anyhow::{bail, Context};
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    common::{i18n::I18nStore, resilience::StorePolicy},
    db::{MemoryStore, PetshopStore, PgStore},
    services::{
        AuthService, BookingService, BusinessService, CatalogService, CustomerService, ReportService,
        SalesService,
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "postgres" => Ok(StoreBackend::Postgres),
            "memory" => Ok(StoreBackend::Memory),
            other => bail!("STORE_BACKEND inválido: '{other}' (use 'postgres' ou 'memory')"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub jwt_audience: String,
    pub bind_addr: String,
    pub db_max_connections: u32,
    pub store_backend: StoreBackend,
    pub store_policy: StorePolicy,
}

// Lê uma variável opcional, aplicando o default quando ausente
fn var_or<T>(name: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{name} possui um valor inválido: '{raw}'")),
        Err(_) => Ok(default),
    }
}

impl Settings {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let store_backend = match env::var("STORE_BACKEND") {
            Ok(raw) => raw.parse()?,
            Err(_) => StoreBackend::Postgres,
        };

        let database_url = env::var("DATABASE_URL").ok();
        if store_backend == StoreBackend::Postgres && database_url.is_none() {
            bail!("DATABASE_URL deve ser definida quando STORE_BACKEND=postgres");
        }

        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET deve ser definido")?;

        let store_policy = StorePolicy {
            timeout: Duration::from_millis(var_or("STORE_TIMEOUT_MS", 5000u64)?),
            read_retries: var_or("STORE_READ_RETRIES", 2u32)?,
            backoff: Duration::from_millis(var_or("STORE_BACKOFF_MS", 100u64)?),
        };

        Ok(Self {
            database_url,
            jwt_secret,
            jwt_audience: env::var("JWT_AUDIENCE").unwrap_or_else(|_| "authenticated".to_string()),
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
            db_max_connections: var_or("DB_MAX_CONNECTIONS", 5u32)?,
            store_backend,
            store_policy,
        })
    }
}

#[derive(Clone)]
pub struct AppState {
    // Só existe com o backend Postgres (migrações rodam sobre ele)
    pub db_pool: Option<PgPool>,
    pub i18n_store: Arc<I18nStore>,

    pub auth_service: AuthService,
    pub business_service: BusinessService,
    pub customer_service: CustomerService,
    pub catalog_service: CatalogService,
    pub booking_service: BookingService,
    pub sales_service: SalesService,
    pub report_service: ReportService,
}

impl AppState {
    pub async fn new(settings: &Settings) -> anyhow::Result<Self> {
        let (db_pool, store): (Option<PgPool>, Arc<dyn PetshopStore>) = match settings.store_backend {
            StoreBackend::Postgres => {
                let url = settings
                    .database_url
                    .as_deref()
                    .context("DATABASE_URL deve ser definida")?;

                let pool = PgPoolOptions::new()
                    .max_connections(settings.db_max_connections)
                    .acquire_timeout(Duration::from_secs(3))
                    .connect(url)
                    .await
                    .context("Falha ao conectar no banco de dados")?;

                tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");
                (Some(pool.clone()), Arc::new(PgStore::new(pool)))
            }
            StoreBackend::Memory => {
                tracing::warn!("Usando o store em memória: os dados somem ao reiniciar");
                (None, Arc::new(MemoryStore::new()))
            }
        };

        Ok(Self::with_store(db_pool, store, settings))
    }

    // --- Monta o gráfico de dependências ---
    pub fn with_store(db_pool: Option<PgPool>, store: Arc<dyn PetshopStore>, settings: &Settings) -> Self {
        let policy = settings.store_policy;

        Self {
            auth_service: AuthService::new(&settings.jwt_secret, &settings.jwt_audience),
            business_service: BusinessService::new(store.clone(), policy),
            customer_service: CustomerService::new(store.clone(), policy),
            catalog_service: CatalogService::new(store.clone(), policy),
            booking_service: BookingService::new(store.clone(), policy),
            sales_service: SalesService::new(store.clone(), policy),
            report_service: ReportService::new(store, policy),
            i18n_store: Arc::new(I18nStore::builtin()),
            db_pool,
        }
    }
}
