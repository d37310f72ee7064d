//src/main.rs

use anyhow::Context;
use axum::{
    middleware as axum_middleware,
    routing::{get, patch, post, put},
    Router,
};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod common;
mod config;
mod db;
mod docs;
mod handlers;
mod middleware;
mod models;
mod services;

#[cfg(test)]
mod test_utils;

use crate::config::{AppState, Settings};
use crate::docs::ApiDoc;
use crate::middleware::auth::{auth_guard, tenant_guard};

fn app(app_state: AppState) -> Router {
    // Rotas que só exigem o token (o usuário ainda não tem loja selecionada)
    let user_routes = Router::new()
        .route("/api/businesses"
               ,post(handlers::businesses::create_business)
               .get(handlers::businesses::list_my_businesses)
        )
        .route("/api/portal/businesses/{business_id}/register"
               ,post(handlers::portal::register)
        )
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    let tenant_routes = Router::new()
        .route("/settings"
               ,get(handlers::businesses::get_settings)
               .put(handlers::businesses::update_settings)
        )
        // Tutores e pets
        .route("/customers"
               ,post(handlers::customers::create_customer)
               .get(handlers::customers::list_customers)
        )
        .route("/customers/{id}"
               ,get(handlers::customers::get_customer)
               .put(handlers::customers::update_customer)
               .delete(handlers::customers::delete_customer)
        )
        .route("/pets"
               ,post(handlers::customers::create_pet)
               .get(handlers::customers::list_pets)
        )
        .route("/pets/{id}"
               ,get(handlers::customers::get_pet)
               .put(handlers::customers::update_pet)
               .delete(handlers::customers::delete_pet)
        )
        // Catálogo
        .route("/services"
               ,post(handlers::catalog::create_service)
               .get(handlers::catalog::list_services)
        )
        .route("/services/{id}", put(handlers::catalog::update_service))
        .route("/products"
               ,post(handlers::catalog::create_product)
               .get(handlers::catalog::list_products)
        )
        .route("/products/low-stock", get(handlers::catalog::list_low_stock))
        .route("/products/{id}"
               ,get(handlers::catalog::get_product)
               .put(handlers::catalog::update_product)
        )
        .route("/products/{id}/restock", post(handlers::catalog::restock_product))
        // Agenda
        .route("/appointments"
               ,post(handlers::appointments::book_appointment)
               .get(handlers::appointments::list_appointments)
        )
        .route("/appointments/{id}", get(handlers::appointments::get_appointment))
        .route("/appointments/{id}/schedule", put(handlers::appointments::reschedule_appointment))
        .route("/appointments/{id}/status", patch(handlers::appointments::change_status))
        // PDV
        .route("/sales"
               ,post(handlers::sales::checkout)
               .get(handlers::sales::list_sales)
        )
        .route("/sales/{id}", get(handlers::sales::get_sale))
        .route("/sales/{id}/void", post(handlers::sales::void_sale))
        // Relatórios
        .route("/reports/monthly", get(handlers::reports::monthly_report))
        .route("/dashboard/summary", get(handlers::reports::dashboard_summary))
        // Portal do cliente
        .route("/portal/pets", get(handlers::portal::my_pets))
        .route("/portal/appointments"
               ,get(handlers::portal::my_appointments)
               .post(handlers::portal::request_appointment)
        )
        .route("/portal/appointments/{id}/cancel", post(handlers::portal::cancel_appointment))
        // Aplica o middleware de Auth + Tenancy em tudo
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            tenant_guard,
        ));

    Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .merge(user_routes)
        .nest("/api", tenant_routes)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .with_state(app_state)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Falha ao escutar o sinal de desligamento: {}", e);
    }
    tracing::info!("Sinal recebido, encerrando o servidor...");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    let settings = Settings::from_env().context("Configuração inválida")?;

    let app_state = AppState::new(&settings)
        .await
        .context("Falha ao inicializar o estado da aplicação")?;

    // Faz o app rodar as migrações do SQLx na inicialização
    if let Some(pool) = &app_state.db_pool {
        sqlx::migrate!()
            .run(pool)
            .await
            .context("Falha ao rodar as migrações do banco de dados")?;
        tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");
    }

    let listener = TcpListener::bind(&settings.bind_addr)
        .await
        .with_context(|| format!("Falha ao iniciar o listener TCP em {}", settings.bind_addr))?;
    tracing::info!("🚀 Servidor escutando em {}", listener.local_addr()?);

    axum::serve(listener, app(app_state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Erro no servidor Axum")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
    };
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use uuid::Uuid;

    use crate::{
        common::resilience::StorePolicy,
        config::StoreBackend,
        db::{MemoryStore, PetshopStore},
    };

    const SECRET: &str = "segredo-de-teste";

    fn settings() -> Settings {
        Settings {
            database_url: None,
            jwt_secret: SECRET.into(),
            jwt_audience: "authenticated".into(),
            bind_addr: "127.0.0.1:0".into(),
            db_max_connections: 1,
            store_backend: StoreBackend::Memory,
            store_policy: StorePolicy {
                timeout: Duration::from_millis(500),
                read_retries: 1,
                backoff: Duration::from_millis(1),
            },
        }
    }

    fn test_app() -> Router {
        let store: Arc<dyn PetshopStore> = Arc::new(MemoryStore::new());
        app(AppState::with_store(None, store, &settings()))
    }

    fn token(user_id: Uuid) -> String {
        let claims = json!({
            "sub": user_id,
            "email": "tutor@example.com",
            "role": "authenticated",
            "aud": "authenticated",
            "exp": chrono::Utc::now().timestamp() + 600,
        });
        encode(&Header::default(), &claims, &EncodingKey::from_secret(SECRET.as_bytes())).unwrap()
    }

    fn request(method: &str, uri: &str, user: Uuid, tenant: Option<Uuid>, body: Option<Value>) -> Request<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", token(user)))
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(tenant) = tenant {
            builder = builder.header("x-tenant-id", tenant.to_string());
        }
        let body = body.map(|b| Body::from(b.to_string())).unwrap_or_else(Body::empty);
        builder.body(body).unwrap()
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_needs_no_token() {
        let response = test_app()
            .oneshot(Request::builder().uri("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn tenant_routes_require_a_valid_token_and_membership() {
        let app = test_app();
        let owner = Uuid::new_v4();

        let anonymous = Request::builder().uri("/api/customers").body(Body::empty()).unwrap();
        assert_eq!(app.clone().oneshot(anonymous).await.unwrap().status(), StatusCode::UNAUTHORIZED);

        let created = app
            .clone()
            .oneshot(request(
                "POST",
                "/api/businesses",
                owner,
                None,
                Some(json!({ "name": "Pet Feliz", "email": "loja@example.com", "phone": "11 4002-8922" })),
            ))
            .await
            .unwrap();
        assert_eq!(created.status(), StatusCode::CREATED);
        let business_id: Uuid = json_body(created).await["id"].as_str().unwrap().parse().unwrap();

        let stranger = app
            .clone()
            .oneshot(request("GET", "/api/customers", Uuid::new_v4(), Some(business_id), None))
            .await
            .unwrap();
        assert_eq!(stranger.status(), StatusCode::FORBIDDEN);

        let no_tenant = app.clone().oneshot(request("GET", "/api/customers", owner, None, None)).await.unwrap();
        assert_eq!(no_tenant.status(), StatusCode::BAD_REQUEST);

        let listed = app
            .oneshot(request("GET", "/api/customers", owner, Some(business_id), None))
            .await
            .unwrap();
        assert_eq!(listed.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn portal_customer_flow_over_http() {
        let app = test_app();
        let owner = Uuid::new_v4();
        let tutor = Uuid::new_v4();

        let created = app
            .clone()
            .oneshot(request(
                "POST",
                "/api/businesses",
                owner,
                None,
                Some(json!({ "name": "Pet Feliz", "email": "loja@example.com", "phone": "11 4002-8922" })),
            ))
            .await
            .unwrap();
        let business_id: Uuid = json_body(created).await["id"].as_str().unwrap().parse().unwrap();

        let registered = app
            .clone()
            .oneshot(request(
                "POST",
                &format!("/api/portal/businesses/{business_id}/register"),
                tutor,
                None,
                Some(json!({ "name": "Ana", "phone": "11 98888-7777" })),
            ))
            .await
            .unwrap();
        assert_eq!(registered.status(), StatusCode::CREATED);
        assert_eq!(json_body(registered).await["email"], "tutor@example.com");

        // Cliente do portal não acessa rotas do dono
        let forbidden = app
            .clone()
            .oneshot(request("GET", "/api/customers", tutor, Some(business_id), None))
            .await
            .unwrap();
        assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);

        let mine = app
            .oneshot(request("GET", "/api/portal/appointments", tutor, Some(business_id), None))
            .await
            .unwrap();
        assert_eq!(mine.status(), StatusCode::OK);
        assert_eq!(json_body(mine).await, json!([]));
    }

    #[tokio::test]
    async fn checkout_validates_the_cart_before_touching_stock() {
        let app = test_app();
        let owner = Uuid::new_v4();

        let created = app
            .clone()
            .oneshot(request(
                "POST",
                "/api/businesses",
                owner,
                None,
                Some(json!({ "name": "Pet Feliz", "email": "loja@example.com", "phone": "11 4002-8922" })),
            ))
            .await
            .unwrap();
        let business_id: Uuid = json_body(created).await["id"].as_str().unwrap().parse().unwrap();

        let empty = app
            .clone()
            .oneshot(request(
                "POST",
                "/api/sales",
                owner,
                Some(business_id),
                Some(json!({ "items": [], "paymentMethod": "pix" })),
            ))
            .await
            .unwrap();
        assert_eq!(empty.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = json_body(empty).await;
        assert_eq!(body["code"], "validation_failed");
        assert!(body["details"]["items"].is_array());

        let zero_quantity = app
            .oneshot(request(
                "POST",
                "/api/sales",
                owner,
                Some(business_id),
                Some(json!({
                    "items": [{ "productId": Uuid::new_v4(), "quantity": 0 }],
                    "paymentMethod": "cash",
                })),
            ))
            .await
            .unwrap();
        assert_eq!(zero_quantity.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn errors_are_translated_from_accept_language() {
        let app = test_app();
        let owner = Uuid::new_v4();

        let mut english = request("POST", "/api/businesses", owner, None, Some(json!({ "name": "", "email": "x", "phone": "" })));
        english.headers_mut().insert(header::ACCEPT_LANGUAGE, "en-US,en;q=0.9".parse().unwrap());
        let response = app.oneshot(english).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = json_body(response).await;
        assert_eq!(body["code"], "validation_failed");
        assert!(body["details"]["email"].is_array());
    }
}
