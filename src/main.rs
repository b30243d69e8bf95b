use actix_cors::Cors;
use actix_web::{middleware::Compress, web, App, HttpServer};
use std::sync::Arc;
use tracing::{info, Level};
use tracing_actix_web::TracingLogger;
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi; // bring trait into scope for ApiDoc::openapi()
use utoipa_swagger_ui::SwaggerUi;

use circle::openapi::ApiDoc;
use circle::rate_limit::RateLimiterFacade;
use circle::repo::Repo;
use circle::storage::build_image_store;
use circle::{config, AppState, SecurityHeaders};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env automatically only in debug builds; production sets the environment externally.
    if cfg!(debug_assertions) {
        let _ = dotenv::dotenv();
    }

    validate_env_vars();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .init();

    info!("Bootstrapping circle server");
    info!("Frontend URL: {}", std::env::var("FRONTEND_URL").unwrap_or_else(|_| "http://localhost:5173".to_string()));

    let repo = build_repo().await?;

    let image_store = build_image_store().await.map_err(|e| {
        tracing::error!("image store unavailable: {e:#}");
        std::io::Error::new(std::io::ErrorKind::Other, e.to_string())
    })?;

    let rate_limiter = RateLimiterFacade::from_env();
    info!("Rate limiting enabled: {}", rate_limiter.is_some());

    let state = AppState::new(repo, image_store).with_rate_limiter(rate_limiter);
    let openapi = ApiDoc::openapi();
    let security = SecurityHeaders::from_env();
    info!("HSTS enabled: {}", security.enable_hsts);

    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

    let server = HttpServer::new(move || {
        let cors = {
            let mut c = Cors::default()
                // local dev frontends (Vite, CRA)
                .allowed_origin("http://localhost:5173")
                .allowed_origin("http://127.0.0.1:5173")
                .allowed_origin("http://localhost:3000")
                .allowed_origin("http://127.0.0.1:3000")
                .allow_any_header()
                .allowed_methods(["GET", "POST", "PUT", "PATCH", "DELETE", "OPTIONS"])
                .max_age(3600);
            if let Ok(front) = std::env::var("FRONTEND_URL") {
                c = c.allowed_origin(&front);
            }
            c
        };

        App::new()
            .wrap(TracingLogger::default())
            .wrap(Compress::default())
            .wrap(security.clone())
            .wrap(cors)
            .app_data(web::Data::new(state.clone()))
            .configure(config)
            .service(SwaggerUi::new("/docs/{_:.*}").url("/docs/openapi.json", openapi.clone()))
    })
    .bind(&bind_addr)?;

    info!("Listening on http://{bind_addr}");

    server.run().await
}

#[cfg(feature = "postgres-store")]
async fn build_repo() -> std::io::Result<Arc<dyn Repo>> {
    use circle::repo::pg::PgRepo;
    use sqlx::postgres::PgPoolOptions;

    let io_err = |e: String| std::io::Error::new(std::io::ErrorKind::Other, e);
    let db_url = std::env::var("DATABASE_URL").map_err(|_| io_err("DATABASE_URL must be set for postgres-store".into()))?;
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&db_url)
        .await
        .map_err(|e| io_err(format!("failed to connect to Postgres: {e}")))?;
    let repo = PgRepo::new(pool);
    repo.migrate().await.map_err(|e| io_err(format!("migrations failed: {e}")))?;
    info!("Using Postgres repository backend");
    Ok(Arc::new(repo))
}

#[cfg(all(feature = "inmem-store", not(feature = "postgres-store")))]
async fn build_repo() -> std::io::Result<Arc<dyn Repo>> {
    info!("Using in-memory repository backend");
    Ok(Arc::new(circle::repo::inmem::InMemRepo::new()))
}

/// Exit early when required configuration is missing or unsafe.
fn validate_env_vars() {
    use std::env;

    let missing: Vec<&str> = ["JWT_SECRET"].into_iter().filter(|v| env::var(v).is_err()).collect();
    if !missing.is_empty() {
        eprintln!("Missing required environment variables: {:?}", missing);
        eprintln!("Please copy .env.example to .env and configure it");
        std::process::exit(1);
    }

    if let Ok(secret) = env::var("JWT_SECRET") {
        if secret.len() < 32 {
            eprintln!("JWT_SECRET must be at least 32 characters long for security");
            std::process::exit(1);
        }
    }

    if cfg!(feature = "postgres-store") && env::var("DATABASE_URL").is_err() {
        eprintln!("DATABASE_URL is required when built with postgres-store");
        std::process::exit(1);
    }
}
