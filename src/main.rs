use std::sync::Arc;

use axum::{
    http::{header, Method},
    routing::{get, patch, post},
    Router,
};
use tower_http::cors::{AllowHeaders, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use itinerarios_api::{config::Config, db, routes, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    let config = Arc::new(config);

    let pool = db::create_pool(&config.database_url).await?;
    db::run_migrations(&pool).await?;
    info!("Base de datos conectada y migraciones aplicadas");

    let state = AppState {
        db: pool,
        config: config.clone(),
    };

    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(AllowHeaders::list([header::CONTENT_TYPE, header::ACCEPT]))
        .allow_origin(tower_http::cors::Any);

    let app = Router::new()
        .route("/health", get(routes::health::health_check))
        // Itinerarios
        .route(
            "/itinerarios",
            get(routes::itinerarios::listar).post(routes::itinerarios::crear),
        )
        .route(
            "/itinerarios/{id}",
            get(routes::itinerarios::obtener)
                .put(routes::itinerarios::actualizar)
                .delete(routes::itinerarios::eliminar),
        )
        .route(
            "/itinerarios/{id}/duplicar",
            post(routes::itinerarios::duplicar),
        )
        // Actividades anidadas
        .route(
            "/itinerarios/{id}/actividades",
            post(routes::itinerarios::agregar_actividad),
        )
        .route(
            "/itinerarios/{id}/actividades/{actividad_id}",
            patch(routes::itinerarios::actualizar_actividad)
                .delete(routes::itinerarios::eliminar_actividad),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state);

    let addr = format!("{}:{}", config.host, config.port);
    info!("API de itinerarios escuchando en {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
