// Exportaciones de la biblioteca para el binario, la mitad cliente y las
// pruebas
pub mod client;
pub mod config;
pub mod db;
pub mod models;
pub mod routes;
pub mod services;

use sqlx::SqlitePool;
use std::sync::Arc;

use config::Config;

/// Estado de la aplicación compartido por todos los handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub config: Arc<Config>,
}
