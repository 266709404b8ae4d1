use thiserror::Error;

use crate::services::validation::ValidationError;

/// Taxonomía de errores del servicio: validación (400), no encontrado
/// (404) y base de datos (500). Las rutas hacen el mapeo a HTTP.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Validacion(#[from] ValidationError),
    #[error("{0}")]
    NoEncontrado(&'static str),
    #[error(transparent)]
    Db(#[from] sqlx::Error),
}
