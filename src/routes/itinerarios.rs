use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};

use crate::{
    services::{
        error::ServiceError,
        itinerarios::ItinerarioService,
        validation,
    },
    AppState,
};

fn respuesta_error(error: ServiceError) -> (StatusCode, Json<Value>) {
    match error {
        ServiceError::Validacion(v) => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": { "issues": v.issues } })),
        ),
        ServiceError::NoEncontrado(mensaje) => {
            (StatusCode::NOT_FOUND, Json(json!({ "error": mensaje })))
        }
        ServiceError::Db(e) => {
            tracing::error!(error = %e, "Fallo de base de datos");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Error interno" })),
            )
        }
    }
}

/// GET /itinerarios — todos, por fecha de inicio ascendente.
pub async fn listar(
    State(state): State<AppState>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    ItinerarioService::listar(&state.db)
        .await
        .map(|lista| Json(serde_json::to_value(lista).unwrap_or_default()))
        .map_err(respuesta_error)
}

/// POST /itinerarios — 201 con el registro creado, 400 con las
/// incidencias de validación.
pub async fn crear(
    State(state): State<AppState>,
    Json(cuerpo): Json<Value>,
) -> Result<(StatusCode, Json<Value>), (StatusCode, Json<Value>)> {
    let datos = validation::validar_itinerario(&cuerpo)
        .map_err(|e| respuesta_error(ServiceError::Validacion(e)))?;

    ItinerarioService::crear(&state.db, &datos)
        .await
        .map(|it| {
            (
                StatusCode::CREATED,
                Json(serde_json::to_value(it).unwrap_or_default()),
            )
        })
        .map_err(respuesta_error)
}

/// GET /itinerarios/{id}
pub async fn obtener(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    ItinerarioService::obtener(&state.db, &id)
        .await
        .map(|it| Json(serde_json::to_value(it).unwrap_or_default()))
        .map_err(respuesta_error)
}

/// PUT /itinerarios/{id}
pub async fn actualizar(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(cuerpo): Json<Value>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let datos = validation::validar_itinerario_parcial(&cuerpo)
        .map_err(|e| respuesta_error(ServiceError::Validacion(e)))?;

    ItinerarioService::actualizar(&state.db, &id, &datos)
        .await
        .map(|it| Json(serde_json::to_value(it).unwrap_or_default()))
        .map_err(respuesta_error)
}

/// DELETE /itinerarios/{id} — devuelve el registro eliminado.
pub async fn eliminar(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    ItinerarioService::eliminar(&state.db, &id)
        .await
        .map(|it| Json(serde_json::to_value(it).unwrap_or_default()))
        .map_err(respuesta_error)
}

/// POST /itinerarios/{id}/duplicar
pub async fn duplicar(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    ItinerarioService::duplicar(&state.db, &id)
        .await
        .map(|it| Json(serde_json::to_value(it).unwrap_or_default()))
        .map_err(respuesta_error)
}

/// POST /itinerarios/{id}/actividades — devuelve el padre actualizado.
pub async fn agregar_actividad(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(cuerpo): Json<Value>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let datos = validation::validar_actividad(&cuerpo)
        .map_err(|e| respuesta_error(ServiceError::Validacion(e)))?;

    ItinerarioService::agregar_actividad(&state.db, &id, &datos)
        .await
        .map(|it| Json(serde_json::to_value(it).unwrap_or_default()))
        .map_err(respuesta_error)
}

/// PATCH /itinerarios/{id}/actividades/{actividad_id}
pub async fn actualizar_actividad(
    State(state): State<AppState>,
    Path((id, actividad_id)): Path<(String, String)>,
    Json(cuerpo): Json<Value>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let parche = validation::validar_actividad_parcial(&cuerpo)
        .map_err(|e| respuesta_error(ServiceError::Validacion(e)))?;

    ItinerarioService::actualizar_actividad(&state.db, &id, &actividad_id, &parche)
        .await
        .map(|it| Json(serde_json::to_value(it).unwrap_or_default()))
        .map_err(respuesta_error)
}

/// DELETE /itinerarios/{id}/actividades/{actividad_id}
pub async fn eliminar_actividad(
    State(state): State<AppState>,
    Path((id, actividad_id)): Path<(String, String)>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    ItinerarioService::eliminar_actividad(&state.db, &id, &actividad_id)
        .await
        .map(|it| Json(serde_json::to_value(it).unwrap_or_default()))
        .map_err(respuesta_error)
}
