use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::models::itinerario::{
    ActividadParche, ActividadPayload, Itinerario, ItinerarioParche, ItinerarioPayload,
};

/// Fallos del gateway remoto. `Conexion` dispara el repliegue al espejo
/// local; `Rechazado` (validación o no-encontrado) bloquea la acción y se
/// muestra al usuario.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("No se pudo contactar al servidor: {0}")]
    Conexion(String),
    #[error("{mensaje}")]
    Rechazado { status: StatusCode, mensaje: String },
}

impl From<reqwest::Error> for GatewayError {
    fn from(e: reqwest::Error) -> Self {
        GatewayError::Conexion(e.to_string())
    }
}

impl GatewayError {
    pub fn es_conectividad(&self) -> bool {
        matches!(self, GatewayError::Conexion(_))
    }
}

/// Costura entre el controlador de sincronización y la API remota.
#[async_trait]
pub trait ItinerarioGateway: Send + Sync {
    async fn listar(&self) -> Result<Vec<Itinerario>, GatewayError>;
    async fn crear(&self, payload: &ItinerarioPayload) -> Result<Itinerario, GatewayError>;
    async fn actualizar(
        &self,
        id: &str,
        parche: &ItinerarioParche,
    ) -> Result<Itinerario, GatewayError>;
    async fn eliminar(&self, id: &str) -> Result<Itinerario, GatewayError>;
    async fn duplicar(&self, id: &str) -> Result<Itinerario, GatewayError>;
    async fn agregar_actividad(
        &self,
        id: &str,
        payload: &ActividadPayload,
    ) -> Result<Itinerario, GatewayError>;
    async fn actualizar_actividad(
        &self,
        id: &str,
        actividad_id: &str,
        parche: &ActividadParche,
    ) -> Result<Itinerario, GatewayError>;
    async fn eliminar_actividad(
        &self,
        id: &str,
        actividad_id: &str,
    ) -> Result<Itinerario, GatewayError>;
}

/// Cliente delgado sobre la API HTTP de itinerarios.
#[derive(Debug, Clone)]
pub struct HttpGateway {
    http: reqwest::Client,
    base_url: String,
}

impl HttpGateway {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, camino: &str) -> String {
        format!("{}{camino}", self.base_url)
    }

    async fn enviar<T: Serialize + ?Sized>(
        &self,
        metodo: Method,
        camino: &str,
        cuerpo: Option<&T>,
    ) -> Result<reqwest::Response, GatewayError> {
        let mut solicitud = self.http.request(metodo, self.url(camino));
        if let Some(cuerpo) = cuerpo {
            solicitud = solicitud.json(cuerpo);
        }
        let respuesta = solicitud.send().await?;

        if respuesta.status().is_success() {
            return Ok(respuesta);
        }

        let status = respuesta.status();
        let mensaje = respuesta
            .json::<Value>()
            .await
            .ok()
            .and_then(|v| match v.get("error") {
                Some(Value::String(s)) => Some(s.clone()),
                Some(otro) => Some(otro.to_string()),
                None => None,
            })
            .unwrap_or_else(|| format!("El servidor respondió {status}"));
        Err(GatewayError::Rechazado { status, mensaje })
    }

    async fn itinerario<T: Serialize + ?Sized>(
        &self,
        metodo: Method,
        camino: &str,
        cuerpo: Option<&T>,
    ) -> Result<Itinerario, GatewayError> {
        let respuesta = self.enviar(metodo, camino, cuerpo).await?;
        Ok(respuesta.json().await?)
    }
}

#[async_trait]
impl ItinerarioGateway for HttpGateway {
    async fn listar(&self) -> Result<Vec<Itinerario>, GatewayError> {
        let respuesta = self
            .enviar::<()>(Method::GET, "/itinerarios", None)
            .await?;
        Ok(respuesta.json().await?)
    }

    async fn crear(&self, payload: &ItinerarioPayload) -> Result<Itinerario, GatewayError> {
        self.itinerario(Method::POST, "/itinerarios", Some(payload))
            .await
    }

    async fn actualizar(
        &self,
        id: &str,
        parche: &ItinerarioParche,
    ) -> Result<Itinerario, GatewayError> {
        self.itinerario(Method::PUT, &format!("/itinerarios/{id}"), Some(parche))
            .await
    }

    async fn eliminar(&self, id: &str) -> Result<Itinerario, GatewayError> {
        self.itinerario::<()>(Method::DELETE, &format!("/itinerarios/{id}"), None)
            .await
    }

    async fn duplicar(&self, id: &str) -> Result<Itinerario, GatewayError> {
        self.itinerario::<()>(Method::POST, &format!("/itinerarios/{id}/duplicar"), None)
            .await
    }

    async fn agregar_actividad(
        &self,
        id: &str,
        payload: &ActividadPayload,
    ) -> Result<Itinerario, GatewayError> {
        self.itinerario(
            Method::POST,
            &format!("/itinerarios/{id}/actividades"),
            Some(payload),
        )
        .await
    }

    async fn actualizar_actividad(
        &self,
        id: &str,
        actividad_id: &str,
        parche: &ActividadParche,
    ) -> Result<Itinerario, GatewayError> {
        self.itinerario(
            Method::PATCH,
            &format!("/itinerarios/{id}/actividades/{actividad_id}"),
            Some(parche),
        )
        .await
    }

    async fn eliminar_actividad(
        &self,
        id: &str,
        actividad_id: &str,
    ) -> Result<Itinerario, GatewayError> {
        self.itinerario::<()>(
            Method::DELETE,
            &format!("/itinerarios/{id}/actividades/{actividad_id}"),
            None,
        )
        .await
    }
}
