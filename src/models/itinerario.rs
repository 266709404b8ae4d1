use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Color de tema por defecto para itinerarios.
pub const COLOR_TEMA_PREDETERMINADO: &str = "#2563eb";
/// Color teal fijo por defecto para actividades.
pub const COLOR_ACTIVIDAD_PREDETERMINADO: &str = "#14b8a6";
pub const TRANSPORTE_PREDETERMINADO: &str = "Avión";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum Prioridad {
    Alta,
    #[default]
    Media,
    Baja,
}

impl std::fmt::Display for Prioridad {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", match self {
            Prioridad::Alta => "alta",
            Prioridad::Media => "media",
            Prioridad::Baja => "baja",
        })
    }
}

impl std::str::FromStr for Prioridad {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "alta" => Ok(Prioridad::Alta),
            "media" => Ok(Prioridad::Media),
            "baja" => Ok(Prioridad::Baja),
            _ => Err(anyhow::anyhow!("Prioridad desconocida: {s}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum EstadoManual {
    #[default]
    Planificado,
    EnCurso,
    Finalizado,
    Archivado,
}

impl std::fmt::Display for EstadoManual {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", match self {
            EstadoManual::Planificado => "planificado",
            EstadoManual::EnCurso => "enCurso",
            EstadoManual::Finalizado => "finalizado",
            EstadoManual::Archivado => "archivado",
        })
    }
}

impl std::str::FromStr for EstadoManual {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "planificado" => Ok(EstadoManual::Planificado),
            "enCurso" => Ok(EstadoManual::EnCurso),
            "finalizado" => Ok(EstadoManual::Finalizado),
            "archivado" => Ok(EstadoManual::Archivado),
            _ => Err(anyhow::anyhow!("Estado desconocido: {s}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum EstadoActividad {
    #[default]
    Pendiente,
    Confirmado,
    Completado,
    Cancelado,
}

impl std::fmt::Display for EstadoActividad {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", match self {
            EstadoActividad::Pendiente => "pendiente",
            EstadoActividad::Confirmado => "confirmado",
            EstadoActividad::Completado => "completado",
            EstadoActividad::Cancelado => "cancelado",
        })
    }
}

impl std::str::FromStr for EstadoActividad {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pendiente" => Ok(EstadoActividad::Pendiente),
            "confirmado" => Ok(EstadoActividad::Confirmado),
            "completado" => Ok(EstadoActividad::Completado),
            "cancelado" => Ok(EstadoActividad::Cancelado),
            _ => Err(anyhow::anyhow!("Estado de actividad desconocido: {s}")),
        }
    }
}

/// Representación de transporte de un itinerario: fechas como cadenas
/// ISO-8601 y etiquetas ya decodificadas. Es también la forma que guarda
/// el espejo local, por lo que los campos llevan valores por defecto
/// tolerantes al cargar instantáneas antiguas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Itinerario {
    pub id: String,
    pub nombre: String,
    pub destino: String,
    pub fecha_inicio: String,
    pub fecha_fin: String,
    #[serde(default)]
    pub presupuesto: i64,
    #[serde(default)]
    pub transporte: String,
    #[serde(default)]
    pub hospedaje: String,
    #[serde(default)]
    pub notas: String,
    #[serde(default)]
    pub etiquetas: Vec<String>,
    #[serde(default)]
    pub prioridad: Prioridad,
    #[serde(default)]
    pub estado_manual: EstadoManual,
    #[serde(default = "color_tema_predeterminado")]
    pub color_tema: String,
    #[serde(default)]
    pub creado_en: String,
    #[serde(default)]
    pub actualizado_en: String,
    #[serde(default)]
    pub actividades: Vec<Actividad>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Actividad {
    pub id: String,
    #[serde(default)]
    pub itinerario_id: String,
    pub titulo: String,
    #[serde(default)]
    pub descripcion: Option<String>,
    #[serde(default)]
    pub ubicacion: Option<String>,
    #[serde(default)]
    pub inicio: Option<String>,
    #[serde(default)]
    pub fin: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub estado: EstadoActividad,
    #[serde(default)]
    pub completado: bool,
    #[serde(default)]
    pub creado_en: String,
    #[serde(default)]
    pub actualizado_en: String,
}

fn color_tema_predeterminado() -> String {
    COLOR_TEMA_PREDETERMINADO.to_string()
}

/// Fila persistida de un itinerario: fechas nativas y etiquetas como
/// texto JSON. Solo el mapeador de serialización la convierte a DTO.
#[derive(Debug, Clone, FromRow)]
pub struct ItinerarioRow {
    pub id: String,
    pub nombre: String,
    pub destino: String,
    pub fecha_inicio: DateTime<Utc>,
    pub fecha_fin: DateTime<Utc>,
    pub presupuesto: Option<i64>,
    pub transporte: Option<String>,
    pub hospedaje: Option<String>,
    pub notas: Option<String>,
    pub etiquetas: Option<String>,
    pub prioridad: String,
    pub estado_manual: String,
    pub color_tema: Option<String>,
    pub creado_en: DateTime<Utc>,
    pub actualizado_en: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct ActividadRow {
    pub id: String,
    pub itinerario_id: String,
    pub titulo: String,
    pub descripcion: Option<String>,
    pub ubicacion: Option<String>,
    pub inicio: Option<DateTime<Utc>>,
    pub fin: Option<DateTime<Utc>>,
    pub color: Option<String>,
    pub estado: String,
    pub completado: bool,
    pub creado_en: DateTime<Utc>,
    pub actualizado_en: DateTime<Utc>,
}

/// Payload de creación de itinerario tal como viaja por la red.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItinerarioPayload {
    pub nombre: String,
    pub destino: String,
    pub fecha_inicio: String,
    pub fecha_fin: String,
    #[serde(default)]
    pub presupuesto: i64,
    #[serde(default = "transporte_predeterminado")]
    pub transporte: String,
    #[serde(default)]
    pub hospedaje: String,
    #[serde(default)]
    pub notas: String,
    #[serde(default)]
    pub etiquetas: Vec<String>,
    #[serde(default)]
    pub prioridad: Prioridad,
    #[serde(default)]
    pub estado_manual: EstadoManual,
    #[serde(default = "color_tema_predeterminado")]
    pub color_tema: String,
}

fn transporte_predeterminado() -> String {
    TRANSPORTE_PREDETERMINADO.to_string()
}

/// Actualización parcial de itinerario. Los campos ausentes no se envían
/// ni se tocan.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ItinerarioParche {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nombre: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destino: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fecha_inicio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fecha_fin: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presupuesto: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transporte: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hospedaje: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notas: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub etiquetas: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prioridad: Option<Prioridad>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estado_manual: Option<EstadoManual>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color_tema: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActividadPayload {
    pub titulo: String,
    #[serde(default)]
    pub descripcion: String,
    #[serde(default)]
    pub ubicacion: String,
    #[serde(default)]
    pub inicio: Option<String>,
    #[serde(default)]
    pub fin: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub estado: EstadoActividad,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ActividadParche {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub titulo: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub descripcion: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ubicacion: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inicio: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fin: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estado: Option<EstadoActividad>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completado: Option<bool>,
}

/// Acepta fechas `YYYY-MM-DD`, `datetime-local` o RFC 3339.
pub fn parsear_fecha(texto: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(texto) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(texto, "%Y-%m-%dT%H:%M:%S") {
        return Some(Utc.from_utc_datetime(&dt));
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(texto, "%Y-%m-%dT%H:%M") {
        return Some(Utc.from_utc_datetime(&dt));
    }
    if let Ok(fecha) = NaiveDate::parse_from_str(texto, "%Y-%m-%d") {
        return Some(Utc.from_utc_datetime(&fecha.and_hms_opt(0, 0, 0)?));
    }
    None
}
