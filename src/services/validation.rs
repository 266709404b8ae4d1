use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::models::itinerario::{
    parsear_fecha, EstadoActividad, EstadoManual, Prioridad, TRANSPORTE_PREDETERMINADO,
};

/// Rechazo estructurado: nunca se corrige un valor en silencio.
#[derive(Debug, Clone, Error, Serialize)]
#[error("{}", self.resumen())]
pub struct ValidationError {
    pub issues: Vec<Incidencia>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Incidencia {
    pub campo: String,
    pub mensaje: String,
}

impl ValidationError {
    fn resumen(&self) -> String {
        self.issues
            .iter()
            .map(|i| format!("{}: {}", i.campo, i.mensaje))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

struct Incidencias(Vec<Incidencia>);

impl Incidencias {
    fn agregar(&mut self, campo: &str, mensaje: impl Into<String>) {
        self.0.push(Incidencia {
            campo: campo.to_string(),
            mensaje: mensaje.into(),
        });
    }

    fn cerrar(self) -> Result<(), ValidationError> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { issues: self.0 })
        }
    }
}

/// Datos de itinerario ya validados, con fechas nativas.
#[derive(Debug, Clone)]
pub struct DatosItinerario {
    pub nombre: String,
    pub destino: String,
    pub fecha_inicio: DateTime<Utc>,
    pub fecha_fin: DateTime<Utc>,
    pub presupuesto: i64,
    pub transporte: String,
    pub hospedaje: String,
    pub notas: String,
    pub etiquetas: Vec<String>,
    pub prioridad: Prioridad,
    pub estado_manual: EstadoManual,
    pub color_tema: String,
}

#[derive(Debug, Clone, Default)]
pub struct DatosParciales {
    pub nombre: Option<String>,
    pub destino: Option<String>,
    pub fecha_inicio: Option<DateTime<Utc>>,
    pub fecha_fin: Option<DateTime<Utc>>,
    pub presupuesto: Option<i64>,
    pub transporte: Option<String>,
    pub hospedaje: Option<String>,
    pub notas: Option<String>,
    pub etiquetas: Option<Vec<String>>,
    pub prioridad: Option<Prioridad>,
    pub estado_manual: Option<EstadoManual>,
    pub color_tema: Option<String>,
}

#[derive(Debug, Clone)]
pub struct DatosActividad {
    pub titulo: String,
    pub descripcion: String,
    pub ubicacion: String,
    pub inicio: Option<DateTime<Utc>>,
    pub fin: Option<DateTime<Utc>>,
    pub color: Option<String>,
    pub estado: EstadoActividad,
}

#[derive(Debug, Clone, Default)]
pub struct ParcheActividad {
    pub titulo: Option<String>,
    pub descripcion: Option<String>,
    pub ubicacion: Option<String>,
    pub inicio: Option<Option<DateTime<Utc>>>,
    pub fin: Option<Option<DateTime<Utc>>>,
    pub color: Option<String>,
    pub estado: Option<EstadoActividad>,
    pub completado: Option<bool>,
}

pub fn es_color_hexadecimal(texto: &str) -> bool {
    let Some(hex) = texto.strip_prefix('#') else {
        return false;
    };
    (hex.len() == 3 || hex.len() == 6) && hex.chars().all(|c| c.is_ascii_hexdigit())
}

fn texto_minimo(
    cuerpo: &Value,
    campo: &str,
    minimo: usize,
    incidencias: &mut Incidencias,
) -> Option<String> {
    match cuerpo.get(campo) {
        Some(Value::String(s)) if s.trim().chars().count() >= minimo => {
            Some(s.trim().to_string())
        }
        Some(Value::String(_)) => {
            incidencias.agregar(campo, format!("Debe tener al menos {minimo} caracteres"));
            None
        }
        _ => {
            incidencias.agregar(campo, "Es obligatorio");
            None
        }
    }
}

fn fecha_requerida(
    cuerpo: &Value,
    campo: &str,
    incidencias: &mut Incidencias,
) -> Option<DateTime<Utc>> {
    match cuerpo.get(campo).and_then(Value::as_str) {
        Some(texto) => match parsear_fecha(texto) {
            Some(fecha) => Some(fecha),
            None => {
                incidencias.agregar(campo, "No es una fecha válida");
                None
            }
        },
        None => {
            incidencias.agregar(campo, "Es obligatorio");
            None
        }
    }
}

fn texto_opcional(cuerpo: &Value, campo: &str, predeterminado: &str) -> String {
    match cuerpo.get(campo) {
        Some(Value::String(s)) => s.clone(),
        _ => predeterminado.to_string(),
    }
}

/// Acepta números enteros o cadenas numéricas; rechaza negativos y
/// fracciones. Ausente o nulo vale 0.
fn presupuesto_no_negativo(cuerpo: &Value, incidencias: &mut Incidencias) -> i64 {
    let valor = match cuerpo.get("presupuesto") {
        None | Some(Value::Null) => return 0,
        Some(v) => v,
    };
    let numero = match valor {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    match numero {
        Some(n) if n >= 0 => n,
        _ => {
            incidencias.agregar("presupuesto", "Debe ser un entero no negativo");
            0
        }
    }
}

fn etiquetas_del_cuerpo(cuerpo: &Value, incidencias: &mut Incidencias) -> Vec<String> {
    match cuerpo.get("etiquetas") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => {
            let mut etiquetas = Vec::with_capacity(items.len());
            for item in items {
                match item {
                    Value::String(s) => etiquetas.push(s.clone()),
                    _ => {
                        incidencias.agregar("etiquetas", "Cada etiqueta debe ser texto");
                        return Vec::new();
                    }
                }
            }
            etiquetas
        }
        Some(_) => {
            incidencias.agregar("etiquetas", "Debe ser un arreglo de textos");
            Vec::new()
        }
    }
}

fn enumerado<T: std::str::FromStr + Default>(
    cuerpo: &Value,
    campo: &str,
    incidencias: &mut Incidencias,
) -> T {
    match cuerpo.get(campo) {
        None | Some(Value::Null) => T::default(),
        Some(Value::String(s)) => match s.parse() {
            Ok(valor) => valor,
            Err(_) => {
                incidencias.agregar(campo, "Valor no reconocido");
                T::default()
            }
        },
        Some(_) => {
            incidencias.agregar(campo, "Valor no reconocido");
            T::default()
        }
    }
}

/// Valida el payload completo de creación. La fecha de regreso anterior a
/// la de inicio se rechaza, nunca se corrige.
pub fn validar_itinerario(cuerpo: &Value) -> Result<DatosItinerario, ValidationError> {
    let mut incidencias = Incidencias(Vec::new());

    let nombre = texto_minimo(cuerpo, "nombre", 3, &mut incidencias);
    let destino = texto_minimo(cuerpo, "destino", 3, &mut incidencias);
    let fecha_inicio = fecha_requerida(cuerpo, "fechaInicio", &mut incidencias);
    let fecha_fin = fecha_requerida(cuerpo, "fechaFin", &mut incidencias);
    let presupuesto = presupuesto_no_negativo(cuerpo, &mut incidencias);
    let etiquetas = etiquetas_del_cuerpo(cuerpo, &mut incidencias);
    let prioridad: Prioridad = enumerado(cuerpo, "prioridad", &mut incidencias);
    let estado_manual: EstadoManual = enumerado(cuerpo, "estadoManual", &mut incidencias);

    let color_tema = match cuerpo.get("colorTema").and_then(Value::as_str) {
        Some(color) if es_color_hexadecimal(color) => color.to_string(),
        Some(_) => {
            incidencias.agregar("colorTema", "El color debe estar en formato hexadecimal");
            String::new()
        }
        None => {
            incidencias.agregar("colorTema", "Es obligatorio");
            String::new()
        }
    };

    if let (Some(inicio), Some(fin)) = (fecha_inicio, fecha_fin) {
        if fin < inicio {
            incidencias.agregar(
                "fechaFin",
                "La fecha de regreso no puede ser anterior a la de inicio.",
            );
        }
    }

    incidencias.cerrar()?;

    Ok(DatosItinerario {
        nombre: nombre.unwrap_or_default(),
        destino: destino.unwrap_or_default(),
        fecha_inicio: fecha_inicio.unwrap_or_default(),
        fecha_fin: fecha_fin.unwrap_or_default(),
        presupuesto,
        transporte: texto_opcional(cuerpo, "transporte", TRANSPORTE_PREDETERMINADO),
        hospedaje: texto_opcional(cuerpo, "hospedaje", ""),
        notas: texto_opcional(cuerpo, "notas", ""),
        etiquetas,
        prioridad,
        estado_manual,
        color_tema,
    })
}

/// Versión parcial para actualizaciones: solo valida lo presente. Si ambas
/// fechas llegan en el parche se aplica el mismo invariante de orden.
pub fn validar_itinerario_parcial(cuerpo: &Value) -> Result<DatosParciales, ValidationError> {
    let mut incidencias = Incidencias(Vec::new());
    let mut datos = DatosParciales::default();

    if cuerpo.get("nombre").is_some() {
        datos.nombre = texto_minimo(cuerpo, "nombre", 3, &mut incidencias);
    }
    if cuerpo.get("destino").is_some() {
        datos.destino = texto_minimo(cuerpo, "destino", 3, &mut incidencias);
    }
    if cuerpo.get("fechaInicio").is_some() {
        datos.fecha_inicio = fecha_requerida(cuerpo, "fechaInicio", &mut incidencias);
    }
    if cuerpo.get("fechaFin").is_some() {
        datos.fecha_fin = fecha_requerida(cuerpo, "fechaFin", &mut incidencias);
    }
    if cuerpo
        .get("presupuesto")
        .is_some_and(|v| !v.is_null())
    {
        datos.presupuesto = Some(presupuesto_no_negativo(cuerpo, &mut incidencias));
    }
    if cuerpo.get("transporte").is_some() {
        datos.transporte = Some(texto_opcional(cuerpo, "transporte", ""));
    }
    if cuerpo.get("hospedaje").is_some() {
        datos.hospedaje = Some(texto_opcional(cuerpo, "hospedaje", ""));
    }
    if cuerpo.get("notas").is_some() {
        datos.notas = Some(texto_opcional(cuerpo, "notas", ""));
    }
    if cuerpo.get("etiquetas").is_some() {
        datos.etiquetas = Some(etiquetas_del_cuerpo(cuerpo, &mut incidencias));
    }
    if cuerpo.get("prioridad").is_some() {
        datos.prioridad = Some(enumerado(cuerpo, "prioridad", &mut incidencias));
    }
    if cuerpo.get("estadoManual").is_some() {
        datos.estado_manual = Some(enumerado(cuerpo, "estadoManual", &mut incidencias));
    }
    if let Some(color) = cuerpo.get("colorTema").and_then(Value::as_str) {
        if es_color_hexadecimal(color) {
            datos.color_tema = Some(color.to_string());
        } else {
            incidencias.agregar("colorTema", "El color debe estar en formato hexadecimal");
        }
    }

    if let (Some(inicio), Some(fin)) = (datos.fecha_inicio, datos.fecha_fin) {
        if fin < inicio {
            incidencias.agregar(
                "fechaFin",
                "La fecha de regreso no puede ser anterior a la de inicio.",
            );
        }
    }

    incidencias.cerrar()?;
    Ok(datos)
}

fn fecha_opcional(
    cuerpo: &Value,
    campo: &str,
    incidencias: &mut Incidencias,
) -> Option<DateTime<Utc>> {
    match cuerpo.get(campo) {
        None | Some(Value::Null) => None,
        Some(Value::String(texto)) if texto.is_empty() => None,
        Some(Value::String(texto)) => match parsear_fecha(texto) {
            Some(fecha) => Some(fecha),
            None => {
                incidencias.agregar(campo, "No es una fecha válida");
                None
            }
        },
        Some(_) => {
            incidencias.agregar(campo, "No es una fecha válida");
            None
        }
    }
}

pub fn validar_actividad(cuerpo: &Value) -> Result<DatosActividad, ValidationError> {
    let mut incidencias = Incidencias(Vec::new());

    let titulo = texto_minimo(cuerpo, "titulo", 3, &mut incidencias);
    let inicio = fecha_opcional(cuerpo, "inicio", &mut incidencias);
    let fin = fecha_opcional(cuerpo, "fin", &mut incidencias);
    let estado: EstadoActividad = enumerado(cuerpo, "estado", &mut incidencias);

    let color = match cuerpo.get("color").and_then(Value::as_str) {
        Some(color) if es_color_hexadecimal(color) => Some(color.to_string()),
        Some(_) => {
            incidencias.agregar("color", "Color inválido");
            None
        }
        None => None,
    };

    incidencias.cerrar()?;

    Ok(DatosActividad {
        titulo: titulo.unwrap_or_default(),
        descripcion: texto_opcional(cuerpo, "descripcion", ""),
        ubicacion: texto_opcional(cuerpo, "ubicacion", ""),
        inicio,
        fin,
        color,
        estado,
    })
}

/// Parche de actividad. `completado` y `estado` son independientes: tocar
/// uno jamás arrastra al otro.
pub fn validar_actividad_parcial(cuerpo: &Value) -> Result<ParcheActividad, ValidationError> {
    let mut incidencias = Incidencias(Vec::new());
    let mut parche = ParcheActividad::default();

    if cuerpo.get("titulo").is_some() {
        parche.titulo = texto_minimo(cuerpo, "titulo", 3, &mut incidencias);
    }
    if cuerpo.get("descripcion").is_some() {
        parche.descripcion = Some(texto_opcional(cuerpo, "descripcion", ""));
    }
    if cuerpo.get("ubicacion").is_some() {
        parche.ubicacion = Some(texto_opcional(cuerpo, "ubicacion", ""));
    }
    if cuerpo.get("inicio").is_some() {
        parche.inicio = Some(fecha_opcional(cuerpo, "inicio", &mut incidencias));
    }
    if cuerpo.get("fin").is_some() {
        parche.fin = Some(fecha_opcional(cuerpo, "fin", &mut incidencias));
    }
    if let Some(color) = cuerpo.get("color").and_then(Value::as_str) {
        if es_color_hexadecimal(color) {
            parche.color = Some(color.to_string());
        } else {
            incidencias.agregar("color", "Color inválido");
        }
    }
    if cuerpo.get("estado").is_some() {
        parche.estado = Some(enumerado(cuerpo, "estado", &mut incidencias));
    }
    if let Some(valor) = cuerpo.get("completado") {
        match valor.as_bool() {
            Some(b) => parche.completado = Some(b),
            None => incidencias.agregar("completado", "Debe ser booleano"),
        }
    }

    incidencias.cerrar()?;
    Ok(parche)
}
