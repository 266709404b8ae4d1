use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;

use crate::models::itinerario::{
    Actividad, ActividadRow, EstadoActividad, EstadoManual, Itinerario, ItinerarioRow, Prioridad,
    COLOR_TEMA_PREDETERMINADO,
};

/// Única frontera donde las etiquetas pasan de texto JSON a arreglo.
/// JSON malformado o un valor que no es arreglo producen una lista vacía,
/// nunca un error.
pub fn decodificar_etiquetas(valor: Option<&str>) -> Vec<String> {
    let Some(texto) = valor else {
        return Vec::new();
    };
    let Ok(parseado) = serde_json::from_str::<Value>(texto) else {
        return Vec::new();
    };
    match parseado {
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::String(s) => s,
                otro => otro.to_string(),
            })
            .filter(|s| !s.is_empty())
            .collect(),
        _ => Vec::new(),
    }
}

/// Inversa: codifica el arreglo de etiquetas a texto JSON persistible.
pub fn codificar_etiquetas(etiquetas: &[String]) -> String {
    serde_json::to_string(etiquetas).unwrap_or_else(|_| "[]".to_string())
}

/// Presupuesto persistible: entero redondeado no negativo.
pub fn ajustar_presupuesto(valor: i64) -> i64 {
    valor.max(0)
}

fn iso(fecha: &DateTime<Utc>) -> String {
    fecha.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Fila persistida → representación de transporte. Los opcionales ausentes
/// se vuelven valores seguros (0 o cadena vacía), nunca nulos en el wire.
pub fn a_dto(registro: ItinerarioRow, actividades: Vec<ActividadRow>) -> Itinerario {
    Itinerario {
        id: registro.id,
        nombre: registro.nombre,
        destino: registro.destino,
        fecha_inicio: iso(&registro.fecha_inicio),
        fecha_fin: iso(&registro.fecha_fin),
        presupuesto: registro.presupuesto.unwrap_or(0).max(0),
        transporte: registro.transporte.unwrap_or_default(),
        hospedaje: registro.hospedaje.unwrap_or_default(),
        notas: registro.notas.unwrap_or_default(),
        etiquetas: decodificar_etiquetas(registro.etiquetas.as_deref()),
        prioridad: registro.prioridad.parse().unwrap_or(Prioridad::Media),
        estado_manual: registro
            .estado_manual
            .parse()
            .unwrap_or(EstadoManual::Planificado),
        color_tema: registro
            .color_tema
            .unwrap_or_else(|| COLOR_TEMA_PREDETERMINADO.to_string()),
        creado_en: iso(&registro.creado_en),
        actualizado_en: iso(&registro.actualizado_en),
        actividades: actividades.into_iter().map(actividad_a_dto).collect(),
    }
}

pub fn actividad_a_dto(registro: ActividadRow) -> Actividad {
    Actividad {
        id: registro.id,
        itinerario_id: registro.itinerario_id,
        titulo: registro.titulo,
        descripcion: registro.descripcion,
        ubicacion: registro.ubicacion,
        inicio: registro.inicio.as_ref().map(iso),
        fin: registro.fin.as_ref().map(iso),
        color: registro.color,
        estado: registro.estado.parse().unwrap_or(EstadoActividad::Pendiente),
        completado: registro.completado,
        creado_en: iso(&registro.creado_en),
        actualizado_en: iso(&registro.actualizado_en),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fila_base() -> ItinerarioRow {
        ItinerarioRow {
            id: "it-1".into(),
            nombre: "Viaje a Tokyo".into(),
            destino: "Tokyo".into(),
            fecha_inicio: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
            fecha_fin: Utc.with_ymd_and_hms(2025, 1, 10, 0, 0, 0).unwrap(),
            presupuesto: None,
            transporte: None,
            hospedaje: None,
            notas: None,
            etiquetas: None,
            prioridad: "alta".into(),
            estado_manual: "planificado".into(),
            color_tema: None,
            creado_en: Utc.with_ymd_and_hms(2024, 12, 1, 0, 0, 0).unwrap(),
            actualizado_en: Utc.with_ymd_and_hms(2024, 12, 1, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn etiquetas_hacen_round_trip_exacto() {
        let etiquetas = vec![
            "playa".to_string(),
            "familia".to_string(),
            "playa".to_string(),
        ];
        let texto = codificar_etiquetas(&etiquetas);
        assert_eq!(decodificar_etiquetas(Some(&texto)), etiquetas);
    }

    #[test]
    fn etiquetas_no_cadena_se_convierten_a_texto() {
        assert_eq!(
            decodificar_etiquetas(Some(r#"["a", 1, true, ""]"#)),
            vec!["a".to_string(), "1".to_string(), "true".to_string()],
        );
    }

    #[test]
    fn etiquetas_corruptas_producen_lista_vacia() {
        assert!(decodificar_etiquetas(Some("json invalido")).is_empty());
        assert!(decodificar_etiquetas(Some(r#"{"not":"array"}"#)).is_empty());
        assert!(decodificar_etiquetas(None).is_empty());
    }

    #[test]
    fn opcionales_ausentes_reciben_valores_seguros() {
        let dto = a_dto(fila_base(), Vec::new());
        assert_eq!(dto.presupuesto, 0);
        assert_eq!(dto.transporte, "");
        assert_eq!(dto.hospedaje, "");
        assert_eq!(dto.notas, "");
        assert!(dto.etiquetas.is_empty());
        assert_eq!(dto.color_tema, COLOR_TEMA_PREDETERMINADO);
        assert_eq!(dto.fecha_inicio, "2025-01-01T00:00:00.000Z");
    }

    #[test]
    fn presupuesto_se_ajusta_a_no_negativo() {
        assert_eq!(ajustar_presupuesto(-50), 0);
        assert_eq!(ajustar_presupuesto(1500), 1500);
    }
}
