use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};

use crate::models::itinerario::{parsear_fecha, EstadoManual, Itinerario, Prioridad};

/// Criterio de ordenamiento del tablero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Orden {
    #[default]
    FechaAsc,
    FechaDesc,
    Presupuesto,
    Creacion,
}

/// Filtros vivos del tablero. Todos se combinan en conjunción.
#[derive(Debug, Clone, Default)]
pub struct FiltrosItinerario {
    /// Subcadena a buscar, sin distinguir mayúsculas.
    pub texto: String,
    /// Solo itinerarios que inician en esta fecha o después.
    pub fecha: Option<String>,
    pub estado: Option<EstadoManual>,
    pub prioridad: Option<Prioridad>,
    pub orden: Orden,
}

fn fecha_o_epoca(texto: &str) -> DateTime<Utc> {
    parsear_fecha(texto).unwrap_or_default()
}

fn coincide_texto(itinerario: &Itinerario, consulta: &str) -> bool {
    if consulta.is_empty() {
        return true;
    }
    // Un solo texto concatenado: una consulta puede cruzar el límite
    // entre campos.
    let pajar = [
        itinerario.nombre.as_str(),
        itinerario.destino.as_str(),
        itinerario.hospedaje.as_str(),
        itinerario.transporte.as_str(),
        itinerario.notas.as_str(),
        &itinerario.etiquetas.join(" "),
    ]
    .join(" ")
    .to_lowercase();
    pajar.contains(&consulta.to_lowercase())
}

/// Proyección pura sobre la colección: nunca muta el estado del
/// controlador. El orden es estable, por lo que empates conservan el
/// orden de llegada.
pub fn aplicar_filtros(itinerarios: &[Itinerario], filtros: &FiltrosItinerario) -> Vec<Itinerario> {
    let desde = filtros.fecha.as_deref().and_then(parsear_fecha);

    let mut resultado: Vec<Itinerario> = itinerarios
        .iter()
        .filter(|it| coincide_texto(it, &filtros.texto))
        .filter(|it| desde.map_or(true, |limite| fecha_o_epoca(&it.fecha_inicio) >= limite))
        .filter(|it| {
            filtros
                .estado
                .map_or(true, |estado| it.estado_manual == estado)
        })
        .filter(|it| {
            filtros
                .prioridad
                .map_or(true, |prioridad| it.prioridad == prioridad)
        })
        .cloned()
        .collect();

    match filtros.orden {
        Orden::FechaAsc => {
            resultado.sort_by_key(|it| fecha_o_epoca(&it.fecha_inicio));
        }
        Orden::FechaDesc => {
            resultado.sort_by_key(|it| std::cmp::Reverse(fecha_o_epoca(&it.fecha_inicio)));
        }
        Orden::Presupuesto => {
            resultado.sort_by_key(|it| std::cmp::Reverse(it.presupuesto));
        }
        Orden::Creacion => {
            resultado.sort_by_key(|it| std::cmp::Reverse(fecha_o_epoca(&it.creado_en)));
        }
    }
    resultado
}

/// Tarjetas de resumen del encabezado del tablero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resumen {
    pub total: usize,
    /// Viajes que inician dentro de los próximos 30 días.
    pub proximos: usize,
    /// Suma de presupuestos de toda la colección.
    pub presupuesto: i64,
    /// Colores de actividad distintos en uso.
    pub paletas: usize,
}

pub fn resumir(itinerarios: &[Itinerario]) -> Resumen {
    let ahora = Utc::now();
    let limite = ahora + Duration::days(30);

    let proximos = itinerarios
        .iter()
        .filter(|it| {
            parsear_fecha(&it.fecha_inicio)
                .map(|inicio| inicio >= ahora && inicio <= limite)
                .unwrap_or(false)
        })
        .count();

    let paletas: HashSet<&str> = itinerarios
        .iter()
        .flat_map(|it| &it.actividades)
        .filter_map(|actividad| actividad.color.as_deref())
        .collect();

    Resumen {
        total: itinerarios.len(),
        proximos,
        presupuesto: itinerarios.iter().map(|it| it.presupuesto).sum(),
        paletas: paletas.len(),
    }
}
