use std::collections::HashMap;

use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{
    models::itinerario::{
        ActividadRow, EstadoActividad, Itinerario, ItinerarioRow, COLOR_ACTIVIDAD_PREDETERMINADO,
    },
    services::{
        error::ServiceError,
        serializer,
        validation::{DatosActividad, DatosItinerario, DatosParciales, ParcheActividad},
    },
};

const COLUMNAS_ITINERARIO: &str = "id, nombre, destino, fecha_inicio, fecha_fin, presupuesto, \
     transporte, hospedaje, notas, etiquetas, prioridad, estado_manual, color_tema, \
     creado_en, actualizado_en";

const COLUMNAS_ACTIVIDAD: &str = "id, itinerario_id, titulo, descripcion, ubicacion, inicio, \
     fin, color, estado, completado, creado_en, actualizado_en";

pub struct ItinerarioService;

impl ItinerarioService {
    /// Itinerarios por fecha de inicio ascendente, actividades anidadas
    /// por inicio ascendente.
    pub async fn listar(pool: &SqlitePool) -> Result<Vec<Itinerario>, ServiceError> {
        let filas: Vec<ItinerarioRow> = sqlx::query_as(&format!(
            "SELECT {COLUMNAS_ITINERARIO} FROM itinerarios ORDER BY fecha_inicio ASC"
        ))
        .fetch_all(pool)
        .await?;

        let actividades: Vec<ActividadRow> = sqlx::query_as(&format!(
            "SELECT {COLUMNAS_ACTIVIDAD} FROM actividades ORDER BY inicio ASC"
        ))
        .fetch_all(pool)
        .await?;

        let mut por_itinerario: HashMap<String, Vec<ActividadRow>> = HashMap::new();
        for actividad in actividades {
            por_itinerario
                .entry(actividad.itinerario_id.clone())
                .or_default()
                .push(actividad);
        }

        Ok(filas
            .into_iter()
            .map(|fila| {
                let anidadas = por_itinerario.remove(&fila.id).unwrap_or_default();
                serializer::a_dto(fila, anidadas)
            })
            .collect())
    }

    pub async fn obtener(pool: &SqlitePool, id: &str) -> Result<Itinerario, ServiceError> {
        let fila: Option<ItinerarioRow> = sqlx::query_as(&format!(
            "SELECT {COLUMNAS_ITINERARIO} FROM itinerarios WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;

        let fila = fila.ok_or(ServiceError::NoEncontrado("Itinerario no encontrado"))?;
        let actividades: Vec<ActividadRow> = sqlx::query_as(&format!(
            "SELECT {COLUMNAS_ACTIVIDAD} FROM actividades WHERE itinerario_id = ? ORDER BY inicio ASC"
        ))
        .bind(id)
        .fetch_all(pool)
        .await?;

        Ok(serializer::a_dto(fila, actividades))
    }

    pub async fn crear(
        pool: &SqlitePool,
        datos: &DatosItinerario,
    ) -> Result<Itinerario, ServiceError> {
        let id = Uuid::new_v4().to_string();
        let ahora = Utc::now();

        sqlx::query(
            "INSERT INTO itinerarios (id, nombre, destino, fecha_inicio, fecha_fin, presupuesto, \
             transporte, hospedaje, notas, etiquetas, prioridad, estado_manual, color_tema, \
             creado_en, actualizado_en) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&datos.nombre)
        .bind(&datos.destino)
        .bind(datos.fecha_inicio)
        .bind(datos.fecha_fin)
        .bind(serializer::ajustar_presupuesto(datos.presupuesto))
        .bind(&datos.transporte)
        .bind(&datos.hospedaje)
        .bind(&datos.notas)
        .bind(serializer::codificar_etiquetas(&datos.etiquetas))
        .bind(datos.prioridad.to_string())
        .bind(datos.estado_manual.to_string())
        .bind(&datos.color_tema)
        .bind(ahora)
        .bind(ahora)
        .execute(pool)
        .await?;

        tracing::info!(itinerario = %id, "Itinerario creado");
        Self::obtener(pool, &id).await
    }

    /// Mezcla los campos presentes del parche sobre la fila existente y
    /// sube `actualizado_en`.
    pub async fn actualizar(
        pool: &SqlitePool,
        id: &str,
        datos: &DatosParciales,
    ) -> Result<Itinerario, ServiceError> {
        let fila: Option<ItinerarioRow> = sqlx::query_as(&format!(
            "SELECT {COLUMNAS_ITINERARIO} FROM itinerarios WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;
        let fila = fila.ok_or(ServiceError::NoEncontrado("Itinerario no encontrado"))?;

        let etiquetas = match &datos.etiquetas {
            Some(nuevas) => Some(serializer::codificar_etiquetas(nuevas)),
            None => fila.etiquetas,
        };
        let presupuesto = match datos.presupuesto {
            Some(valor) => Some(serializer::ajustar_presupuesto(valor)),
            None => fila.presupuesto,
        };

        sqlx::query(
            "UPDATE itinerarios SET nombre = ?, destino = ?, fecha_inicio = ?, fecha_fin = ?, \
             presupuesto = ?, transporte = ?, hospedaje = ?, notas = ?, etiquetas = ?, \
             prioridad = ?, estado_manual = ?, color_tema = ?, actualizado_en = ? WHERE id = ?",
        )
        .bind(datos.nombre.as_ref().unwrap_or(&fila.nombre))
        .bind(datos.destino.as_ref().unwrap_or(&fila.destino))
        .bind(datos.fecha_inicio.unwrap_or(fila.fecha_inicio))
        .bind(datos.fecha_fin.unwrap_or(fila.fecha_fin))
        .bind(presupuesto)
        .bind(datos.transporte.clone().or(fila.transporte))
        .bind(datos.hospedaje.clone().or(fila.hospedaje))
        .bind(datos.notas.clone().or(fila.notas))
        .bind(etiquetas)
        .bind(datos.prioridad.unwrap_or_else(|| fila.prioridad.parse().unwrap_or_default()).to_string())
        .bind(
            datos
                .estado_manual
                .unwrap_or_else(|| fila.estado_manual.parse().unwrap_or_default())
                .to_string(),
        )
        .bind(datos.color_tema.clone().or(fila.color_tema))
        .bind(Utc::now())
        .bind(id)
        .execute(pool)
        .await?;

        Self::obtener(pool, id).await
    }

    /// Borra el itinerario y sus actividades; devuelve el registro
    /// eliminado tal como quedó antes del borrado.
    pub async fn eliminar(pool: &SqlitePool, id: &str) -> Result<Itinerario, ServiceError> {
        let eliminado = Self::obtener(pool, id).await?;

        sqlx::query("DELETE FROM actividades WHERE itinerario_id = ?")
            .bind(id)
            .execute(pool)
            .await?;
        sqlx::query("DELETE FROM itinerarios WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await?;

        tracing::info!(itinerario = %id, "Itinerario eliminado");
        Ok(eliminado)
    }

    /// Clona todos los campos salvo identificadores y marcas de tiempo;
    /// las actividades se reclavean y su bandera de completado vuelve a
    /// falso.
    pub async fn duplicar(pool: &SqlitePool, id: &str) -> Result<Itinerario, ServiceError> {
        let fila: Option<ItinerarioRow> = sqlx::query_as(&format!(
            "SELECT {COLUMNAS_ITINERARIO} FROM itinerarios WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;
        let original = fila.ok_or(ServiceError::NoEncontrado("Itinerario no encontrado"))?;

        let actividades: Vec<ActividadRow> = sqlx::query_as(&format!(
            "SELECT {COLUMNAS_ACTIVIDAD} FROM actividades WHERE itinerario_id = ? ORDER BY inicio ASC"
        ))
        .bind(id)
        .fetch_all(pool)
        .await?;

        let nuevo_id = Uuid::new_v4().to_string();
        let ahora = Utc::now();

        sqlx::query(
            "INSERT INTO itinerarios (id, nombre, destino, fecha_inicio, fecha_fin, presupuesto, \
             transporte, hospedaje, notas, etiquetas, prioridad, estado_manual, color_tema, \
             creado_en, actualizado_en) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&nuevo_id)
        .bind(format!("{} (copia)", original.nombre))
        .bind(&original.destino)
        .bind(original.fecha_inicio)
        .bind(original.fecha_fin)
        .bind(original.presupuesto)
        .bind(&original.transporte)
        .bind(&original.hospedaje)
        .bind(&original.notas)
        .bind(&original.etiquetas)
        .bind(&original.prioridad)
        .bind(&original.estado_manual)
        .bind(&original.color_tema)
        .bind(ahora)
        .bind(ahora)
        .execute(pool)
        .await?;

        for actividad in actividades {
            sqlx::query(
                "INSERT INTO actividades (id, itinerario_id, titulo, descripcion, ubicacion, \
                 inicio, fin, color, estado, completado, creado_en, actualizado_en) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(Uuid::new_v4().to_string())
            .bind(&nuevo_id)
            .bind(&actividad.titulo)
            .bind(&actividad.descripcion)
            .bind(&actividad.ubicacion)
            .bind(actividad.inicio)
            .bind(actividad.fin)
            .bind(&actividad.color)
            .bind(&actividad.estado)
            .bind(false)
            .bind(ahora)
            .bind(ahora)
            .execute(pool)
            .await?;
        }

        Self::obtener(pool, &nuevo_id).await
    }

    /// Agrega una actividad y devuelve el itinerario padre actualizado.
    /// En la creación la bandera de completado se deriva del estado
    /// inicial.
    pub async fn agregar_actividad(
        pool: &SqlitePool,
        itinerario_id: &str,
        datos: &DatosActividad,
    ) -> Result<Itinerario, ServiceError> {
        Self::asegurar_existencia(pool, itinerario_id).await?;

        let ahora = Utc::now();
        sqlx::query(
            "INSERT INTO actividades (id, itinerario_id, titulo, descripcion, ubicacion, \
             inicio, fin, color, estado, completado, creado_en, actualizado_en) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(itinerario_id)
        .bind(&datos.titulo)
        .bind(&datos.descripcion)
        .bind(&datos.ubicacion)
        .bind(datos.inicio)
        .bind(datos.fin)
        .bind(
            datos
                .color
                .clone()
                .unwrap_or_else(|| COLOR_ACTIVIDAD_PREDETERMINADO.to_string()),
        )
        .bind(datos.estado.to_string())
        .bind(datos.estado == EstadoActividad::Completado)
        .bind(ahora)
        .bind(ahora)
        .execute(pool)
        .await?;

        Self::tocar(pool, itinerario_id).await?;
        Self::obtener(pool, itinerario_id).await
    }

    pub async fn actualizar_actividad(
        pool: &SqlitePool,
        itinerario_id: &str,
        actividad_id: &str,
        parche: &ParcheActividad,
    ) -> Result<Itinerario, ServiceError> {
        let fila: Option<ActividadRow> = sqlx::query_as(&format!(
            "SELECT {COLUMNAS_ACTIVIDAD} FROM actividades WHERE id = ? AND itinerario_id = ?"
        ))
        .bind(actividad_id)
        .bind(itinerario_id)
        .fetch_optional(pool)
        .await?;
        let fila = fila.ok_or(ServiceError::NoEncontrado("Actividad no encontrada"))?;

        let inicio = match &parche.inicio {
            Some(valor) => *valor,
            None => fila.inicio,
        };
        let fin = match &parche.fin {
            Some(valor) => *valor,
            None => fila.fin,
        };

        sqlx::query(
            "UPDATE actividades SET titulo = ?, descripcion = ?, ubicacion = ?, inicio = ?, \
             fin = ?, color = ?, estado = ?, completado = ?, actualizado_en = ? WHERE id = ?",
        )
        .bind(parche.titulo.as_ref().unwrap_or(&fila.titulo))
        .bind(parche.descripcion.clone().or(fila.descripcion))
        .bind(parche.ubicacion.clone().or(fila.ubicacion))
        .bind(inicio)
        .bind(fin)
        .bind(parche.color.clone().or(fila.color))
        .bind(
            parche
                .estado
                .map(|e| e.to_string())
                .unwrap_or(fila.estado),
        )
        .bind(parche.completado.unwrap_or(fila.completado))
        .bind(Utc::now())
        .bind(actividad_id)
        .execute(pool)
        .await?;

        Self::tocar(pool, itinerario_id).await?;
        Self::obtener(pool, itinerario_id).await
    }

    pub async fn eliminar_actividad(
        pool: &SqlitePool,
        itinerario_id: &str,
        actividad_id: &str,
    ) -> Result<Itinerario, ServiceError> {
        let resultado = sqlx::query("DELETE FROM actividades WHERE id = ? AND itinerario_id = ?")
            .bind(actividad_id)
            .bind(itinerario_id)
            .execute(pool)
            .await?;

        if resultado.rows_affected() == 0 {
            return Err(ServiceError::NoEncontrado("Actividad no encontrada"));
        }

        Self::tocar(pool, itinerario_id).await?;
        Self::obtener(pool, itinerario_id).await
    }

    async fn asegurar_existencia(pool: &SqlitePool, id: &str) -> Result<(), ServiceError> {
        let existe: Option<(String,)> = sqlx::query_as("SELECT id FROM itinerarios WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await?;
        existe
            .map(|_| ())
            .ok_or(ServiceError::NoEncontrado("Itinerario no encontrado"))
    }

    async fn tocar(pool: &SqlitePool, id: &str) -> Result<(), ServiceError> {
        sqlx::query("UPDATE itinerarios SET actualizado_en = ? WHERE id = ?")
            .bind(Utc::now())
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::validation::{validar_actividad, validar_itinerario};
    use serde_json::json;

    async fn pool_de_prueba() -> SqlitePool {
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        crate::db::run_migrations(&pool).await.unwrap();
        pool
    }

    fn datos_madrid() -> crate::services::validation::DatosItinerario {
        validar_itinerario(&json!({
            "nombre": "Viaje a Madrid",
            "destino": "Madrid",
            "fechaInicio": "2024-07-01",
            "fechaFin": "2024-07-10",
            "presupuesto": 1500,
            "colorTema": "#2563eb",
            "etiquetas": []
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn crear_y_listar_itinerario() {
        let pool = pool_de_prueba().await;
        let creado = ItinerarioService::crear(&pool, &datos_madrid()).await.unwrap();

        assert_eq!(creado.presupuesto, 1500);
        assert!(creado.etiquetas.is_empty());
        assert_eq!(creado.fecha_inicio, "2024-07-01T00:00:00.000Z");

        let lista = ItinerarioService::listar(&pool).await.unwrap();
        assert_eq!(lista.len(), 1);
        assert_eq!(lista[0].id, creado.id);
    }

    #[tokio::test]
    async fn listar_ordena_por_fecha_de_inicio() {
        let pool = pool_de_prueba().await;
        let tardio = validar_itinerario(&json!({
            "nombre": "Viaje tardío",
            "destino": "Cusco",
            "fechaInicio": "2024-09-01",
            "fechaFin": "2024-09-10",
            "colorTema": "#fff"
        }))
        .unwrap();
        ItinerarioService::crear(&pool, &tardio).await.unwrap();
        ItinerarioService::crear(&pool, &datos_madrid()).await.unwrap();

        let lista = ItinerarioService::listar(&pool).await.unwrap();
        assert_eq!(lista[0].nombre, "Viaje a Madrid");
        assert_eq!(lista[1].nombre, "Viaje tardío");
    }

    #[tokio::test]
    async fn actualizar_mezcla_campos_presentes() {
        let pool = pool_de_prueba().await;
        let creado = ItinerarioService::crear(&pool, &datos_madrid()).await.unwrap();

        let parche = crate::services::validation::validar_itinerario_parcial(&json!({
            "notas": "Llevar paraguas",
            "etiquetas": ["ciudad", "museos"]
        }))
        .unwrap();
        let actualizado = ItinerarioService::actualizar(&pool, &creado.id, &parche)
            .await
            .unwrap();

        assert_eq!(actualizado.notas, "Llevar paraguas");
        assert_eq!(actualizado.etiquetas, vec!["ciudad", "museos"]);
        // Lo no tocado se conserva.
        assert_eq!(actualizado.nombre, "Viaje a Madrid");
        assert_eq!(actualizado.presupuesto, 1500);
    }

    #[tokio::test]
    async fn actualizar_inexistente_es_404() {
        let pool = pool_de_prueba().await;
        let parche = crate::services::validation::validar_itinerario_parcial(&json!({
            "notas": "x"
        }))
        .unwrap();
        let error = ItinerarioService::actualizar(&pool, "no-existe", &parche)
            .await
            .unwrap_err();
        assert!(matches!(error, ServiceError::NoEncontrado(_)));
    }

    #[tokio::test]
    async fn eliminar_arrastra_actividades() {
        let pool = pool_de_prueba().await;
        let creado = ItinerarioService::crear(&pool, &datos_madrid()).await.unwrap();
        let actividad = validar_actividad(&json!({ "titulo": "Museo del Prado" })).unwrap();
        ItinerarioService::agregar_actividad(&pool, &creado.id, &actividad)
            .await
            .unwrap();

        ItinerarioService::eliminar(&pool, &creado.id).await.unwrap();

        let restantes: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM actividades")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(restantes.0, 0);
        assert!(matches!(
            ItinerarioService::obtener(&pool, &creado.id).await,
            Err(ServiceError::NoEncontrado(_))
        ));
    }

    #[tokio::test]
    async fn duplicar_reclavea_actividades_y_reinicia_completado() {
        let pool = pool_de_prueba().await;
        let creado = ItinerarioService::crear(&pool, &datos_madrid()).await.unwrap();
        let actividad = validar_actividad(&json!({
            "titulo": "Cena de despedida",
            "estado": "completado"
        }))
        .unwrap();
        let padre = ItinerarioService::agregar_actividad(&pool, &creado.id, &actividad)
            .await
            .unwrap();
        assert!(padre.actividades[0].completado);

        let copia = ItinerarioService::duplicar(&pool, &creado.id).await.unwrap();
        assert_eq!(copia.nombre, "Viaje a Madrid (copia)");
        assert_ne!(copia.id, creado.id);
        assert_eq!(copia.actividades.len(), 1);
        assert_ne!(copia.actividades[0].id, padre.actividades[0].id);
        assert!(!copia.actividades[0].completado);
        assert_eq!(copia.actividades[0].estado, EstadoActividad::Completado);
    }

    #[tokio::test]
    async fn agregar_actividad_deriva_completado_y_color() {
        let pool = pool_de_prueba().await;
        let creado = ItinerarioService::crear(&pool, &datos_madrid()).await.unwrap();

        let pendiente = validar_actividad(&json!({ "titulo": "Paseo por El Retiro" })).unwrap();
        let padre = ItinerarioService::agregar_actividad(&pool, &creado.id, &pendiente)
            .await
            .unwrap();
        let actividad = &padre.actividades[0];
        assert!(!actividad.completado);
        assert_eq!(
            actividad.color.as_deref(),
            Some(COLOR_ACTIVIDAD_PREDETERMINADO)
        );
        assert_eq!(actividad.itinerario_id, creado.id);
    }

    #[tokio::test]
    async fn parchar_actividad_no_arrastra_el_estado() {
        let pool = pool_de_prueba().await;
        let creado = ItinerarioService::crear(&pool, &datos_madrid()).await.unwrap();
        let actividad = validar_actividad(&json!({ "titulo": "Tour nocturno" })).unwrap();
        let padre = ItinerarioService::agregar_actividad(&pool, &creado.id, &actividad)
            .await
            .unwrap();
        let actividad_id = padre.actividades[0].id.clone();

        let parche = crate::services::validation::validar_actividad_parcial(&json!({
            "completado": true
        }))
        .unwrap();
        let actualizado =
            ItinerarioService::actualizar_actividad(&pool, &creado.id, &actividad_id, &parche)
                .await
                .unwrap();

        let actividad = &actualizado.actividades[0];
        assert!(actividad.completado);
        assert_eq!(actividad.estado, EstadoActividad::Pendiente);
    }

    #[tokio::test]
    async fn actividad_inexistente_es_404() {
        let pool = pool_de_prueba().await;
        let creado = ItinerarioService::crear(&pool, &datos_madrid()).await.unwrap();

        let error = ItinerarioService::eliminar_actividad(&pool, &creado.id, "no-existe")
            .await
            .unwrap_err();
        assert!(matches!(error, ServiceError::NoEncontrado(_)));
    }
}
