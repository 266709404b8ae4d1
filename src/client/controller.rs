use chrono::{SecondsFormat, Utc};
use serde_json::Value;
use thiserror::Error;

use crate::client::{
    gateway::{GatewayError, ItinerarioGateway},
    mirror::MirrorStore,
    temp_id::{es_id_temporal, generar_id_temporal},
};
use crate::models::itinerario::{
    Actividad, ActividadParche, ActividadPayload, EstadoActividad, Itinerario, ItinerarioParche,
    ItinerarioPayload, COLOR_ACTIVIDAD_PREDETERMINADO, COLOR_TEMA_PREDETERMINADO,
    TRANSPORTE_PREDETERMINADO,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModoSesion {
    EnLinea,
    SinConexion,
}

/// Mensaje para el usuario. Los fallos de conectividad producen avisos
/// informativos, nunca errores: la acción siempre termina, en remoto o en
/// el espejo.
#[derive(Debug, Clone)]
pub struct Aviso {
    pub texto: String,
    pub es_error: bool,
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Remoto(#[from] GatewayError),
    #[error("Itinerario no encontrado")]
    ItinerarioNoEncontrado,
    #[error("Actividad no encontrada")]
    ActividadNoEncontrada,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ResumenImportacion {
    pub remotos: usize,
    pub locales: usize,
    pub omitidos: usize,
}

/// Controlador de sincronización del tablero. Dueño único de la colección
/// en memoria; toda mutación intenta primero el remoto (salvo con
/// identificadores temporales, que por construcción no existen allá) y se
/// repliega al espejo local ante fallos de conectividad. Cada cambio
/// re-persiste la colección completa en el espejo.
pub struct SyncController<G> {
    gateway: G,
    espejo: MirrorStore,
    itinerarios: Vec<Itinerario>,
    modo: ModoSesion,
    aviso: Option<Aviso>,
}

fn ahora_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn opcional(texto: String) -> Option<String> {
    if texto.is_empty() {
        None
    } else {
        Some(texto)
    }
}

fn construir_local(payload: ItinerarioPayload) -> Itinerario {
    let ahora = ahora_iso();
    Itinerario {
        id: generar_id_temporal(),
        nombre: payload.nombre,
        destino: payload.destino,
        fecha_inicio: payload.fecha_inicio,
        fecha_fin: payload.fecha_fin,
        presupuesto: payload.presupuesto.max(0),
        transporte: payload.transporte,
        hospedaje: payload.hospedaje,
        notas: payload.notas,
        etiquetas: payload.etiquetas,
        prioridad: payload.prioridad,
        estado_manual: payload.estado_manual,
        color_tema: payload.color_tema,
        creado_en: ahora.clone(),
        actualizado_en: ahora,
        actividades: Vec::new(),
    }
}

/// Clona todos los campos salvo identificadores y marcas de tiempo; las
/// actividades se reclavean y vuelven a no completadas.
fn clonar_local(original: &Itinerario) -> Itinerario {
    let ahora = ahora_iso();
    let nuevo_id = generar_id_temporal();
    let actividades = original
        .actividades
        .iter()
        .map(|actividad| Actividad {
            id: generar_id_temporal(),
            itinerario_id: nuevo_id.clone(),
            completado: false,
            creado_en: ahora.clone(),
            actualizado_en: ahora.clone(),
            ..actividad.clone()
        })
        .collect();

    Itinerario {
        id: nuevo_id,
        nombre: format!("{} (copia)", original.nombre),
        creado_en: ahora.clone(),
        actualizado_en: ahora,
        actividades,
        ..original.clone()
    }
}

fn aplicar_parche(itinerario: &mut Itinerario, parche: &ItinerarioParche) {
    if let Some(nombre) = &parche.nombre {
        itinerario.nombre = nombre.clone();
    }
    if let Some(destino) = &parche.destino {
        itinerario.destino = destino.clone();
    }
    if let Some(fecha) = &parche.fecha_inicio {
        itinerario.fecha_inicio = fecha.clone();
    }
    if let Some(fecha) = &parche.fecha_fin {
        itinerario.fecha_fin = fecha.clone();
    }
    if let Some(presupuesto) = parche.presupuesto {
        itinerario.presupuesto = presupuesto.max(0);
    }
    if let Some(transporte) = &parche.transporte {
        itinerario.transporte = transporte.clone();
    }
    if let Some(hospedaje) = &parche.hospedaje {
        itinerario.hospedaje = hospedaje.clone();
    }
    if let Some(notas) = &parche.notas {
        itinerario.notas = notas.clone();
    }
    if let Some(etiquetas) = &parche.etiquetas {
        itinerario.etiquetas = etiquetas.clone();
    }
    if let Some(prioridad) = parche.prioridad {
        itinerario.prioridad = prioridad;
    }
    if let Some(estado) = parche.estado_manual {
        itinerario.estado_manual = estado;
    }
    if let Some(color) = &parche.color_tema {
        itinerario.color_tema = color.clone();
    }
    itinerario.actualizado_en = ahora_iso();
}

fn actividad_local(itinerario_id: &str, payload: ActividadPayload) -> Actividad {
    let ahora = ahora_iso();
    Actividad {
        id: generar_id_temporal(),
        itinerario_id: itinerario_id.to_string(),
        titulo: payload.titulo,
        descripcion: opcional(payload.descripcion),
        ubicacion: opcional(payload.ubicacion),
        inicio: payload.inicio,
        fin: payload.fin,
        color: Some(
            payload
                .color
                .unwrap_or_else(|| COLOR_ACTIVIDAD_PREDETERMINADO.to_string()),
        ),
        completado: payload.estado == EstadoActividad::Completado,
        estado: payload.estado,
        creado_en: ahora.clone(),
        actualizado_en: ahora,
    }
}

/// Elementos importados con campos mínimos ausentes se descartan; el
/// resto recibe valores por defecto.
fn normalizar_item(item: &Value) -> Option<ItinerarioPayload> {
    let objeto = item.as_object()?;
    let requerido = |campo: &str| {
        objeto
            .get(campo)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(String::from)
    };

    Some(ItinerarioPayload {
        nombre: requerido("nombre")?,
        destino: requerido("destino")?,
        fecha_inicio: requerido("fechaInicio")?,
        fecha_fin: requerido("fechaFin")?,
        presupuesto: objeto
            .get("presupuesto")
            .and_then(Value::as_i64)
            .unwrap_or(0)
            .max(0),
        transporte: requerido("transporte").unwrap_or_else(|| TRANSPORTE_PREDETERMINADO.into()),
        hospedaje: requerido("hospedaje").unwrap_or_default(),
        notas: requerido("notas").unwrap_or_default(),
        etiquetas: objeto
            .get("etiquetas")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default(),
        prioridad: requerido("prioridad")
            .and_then(|s| s.parse().ok())
            .unwrap_or_default(),
        estado_manual: requerido("estadoManual")
            .and_then(|s| s.parse().ok())
            .unwrap_or_default(),
        color_tema: requerido("colorTema").unwrap_or_else(|| COLOR_TEMA_PREDETERMINADO.into()),
    })
}

impl<G: ItinerarioGateway> SyncController<G> {
    pub fn new(gateway: G, espejo: MirrorStore) -> Self {
        Self {
            gateway,
            espejo,
            itinerarios: Vec::new(),
            modo: ModoSesion::EnLinea,
            aviso: None,
        }
    }

    pub fn itinerarios(&self) -> &[Itinerario] {
        &self.itinerarios
    }

    pub fn modo(&self) -> ModoSesion {
        self.modo
    }

    pub fn tomar_aviso(&mut self) -> Option<Aviso> {
        self.aviso.take()
    }

    pub fn ultima_sincronizacion(&self) -> Option<String> {
        self.espejo.ultima_sincronizacion()
    }

    /// Serializa la colección actual para exportarla como archivo.
    pub fn exportar(&self) -> String {
        serde_json::to_string_pretty(&self.itinerarios).unwrap_or_else(|_| "[]".to_string())
    }

    fn persistir(&self) {
        self.espejo.guardar(&self.itinerarios);
    }

    fn indice(&self, id: &str) -> Option<usize> {
        self.itinerarios.iter().position(|it| it.id == id)
    }

    fn avisar(&mut self, texto: impl Into<String>) {
        self.aviso = Some(Aviso {
            texto: texto.into(),
            es_error: false,
        });
    }

    fn avisar_error(&mut self, texto: impl Into<String>) {
        self.aviso = Some(Aviso {
            texto: texto.into(),
            es_error: true,
        });
    }

    fn repliegue(&mut self, texto: &str) {
        self.modo = ModoSesion::SinConexion;
        tracing::info!("{texto}");
        self.avisar(texto.to_string());
    }

    /// Carga inicial. Una colección remota vacía puede ser una base vacía
    /// de verdad o un remoto inalcanzable; ante la duda se carga el
    /// espejo local.
    pub fn hidratar(&mut self, iniciales: Vec<Itinerario>) {
        if iniciales.is_empty() {
            if let Some(respaldo) = self.espejo.cargar() {
                if !respaldo.is_empty() {
                    self.itinerarios = respaldo;
                    self.avisar("Mostrando datos guardados localmente.");
                    return;
                }
            }
            self.itinerarios = iniciales;
            return;
        }
        self.itinerarios = iniciales;
        self.persistir();
    }

    /// Vuelve a pedir la lista remota; ante fallo de conectividad sirve
    /// el espejo.
    pub async fn refrescar(&mut self) {
        match self.gateway.listar().await {
            Ok(lista) => {
                self.modo = ModoSesion::EnLinea;
                self.hidratar(lista);
            }
            Err(e) if e.es_conectividad() => {
                if let Some(respaldo) = self.espejo.cargar() {
                    self.itinerarios = respaldo;
                }
                self.repliegue("Sin conexión: mostrando datos locales.");
            }
            Err(e) => self.avisar_error(e.to_string()),
        }
    }

    pub async fn crear(&mut self, payload: ItinerarioPayload) -> Result<Itinerario, SyncError> {
        let resultado = match self.gateway.crear(&payload).await {
            Ok(creado) => {
                self.modo = ModoSesion::EnLinea;
                self.avisar("Itinerario guardado.");
                creado
            }
            Err(e) if e.es_conectividad() => {
                let local = construir_local(payload);
                self.repliegue("Sin conexión: itinerario guardado localmente.");
                local
            }
            Err(e) => {
                self.avisar_error(e.to_string());
                return Err(e.into());
            }
        };

        self.itinerarios.insert(0, resultado.clone());
        self.persistir();
        Ok(resultado)
    }

    pub async fn actualizar(
        &mut self,
        id: &str,
        parche: ItinerarioParche,
    ) -> Result<Itinerario, SyncError> {
        let indice = self.indice(id).ok_or(SyncError::ItinerarioNoEncontrado)?;

        if !es_id_temporal(id) {
            match self.gateway.actualizar(id, &parche).await {
                Ok(actualizado) => {
                    self.modo = ModoSesion::EnLinea;
                    self.itinerarios[indice] = actualizado.clone();
                    self.persistir();
                    self.avisar("Itinerario actualizado.");
                    return Ok(actualizado);
                }
                Err(e) if e.es_conectividad() => {}
                Err(e) => {
                    self.avisar_error(e.to_string());
                    return Err(e.into());
                }
            }
        }

        aplicar_parche(&mut self.itinerarios[indice], &parche);
        self.repliegue("Sin conexión: cambios guardados localmente.");
        self.persistir();
        Ok(self.itinerarios[indice].clone())
    }

    pub async fn eliminar(&mut self, id: &str) -> Result<(), SyncError> {
        let indice = self.indice(id).ok_or(SyncError::ItinerarioNoEncontrado)?;

        if !es_id_temporal(id) {
            match self.gateway.eliminar(id).await {
                Ok(_) => {
                    self.modo = ModoSesion::EnLinea;
                    self.avisar("Itinerario eliminado.");
                }
                Err(e) if e.es_conectividad() => {
                    self.repliegue("Sin conexión: eliminado localmente.");
                }
                Err(e) => {
                    self.avisar_error(e.to_string());
                    return Err(e.into());
                }
            }
        } else {
            self.repliegue("Sin conexión: eliminado localmente.");
        }

        self.itinerarios.remove(indice);
        self.persistir();
        Ok(())
    }

    pub async fn duplicar(&mut self, id: &str) -> Result<Itinerario, SyncError> {
        let indice = self.indice(id).ok_or(SyncError::ItinerarioNoEncontrado)?;

        let copia = if es_id_temporal(id) {
            let copia = clonar_local(&self.itinerarios[indice]);
            self.repliegue("Sin conexión: duplicado localmente.");
            copia
        } else {
            match self.gateway.duplicar(id).await {
                Ok(copia) => {
                    self.modo = ModoSesion::EnLinea;
                    self.avisar("Itinerario duplicado.");
                    copia
                }
                Err(e) if e.es_conectividad() => {
                    let copia = clonar_local(&self.itinerarios[indice]);
                    self.repliegue("Sin conexión: duplicado localmente.");
                    copia
                }
                Err(e) => {
                    self.avisar_error(e.to_string());
                    return Err(e.into());
                }
            }
        };

        self.itinerarios.insert(0, copia.clone());
        self.persistir();
        Ok(copia)
    }

    pub async fn agregar_actividad(
        &mut self,
        id: &str,
        payload: ActividadPayload,
    ) -> Result<(), SyncError> {
        let indice = self.indice(id).ok_or(SyncError::ItinerarioNoEncontrado)?;

        if !es_id_temporal(id) {
            match self.gateway.agregar_actividad(id, &payload).await {
                Ok(actualizado) => {
                    self.modo = ModoSesion::EnLinea;
                    self.itinerarios[indice] = actualizado;
                    self.persistir();
                    self.avisar("Actividad registrada.");
                    return Ok(());
                }
                Err(e) if e.es_conectividad() => {}
                Err(e) => {
                    self.avisar_error(e.to_string());
                    return Err(e.into());
                }
            }
        }

        let actividad = actividad_local(id, payload);
        let itinerario = &mut self.itinerarios[indice];
        itinerario.actividades.push(actividad);
        itinerario.actualizado_en = ahora_iso();
        self.repliegue("Sin conexión: actividad guardada localmente.");
        self.persistir();
        Ok(())
    }

    pub async fn alternar_actividad(
        &mut self,
        id: &str,
        actividad_id: &str,
    ) -> Result<(), SyncError> {
        let indice = self.indice(id).ok_or(SyncError::ItinerarioNoEncontrado)?;
        let completado = self.itinerarios[indice]
            .actividades
            .iter()
            .find(|a| a.id == actividad_id)
            .map(|a| a.completado)
            .ok_or(SyncError::ActividadNoEncontrada)?;

        if !es_id_temporal(id) && !es_id_temporal(actividad_id) {
            let parche = ActividadParche {
                completado: Some(!completado),
                ..ActividadParche::default()
            };
            match self
                .gateway
                .actualizar_actividad(id, actividad_id, &parche)
                .await
            {
                Ok(actualizado) => {
                    self.modo = ModoSesion::EnLinea;
                    self.itinerarios[indice] = actualizado;
                    self.persistir();
                    return Ok(());
                }
                Err(e) if e.es_conectividad() => {}
                Err(e) => {
                    self.avisar_error(e.to_string());
                    return Err(e.into());
                }
            }
        }

        let ahora = ahora_iso();
        let itinerario = &mut self.itinerarios[indice];
        if let Some(actividad) = itinerario
            .actividades
            .iter_mut()
            .find(|a| a.id == actividad_id)
        {
            actividad.completado = !completado;
            actividad.actualizado_en = ahora.clone();
        }
        itinerario.actualizado_en = ahora;
        self.repliegue("Sin conexión: cambios guardados localmente.");
        self.persistir();
        Ok(())
    }

    pub async fn eliminar_actividad(
        &mut self,
        id: &str,
        actividad_id: &str,
    ) -> Result<(), SyncError> {
        let indice = self.indice(id).ok_or(SyncError::ItinerarioNoEncontrado)?;
        if !self.itinerarios[indice]
            .actividades
            .iter()
            .any(|a| a.id == actividad_id)
        {
            return Err(SyncError::ActividadNoEncontrada);
        }

        if !es_id_temporal(id) && !es_id_temporal(actividad_id) {
            match self.gateway.eliminar_actividad(id, actividad_id).await {
                Ok(actualizado) => {
                    self.modo = ModoSesion::EnLinea;
                    self.itinerarios[indice] = actualizado;
                    self.persistir();
                    return Ok(());
                }
                Err(e) if e.es_conectividad() => {}
                Err(e) => {
                    self.avisar_error(e.to_string());
                    return Err(e.into());
                }
            }
        }

        let itinerario = &mut self.itinerarios[indice];
        itinerario.actividades.retain(|a| a.id != actividad_id);
        itinerario.actualizado_en = ahora_iso();
        self.repliegue("Sin conexión: actividad quitada localmente.");
        self.persistir();
        Ok(())
    }

    /// Importación masiva: la política de intento-remoto por elemento
    /// permite resultados mixtos; la unión se antepone a la colección
    /// existente.
    pub async fn importar(&mut self, items: &[Value]) -> ResumenImportacion {
        let mut resumen = ResumenImportacion::default();
        let mut nuevos: Vec<Itinerario> = Vec::new();

        for item in items {
            let Some(payload) = normalizar_item(item) else {
                resumen.omitidos += 1;
                continue;
            };

            match self.gateway.crear(&payload).await {
                Ok(creado) => {
                    self.modo = ModoSesion::EnLinea;
                    resumen.remotos += 1;
                    nuevos.push(creado);
                }
                Err(e) if e.es_conectividad() => {
                    self.modo = ModoSesion::SinConexion;
                    resumen.locales += 1;
                    nuevos.push(construir_local(payload));
                }
                Err(_) => resumen.omitidos += 1,
            }
        }

        let existentes = std::mem::take(&mut self.itinerarios);
        nuevos.extend(existentes);
        self.itinerarios = nuevos;
        self.persistir();
        self.avisar(format!(
            "Importación completada: {} en remoto, {} locales, {} omitidos.",
            resumen.remotos, resumen.locales, resumen.omitidos
        ));
        resumen
    }

    /// Vacía la colección aplicando la política de borrado por elemento.
    pub async fn limpiar_todo(&mut self) {
        let ids: Vec<String> = self.itinerarios.iter().map(|it| it.id.clone()).collect();
        for id in ids {
            if es_id_temporal(&id) {
                continue;
            }
            match self.gateway.eliminar(&id).await {
                Ok(_) => self.modo = ModoSesion::EnLinea,
                Err(e) if e.es_conectividad() => self.modo = ModoSesion::SinConexion,
                Err(e) => tracing::warn!(error = %e, "No se pudo eliminar en remoto"),
            }
        }
        self.itinerarios.clear();
        self.persistir();
        self.avisar("Se eliminó toda la información.");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::gateway::GatewayError;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
    use std::sync::Arc;
    use tempfile::TempDir;

    /// Gateway en memoria: responde registros canónicos cuando está
    /// conectado y fallos de conectividad cuando no.
    #[derive(Clone, Default)]
    struct GatewayFalso {
        caido: Arc<AtomicBool>,
        rechaza: Arc<AtomicBool>,
        llamadas: Arc<AtomicU32>,
        secuencia: Arc<AtomicU32>,
        alterno: Arc<AtomicBool>,
    }

    impl GatewayFalso {
        fn conectado() -> Self {
            Self::default()
        }

        fn sin_conexion() -> Self {
            let g = Self::default();
            g.caido.store(true, Ordering::SeqCst);
            g
        }

        fn revisar(&self) -> Result<(), GatewayError> {
            let n = self.llamadas.fetch_add(1, Ordering::SeqCst);
            if self.alterno.load(Ordering::SeqCst) && n % 2 == 1 {
                return Err(GatewayError::Conexion("conexión rehusada".into()));
            }
            if self.caido.load(Ordering::SeqCst) {
                return Err(GatewayError::Conexion("conexión rehusada".into()));
            }
            if self.rechaza.load(Ordering::SeqCst) {
                return Err(GatewayError::Rechazado {
                    status: reqwest::StatusCode::BAD_REQUEST,
                    mensaje: "Payload inválido".into(),
                });
            }
            Ok(())
        }

        fn canonico(&self, payload: &ItinerarioPayload) -> Itinerario {
            let n = self.secuencia.fetch_add(1, Ordering::SeqCst) + 1;
            let mut it = construir_local(payload.clone());
            it.id = format!("srv-{n}");
            it
        }
    }

    #[async_trait]
    impl ItinerarioGateway for GatewayFalso {
        async fn listar(&self) -> Result<Vec<Itinerario>, GatewayError> {
            self.revisar()?;
            Ok(Vec::new())
        }

        async fn crear(&self, payload: &ItinerarioPayload) -> Result<Itinerario, GatewayError> {
            self.revisar()?;
            Ok(self.canonico(payload))
        }

        async fn actualizar(
            &self,
            id: &str,
            parche: &ItinerarioParche,
        ) -> Result<Itinerario, GatewayError> {
            self.revisar()?;
            let mut it = plantilla(id);
            aplicar_parche(&mut it, parche);
            Ok(it)
        }

        async fn eliminar(&self, id: &str) -> Result<Itinerario, GatewayError> {
            self.revisar()?;
            Ok(plantilla(id))
        }

        async fn duplicar(&self, id: &str) -> Result<Itinerario, GatewayError> {
            self.revisar()?;
            let mut it = plantilla("srv-copia");
            it.nombre = format!("{} (copia)", plantilla(id).nombre);
            Ok(it)
        }

        async fn agregar_actividad(
            &self,
            id: &str,
            payload: &ActividadPayload,
        ) -> Result<Itinerario, GatewayError> {
            self.revisar()?;
            let mut it = plantilla(id);
            let mut actividad = actividad_local(id, payload.clone());
            actividad.id = "srv-act-1".into();
            it.actividades.push(actividad);
            Ok(it)
        }

        async fn actualizar_actividad(
            &self,
            id: &str,
            actividad_id: &str,
            parche: &ActividadParche,
        ) -> Result<Itinerario, GatewayError> {
            self.revisar()?;
            let mut it = plantilla(id);
            let mut actividad = actividad_local(id, payload_actividad("Actividad remota"));
            actividad.id = actividad_id.to_string();
            if let Some(completado) = parche.completado {
                actividad.completado = completado;
            }
            it.actividades.push(actividad);
            Ok(it)
        }

        async fn eliminar_actividad(
            &self,
            id: &str,
            _actividad_id: &str,
        ) -> Result<Itinerario, GatewayError> {
            self.revisar()?;
            Ok(plantilla(id))
        }
    }

    fn plantilla(id: &str) -> Itinerario {
        let mut it = construir_local(payload_madrid());
        it.id = id.to_string();
        it
    }

    fn payload_madrid() -> ItinerarioPayload {
        ItinerarioPayload {
            nombre: "Viaje a Madrid".into(),
            destino: "Madrid".into(),
            fecha_inicio: "2024-07-01".into(),
            fecha_fin: "2024-07-10".into(),
            presupuesto: 1500,
            transporte: "Avión".into(),
            hospedaje: "Hotel".into(),
            notas: String::new(),
            etiquetas: Vec::new(),
            prioridad: Default::default(),
            estado_manual: Default::default(),
            color_tema: "#2563eb".into(),
        }
    }

    fn payload_actividad(titulo: &str) -> ActividadPayload {
        ActividadPayload {
            titulo: titulo.into(),
            descripcion: String::new(),
            ubicacion: String::new(),
            inicio: None,
            fin: None,
            color: None,
            estado: Default::default(),
        }
    }

    fn controlador(gateway: GatewayFalso, dir: &TempDir) -> SyncController<GatewayFalso> {
        SyncController::new(gateway, MirrorStore::new(dir.path()))
    }

    #[tokio::test]
    async fn crear_en_linea_adopta_el_registro_canonico() {
        let dir = TempDir::new().unwrap();
        let mut ctrl = controlador(GatewayFalso::conectado(), &dir);

        let creado = ctrl.crear(payload_madrid()).await.unwrap();

        assert_eq!(creado.id, "srv-1");
        assert!(!es_id_temporal(&creado.id));
        assert_eq!(ctrl.modo(), ModoSesion::EnLinea);
        assert_eq!(ctrl.itinerarios()[0].id, "srv-1");
        // El espejo refleja cada cambio.
        let respaldo = MirrorStore::new(dir.path()).cargar().unwrap();
        assert_eq!(respaldo[0].id, "srv-1");
    }

    #[tokio::test]
    async fn crear_sin_conexion_usa_id_temporal_y_persiste() {
        let dir = TempDir::new().unwrap();
        let mut ctrl = controlador(GatewayFalso::sin_conexion(), &dir);

        let creado = ctrl.crear(payload_madrid()).await.unwrap();

        assert!(es_id_temporal(&creado.id));
        assert_eq!(ctrl.modo(), ModoSesion::SinConexion);
        assert_eq!(ctrl.itinerarios().len(), 1);

        let aviso = ctrl.tomar_aviso().unwrap();
        assert!(!aviso.es_error);

        let respaldo = MirrorStore::new(dir.path()).cargar().unwrap();
        assert_eq!(respaldo[0].id, creado.id);
    }

    #[tokio::test]
    async fn crear_rechazado_bloquea_sin_tocar_el_estado() {
        let dir = TempDir::new().unwrap();
        let gateway = GatewayFalso::conectado();
        gateway.rechaza.store(true, Ordering::SeqCst);
        let mut ctrl = controlador(gateway, &dir);

        let resultado = ctrl.crear(payload_madrid()).await;

        assert!(resultado.is_err());
        assert!(ctrl.itinerarios().is_empty());
        assert!(ctrl.tomar_aviso().unwrap().es_error);
        assert!(MirrorStore::new(dir.path()).cargar().is_none());
    }

    #[tokio::test]
    async fn actualizar_id_temporal_omite_el_remoto() {
        let dir = TempDir::new().unwrap();
        let gateway = GatewayFalso::sin_conexion();
        let mut ctrl = controlador(gateway.clone(), &dir);

        let creado = ctrl.crear(payload_madrid()).await.unwrap();
        let llamadas_previas = gateway.llamadas.load(Ordering::SeqCst);

        // El remoto vuelve, pero un id temporal jamás se intenta allá.
        gateway.caido.store(false, Ordering::SeqCst);
        let parche = ItinerarioParche {
            notas: Some("Reservar museo".into()),
            ..ItinerarioParche::default()
        };
        let actualizado = ctrl.actualizar(&creado.id, parche).await.unwrap();

        assert_eq!(gateway.llamadas.load(Ordering::SeqCst), llamadas_previas);
        assert_eq!(actualizado.notas, "Reservar museo");
        assert!(es_id_temporal(&actualizado.id));
    }

    #[tokio::test]
    async fn actualizar_en_linea_reemplaza_con_el_canonico() {
        let dir = TempDir::new().unwrap();
        let mut ctrl = controlador(GatewayFalso::conectado(), &dir);
        let creado = ctrl.crear(payload_madrid()).await.unwrap();

        let parche = ItinerarioParche {
            nombre: Some("Viaje renombrado".into()),
            ..ItinerarioParche::default()
        };
        let actualizado = ctrl.actualizar(&creado.id, parche).await.unwrap();

        assert_eq!(actualizado.nombre, "Viaje renombrado");
        assert_eq!(ctrl.itinerarios()[0].nombre, "Viaje renombrado");
        assert_eq!(ctrl.modo(), ModoSesion::EnLinea);
    }

    #[tokio::test]
    async fn eliminar_con_fallo_remoto_quita_localmente() {
        let dir = TempDir::new().unwrap();
        let gateway = GatewayFalso::conectado();
        let mut ctrl = controlador(gateway.clone(), &dir);
        let creado = ctrl.crear(payload_madrid()).await.unwrap();

        gateway.caido.store(true, Ordering::SeqCst);
        ctrl.eliminar(&creado.id).await.unwrap();

        assert!(ctrl.itinerarios().is_empty());
        assert_eq!(ctrl.modo(), ModoSesion::SinConexion);
        assert_eq!(
            MirrorStore::new(dir.path()).cargar().unwrap(),
            Vec::<Itinerario>::new()
        );
    }

    #[tokio::test]
    async fn duplicar_sin_conexion_reclavea_y_reinicia_completado() {
        let dir = TempDir::new().unwrap();
        let gateway = GatewayFalso::sin_conexion();
        let mut ctrl = controlador(gateway, &dir);

        let creado = ctrl.crear(payload_madrid()).await.unwrap();
        let mut actividad = payload_actividad("Cena de gala");
        actividad.estado = EstadoActividad::Completado;
        ctrl.agregar_actividad(&creado.id, actividad).await.unwrap();

        let copia = ctrl.duplicar(&creado.id).await.unwrap();

        assert!(es_id_temporal(&copia.id));
        assert_eq!(copia.nombre, "Viaje a Madrid (copia)");
        assert_eq!(copia.actividades.len(), 1);
        assert!(es_id_temporal(&copia.actividades[0].id));
        assert!(!copia.actividades[0].completado);
        assert_eq!(copia.actividades[0].itinerario_id, copia.id);
    }

    #[tokio::test]
    async fn alternar_actividad_local_no_arrastra_el_estado() {
        let dir = TempDir::new().unwrap();
        let mut ctrl = controlador(GatewayFalso::sin_conexion(), &dir);

        let creado = ctrl.crear(payload_madrid()).await.unwrap();
        let mut actividad = payload_actividad("Tour a pie");
        actividad.estado = EstadoActividad::Confirmado;
        ctrl.agregar_actividad(&creado.id, actividad).await.unwrap();
        let actividad_id = ctrl.itinerarios()[0].actividades[0].id.clone();

        ctrl.alternar_actividad(&creado.id, &actividad_id)
            .await
            .unwrap();

        let actividad = &ctrl.itinerarios()[0].actividades[0];
        assert!(actividad.completado);
        assert_eq!(actividad.estado, EstadoActividad::Confirmado);
    }

    #[tokio::test]
    async fn eliminar_actividad_inexistente_es_error() {
        let dir = TempDir::new().unwrap();
        let mut ctrl = controlador(GatewayFalso::sin_conexion(), &dir);
        let creado = ctrl.crear(payload_madrid()).await.unwrap();

        let resultado = ctrl.eliminar_actividad(&creado.id, "no-existe").await;
        assert!(matches!(resultado, Err(SyncError::ActividadNoEncontrada)));
    }

    #[tokio::test]
    async fn importar_admite_resultado_mixto() {
        let dir = TempDir::new().unwrap();
        let gateway = GatewayFalso::conectado();
        gateway.alterno.store(true, Ordering::SeqCst);
        let mut ctrl = controlador(gateway, &dir);

        let items = vec![
            json!({ "nombre": "Uno", "destino": "Lima", "fechaInicio": "2024-05-01", "fechaFin": "2024-05-05" }),
            json!({ "nombre": "Dos", "destino": "Quito", "fechaInicio": "2024-06-01", "fechaFin": "2024-06-05" }),
            json!({ "nombre": "Sin destino" }),
        ];
        let resumen = ctrl.importar(&items).await;

        assert_eq!(resumen.remotos, 1);
        assert_eq!(resumen.locales, 1);
        assert_eq!(resumen.omitidos, 1);

        // La unión queda antepuesta y con ambas clases de identificador.
        let ids: Vec<&str> = ctrl.itinerarios().iter().map(|it| it.id.as_str()).collect();
        assert_eq!(ids.len(), 2);
        assert!(ids.iter().any(|id| id.starts_with("srv-")));
        assert!(ids.iter().any(|id| es_id_temporal(id)));
    }

    #[tokio::test]
    async fn limpiar_todo_vacia_y_persiste() {
        let dir = TempDir::new().unwrap();
        let mut ctrl = controlador(GatewayFalso::conectado(), &dir);
        ctrl.crear(payload_madrid()).await.unwrap();
        ctrl.crear(payload_madrid()).await.unwrap();

        ctrl.limpiar_todo().await;

        assert!(ctrl.itinerarios().is_empty());
        assert_eq!(
            MirrorStore::new(dir.path()).cargar().unwrap(),
            Vec::<Itinerario>::new()
        );
    }

    #[tokio::test]
    async fn hidratar_con_remoto_vacio_carga_el_espejo() {
        let dir = TempDir::new().unwrap();
        let espejo = MirrorStore::new(dir.path());
        espejo.guardar(&[plantilla("srv-9")]);

        let mut ctrl = controlador(GatewayFalso::conectado(), &dir);
        ctrl.hidratar(Vec::new());

        assert_eq!(ctrl.itinerarios().len(), 1);
        assert_eq!(ctrl.itinerarios()[0].id, "srv-9");
    }

    #[tokio::test]
    async fn hidratar_con_datos_remotos_los_persiste() {
        let dir = TempDir::new().unwrap();
        let mut ctrl = controlador(GatewayFalso::conectado(), &dir);

        ctrl.hidratar(vec![plantilla("srv-1")]);

        assert_eq!(ctrl.itinerarios()[0].id, "srv-1");
        let respaldo = MirrorStore::new(dir.path()).cargar().unwrap();
        assert_eq!(respaldo[0].id, "srv-1");
    }

    #[tokio::test]
    async fn refrescar_sin_conexion_sirve_el_espejo() {
        let dir = TempDir::new().unwrap();
        let gateway = GatewayFalso::conectado();
        let mut ctrl = controlador(gateway.clone(), &dir);
        ctrl.crear(payload_madrid()).await.unwrap();

        gateway.caido.store(true, Ordering::SeqCst);
        ctrl.refrescar().await;

        assert_eq!(ctrl.modo(), ModoSesion::SinConexion);
        assert_eq!(ctrl.itinerarios().len(), 1);
    }
}
