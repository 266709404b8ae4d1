use std::fs;
use std::path::PathBuf;

use chrono::{SecondsFormat, Utc};
use serde_json::Value;

use crate::models::itinerario::Itinerario;

const ARCHIVO_RESPALDO: &str = "itinerarios_backup.json";
const ARCHIVO_ULTIMA_SINCRONIZACION: &str = "itinerarios_last_sync";

/// Espejo local: instantánea completa de la colección más la marca de la
/// última sincronización, en dos archivos bajo un directorio. Caché de
/// confianza: no valida esquemas al cargar y el que escribe último gana.
#[derive(Debug, Clone)]
pub struct MirrorStore {
    dir: PathBuf,
}

impl MirrorStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn ruta_respaldo(&self) -> PathBuf {
        self.dir.join(ARCHIVO_RESPALDO)
    }

    fn ruta_sincronizacion(&self) -> PathBuf {
        self.dir.join(ARCHIVO_ULTIMA_SINCRONIZACION)
    }

    /// Sobrescribe la instantánea anterior sin mezclar y estampa el
    /// instante actual. Los fallos de escritura se registran y no se
    /// propagan.
    pub fn guardar(&self, itinerarios: &[Itinerario]) {
        if let Err(e) = fs::create_dir_all(&self.dir) {
            tracing::warn!(error = %e, "No se pudo preparar el directorio del espejo");
            return;
        }
        let texto = match serde_json::to_string(itinerarios) {
            Ok(texto) => texto,
            Err(e) => {
                tracing::warn!(error = %e, "No se pudo serializar la instantánea");
                return;
            }
        };
        if let Err(e) = fs::write(self.ruta_respaldo(), texto) {
            tracing::warn!(error = %e, "No se pudo escribir el respaldo local");
            return;
        }
        let ahora = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        if let Err(e) = fs::write(self.ruta_sincronizacion(), ahora) {
            tracing::warn!(error = %e, "No se pudo estampar la sincronización");
        }
    }

    /// `None` ante ausencia, JSON malformado o un valor que no es
    /// arreglo; el llamador no distingue entre esos casos.
    pub fn cargar(&self) -> Option<Vec<Itinerario>> {
        let texto = fs::read_to_string(self.ruta_respaldo()).ok()?;
        let valor: Value = serde_json::from_str(&texto).ok()?;
        if !valor.is_array() {
            return None;
        }
        serde_json::from_value(valor).ok()
    }

    pub fn ultima_sincronizacion(&self) -> Option<String> {
        fs::read_to_string(self.ruta_sincronizacion()).ok()
    }

    pub fn limpiar(&self) {
        let _ = fs::remove_file(self.ruta_respaldo());
        let _ = fs::remove_file(self.ruta_sincronizacion());
    }
}
