use chrono::Utc;
use rand::Rng;

/// Prefijo que marca un identificador como aún no persistido en remoto.
pub const PREFIJO_TEMPORAL: &str = "temp_";

const SUFIJO_LARGO: usize = 9;
const ALFABETO: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Genera `temp_<milisegundos>_<sufijo alfanumérico en minúsculas>`. Dos
/// llamadas en el mismo milisegundo difieren por el sufijo aleatorio.
pub fn generar_id_temporal() -> String {
    let mut rng = rand::thread_rng();
    let sufijo: String = (0..SUFIJO_LARGO)
        .map(|_| ALFABETO[rng.gen_range(0..ALFABETO.len())] as char)
        .collect();
    format!("{PREFIJO_TEMPORAL}{}_{sufijo}", Utc::now().timestamp_millis())
}

/// Único mecanismo para decidir si una entidad existe en el remoto.
pub fn es_id_temporal(id: &str) -> bool {
    id.starts_with(PREFIJO_TEMPORAL)
}
