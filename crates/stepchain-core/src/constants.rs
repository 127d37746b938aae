//! Constantes del core.

/// Rol asignado a un principal sin sesión (o cuya sesión ya no resuelve a
/// un usuario existente).
pub const ANON_ROLE: &str = "anon";

/// Resolución temporal de los timestamps de steps e historias. Coincide con
/// la precisión de `timestamptz` en Postgres para que el orden estricto
/// sobreviva al round-trip.
pub const TIMESTAMP_RESOLUTION_MICROS: i64 = 1;

/// Nombre de una historia creada por fork a partir de `source` en `index`.
pub fn fork_name(source: &str, index: usize) -> String {
    format!("{source} (fork @{index})")
}
