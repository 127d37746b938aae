use chrono::{DateTime, Utc};

use crate::constants::TIMESTAMP_RESOLUTION_MICROS;

/// Timestamp para un registro nuevo que debe quedar estrictamente después de
/// `after`.
///
/// Se trunca a microsegundos; si el reloj no avanzó (o retrocedió) respecto
/// de `after`, se usa `after + 1µs`.
pub fn next_timestamp(now: DateTime<Utc>, after: Option<DateTime<Utc>>) -> DateTime<Utc> {
    let candidate = now.timestamp_micros();
    let micros = match after {
        Some(prev) => candidate.max(prev.timestamp_micros() + TIMESTAMP_RESOLUTION_MICROS),
        None => candidate,
    };
    DateTime::<Utc>::from_timestamp_micros(micros).unwrap_or(now)
}
