//! Errores del core y su clasificación.
//!
//! Toda operación del engine/store devuelve `ChainError`. La capa externa
//! decide cómo presentarlo usando `classify_error`: los errores de cliente
//! (`NotFound`, `Range`, `Validation`, `Conflict`, `PermissionDenied`) son
//! causados por la entrada; `Configuration` es fatal al arrancar.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChainError {
    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },
    #[error("fork index {index} out of range (valid: 0..={len})")]
    Range { index: i64, len: usize },
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("permission denied: requires one of {required:?}")]
    PermissionDenied { required: Vec<String> },
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("payload codec: {0}")]
    Codec(String),
    #[error("transient backend error (retryable): {0}")]
    Transient(String),
    #[error("storage backend: {0}")]
    Backend(String),
}

impl ChainError {
    pub fn not_found(entity: &'static str, key: impl ToString) -> Self {
        Self::NotFound { entity,
                         key: key.to_string() }
    }
}

/// Clase de error para decidir respuesta/reintento en la capa externa.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Causado por la entrada del cliente; no reintentar.
    Client,
    /// Falta configuración; abortar el arranque.
    Fatal,
    /// Reintentable (conflicto de serialización, conexión caída).
    Transient,
    /// Fallo interno del backend o datos corruptos.
    Internal,
}

pub fn classify_error(err: &ChainError) -> ErrorClass {
    match err {
        ChainError::NotFound { .. }
        | ChainError::Range { .. }
        | ChainError::Validation(_)
        | ChainError::Conflict(_)
        | ChainError::PermissionDenied { .. } => ErrorClass::Client,
        ChainError::Configuration(_) => ErrorClass::Fatal,
        ChainError::Transient(_) => ErrorClass::Transient,
        ChainError::Codec(_) | ChainError::Backend(_) => ErrorClass::Internal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_message_names_entity_and_key() {
        let err = ChainError::not_found("history", "abc");
        assert_eq!(err.to_string(), "history not found: abc");
    }

    #[test]
    fn range_message_shows_bounds() {
        let err = ChainError::Range { index: -1, len: 3 };
        assert_eq!(err.to_string(), "fork index -1 out of range (valid: 0..=3)");
    }

    #[test]
    fn client_errors_are_classified_as_client() {
        assert_eq!(classify_error(&ChainError::Validation("x".into())), ErrorClass::Client);
        assert_eq!(classify_error(&ChainError::Conflict("x".into())), ErrorClass::Client);
        assert_eq!(classify_error(&ChainError::Range { index: 9, len: 1 }), ErrorClass::Client);
        assert_eq!(classify_error(&ChainError::PermissionDenied { required: vec!["admin".into()] }),
                   ErrorClass::Client);
    }

    #[test]
    fn configuration_is_fatal_and_transient_is_retryable() {
        assert_eq!(classify_error(&ChainError::Configuration("DB_URL".into())), ErrorClass::Fatal);
        assert_eq!(classify_error(&ChainError::Transient("deadlock".into())), ErrorClass::Transient);
        assert_eq!(classify_error(&ChainError::Backend("boom".into())), ErrorClass::Internal);
    }
}
