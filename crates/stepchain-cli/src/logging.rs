//! Logging de diagnóstico del binario.
//!
//! Las librerías emiten por la fachada `log`; el subscriber de `tracing`
//! los recibe vía `tracing-log`. Salida a stderr para no mezclarse con el
//! JSON de stdout.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Usa `RUST_LOG` si está definida; si no, `fallback` (p. ej. `LOG_FILTER`
/// de la configuración).
pub fn init(fallback: &str) {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(fallback))
                                                  .unwrap_or_else(|_| EnvFilter::new("warn"));

    let _ = tracing_subscriber::registry().with(filter)
                                          .with(fmt::layer().with_writer(std::io::stderr).compact())
                                          .try_init();
}
