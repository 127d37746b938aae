//! Carga de configuración de conexión desde variables de entorno.
//! Usa convención `DATABASE_URL` y parámetros opcionales de pool.

use std::env;

use dotenvy::dotenv;
use once_cell::sync::Lazy;
use stepchain_core::ChainError;

// Carga perezosa del archivo .env una sola vez.
static DOTENV_LOADED: Lazy<()> = Lazy::new(|| {
    let _ = dotenv(); // ignora error si no existe .env
});

pub const DEFAULT_MIN_CONNECTIONS: u32 = 2;
pub const DEFAULT_MAX_CONNECTIONS: u32 = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbConfig {
    pub url: String,
    pub min_connections: u32,
    pub max_connections: u32,
}

impl DbConfig {
    /// Lee `DATABASE_URL` (obligatoria) y los tamaños de pool opcionales.
    pub fn from_env() -> Result<Self, ChainError> {
        Lazy::force(&DOTENV_LOADED);
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Como `from_env`, con las variables provistas por `lookup`.
    pub fn from_lookup<L>(lookup: L) -> Result<Self, ChainError>
        where L: Fn(&str) -> Option<String>
    {
        let url = lookup("DATABASE_URL").ok_or_else(|| ChainError::Configuration("DATABASE_URL is not set".into()))?;
        let min_connections = pool_size(&lookup, "DATABASE_MIN_CONNECTIONS")?.unwrap_or(DEFAULT_MIN_CONNECTIONS);
        let max_connections = pool_size(&lookup, "DATABASE_MAX_CONNECTIONS")?.unwrap_or(DEFAULT_MAX_CONNECTIONS);
        Ok(Self { url,
                  min_connections,
                  max_connections })
    }
}

fn pool_size<L>(lookup: &L, key: &str) -> Result<Option<u32>, ChainError>
    where L: Fn(&str) -> Option<String>
{
    lookup(key).map(|raw| {
                   raw.trim()
                      .parse::<u32>()
                      .map_err(|e| ChainError::Configuration(format!("{key}='{raw}' is not a valid count: {e}")))
               })
               .transpose()
}

/// Forzar carga temprana de .env desde aplicaciones externas si se desea.
pub fn init_dotenv() {
    Lazy::force(&DOTENV_LOADED);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup<'a>(pairs: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        move |key| pairs.iter().find(|(k, _)| *k == key).map(|(_, v)| v.to_string())
    }

    #[test]
    fn defaults_apply_when_sizes_are_unset() {
        let cfg = DbConfig::from_lookup(lookup(&[("DATABASE_URL", "postgres://x/db")])).expect("config");
        assert_eq!(cfg.min_connections, DEFAULT_MIN_CONNECTIONS);
        assert_eq!(cfg.max_connections, DEFAULT_MAX_CONNECTIONS);
    }

    #[test]
    fn missing_url_is_a_configuration_error() {
        let err = DbConfig::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, ChainError::Configuration(_)), "got {err:?}");
    }

    #[test]
    fn unparseable_pool_size_is_a_configuration_error() {
        let err = DbConfig::from_lookup(lookup(&[("DATABASE_URL", "postgres://x/db"), ("DATABASE_MAX_CONNECTIONS", "lots")]))
            .unwrap_err();
        assert!(matches!(err, ChainError::Configuration(ref m) if m.contains("DATABASE_MAX_CONNECTIONS")), "got {err:?}");
        let cfg = DbConfig::from_lookup(lookup(&[("DATABASE_URL", "postgres://x/db"), ("DATABASE_MIN_CONNECTIONS", " 4 ")]))
            .expect("trimmed size parses");
        assert_eq!(cfg.min_connections, 4);
    }
}
