//! Configuración de la aplicación.
//!
//! Capas, de mayor a menor prioridad:
//! 1. Variables de entorno `STEPCHAIN_<KEY>`.
//! 2. Archivo `config.json` (ruta sobreescribible con `STEPCHAIN_CONFIG`).
//! 3. `DATABASE_URL` como respaldo de `DB_URL`.
//!
//! Un archivo inexistente equivale a un objeto vacío; un archivo ilegible o
//! con JSON inválido es `ChainError::Configuration`.

use std::path::Path;

use serde_json::{Map, Value};
use stepchain_core::ChainError;
use stepchain_persistence::config::{DbConfig, DEFAULT_MAX_CONNECTIONS, DEFAULT_MIN_CONNECTIONS};

pub const ENV_PREFIX: &str = "STEPCHAIN_";
pub const CONFIG_PATH_VAR: &str = "STEPCHAIN_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "config.json";
pub const DEFAULT_LOG_FILTER: &str = "warn";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub db_url: Option<String>,
    pub db_min_connections: u32,
    pub db_max_connections: u32,
    pub log_filter: String,
}

impl AppConfig {
    /// Carga desde el entorno del proceso (y `.env`).
    pub fn load() -> Result<Self, ChainError> {
        stepchain_persistence::init_dotenv();
        let path = std::env::var(CONFIG_PATH_VAR).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from(Path::new(&path), |key| std::env::var(key).ok())
    }

    /// Carga desde `path` con un entorno inyectado.
    pub fn load_from<E>(path: &Path, env: E) -> Result<Self, ChainError>
        where E: Fn(&str) -> Option<String>
    {
        let layers = Layers { file: read_config_file(path)?,
                              env: &env };
        let db_url = layers.get("DB_URL")?.or_else(|| env("DATABASE_URL"));
        let db_min_connections = layers.get_u32("DB_MIN_CONNECTIONS")?.unwrap_or(DEFAULT_MIN_CONNECTIONS);
        let db_max_connections = layers.get_u32("DB_MAX_CONNECTIONS")?.unwrap_or(DEFAULT_MAX_CONNECTIONS);
        let log_filter = layers.get("LOG_FILTER")?.unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());
        Ok(Self { db_url,
                  db_min_connections,
                  db_max_connections,
                  log_filter })
    }

    pub fn db_config(&self) -> Result<DbConfig, ChainError> {
        let url = self.db_url
                      .clone()
                      .ok_or_else(|| ChainError::Configuration("DB_URL is not configured".into()))?;
        Ok(DbConfig { url,
                      min_connections: self.db_min_connections,
                      max_connections: self.db_max_connections })
    }
}

struct Layers<'e, E> {
    file: Map<String, Value>,
    env: &'e E,
}

impl<E> Layers<'_, E> where E: Fn(&str) -> Option<String>
{
    fn get(&self, key: &str) -> Result<Option<String>, ChainError> {
        if let Some(v) = (self.env)(&format!("{ENV_PREFIX}{key}")) {
            return Ok(Some(v));
        }
        match self.file.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(Value::Number(n)) => Ok(Some(n.to_string())),
            Some(other) => Err(ChainError::Configuration(format!("{key} must be a string or number, got {other}"))),
        }
    }

    fn get_u32(&self, key: &str) -> Result<Option<u32>, ChainError> {
        self.get(key)?
            .map(|raw| {
                raw.trim()
                   .parse::<u32>()
                   .map_err(|e| ChainError::Configuration(format!("{key}='{raw}' is not a valid count: {e}")))
            })
            .transpose()
    }
}

fn read_config_file(path: &Path) -> Result<Map<String, Value>, ChainError> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            log::debug!("no config file at {}", path.display());
            return Ok(Map::new());
        }
        Err(e) => return Err(ChainError::Configuration(format!("reading {}: {e}", path.display()))),
    };
    match serde_json::from_str::<Value>(&raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(ChainError::Configuration(format!("{} must contain a JSON object", path.display()))),
        Err(e) => Err(ChainError::Configuration(format!("parsing {}: {e}", path.display()))),
    }
}
