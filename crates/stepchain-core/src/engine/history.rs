use chrono::Utc;

use super::next_timestamp;
use crate::errors::ChainError;
use crate::model::{HistoryId, HistoryMeta, UserId};
use crate::selector::UserSelector;
use crate::storage::StoreTx;

/// Crea la cabecera de una historia nueva (vacía) para `user`.
///
/// `created_at` queda estrictamente después de la última historia del
/// usuario, así `histories_of` respeta el orden de creación aunque el reloj
/// retroceda.
pub fn create_history(tx: &mut dyn StoreTx, user: UserId, name: &str) -> Result<HistoryMeta, ChainError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ChainError::Validation("history name must not be empty".into()));
    }
    if tx.find_user(&UserSelector::Id(user))?.is_none() {
        return Err(ChainError::not_found("user", user));
    }
    let latest = tx.latest_history_of(user)?.map(|h| h.created_at);
    let meta = HistoryMeta { id: HistoryId::generate(),
                             name: name.to_string(),
                             user_id: user,
                             created_at: next_timestamp(Utc::now(), latest) };
    tx.insert_history(&meta)?;
    Ok(meta)
}
