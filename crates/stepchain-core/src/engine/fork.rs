use log::debug;

use super::create_history;
use crate::constants::fork_name;
use crate::errors::ChainError;
use crate::model::History;
use crate::selector::HistorySelector;
use crate::storage::StoreTx;

/// Crea una historia nueva del mismo dueño cuya secuencia son los primeros
/// `index` steps de la fuente, por referencia. No crea ni copia steps.
///
/// `index` es con signo porque llega de la capa externa; fuera de
/// `0..=len` es `ChainError::Range`.
pub fn fork_history(tx: &mut dyn StoreTx, selector: &HistorySelector, index: i64) -> Result<History, ChainError> {
    let source = tx.find_history(selector.id)?
                   .ok_or_else(|| ChainError::not_found("history", selector.id))?;
    let (len, _) = tx.history_tail(source.id)?;
    let keep = usize::try_from(index).ok()
                                     .filter(|k| *k <= len)
                                     .ok_or(ChainError::Range { index, len })?;

    let meta = create_history(tx, source.user_id, &fork_name(&source.name, keep))?;
    tx.copy_history_prefix(source.id, meta.id, keep)?;
    let steps = tx.history_step_ids(meta.id)?;
    debug!("fork_history source={} fork={} index={keep} of {len}", source.id, meta.id);
    Ok(History::from_parts(meta, steps))
}
