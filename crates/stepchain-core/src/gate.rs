//! Role gate: autorización mínima por intersección de roles.
//!
//! No guarda estado propio; resuelve los roles del principal actual a través
//! del `Store` en cada chequeo.

use std::collections::BTreeSet;

use log::debug;

use crate::constants::ANON_ROLE;
use crate::errors::ChainError;
use crate::selector::UserSelector;
use crate::storage::Backend;
use crate::store::Store;

pub struct RoleGate<'s, B: Backend> {
    store: &'s Store<B>,
}

impl<'s, B: Backend> RoleGate<'s, B> {
    pub fn new(store: &'s Store<B>) -> Self {
        Self { store }
    }

    /// Roles del principal. Sin principal, o si ya no resuelve a un usuario,
    /// el principal es anónimo (`{"anon"}`).
    pub fn current_roles(&self, principal: Option<&UserSelector>) -> Result<BTreeSet<String>, ChainError> {
        let Some(selector) = principal else {
            return Ok(anonymous());
        };
        match self.store.fetch_user(selector) {
            Ok(user) => Ok(user.roles),
            Err(ChainError::NotFound { .. }) => {
                debug!("principal {selector} no longer resolves; treating as anonymous");
                Ok(anonymous())
            }
            Err(e) => Err(e),
        }
    }

    /// `Ok` si el principal tiene al menos uno de los roles requeridos.
    pub fn check(&self, principal: Option<&UserSelector>, required: &[&str]) -> Result<(), ChainError> {
        let roles = self.current_roles(principal)?;
        if required.iter().any(|r| roles.contains(*r)) {
            Ok(())
        } else {
            Err(ChainError::PermissionDenied { required: required.iter().map(|r| r.to_string()).collect() })
        }
    }

    /// Chequea y, si corresponde, ejecuta `op` contra el store.
    pub fn guard<T, F>(&self, principal: Option<&UserSelector>, required: &[&str], op: F) -> Result<T, ChainError>
        where F: FnOnce(&Store<B>) -> Result<T, ChainError>
    {
        self.check(principal, required)?;
        op(self.store)
    }
}

fn anonymous() -> BTreeSet<String> {
    BTreeSet::from([ANON_ROLE.to_string()])
}
