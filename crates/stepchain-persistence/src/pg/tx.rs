//! `StoreTx` sobre una conexión Diesel dentro de una transacción abierta.

use std::collections::{BTreeSet, HashMap};

use diesel::dsl::exists;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel::sql_types::{BigInt, Uuid as SqlUuid};
use log::error;
use stepchain_core::payload::encode_payload;
use stepchain_core::{ChainError, HistoryId, HistoryMeta, Step, StepId, StoreTx, User, UserId, UserSelector};
use uuid::Uuid;

use super::rows::{HistoryRow, NewHistoryRow, NewHistoryStepRow, NewStepRow, NewUserRoleRow, NewUserRow, StepRow, UserRow};
use crate::error::PersistenceError;
use crate::schema::{histories, history_steps, steps, user_roles, users};

pub(super) struct PgTx<'c> {
    conn: &'c mut PgConnection,
}

impl<'c> PgTx<'c> {
    pub(super) fn new(conn: &'c mut PgConnection) -> Self {
        Self { conn }
    }

    fn roles_of(&mut self, user: Uuid) -> Result<BTreeSet<String>, ChainError> {
        let roles: Vec<String> = db(user_roles::table.filter(user_roles::user_id.eq(user))
                                                     .select(user_roles::role)
                                                     .load(self.conn))?;
        Ok(roles.into_iter().collect())
    }

    fn user_exists(&mut self, user: Uuid) -> Result<bool, ChainError> {
        db(diesel::select(exists(users::table.find(user))).get_result(self.conn))
    }

    fn step_exists(&mut self, step: Uuid) -> Result<bool, ChainError> {
        db(diesel::select(exists(steps::table.find(step))).get_result(self.conn))
    }

    fn history_exists(&mut self, history: Uuid) -> Result<bool, ChainError> {
        db(diesel::select(exists(histories::table.find(history))).get_result(self.conn))
    }
}

fn db<T>(res: QueryResult<T>) -> Result<T, ChainError> {
    res.map_err(|e| PersistenceError::from(e).into())
}

fn position_to_i64(position: usize) -> Result<i64, ChainError> {
    i64::try_from(position).map_err(|_| ChainError::Backend(format!("position {position} does not fit in BIGINT")))
}

impl StoreTx for PgTx<'_> {
    fn insert_user(&mut self, user: &User) -> Result<(), ChainError> {
        let taken: bool = db(diesel::select(exists(users::table.filter(users::name.eq(user.name.as_str())))).get_result(self.conn))?;
        if taken {
            return Err(ChainError::Conflict(format!("user name '{}' already exists", user.name)));
        }
        let row = NewUserRow { id: user.id.as_uuid(),
                               name: &user.name,
                               email: &user.email,
                               passhash: user.passhash.as_deref(),
                               created_at: user.created_at };
        match diesel::insert_into(users::table).values(&row).execute(self.conn) {
            Ok(_) => {}
            Err(DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => {
                return Err(ChainError::Conflict(format!("user '{}' already exists", user.name)));
            }
            Err(e) => return db(Err(e)),
        }
        for role in &user.roles {
            self.add_role(user.id, role)?;
        }
        Ok(())
    }

    fn find_user(&mut self, selector: &UserSelector) -> Result<Option<User>, ChainError> {
        let row: Option<UserRow> = match selector {
            UserSelector::Id(id) => db(users::table.find(id.as_uuid()).first(self.conn).optional())?,
            UserSelector::Name(name) => db(users::table.filter(users::name.eq(name.as_str())).first(self.conn).optional())?,
        };
        match row {
            Some(row) => {
                let roles = self.roles_of(row.id)?;
                Ok(Some(row.into_user(roles)))
            }
            None => Ok(None),
        }
    }

    fn list_users(&mut self) -> Result<Vec<User>, ChainError> {
        let rows: Vec<UserRow> = db(users::table.order((users::created_at.asc(), users::id.asc())).load(self.conn))?;
        let pairs: Vec<(Uuid, String)> = db(user_roles::table.select((user_roles::user_id, user_roles::role))
                                                             .load(self.conn))?;
        let mut roles: HashMap<Uuid, BTreeSet<String>> = HashMap::new();
        for (user_id, role) in pairs {
            roles.entry(user_id).or_default().insert(role);
        }
        Ok(rows.into_iter()
               .map(|row| {
                   let r = roles.remove(&row.id).unwrap_or_default();
                   row.into_user(r)
               })
               .collect())
    }

    fn add_role(&mut self, user: UserId, role: &str) -> Result<(), ChainError> {
        if !self.user_exists(user.as_uuid())? {
            return Err(ChainError::not_found("user", user));
        }
        db(diesel::insert_into(user_roles::table).values(&NewUserRoleRow { user_id: user.as_uuid(),
                                                                           role })
                                                 .on_conflict_do_nothing()
                                                 .execute(self.conn))?;
        Ok(())
    }

    fn insert_history(&mut self, meta: &HistoryMeta) -> Result<(), ChainError> {
        if !self.user_exists(meta.user_id.as_uuid())? {
            return Err(ChainError::not_found("user", meta.user_id));
        }
        db(diesel::insert_into(histories::table).values(&NewHistoryRow { id: meta.id.as_uuid(),
                                                                         name: &meta.name,
                                                                         user_id: meta.user_id.as_uuid(),
                                                                         created_at: meta.created_at })
                                                .execute(self.conn))?;
        Ok(())
    }

    fn find_history(&mut self, id: HistoryId) -> Result<Option<HistoryMeta>, ChainError> {
        let row: Option<HistoryRow> = db(histories::table.find(id.as_uuid()).first(self.conn).optional())?;
        Ok(row.map(HistoryMeta::from))
    }

    fn lock_history(&mut self, id: HistoryId) -> Result<Option<HistoryMeta>, ChainError> {
        let rows: Vec<HistoryRow> = db(histories::table.filter(histories::id.eq(id.as_uuid()))
                                                       .for_update()
                                                       .load(self.conn))?;
        Ok(rows.into_iter().next().map(HistoryMeta::from))
    }

    fn histories_of(&mut self, user: UserId) -> Result<Vec<HistoryMeta>, ChainError> {
        let rows: Vec<HistoryRow> = db(histories::table.filter(histories::user_id.eq(user.as_uuid()))
                                                       .order((histories::created_at.asc(), histories::seq.asc()))
                                                       .load(self.conn))?;
        Ok(rows.into_iter().map(HistoryMeta::from).collect())
    }

    fn latest_history_of(&mut self, user: UserId) -> Result<Option<HistoryMeta>, ChainError> {
        let row: Option<HistoryRow> = db(histories::table.filter(histories::user_id.eq(user.as_uuid()))
                                                         .order((histories::created_at.desc(), histories::seq.desc()))
                                                         .first(self.conn)
                                                         .optional())?;
        Ok(row.map(HistoryMeta::from))
    }

    fn history_step_ids(&mut self, id: HistoryId) -> Result<Vec<StepId>, ChainError> {
        if !self.history_exists(id.as_uuid())? {
            return Err(ChainError::not_found("history", id));
        }
        let ids: Vec<Uuid> = db(history_steps::table.filter(history_steps::history_id.eq(id.as_uuid()))
                                                    .order(history_steps::position.asc())
                                                    .select(history_steps::step_id)
                                                    .load(self.conn))?;
        Ok(ids.into_iter().map(StepId::from).collect())
    }

    fn history_tail(&mut self, id: HistoryId) -> Result<(usize, Option<StepId>), ChainError> {
        if !self.history_exists(id.as_uuid())? {
            return Err(ChainError::not_found("history", id));
        }
        let last: Option<(i64, Uuid)> = db(history_steps::table.filter(history_steps::history_id.eq(id.as_uuid()))
                                                               .order(history_steps::position.desc())
                                                               .select((history_steps::position, history_steps::step_id))
                                                               .first(self.conn)
                                                               .optional())?;
        match last {
            Some((position, step)) => {
                let len = usize::try_from(position + 1).map_err(|_| {
                                                           ChainError::Backend(format!("history {id} has negative position {position}"))
                                                       })?;
                Ok((len, Some(step.into())))
            }
            None => Ok((0, None)),
        }
    }

    fn push_history_step(&mut self, id: HistoryId, position: usize, step: StepId) -> Result<(), ChainError> {
        if !self.step_exists(step.as_uuid())? {
            return Err(ChainError::not_found("step", step));
        }
        let (len, _) = self.history_tail(id)?;
        if position != len {
            return Err(ChainError::Conflict(format!("history {id} expected position {len}, got {position}")));
        }
        db(diesel::insert_into(history_steps::table).values(&NewHistoryStepRow { history_id: id.as_uuid(),
                                                                                 position: position_to_i64(position)?,
                                                                                 step_id: step.as_uuid() })
                                                    .execute(self.conn))?;
        Ok(())
    }

    fn copy_history_prefix(&mut self, source: HistoryId, target: HistoryId, len: usize) -> Result<(), ChainError> {
        let (source_len, _) = self.history_tail(source)?;
        if len > source_len {
            return Err(ChainError::Range { index: position_to_i64(len)?,
                                           len: source_len });
        }
        let (target_len, _) = self.history_tail(target)?;
        if target_len != 0 {
            return Err(ChainError::Conflict(format!("history {target} already has steps")));
        }
        let copied = db(diesel::sql_query("INSERT INTO history_steps (history_id, position, step_id) \
                                           SELECT $1, position, step_id FROM history_steps \
                                           WHERE history_id = $2 AND position < $3")
                        .bind::<SqlUuid, _>(target.as_uuid())
                        .bind::<SqlUuid, _>(source.as_uuid())
                        .bind::<BigInt, _>(position_to_i64(len)?)
                        .execute(self.conn))?;
        if copied != len {
            return Err(ChainError::Backend(format!("history {source} has gaps: copied {copied} of {len} steps")));
        }
        Ok(())
    }

    fn insert_step(&mut self, step: &Step) -> Result<(), ChainError> {
        if let Some(prev) = step.previous {
            if !self.step_exists(prev.as_uuid())? {
                return Err(ChainError::not_found("step", prev));
            }
        }
        let payload = encode_payload(&step.payload);
        let row = NewStepRow { id: step.id.as_uuid(),
                               created_at: step.created_at,
                               type_tag: &step.type_tag,
                               payload: &payload,
                               previous_id: step.previous.map(|p| p.as_uuid()) };
        db(diesel::insert_into(steps::table).values(&row).execute(self.conn))?;
        Ok(())
    }

    fn find_step(&mut self, id: StepId) -> Result<Option<Step>, ChainError> {
        let row: Option<StepRow> = db(steps::table.find(id.as_uuid()).first(self.conn).optional())?;
        row.map(|r| {
               Step::try_from(r).map_err(|e| {
                                    error!("stored payload of step {id} failed to decode: {e}");
                                    e
                                })
           })
           .transpose()
    }

    fn next_step_ids(&mut self, id: StepId) -> Result<Vec<StepId>, ChainError> {
        if !self.step_exists(id.as_uuid())? {
            return Err(ChainError::not_found("step", id));
        }
        let ids: Vec<Uuid> = db(steps::table.filter(steps::previous_id.eq(id.as_uuid()))
                                            .order((steps::created_at.asc(), steps::seq.asc()))
                                            .select(steps::id)
                                            .load(self.conn))?;
        Ok(ids.into_iter().map(StepId::from).collect())
    }
}
