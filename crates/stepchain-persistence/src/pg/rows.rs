//! Filas Diesel y su conversión a entidades del core.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use stepchain_core::payload::decode_payload;
use stepchain_core::{ChainError, HistoryMeta, Step, User};
use uuid::Uuid;

use crate::schema::{histories, history_steps, steps, user_roles, users};

#[derive(Queryable, Debug)]
pub struct UserRow {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub passhash: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl UserRow {
    pub fn into_user(self, roles: BTreeSet<String>) -> User {
        User { id: self.id.into(),
               name: self.name,
               email: self.email,
               passhash: self.passhash,
               roles,
               created_at: self.created_at }
    }
}

#[derive(Insertable)]
#[diesel(table_name = users)]
pub struct NewUserRow<'a> {
    pub id: Uuid,
    pub name: &'a str,
    pub email: &'a str,
    pub passhash: Option<&'a str>,
    pub created_at: DateTime<Utc>,
}

#[derive(Insertable)]
#[diesel(table_name = user_roles)]
pub struct NewUserRoleRow<'a> {
    pub user_id: Uuid,
    pub role: &'a str,
}

#[derive(Queryable, Debug)]
pub struct HistoryRow {
    pub id: Uuid,
    pub seq: i64,
    pub name: String,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl From<HistoryRow> for HistoryMeta {
    fn from(row: HistoryRow) -> Self {
        HistoryMeta { id: row.id.into(),
                      name: row.name,
                      user_id: row.user_id.into(),
                      created_at: row.created_at }
    }
}

#[derive(Insertable)]
#[diesel(table_name = histories)]
pub struct NewHistoryRow<'a> {
    pub id: Uuid,
    pub name: &'a str,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Queryable, Debug)]
pub struct StepRow {
    pub id: Uuid,
    pub seq: i64,
    pub created_at: DateTime<Utc>,
    pub type_tag: String,
    pub payload: String,
    pub previous_id: Option<Uuid>,
}

impl TryFrom<StepRow> for Step {
    type Error = ChainError;

    fn try_from(row: StepRow) -> Result<Self, Self::Error> {
        Ok(Step { id: row.id.into(),
                  created_at: row.created_at,
                  type_tag: row.type_tag,
                  payload: decode_payload(&row.payload)?,
                  previous: row.previous_id.map(Into::into) })
    }
}

#[derive(Insertable)]
#[diesel(table_name = steps)]
pub struct NewStepRow<'a> {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub type_tag: &'a str,
    pub payload: &'a str,
    pub previous_id: Option<Uuid>,
}

#[derive(Insertable)]
#[diesel(table_name = history_steps)]
pub struct NewHistoryStepRow {
    pub history_id: Uuid,
    pub position: i64,
    pub step_id: Uuid,
}
