//! Subcomandos y su ejecución contra cualquier `Store`.

use clap::{Args, Parser, Subcommand};
use serde_json::{json, Value};
use stepchain_core::{Backend, ChainError, HistoryId, HistorySelector, Payload, RoleGate, StepId, Store, UserId, UserSelector};

#[derive(Parser, Debug)]
#[command(name = "stepchain", version, about = "Historias de steps encadenados con forks")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Aplica las migraciones pendientes.
    Migrate,
    #[command(subcommand)]
    User(UserCommand),
    #[command(subcommand)]
    History(HistoryCommand),
    #[command(subcommand)]
    Step(StepCommand),
}

/// Selección de usuario por id o por nombre (exactamente uno).
#[derive(Args, Debug, Clone)]
pub struct UserArg {
    #[arg(long = "user-id", conflicts_with = "user")]
    pub user_id: Option<UserId>,
    #[arg(long)]
    pub user: Option<String>,
}

impl UserArg {
    fn selector(&self) -> Result<UserSelector, ChainError> {
        UserSelector::from_parts(self.user_id, self.user.as_deref())
    }
}

#[derive(Subcommand, Debug)]
pub enum UserCommand {
    Add {
        name: String,
        email: String,
        /// Hash ya calculado; se guarda tal cual.
        #[arg(long)]
        passhash: Option<String>,
    },
    Show {
        #[command(flatten)]
        who: UserArg,
    },
    List,
    Grant {
        #[command(flatten)]
        who: UserArg,
        role: String,
    },
    /// Roles efectivos; sin usuario, los del principal anónimo.
    Roles {
        #[command(flatten)]
        who: UserArg,
    },
}

#[derive(Subcommand, Debug)]
pub enum HistoryCommand {
    New {
        #[command(flatten)]
        owner: UserArg,
        name: String,
    },
    List {
        #[command(flatten)]
        owner: UserArg,
    },
    Show {
        id: HistoryId,
    },
    Fork {
        id: HistoryId,
        #[arg(allow_negative_numbers = true)]
        index: i64,
    },
    Verify {
        id: HistoryId,
    },
}

#[derive(Subcommand, Debug)]
pub enum StepCommand {
    Append {
        history: HistoryId,
        type_tag: String,
        payload: String,
        /// Interpreta `payload` como JSON en vez de texto.
        #[arg(long)]
        json: bool,
    },
    /// Agrega después de la posición `index`; ramifica si no es el final.
    Extend {
        history: HistoryId,
        #[arg(allow_negative_numbers = true)]
        index: i64,
        type_tag: String,
        payload: String,
        #[arg(long)]
        json: bool,
    },
    Show {
        id: StepId,
    },
    Next {
        id: StepId,
    },
    Chain {
        id: StepId,
    },
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<Value, ChainError> {
    serde_json::to_value(value).map_err(|e| ChainError::Codec(e.to_string()))
}

fn parse_payload(raw: String, json: bool) -> Result<Payload, ChainError> {
    if json {
        serde_json::from_str::<Value>(&raw).map(Payload::new)
                                           .map_err(|e| ChainError::Validation(format!("payload is not valid JSON: {e}")))
    } else {
        Ok(Payload::from(raw))
    }
}

/// Ejecuta un subcomando de datos. `Migrate` no pasa por aquí.
pub fn run<B: Backend>(store: &Store<B>, command: Command) -> Result<Value, ChainError> {
    match command {
        Command::Migrate => Ok(json!({"migrated": true})),
        Command::User(cmd) => run_user(store, cmd),
        Command::History(cmd) => run_history(store, cmd),
        Command::Step(cmd) => run_step(store, cmd),
    }
}

fn run_user<B: Backend>(store: &Store<B>, cmd: UserCommand) -> Result<Value, ChainError> {
    match cmd {
        UserCommand::Add { name, email, passhash } => to_json(&store.create_user(&name, &email, passhash.as_deref())?),
        UserCommand::Show { who } => to_json(&store.fetch_user(&who.selector()?)?),
        UserCommand::List => to_json(&store.list_users()?),
        UserCommand::Grant { who, role } => {
            let user = store.fetch_user(&who.selector()?)?;
            to_json(&store.grant_role(user.id, &role)?)
        }
        UserCommand::Roles { who } => {
            let principal = match (who.user_id, who.user.as_deref()) {
                (None, None) => None,
                _ => Some(who.selector()?),
            };
            to_json(&RoleGate::new(store).current_roles(principal.as_ref())?)
        }
    }
}

fn run_history<B: Backend>(store: &Store<B>, cmd: HistoryCommand) -> Result<Value, ChainError> {
    match cmd {
        HistoryCommand::New { owner, name } => {
            let user = store.fetch_user(&owner.selector()?)?;
            to_json(&store.create_history(user.id, &name)?)
        }
        HistoryCommand::List { owner } => {
            let user = store.fetch_user(&owner.selector()?)?;
            to_json(&store.list_histories(user.id)?)
        }
        HistoryCommand::Show { id } => to_json(&store.fetch_history(&HistorySelector { id })?),
        HistoryCommand::Fork { id, index } => to_json(&store.fork_history(&HistorySelector { id }, index)?),
        HistoryCommand::Verify { id } => {
            store.verify_history(id)?;
            Ok(json!({"history": id, "valid": true}))
        }
    }
}

fn run_step<B: Backend>(store: &Store<B>, cmd: StepCommand) -> Result<Value, ChainError> {
    match cmd {
        StepCommand::Append { history, type_tag, payload, json } => {
            to_json(&store.append_step(history, &type_tag, parse_payload(payload, json)?)?)
        }
        StepCommand::Extend { history, index, type_tag, payload, json } => {
            let (target, step) = store.extend_at(history, index, &type_tag, parse_payload(payload, json)?)?;
            Ok(json!({"history": to_json(&target)?, "step": to_json(&step)?}))
        }
        StepCommand::Show { id } => to_json(&store.fetch_step(id)?),
        StepCommand::Next { id } => to_json(&store.next_steps(id)?),
        StepCommand::Chain { id } => to_json(&store.chain(id)?),
    }
}
