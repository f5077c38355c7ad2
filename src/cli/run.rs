//! Command dispatcher: matches the parsed [`Command`] to its handler.

use anyhow::Result;

use super::{
    args::{Arguments, Command},
    commands::{ci::ci, init::init, status::status, translate::translate, update::update},
    exit_status::ExitStatus,
};

pub fn run(Arguments { command }: Arguments) -> Result<ExitStatus> {
    match command {
        Some(Command::Init) => init(),
        Some(Command::Translate(args)) => translate(args),
        Some(Command::Update(args)) => update(args),
        Some(Command::Ci(args)) => ci(args),
        Some(Command::Status(args)) => status(args),
        None => {
            anyhow::bail!("No command provided. Use --help to see available commands.")
        }
    }
}
