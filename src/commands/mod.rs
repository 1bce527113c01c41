//! Slash commands typed into chat
//!
//! A line is split on single spaces, so multi-word arguments (search text, reasons, messages)
//! keep their exact spacing when joined back together.

mod admin;
pub mod parse;
mod player;

use log::{debug, error};
use thiserror::Error;

use crate::chat::ChatMessage;
use crate::error::LibraryError;
use crate::network::ServerContext;
use crate::presence::Session;
use crate::world::Position;

/// Why a command did nothing
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Invalid command. Type /help for a list of commands.")]
    Unknown,

    /// Bad arguments; the text is shown to the caller as is
    #[error("{0}")]
    Rejected(String),

    #[error(transparent)]
    Library(#[from] LibraryError),
}

pub type CommandResult = Result<(), CommandError>;

pub(crate) fn rejected(message: impl Into<String>) -> CommandError {
    CommandError::Rejected(message.into())
}

/// Message shown for a failed command
fn user_message(error: &CommandError) -> Option<String> {
    match error {
        CommandError::Library(LibraryError::InvalidSymbol { .. }) => {
            Some("Only letters and spaces are allowed.".to_string())
        }
        CommandError::Library(LibraryError::LengthExceeded { max, .. }) => {
            Some(format!("Phrases cannot be longer than {} characters.", max))
        }
        CommandError::Library(LibraryError::InvalidSearchMode { .. }) => {
            Some("Search mode must be either \"fill\" or \"exact\".".to_string())
        }
        CommandError::Library(LibraryError::MalformedCoordinates { .. }) => {
            Some("Invalid coordinates.".to_string())
        }
        CommandError::Library(LibraryError::OutOfRange { .. }) => {
            Some("Those coordinates are outside the library.".to_string())
        }
        CommandError::Library(e) if e.is_user_error() => Some(e.to_string()),
        CommandError::Library(_) => None,
        other => Some(other.to_string()),
    }
}

/// Run one command line (without the leading `/`) for `session`
pub fn dispatch(context: &ServerContext, session: &Session, line: &str) {
    let mut words = line.split(' ');
    let name = words.next().unwrap_or_default();
    let args: Vec<&str> = words.collect();
    let admin = context.is_admin(&session.uuid());

    let result = match name {
        "help" => player::help(context, session, admin),
        "tp" => player::tp(context, session, session, &args),
        "search" => player::search(context, session, &args),
        "nearbysearch" => player::nearby_search(context, session),
        "highlight" => player::highlight(context, session, &args),
        "togglechat" => player::toggle_chat(context, session),
        "toggleplayers" => player::toggle_players(context, session),
        "report" => player::report(context, session, &args),
        "clear" => player::clear(context, session),
        "kick" if admin => admin::kick(context, session, &args),
        "tpother" if admin => admin::tp_other(context, session, &args),
        "announce" if admin => admin::announce(context, session, &args),
        "tell" if admin => admin::tell(context, session, &args),
        _ => Err(CommandError::Unknown),
    };

    if let Err(e) = result {
        if matches!(e, CommandError::Unknown) {
            debug!("{} tried failing command \"/{}\"", session.username(), line);
        }
        match user_message(&e) {
            Some(message) => context.send_chat(session, ChatMessage::error(message)),
            None => {
                error!("Command \"/{}\" from {} failed: {}", line, session.username(), e);
                context.send_error(session, "Something went wrong. Please try again.");
            }
        }
    }
}

/// Current position of a session
pub(crate) fn position_of(session: &Session) -> Result<Position, CommandError> {
    session
        .state()
        .position
        .ok_or_else(|| rejected("Your position is not known yet."))
}

/// Integer with `,` between thousands, sign kept
pub(crate) fn group_thousands(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if value < 0 {
        grouped.push('-');
    }
    for (index, digit) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    grouped
}
