//! Slash commands typed at the prompt.
//!
//! Each area lives in its own module; [`dispatch`] routes a parsed
//! [`Command`] to it and turns the result into a [`Reply`] for the terminal.

pub mod identity;
pub mod messaging;
pub mod rooms;

use emojichat_store::RealtimeStore;

use crate::config::ClientConfig;
use crate::controller::{ControllerError, RoomController};
use crate::notices::Notice;
use crate::render;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Nick(String),
    Join(String),
    Leave,
    Status(String),
    Who,
    Palette,
    Pick(String),
    Send,
    Transfer,
    Help,
    Quit,
    /// A line without a leading slash: appended to the draft and sent.
    Say(String),
    Unknown(String),
}

impl Command {
    /// `None` for a blank line.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        let Some(rest) = line.strip_prefix('/') else {
            return Some(Command::Say(line.to_string()));
        };

        let (name, args) = match rest.split_once(char::is_whitespace) {
            Some((name, args)) => (name, args.trim().to_string()),
            None => (rest, String::new()),
        };

        let command = match name.to_lowercase().as_str() {
            "nick" | "name" => Command::Nick(args),
            "join" | "j" => Command::Join(args),
            "leave" => Command::Leave,
            "status" | "s" => Command::Status(args),
            "who" | "w" => Command::Who,
            "palette" | "p" => Command::Palette,
            "pick" => Command::Pick(args),
            "send" => Command::Send,
            "transfer" | "pay" => Command::Transfer,
            "help" | "h" | "?" => Command::Help,
            "quit" | "q" | "exit" => Command::Quit,
            _ => Command::Unknown(name.to_string()),
        };
        Some(command)
    }
}

/// What the terminal should do after a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Nothing,
    Notice(Notice),
    Lines(Vec<String>),
    Quit,
}

impl Reply {
    fn from_error(action: &str, err: &ControllerError) -> Self {
        if err.is_validation() {
            Reply::Notice(Notice::error(err.to_string()))
        } else {
            Reply::Notice(Notice::failure(action, err))
        }
    }
}

pub async fn dispatch<S: RealtimeStore>(
    controller: &mut RoomController<S>,
    command: Command,
    config: &ClientConfig,
) -> Reply {
    match command {
        Command::Nick(name) => identity::nick(controller, &name).await,
        Command::Join(room) => rooms::join(controller, &room).await,
        Command::Leave => rooms::leave(controller).await,
        Command::Status(status) => rooms::status(controller, &status).await,
        Command::Who => rooms::who(controller, config),
        Command::Palette => Reply::Lines(render::format_palette()),
        Command::Pick(index) => messaging::pick(controller, &index),
        Command::Send => messaging::send_draft(controller).await,
        Command::Transfer => messaging::transfer(controller).await,
        Command::Say(text) => messaging::say(controller, &text).await,
        Command::Help => Reply::Lines(render::HELP.lines().map(str::to_string).collect()),
        Command::Quit => Reply::Quit,
        Command::Unknown(name) => {
            Reply::Notice(Notice::error(format!("Unknown command /{name}, try /help")))
        }
    }
}
