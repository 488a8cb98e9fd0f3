//! Command parsing.

use tocsin_client::ClientEvent;

/// A parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `create`: new room with a generated code
    Create,
    /// `join <code>`
    Join {
        /// Room code as typed
        room: String,
    },
    /// `leave`
    Leave,
    /// `name <new name>`
    Name {
        /// New name as typed, may contain spaces
        name: String,
    },
    /// `alert`: raise an emergency
    Alert,
    /// `bookmarks`: list bookmarked rooms
    Bookmarks,
    /// `forget <code>`: remove a bookmark
    Forget {
        /// Room code as typed
        room: String,
    },
    /// `status`: show name, room and members
    Status,
    /// `help`
    Help,
    /// `quit`
    Quit,
    /// Nothing recognizable
    Unknown {
        /// The command word
        input: String,
    },
    /// Known command, wrong arguments
    InvalidArgs {
        /// The command word
        command: String,
        /// What was wrong
        error: String,
    },
}

/// Usage text for `help`.
pub const HELP: &str = "\
commands:
  create          create a room with a new code
  join <code>     join a room
  leave           leave the current room
  name <name>     change your display name
  alert           raise an emergency in the current room
  bookmarks       list rooms you joined before
  forget <code>   remove a bookmark
  status          show name, room and members
  quit            exit";

/// Parse one input line. Blank input parses as `Help`.
pub fn parse(line: &str) -> Command {
    let line = line.trim();
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let no_args = |command: Command| {
        if rest.is_empty() {
            command
        } else {
            Command::InvalidArgs { command: word.to_string(), error: "takes no arguments".into() }
        }
    };
    let one_arg = |make: fn(String) -> Command| {
        if rest.is_empty() {
            Command::InvalidArgs { command: word.to_string(), error: "missing argument".into() }
        } else {
            make(rest.to_string())
        }
    };

    match word.to_ascii_lowercase().as_str() {
        "" | "help" => Command::Help,
        "create" => no_args(Command::Create),
        "join" => one_arg(|room| Command::Join { room }),
        "leave" => no_args(Command::Leave),
        "name" => one_arg(|name| Command::Name { name }),
        "alert" => no_args(Command::Alert),
        "bookmarks" => no_args(Command::Bookmarks),
        "forget" => one_arg(|room| Command::Forget { room }),
        "status" => no_args(Command::Status),
        "quit" | "exit" => no_args(Command::Quit),
        _ => Command::Unknown { input: word.to_string() },
    }
}

impl Command {
    /// The manager intent for this command, if it has one.
    ///
    /// Local commands (`bookmarks`, `status`, `help`, `quit`) and parse
    /// failures have none.
    pub fn into_intent(self) -> Option<ClientEvent> {
        match self {
            Self::Create => Some(ClientEvent::CreateRoom),
            Self::Join { room } => Some(ClientEvent::JoinRoom { room }),
            Self::Leave => Some(ClientEvent::LeaveRoom),
            Self::Name { name } => Some(ClientEvent::Rename { name }),
            Self::Alert => Some(ClientEvent::RaiseEmergency),
            Self::Forget { room } => Some(ClientEvent::ForgetBookmark { room }),
            Self::Bookmarks
            | Self::Status
            | Self::Help
            | Self::Quit
            | Self::Unknown { .. }
            | Self::InvalidArgs { .. } => None,
        }
    }
}
