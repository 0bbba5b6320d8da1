//! Parsing of the line-oriented commands typed at the `qrtrack` prompt.

use qrtrack_core::types::DbId;

/// Usage text printed by `help`.
pub const HELP: &str = "\
Commands:
  login <email> <password>      sign in
  register [<email> <password>] create an account
  list                          show the dashboard
  refresh                       re-fetch the QR codes
  generate <url> [count]        create QR codes for a URL
  edit <id>                     start renaming a QR code
  name <text>                   type the new name
  save                          send the new name
  cancel                        leave edit mode
  rename <id> <label>           rename in one step
  delete <id>                   delete a QR code
  download <id>                 save a QR image to the download directory
  logout                        end the session
  help                          show this text
  quit                          exit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Login { email: String, password: String },
    /// Without credentials this only switches to the registration screen.
    Register(Option<(String, String)>),
    List,
    Refresh,
    Generate { url: String, count: Option<u32> },
    Edit(DbId),
    Name(String),
    Save,
    Cancel,
    Rename { id: DbId, label: String },
    Delete(DbId),
    Download(DbId),
    Logout,
    Help,
    Quit,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("empty command")]
    Empty,

    #[error("unknown command {0:?}, type `help` for a list")]
    Unknown(String),

    #[error("usage: {0}")]
    Usage(&'static str),

    #[error("{0:?} is not a valid number")]
    InvalidNumber(String),
}

impl Command {
    pub fn parse(line: &str) -> Result<Self, CommandError> {
        let line = line.trim();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };
        let args: Vec<&str> = rest.split_whitespace().collect();

        let command = match word.to_ascii_lowercase().as_str() {
            "" => return Err(CommandError::Empty),
            "login" => match args.as_slice() {
                [email, password] => Command::Login {
                    email: email.to_string(),
                    password: password.to_string(),
                },
                _ => return Err(CommandError::Usage("login <email> <password>")),
            },
            "register" => match args.as_slice() {
                [] => Command::Register(None),
                [email, password] => {
                    Command::Register(Some((email.to_string(), password.to_string())))
                }
                _ => return Err(CommandError::Usage("register [<email> <password>]")),
            },
            "list" | "ls" => Command::List,
            "refresh" => Command::Refresh,
            "generate" | "gen" => match args.as_slice() {
                [url] => Command::Generate {
                    url: url.to_string(),
                    count: None,
                },
                [url, count] => Command::Generate {
                    url: url.to_string(),
                    count: Some(parse_number(count)?),
                },
                _ => return Err(CommandError::Usage("generate <url> [count]")),
            },
            "edit" => Command::Edit(single_id(&args, "edit <id>")?),
            "name" => Command::Name(rest.to_string()),
            "save" => Command::Save,
            "cancel" => Command::Cancel,
            "rename" => {
                let (id, label) = rest
                    .split_once(char::is_whitespace)
                    .ok_or(CommandError::Usage("rename <id> <label>"))?;
                Command::Rename {
                    id: parse_number(id)?,
                    label: label.trim().to_string(),
                }
            }
            "delete" | "rm" => Command::Delete(single_id(&args, "delete <id>")?),
            "download" => Command::Download(single_id(&args, "download <id>")?),
            "logout" => Command::Logout,
            "help" | "?" => Command::Help,
            "quit" | "exit" => Command::Quit,
            other => return Err(CommandError::Unknown(other.to_string())),
        };
        Ok(command)
    }

    /// Whether the command needs a signed-in dashboard.
    pub fn needs_session(&self) -> bool {
        !matches!(
            self,
            Command::Login { .. } | Command::Register(_) | Command::Help | Command::Quit
        )
    }
}

fn single_id(args: &[&str], usage: &'static str) -> Result<DbId, CommandError> {
    match args {
        [id] => parse_number(id),
        _ => Err(CommandError::Usage(usage)),
    }
}

fn parse_number<T: std::str::FromStr>(raw: &str) -> Result<T, CommandError> {
    raw.trim()
        .parse()
        .map_err(|_| CommandError::InvalidNumber(raw.to_string()))
}
