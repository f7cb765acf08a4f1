//! Slash-command parsing for the input line.

use thiserror::Error;

/// One parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Plain text to send to the agent.
    Send(String),
    /// `/new [name]`
    NewThread(Option<String>),
    /// `/threads`
    Threads,
    /// `/switch <n>`, 1-based index into the thread list.
    Switch(usize),
    /// `/rename <name>` for the active thread.
    Rename(String),
    /// `/delete [n]`, the active thread when no index is given.
    Delete(Option<usize>),
    /// `/clear`
    Clear,
    /// `/reset`
    Reset,
    /// `/retry`
    Retry,
    /// `/cancel`
    Cancel,
    /// `/help`
    Help,
    /// `/quit`
    Quit,
}

/// Why an input line was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    /// Unrecognized slash command.
    #[error("unknown command '/{0}' (try /help)")]
    Unknown(String),

    /// A required argument was not given.
    #[error("/{command} needs {what}")]
    MissingArgument {
        /// Command name without the slash.
        command: &'static str,
        /// What was expected.
        what: &'static str,
    },

    /// A thread index was not a positive number.
    #[error("'{0}' is not a thread number")]
    InvalidIndex(String),
}

/// Help text listing every command.
pub const HELP: &str = "\
Commands:
  /new [name]      start a new thread
  /threads         list threads
  /switch <n>      switch to thread n
  /rename <name>   rename the active thread
  /delete [n]      delete thread n (default: active)
  /clear           clear messages in the active thread
  /reset           delete all threads and stored data
  /retry           resend the message behind the last error
  /cancel          abandon the reply in flight
  /help            show this help
  /quit            exit
Anything else is sent to the weather agent.";

/// Parse one input line. Blank lines yield `Ok(None)`.
///
/// # Errors
///
/// Returns an error for unknown commands and malformed arguments.
pub fn parse(line: &str) -> Result<Option<Command>, CommandError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let Some(rest) = line.strip_prefix('/') else {
        return Ok(Some(Command::Send(line.to_string())));
    };

    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (rest, ""),
    };
    let arg = (!arg.is_empty()).then(|| arg.to_string());

    let command = match name.to_ascii_lowercase().as_str() {
        "new" => Command::NewThread(arg),
        "threads" | "ls" => Command::Threads,
        "switch" => Command::Switch(index(arg.as_deref(), "switch")?),
        "rename" => Command::Rename(arg.ok_or(CommandError::MissingArgument {
            command: "rename",
            what: "a name",
        })?),
        "delete" => Command::Delete(
            arg.as_deref()
                .map(|a| index(Some(a), "delete"))
                .transpose()?,
        ),
        "clear" => Command::Clear,
        "reset" => Command::Reset,
        "retry" => Command::Retry,
        "cancel" => Command::Cancel,
        "help" | "?" => Command::Help,
        "quit" | "exit" | "q" => Command::Quit,
        other => return Err(CommandError::Unknown(other.to_string())),
    };
    Ok(Some(command))
}

fn index(arg: Option<&str>, command: &'static str) -> Result<usize, CommandError> {
    let arg = arg.ok_or(CommandError::MissingArgument {
        command,
        what: "a thread number",
    })?;
    match arg.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(CommandError::InvalidIndex(arg.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_sent_trimmed() {
        assert_eq!(
            parse("  Weather in Oslo?  ").unwrap(),
            Some(Command::Send("Weather in Oslo?".into()))
        );
        assert_eq!(parse("   ").unwrap(), None);
    }

    #[test]
    fn commands_with_arguments() {
        assert_eq!(parse("/new").unwrap(), Some(Command::NewThread(None)));
        assert_eq!(
            parse("/new  Trip planning ").unwrap(),
            Some(Command::NewThread(Some("Trip planning".into())))
        );
        assert_eq!(parse("/switch 2").unwrap(), Some(Command::Switch(2)));
        assert_eq!(parse("/delete").unwrap(), Some(Command::Delete(None)));
        assert_eq!(parse("/DELETE 3").unwrap(), Some(Command::Delete(Some(3))));
        assert_eq!(
            parse("/rename Home").unwrap(),
            Some(Command::Rename("Home".into()))
        );
        assert_eq!(parse("/q").unwrap(), Some(Command::Quit));
    }

    #[test]
    fn malformed_commands() {
        assert_eq!(parse("/bogus"), Err(CommandError::Unknown("bogus".into())));
        assert_eq!(
            parse("/switch"),
            Err(CommandError::MissingArgument {
                command: "switch",
                what: "a thread number"
            })
        );
        assert_eq!(parse("/switch 0"), Err(CommandError::InvalidIndex("0".into())));
        assert_eq!(parse("/delete two"), Err(CommandError::InvalidIndex("two".into())));
        assert!(parse("/rename").is_err());
    }
}
