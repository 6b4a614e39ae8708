//! Line commands read from stdin.

use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Record `n` taps.
    Tap(u32),
    Online,
    Offline,
    Sync,
    Refresh,
    Status,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownCommand(pub String);

impl fmt::Display for UnknownCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown command {:?} (try `help`)", self.0)
    }
}

impl std::error::Error for UnknownCommand {}

impl FromStr for Command {
    type Err = UnknownCommand;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let cmd = words.next().unwrap_or_default().to_ascii_lowercase();
        let arg = words.next();
        let unknown = || UnknownCommand(line.trim().to_string());
        match (cmd.as_str(), arg) {
            ("tap" | "t", None) => Ok(Command::Tap(1)),
            ("tap" | "t", Some(n)) => match n.parse::<u32>() {
                Ok(n) if n > 0 => Ok(Command::Tap(n)),
                _ => Err(unknown()),
            },
            ("online", None) => Ok(Command::Online),
            ("offline", None) => Ok(Command::Offline),
            ("sync", None) => Ok(Command::Sync),
            ("refresh", None) => Ok(Command::Refresh),
            ("status" | "s", None) => Ok(Command::Status),
            ("help" | "?", None) => Ok(Command::Help),
            ("quit" | "exit" | "q", None) => Ok(Command::Quit),
            _ => Err(unknown()),
        }
    }
}

pub const HELP: &str = "\
commands:
  tap [n]   record n taps (default 1)
  online    report the network as connected
  offline   report the network as disconnected
  sync      reconcile buffered taps now
  refresh   fetch today's count from the server
  status    show counts and sync state
  quit      stop";
