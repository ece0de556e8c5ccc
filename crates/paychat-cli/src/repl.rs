//! Input line parsing.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Send(String),
    Approve,
    Deny,
    Limits,
    Upgrade(String),
    Clear,
    Health,
    Help,
    Quit,
    Unknown(String),
    Empty,
}

pub const HELP: &str = "\
Type a message to talk to the agent. Commands:
  /approve        approve the pending action
  /deny           reject the pending action
  /limits         show tier and usage
  /upgrade KEY    raise the session tier with an access key
  /clear          clear the conversation
  /health         check the backend
  /help           show this help
  /quit           exit";

pub fn parse(line: &str) -> Command {
    let line = line.trim();
    if line.is_empty() {
        return Command::Empty;
    }
    let Some(rest) = line.strip_prefix('/') else {
        return Command::Send(line.to_string());
    };
    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (rest, ""),
    };
    match name.to_ascii_lowercase().as_str() {
        "approve" => Command::Approve,
        "deny" | "reject" => Command::Deny,
        "limits" => Command::Limits,
        "upgrade" if !arg.is_empty() => Command::Upgrade(arg.to_string()),
        "clear" => Command::Clear,
        "health" => Command::Health,
        "help" | "?" => Command::Help,
        "quit" | "exit" | "q" => Command::Quit,
        _ => Command::Unknown(line.to_string()),
    }
}
