//! Command text parsing

/// Prefix that marks a message as a command.
pub const COMMAND_PREFIX: &str = "ig~";

/// A parsed command: the command word and its raw argument string.
/// Argument validation happens in the handlers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    pub name: String,
    pub args: String,
}

/// Parse a message into a command, or `None` if it is not one.
pub fn parse(text: &str) -> Option<ParsedCommand> {
    let rest = text.strip_prefix(COMMAND_PREFIX)?;
    let mut parts = rest.splitn(2, ' ');
    let name = parts.next().unwrap_or("");
    if name.is_empty() {
        return None;
    }
    Some(ParsedCommand {
        name: name.to_string(),
        args: parts.next().unwrap_or("").trim().to_string(),
    })
}

/// Strip surrounding quotes and spaces from an argument.
pub fn strip_quotes(s: &str) -> &str {
    s.trim_matches(|c: char| c == '\'' || c == '"' || c == ' ')
}
