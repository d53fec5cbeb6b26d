//! Slash commands accepted by the interactive chat loop.

/// A parsed chat input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatInput {
    /// Plain text, buffered as a human turn.
    Say(String),
    /// A slash command.
    Command(SlashCommand),
}

/// Supported slash commands in the chat loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlashCommand {
    /// Buffer an assistant turn.
    Ai(String),
    /// Move buffered turns into long-term memory.
    Promote,
    /// Drop buffered turns.
    Clear,
    /// Show buffered turns.
    Buffer,
    /// Switch the active project.
    Project(String),
    /// Recall history for the current project.
    History(String),
    /// Recall history for the current session.
    SessionHistory(String),
    /// Show the newest assistant record in scope.
    Last,
    /// Show available commands.
    Help,
    /// Leave the chat loop.
    Quit,
}

/// Usage text printed by `/help`.
pub const HELP: &str = "\
commands:
  /ai <text>                buffer an assistant turn
  /promote                  store buffered turns in long-term memory
  /clear                    drop buffered turns
  /buffer                   show buffered turns
  /project <id>             switch project (drops buffered turns)
  /history [query]          recall history for this project
  /session-history [query]  recall history for this session
  /last                     show the last assistant response
  /quit                     leave";

/// Parse one input line. Blank lines yield `Ok(None)`.
pub fn parse_chat_input(input: &str) -> Result<Option<ChatInput>, String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    let Some(body) = trimmed.strip_prefix('/') else {
        return Ok(Some(ChatInput::Say(trimmed.to_string())));
    };
    let (command, rest) = match body.split_once(char::is_whitespace) {
        Some((command, rest)) => (command, rest.trim()),
        None => (body, ""),
    };
    let command = match command.to_lowercase().as_str() {
        "ai" if rest.is_empty() => return Err("usage: /ai <text>".to_string()),
        "ai" => SlashCommand::Ai(rest.to_string()),
        "promote" => SlashCommand::Promote,
        "clear" => SlashCommand::Clear,
        "buffer" => SlashCommand::Buffer,
        "project" => match rest.split_whitespace().collect::<Vec<_>>().as_slice() {
            [id] => SlashCommand::Project((*id).to_string()),
            _ => return Err("usage: /project <id>".to_string()),
        },
        "history" => SlashCommand::History(rest.to_string()),
        "session-history" => SlashCommand::SessionHistory(rest.to_string()),
        "last" => SlashCommand::Last,
        "help" => SlashCommand::Help,
        "quit" | "exit" => SlashCommand::Quit,
        other => return Err(format!("unknown command: /{other}")),
    };
    Ok(Some(ChatInput::Command(command)))
}

#[cfg(test)]
mod tests {
    use super::{ChatInput, SlashCommand, parse_chat_input};
    use pretty_assertions::assert_eq;

    #[test]
    fn plain_text_is_a_turn() {
        assert_eq!(
            parse_chat_input("  how do I run tests? ").expect("parse"),
            Some(ChatInput::Say("how do I run tests?".to_string()))
        );
        assert_eq!(parse_chat_input("   ").expect("parse"), None);
    }

    #[test]
    fn commands_take_arguments() {
        assert_eq!(
            parse_chat_input("/project  engine").expect("parse"),
            Some(ChatInput::Command(SlashCommand::Project("engine".to_string())))
        );
        assert_eq!(
            parse_chat_input("/ai use cargo nextest").expect("parse"),
            Some(ChatInput::Command(SlashCommand::Ai(
                "use cargo nextest".to_string()
            )))
        );
        assert_eq!(
            parse_chat_input("/HISTORY").expect("parse"),
            Some(ChatInput::Command(SlashCommand::History(String::new())))
        );
        assert_eq!(
            parse_chat_input("/exit").expect("parse"),
            Some(ChatInput::Command(SlashCommand::Quit))
        );
    }

    #[test]
    fn malformed_commands_are_rejected() {
        assert!(parse_chat_input("/project").is_err());
        assert!(parse_chat_input("/project a b").is_err());
        assert!(parse_chat_input("/ai").is_err());
        assert_eq!(
            parse_chat_input("/frobnicate").unwrap_err(),
            "unknown command: /frobnicate"
        );
    }
}
