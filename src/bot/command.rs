//! Direct message commands

/// A parsed direct message command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Process all feeds now
    Run,
    /// Free-text feedback for the profile
    Feedback(String),
    Help,
    /// Prefixed but not recognised
    Unknown(String),
}

/// Parse `content` as a command; messages without the prefix are not commands.
pub fn parse_command(prefix: &str, content: &str) -> Option<Command> {
    let rest = content.trim_start().strip_prefix(prefix)?;
    let rest = rest.trim();
    let (name, args) = match rest.split_once(char::is_whitespace) {
        Some((name, args)) => (name, args.trim()),
        None => (rest, ""),
    };

    let command = match name.to_lowercase().as_str() {
        "run" => Command::Run,
        "feedback" => Command::Feedback(args.to_string()),
        "help" => Command::Help,
        _ => Command::Unknown(name.to_string()),
    };
    Some(command)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run_and_help() {
        assert_eq!(parse_command("!", "!run"), Some(Command::Run));
        assert_eq!(parse_command("!", "  !RUN  "), Some(Command::Run));
        assert_eq!(parse_command("!", "!help"), Some(Command::Help));
    }

    #[test]
    fn test_parse_feedback_keeps_text() {
        assert_eq!(
            parse_command("!", "!feedback  more about Mars,\nless about stocks "),
            Some(Command::Feedback("more about Mars,\nless about stocks".to_string()))
        );
        assert_eq!(
            parse_command("!", "!feedback"),
            Some(Command::Feedback(String::new()))
        );
    }

    #[test]
    fn test_non_commands() {
        assert_eq!(parse_command("!", "hello there"), None);
        assert_eq!(parse_command("!", ""), None);
        assert_eq!(
            parse_command("!", "!dance now"),
            Some(Command::Unknown("dance".to_string()))
        );
    }

    #[test]
    fn test_custom_prefix() {
        assert_eq!(parse_command("fc ", "fc run"), Some(Command::Run));
        assert_eq!(parse_command("fc ", "!run"), None);
    }
}
