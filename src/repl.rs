/// Represents a parsed backslash meta command.
#[derive(Debug, PartialEq)]
pub enum Command {
    Quit,
    Include(Option<String>),
    Begin,
    Commit,
    Rollback,
    Password(Option<String>),
    Set {
        name: Option<String>,
        value: Option<String>,
    },
    Unset(Option<String>),
    Drivers,
    ConnInfo,
    Help,
    Unknown(String),
}

/// Parses a line starting with a backslash into a `Command`.
///
/// Returns `None` for anything else, which is SQL.
pub fn parse_command(input: &str) -> Option<Command> {
    let input = input.trim();
    let trimmed = input.strip_prefix('\\')?;
    let parts: Vec<&str> = trimmed.split_whitespace().collect();
    if parts.is_empty() {
        return Some(Command::Unknown(input.to_string()));
    }
    let arg = |i: usize| parts.get(i).map(|s| s.to_string());
    let command = match parts[0] {
        "q" | "quit" => Command::Quit,
        "i" | "include" => Command::Include(arg(1)),
        "begin" => Command::Begin,
        "commit" => Command::Commit,
        "rollback" | "abort" => Command::Rollback,
        "password" => Command::Password(arg(1)),
        "set" => Command::Set {
            name: arg(1),
            value: (parts.len() > 2).then(|| parts[2..].join(" ")),
        },
        "unset" => Command::Unset(arg(1)),
        "drivers" => Command::Drivers,
        "conninfo" => Command::ConnInfo,
        "?" | "help" => Command::Help,
        _ => Command::Unknown(parts[0].to_string()),
    };
    Some(command)
}

/// Text printed for `\?`.
pub fn help_text() -> &'static str {
    "General
  \\q                     quit
  \\drivers               display information about available drivers
  \\conninfo              display information about the current connection
  \\i FILE                execute commands from file

Transaction
  \\begin                 begin a transaction
  \\commit                commit the current transaction
  \\rollback              rollback (abort) the current transaction

Connection
  \\password [USERNAME]   change the password for a user

Variables
  \\set [NAME [VALUE]]    set a client variable, or list all when no name is given
  \\unset NAME            unset (delete) a client variable
"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_include_command() {
        assert_eq!(
            parse_command("\\i scripts/setup.sql"),
            Some(Command::Include(Some("scripts/setup.sql".to_string())))
        );
        assert_eq!(parse_command("\\include"), Some(Command::Include(None)));
    }

    #[test]
    fn test_parse_set_command_with_value() {
        assert_eq!(
            parse_command("\\set greeting hello world"),
            Some(Command::Set {
                name: Some("greeting".to_string()),
                value: Some("hello world".to_string())
            })
        );
    }

    #[test]
    fn test_parse_set_command_without_arguments() {
        assert_eq!(
            parse_command("\\set"),
            Some(Command::Set {
                name: None,
                value: None
            })
        );
    }

    #[test]
    fn test_parse_transaction_commands() {
        assert_eq!(parse_command("  \\begin "), Some(Command::Begin));
        assert_eq!(parse_command("\\commit"), Some(Command::Commit));
        assert_eq!(parse_command("\\rollback"), Some(Command::Rollback));
    }

    #[test]
    fn test_parse_password_command() {
        assert_eq!(parse_command("\\password"), Some(Command::Password(None)));
        assert_eq!(
            parse_command("\\password bob"),
            Some(Command::Password(Some("bob".to_string())))
        );
    }

    #[test]
    fn test_parse_unknown_command() {
        assert_eq!(
            parse_command("\\invalid"),
            Some(Command::Unknown("invalid".to_string()))
        );
        assert_eq!(parse_command("\\"), Some(Command::Unknown("\\".to_string())));
    }

    #[test]
    fn test_parse_sql_query() {
        assert_eq!(parse_command("SELECT * FROM users"), None);
    }
}
