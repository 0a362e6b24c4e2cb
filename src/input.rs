/// User intents forwarded from the interactive surface.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Intent {
    Toggle(String),
    Clear,
    ToggleTheme,
    /// 1-based position in the visible result list.
    OpenChat(usize),
    Home,
    List,
    Help,
    Quit,
    Invalid(String),
}

pub const HELP_TEXT: &str = "commands: toggle <id> | t <id> | clear | theme | chat <n> | home | list | help | quit";

pub fn parse_intent(line: &str) -> Option<Intent> {
    let mut parts = line.split_whitespace();
    let command = parts.next()?.to_ascii_lowercase();
    let argument = parts.next();

    let intent = match (command.as_str(), argument) {
        ("toggle" | "t", Some(id)) => Intent::Toggle(id.to_ascii_lowercase()),
        ("toggle" | "t", None) => Intent::Invalid("toggle needs a category id".to_string()),
        ("clear", _) => Intent::Clear,
        ("theme", _) => Intent::ToggleTheme,
        ("chat" | "c", Some(raw)) => match raw.parse::<usize>() {
            Ok(position) if position > 0 => Intent::OpenChat(position),
            _ => Intent::Invalid(format!("invalid request number '{raw}'")),
        },
        ("chat" | "c", None) => Intent::Invalid("chat needs a request number".to_string()),
        ("home", _) => Intent::Home,
        ("list" | "ls", _) => Intent::List,
        ("help" | "?", _) => Intent::Help,
        ("quit" | "q" | "exit", _) => Intent::Quit,
        (other, _) => Intent::Invalid(format!("unknown command '{other}'")),
    };
    Some(intent)
}
