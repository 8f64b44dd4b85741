/// Control directives typed with a leading `/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    ToggleCensorship,
    ShowConsequences,
    Redo,
    Save,
    Debug,
    Help,
    Unknown(String),
}

impl Directive {
    pub fn parse(input: &str) -> Option<Directive> {
        let cmd = input.trim();
        if !cmd.starts_with('/') {
            return None;
        }

        let directive = match cmd.to_lowercase().as_str() {
            "/censored" => Directive::ToggleCensorship,
            "/consequences" => Directive::ShowConsequences,
            "/redo" => Directive::Redo,
            "/save" => Directive::Save,
            "/debug" => Directive::Debug,
            "/help" => Directive::Help,
            _ => Directive::Unknown(cmd.to_string()),
        };
        Some(directive)
    }
}

pub const HELP_TEXT: &str = "\
Commands:
/censored - toggle the content filter
/consequences - list the latest consequences of your actions
/redo - ask the narrator to retell the last reply
/save - write the adventure to disk
/debug - show backend and session diagnostics
create <npc|location|item|faction> <name> - add something to the world directly
Start an action with \"Suddenly,\" or \"I bend the story to\" to reshape the narrative.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreationKind {
    Character,
    Location,
    Item,
    Faction,
}

impl CreationKind {
    pub fn from_keyword(keyword: &str) -> Option<CreationKind> {
        match keyword.to_lowercase().as_str() {
            "npc" | "character" | "ally" => Some(CreationKind::Character),
            "location" | "place" => Some(CreationKind::Location),
            "item" | "object" | "artifact" => Some(CreationKind::Item),
            "faction" | "group" => Some(CreationKind::Faction),
            _ => None,
        }
    }
}

/// `create <kind> <name>`: direct world authoring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateCommand {
    pub kind: CreationKind,
    /// The keyword as shown in the creation log, e.g. "Item" or "NPC".
    pub label: String,
    pub name: String,
}

/// What a raw line from the player turns out to be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerInput {
    Empty,
    Directive(Directive),
    Create(CreateCommand),
    UnknownCreation { kind: String },
    Action(String),
}

pub fn classify(raw: &str) -> PlayerInput {
    let input = raw.trim();
    if input.is_empty() {
        return PlayerInput::Empty;
    }

    if let Some(directive) = Directive::parse(input) {
        return PlayerInput::Directive(directive);
    }

    if let Some((kind, name)) = split_create(input) {
        return match CreationKind::from_keyword(kind) {
            Some(k) => PlayerInput::Create(CreateCommand {
                kind: k,
                label: label_for(kind),
                name: name.to_string(),
            }),
            None => PlayerInput::UnknownCreation {
                kind: kind.to_string(),
            },
        };
    }

    PlayerInput::Action(input.to_string())
}

pub fn parse_create(input: &str) -> Option<CreateCommand> {
    match classify(input) {
        PlayerInput::Create(cmd) => Some(cmd),
        _ => None,
    }
}

/// Splits `create <kind> <name...>`; the name must be non-empty.
fn split_create(input: &str) -> Option<(&str, &str)> {
    let (verb, rest) = input.split_once(char::is_whitespace)?;
    if !verb.eq_ignore_ascii_case("create") {
        return None;
    }

    let (kind, name) = rest.trim_start().split_once(char::is_whitespace)?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    Some((kind, name))
}

fn label_for(keyword: &str) -> String {
    let lower = keyword.to_lowercase();
    if lower == "npc" {
        return "NPC".to_string();
    }
    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
