use reqwest::Url;

use crate::schema::{self, Contract};

/// Opponent and country breakdowns keep this many rows, most frequent first.
pub const TOP_OPPONENTS: usize = 5;
pub const TOP_DISMISSALS: usize = 6;
pub const TIME_WINDOW_YEARS: usize = 10;
pub const BOWLING_FORMATS: [&str; 3] = ["Test", "ODI", "T20I"];
pub const RUNS_BUCKETS: [&str; 4] = ["vs Pace", "vs Spin", "at Home", "Away"];
pub const SUMMARY_POINTS: usize = 3;

/// What the user typed to identify a player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    Url(String),
    Name(String),
}

impl Locator {
    /// An absolute http(s) address with a host is a profile URL; anything else is a name.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        match Url::parse(raw) {
            Ok(url) if matches!(url.scheme(), "http" | "https") && url.host_str().is_some() => {
                Locator::Url(raw.to_string())
            }
            _ => Locator::Name(raw.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Locator::Url(s) | Locator::Name(s) => s,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    Report,
    Comparison,
    Chat,
}

impl TargetKind {
    pub fn contract(&self) -> &'static Contract {
        match self {
            TargetKind::Report => &schema::PLAYER_REPORT,
            TargetKind::Comparison => &schema::COMPARISON,
            TargetKind::Chat => &schema::CHAT_ANSWER,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TargetKind::Report => "report",
            TargetKind::Comparison => "comparison",
            TargetKind::Chat => "chat",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Target<'a> {
    Report { locator: &'a Locator },
    Comparison { player_name: &'a str },
    Chat { player_name: &'a str, question: &'a str },
}

impl Target<'_> {
    pub fn kind(&self) -> TargetKind {
        match self {
            Target::Report { .. } => TargetKind::Report,
            Target::Comparison { .. } => TargetKind::Comparison,
            Target::Chat { .. } => TargetKind::Chat,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Prompt {
    pub kind: TargetKind,
    pub instruction: String,
    pub contract: &'static Contract,
}

pub fn build(target: Target<'_>) -> Prompt {
    let kind = target.kind();
    let instruction = match target {
        Target::Report { locator } => report_instruction(locator),
        Target::Comparison { player_name } => comparison_instruction(player_name),
        Target::Chat {
            player_name,
            question,
        } => chat_instruction(player_name, question),
    };
    Prompt {
        kind,
        instruction,
        contract: kind.contract(),
    }
}

fn report_instruction(locator: &Locator) -> String {
    let subject = match locator {
        Locator::Url(url) => format!("Analyze the cricketer's profile from the URL: {url}."),
        Locator::Name(name) => format!("Analyze the career of the cricketer: {name}."),
    };
    format!(
        "{subject}\n\
         Provide a comprehensive analysis based on the provided JSON schema.\n\
         Ensure all fields are populated with accurate data. For performance vs country and opponent, pick the top {TOP_OPPONENTS} most frequent ones.\n\
         For bowling stats, provide stats for {} formats.\n\
         For performance over time, provide the last {TIME_WINDOW_YEARS} years of data.\n\
         For runs distribution, provide runs {}.\n\
         For dismissal analysis, provide the top {TOP_DISMISSALS} most frequent dismissal methods.\n\
         For the executive summary, give {SUMMARY_POINTS} actionable areas for improvement formatted as '1. ... 2. ... 3. ...'.",
        list(&BOWLING_FORMATS),
        list(&RUNS_BUCKETS),
    )
}

fn comparison_instruction(player_name: &str) -> String {
    format!(
        "Generate a career summary for the cricketer: {player_name}. Use the provided JSON schema. \
         Fetch a publicly available image URL for the player."
    )
}

fn chat_instruction(player_name: &str, question: &str) -> String {
    format!(
        "You are a cricket analyst AI. The user is currently viewing a report about {player_name}.\n\
         Answer the following question: \"{question}\".\n\
         Keep your answer concise and informative. Use Google Search to find the most up-to-date information if needed, \
         and prefer search-grounded facts over prior knowledge when they disagree."
    )
}

/// "a, b, and c"
fn list(items: &[&str]) -> String {
    match items {
        [] => String::new(),
        [one] => one.to_string(),
        [first, second] => format!("{first} and {second}"),
        [init @ .., last] => format!("{}, and {last}", init.join(", ")),
    }
}
