//! Structures and methods to extract and normalize the power status embedded in the status page

use std::{fmt, sync::OnceLock};

use regex::Regex;

/// Name of the script array the firmware uses to publish its power status
pub const STATUS_ARRAY_NAME: &str = "info_status_value";

/// Canonical power state of the projector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PowerState {
    /// Powered on, or starting up
    On,
    /// Powered off, or in standby
    Off,
    /// Transitioning between states (cooldown or warmup)
    Cooling,
    /// Anything else, including unreachable device or unparsable page
    Unknown,
}

impl PowerState {
    /// Map a raw vendor token to a canonical state.
    ///
    /// This is a total function: every input, including a missing token, maps to exactly one state.
    pub fn normalize(token: Option<&str>) -> Self {
        let Some(token) = token else {
            return PowerState::Unknown;
        };

        let up = token.trim().to_uppercase();
        match up.as_str() {
            "ON" | "STARTUP" | "STARTUP1" | "STARTUP2" | "POWER ON" => PowerState::On,
            "OFF" | "STANDBY" => PowerState::Off,
            _ if up.contains("COOL") || up.contains("WARM") => PowerState::Cooling,
            _ => PowerState::Unknown,
        }
    }

    /// Upper-case label of this state, as printed by the query tool
    pub fn as_str(&self) -> &'static str {
        match self {
            PowerState::On => "ON",
            PowerState::Off => "OFF",
            PowerState::Cooling => "COOLING",
            PowerState::Unknown => "UNKNOWN",
        }
    }

    /// Process exit code reported by the query tool for this state
    pub fn exit_code(&self) -> u8 {
        match self {
            PowerState::On => 0,
            PowerState::Off => 2,
            PowerState::Cooling => 3,
            PowerState::Unknown => 4,
        }
    }
}

impl fmt::Display for PowerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn status_array_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(r"(?i)var\s+{}\s*=\s*\[([^\]]*)\]", regex::escape(STATUS_ARRAY_NAME)))
            .expect("status array regex is valid")
    })
}

fn quoted_item_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"'([^']*)'").expect("quoted item regex is valid"))
}

/// Remove every line break so declarations spread over several lines match a single-line pattern
pub fn compact(html: &str) -> String {
    html.chars().filter(|c| *c != '\r' && *c != '\n').collect()
}

/// Locate the status array declaration in a compacted page.
///
/// Returns the whole matched declaration and the raw text between its brackets.
pub fn locate_array(compacted: &str) -> Option<(&str, &str)> {
    let captures = status_array_regex().captures(compacted)?;
    let declaration = captures.get(0)?.as_str();
    let contents = captures.get(1)?.as_str();
    Some((declaration, contents))
}

/// All single-quoted literals of an array body, in order
pub fn quoted_items(contents: &str) -> Vec<&str> {
    quoted_item_regex()
        .captures_iter(contents)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str())
        .collect()
}

/// First single-quoted literal of an array body
pub fn first_quoted(contents: &str) -> Option<&str> {
    quoted_item_regex()
        .captures(contents)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// Extract the raw status token from a status page, if any
pub fn extract_token(html: &str) -> Option<String> {
    let compacted = compact(html);
    let (_, contents) = locate_array(&compacted)?;
    first_quoted(contents).map(str::to_owned)
}

/// Detailed result of parsing a status page, used for diagnostics
#[derive(Debug, Clone, PartialEq)]
pub struct StatusReport {
    /// Matched array declaration, if found
    pub declaration: Option<String>,
    /// Every quoted literal of the array
    pub items: Vec<String>,
    /// Normalized state computed from the first item
    pub state: PowerState,
}

impl StatusReport {
    /// Parse a whole status page
    pub fn from_html(html: &str) -> Self {
        let compacted = compact(html);
        match locate_array(&compacted) {
            Some((declaration, contents)) => {
                let items: Vec<String> =
                    quoted_items(contents).into_iter().map(str::to_owned).collect();
                let state = PowerState::normalize(items.first().map(String::as_str));
                Self { declaration: Some(declaration.to_owned()), items, state }
            }
            None => Self { declaration: None, items: Vec::new(), state: PowerState::Unknown },
        }
    }

    /// Raw token the state was computed from
    pub fn token(&self) -> Option<&str> {
        self.items.first().map(String::as_str)
    }
}
