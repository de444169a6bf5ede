//! Special commands parser for interactive chat mode
//!
//! Lines starting with `/` are handled locally instead of being sent to
//! the planner. Besides session inspection (`/state`, `/map`,
//! `/itinerary`) there are quick actions that expand into canned prompts,
//! e.g. `/hotels Lisbon` sends "Show me good hotel options in Lisbon for
//! my trip."
//!
//! Command names are case-insensitive; arguments keep their case.

use thiserror::Error;

/// Errors that can occur when parsing special commands
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// Unknown command was entered
    #[error("Unknown command: {0}\n\nType '/help' to see available commands")]
    UnknownCommand(String),

    /// Command was given an argument it does not take
    #[error("Unsupported argument for {command}: {arg}\n\nType '/help' to see valid usage")]
    UnsupportedArgument { command: String, arg: String },

    /// Command requires an argument but none was provided
    #[error("Command {command} requires an argument\n\nUsage: {usage}")]
    MissingArgument { command: String, usage: String },
}

/// Canned prompts offered next to the itinerary
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuickAction {
    /// Hotel options, optionally for a named city
    Hotels(Option<String>),
    /// Airports and flights, optionally around a named city
    Flights(Option<String>),
    /// Destinations and places to visit, optionally around a named city
    Destinations(Option<String>),
    /// Attractions near a named place
    Attractions(String),
}

impl QuickAction {
    /// Prompt text to send
    ///
    /// Without an explicit city the action falls back to `current_city`
    /// (usually the destination of the last query), and without either to
    /// a prompt about the trip as a whole.
    ///
    /// # Examples
    ///
    /// ```
    /// use tripplanner::commands::special_commands::QuickAction;
    ///
    /// let action = QuickAction::Hotels(None);
    /// assert_eq!(
    ///     action.prompt(Some("Kyoto")),
    ///     "Show me good hotel options in Kyoto for my trip."
    /// );
    /// ```
    pub fn prompt(&self, current_city: Option<&str>) -> String {
        fn city<'a>(explicit: &'a Option<String>, current: Option<&'a str>) -> Option<&'a str> {
            explicit.as_deref().or(current).filter(|c| !c.trim().is_empty())
        }

        match self {
            QuickAction::Hotels(c) => match city(c, current_city) {
                Some(city) => format!("Show me good hotel options in {} for my trip.", city),
                None => "Suggest good hotel options based on my trip.".to_string(),
            },
            QuickAction::Flights(c) => match city(c, current_city) {
                Some(city) => format!(
                    "What are the best airports and flight options around {}?",
                    city
                ),
                None => "Suggest good flight options based on my trip.".to_string(),
            },
            QuickAction::Destinations(c) => match city(c, current_city) {
                Some(city) => format!(
                    "Suggest great destinations and places to visit around {}.",
                    city
                ),
                None => "Suggest great destinations and places to visit for my trip.".to_string(),
            },
            QuickAction::Attractions(place) => {
                format!("Suggest popular attractions near {}.", place)
            }
        }
    }
}

/// Special commands that can be executed during interactive chat
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecialCommand {
    /// Display help information
    Help,

    /// Show conversation id, typing flag, itinerary status and retry state
    State,

    /// Show map markers and, with a maps key, the static map URL
    Map,

    /// Print the current itinerary day by day
    Itinerary,

    /// Show a single itinerary stop on the map, matched by name
    Focus(String),

    /// Send a canned prompt
    Quick(QuickAction),

    /// Start a new conversation
    Reset,

    /// Exit the session
    Exit,

    /// Not a special command; send the input to the planner
    None,
}

fn optional_arg(rest: &str) -> Option<String> {
    let rest = rest.trim();
    if rest.is_empty() {
        None
    } else {
        Some(rest.to_string())
    }
}

fn no_arg(command: &str, rest: &str, cmd: SpecialCommand) -> Result<SpecialCommand, CommandError> {
    match optional_arg(rest) {
        None => Ok(cmd),
        Some(arg) => Err(CommandError::UnsupportedArgument {
            command: command.to_string(),
            arg,
        }),
    }
}

fn required_arg(command: &str, usage: &str, rest: &str) -> Result<String, CommandError> {
    optional_arg(rest).ok_or_else(|| CommandError::MissingArgument {
        command: command.to_string(),
        usage: usage.to_string(),
    })
}

/// Parse user input into a special command
///
/// # Examples
///
/// ```
/// use tripplanner::commands::special_commands::{parse_special_command, QuickAction, SpecialCommand};
///
/// assert_eq!(parse_special_command("/MAP").unwrap(), SpecialCommand::Map);
/// assert_eq!(
///     parse_special_command("/hotels Lisbon").unwrap(),
///     SpecialCommand::Quick(QuickAction::Hotels(Some("Lisbon".to_string())))
/// );
/// assert_eq!(
///     parse_special_command("Plan a trip to Goa").unwrap(),
///     SpecialCommand::None
/// );
/// assert!(parse_special_command("/teleport").is_err());
/// ```
pub fn parse_special_command(input: &str) -> Result<SpecialCommand, CommandError> {
    let trimmed = input.trim();
    let lower = trimmed.to_lowercase();

    if !trimmed.starts_with('/') {
        return Ok(match lower.as_str() {
            "exit" | "quit" => SpecialCommand::Exit,
            _ => SpecialCommand::None,
        });
    }

    let (name, rest) = match trimmed.split_once(char::is_whitespace) {
        Some((name, rest)) => (name.to_lowercase(), rest),
        None => (lower, ""),
    };

    match name.as_str() {
        "/help" | "/?" => no_arg("/help", rest, SpecialCommand::Help),
        "/state" | "/status" => no_arg("/state", rest, SpecialCommand::State),
        "/map" => no_arg("/map", rest, SpecialCommand::Map),
        "/itinerary" | "/plan" => no_arg("/itinerary", rest, SpecialCommand::Itinerary),
        "/reset" | "/new" => no_arg("/reset", rest, SpecialCommand::Reset),
        "/exit" | "/quit" => no_arg("/exit", rest, SpecialCommand::Exit),

        "/focus" => required_arg("/focus", "/focus <place name>", rest).map(SpecialCommand::Focus),

        "/hotels" => Ok(SpecialCommand::Quick(QuickAction::Hotels(optional_arg(rest)))),
        "/flights" => Ok(SpecialCommand::Quick(QuickAction::Flights(optional_arg(rest)))),
        "/destinations" => Ok(SpecialCommand::Quick(QuickAction::Destinations(
            optional_arg(rest),
        ))),
        "/attractions" => required_arg("/attractions", "/attractions <place>", rest)
            .map(|place| SpecialCommand::Quick(QuickAction::Attractions(place))),

        other => Err(CommandError::UnknownCommand(other.to_string())),
    }
}

/// Display help text for special commands
pub fn print_help() {
    println!(
        r#"
Special Commands for Interactive Chat
=====================================

TRIP:
  /state            - Show conversation id, itinerary status and retries
  /itinerary        - Print the current itinerary day by day
  /map              - List map markers and the static map URL
  /focus <place>    - Show one itinerary stop on the map

QUICK ACTIONS:
  /hotels [city]        - Ask for hotel options
  /flights [city]       - Ask for airports and flight options
  /destinations [city]  - Ask for places to visit
  /attractions <place>  - Ask for attractions near a place

SESSION CONTROL:
  /reset            - Forget this conversation and start over
  /help             - Show this help message
  /exit             - Exit (also: exit, quit)

NOTES:
  - Commands are case-insensitive
  - Without a city, quick actions use the destination of your last message
  - Anything else you type is sent to the planner
"#
    );
}
