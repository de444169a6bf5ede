//! Command-line interface definition for Tripplanner
//!
//! This module defines the CLI structure using clap's derive API,
//! providing commands for chatting with the planner, inspecting the
//! conversation state, and calling the auxiliary search endpoints.

use clap::{Parser, Subcommand};

/// Tripplanner - conversational travel planning from the terminal
///
/// Chat with the planning backend, watch the assistant stream its answer,
/// and inspect the resulting itinerary, hotels and map markers.
#[derive(Parser, Debug, Clone)]
#[command(name = "tripplanner")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/config.yaml")]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit logs as JSON lines on stderr
    #[arg(long)]
    pub json_logs: bool,

    /// Override the backend base URL
    #[arg(long, env = "TRIPPLANNER_API_BASE")]
    pub api_base: Option<String>,

    /// Override the conversation id store location
    #[arg(long)]
    pub storage_path: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for Tripplanner
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start an interactive chat with the planner
    Chat {
        /// Initial query to send as soon as the session starts
        #[arg(short, long)]
        query: Option<String>,

        /// Start a fresh conversation instead of resuming the stored one
        #[arg(long)]
        new: bool,
    },

    /// Send a single message and wait for the itinerary to settle
    Send {
        /// Message text
        message: String,
    },

    /// Show the backend state for the current conversation
    State,

    /// List the backend message history for the current conversation
    History,

    /// Forget the stored conversation id
    Reset,

    /// Print map markers for the current itinerary
    Map,

    /// Run the agent planner on free text
    Plan {
        /// Free-text trip description
        text: String,
    },

    /// Query the auxiliary search endpoints
    Search {
        /// Search subcommand
        #[command(subcommand)]
        command: SearchCommand,
    },
}

/// Search subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum SearchCommand {
    /// Search flights between two cities
    Flights {
        /// Origin city
        #[arg(long)]
        from: String,

        /// Destination city
        #[arg(long)]
        to: String,

        /// Departure date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        depart: Option<String>,

        /// Return date (YYYY-MM-DD), defaults to the day after departure
        #[arg(long = "return")]
        return_date: Option<String>,

        /// Number of adults
        #[arg(long, default_value_t = 1)]
        adults: u32,

        /// Price currency
        #[arg(long, default_value = "USD")]
        currency: String,
    },

    /// Search hotels in a city
    Hotels {
        /// City name
        city: String,

        /// Check-in date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        check_in: Option<String>,

        /// Check-out date (YYYY-MM-DD), defaults to the day after check-in
        #[arg(long)]
        check_out: Option<String>,

        /// Number of adults
        #[arg(long, default_value_t = 2)]
        adults: u32,

        /// Price currency
        #[arg(long, default_value = "USD")]
        currency: String,
    },

    /// Find points of interest near a coordinate
    Poi {
        /// Latitude
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,

        /// Longitude
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,
    },

    /// Look up booking destinations
    Destinations {
        /// Search text (at least two characters)
        query: String,
    },

    /// Look up flight destinations
    FlightDestinations {
        /// Search text (at least two characters)
        query: String,
    },

    /// Place suggestions from the maps provider
    Places {
        /// Search text (at least two characters)
        query: String,
    },
}

impl Cli {
    /// Parse command line arguments
    ///
    /// # Returns
    ///
    /// Returns the parsed CLI structure
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
