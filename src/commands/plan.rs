//! Agent planning command
//!
//! Sends free text to the structured planner. The planner either asks
//! follow-up questions or returns an itinerary with hotel options.

use colored::Colorize;

use crate::api::{AgentPlanOutcome, AgentPlanRequest, ApiClient};
use crate::config::Config;
use crate::error::Result;

/// Run one planning turn for `text`
pub async fn run_plan(config: &Config, text: &str) -> Result<()> {
    let client = ApiClient::new(&config.api)?;
    let request = AgentPlanRequest {
        user_text: Some(text.trim().to_string()),
        state: serde_json::Map::new(),
    };

    let outcome = client.agent_plan(&request).await?;
    println!("{}", format_outcome(&outcome)?);
    Ok(())
}

/// Human-readable planner outcome
pub fn format_outcome(outcome: &AgentPlanOutcome) -> Result<String> {
    match outcome {
        AgentPlanOutcome::NeedsInfo { questions, .. } => {
            let mut out = "The planner needs a few more details:".yellow().to_string();
            if questions.is_empty() {
                out.push_str("\n  - Could you tell me more about your trip?");
            }
            for question in questions {
                out.push_str(&format!("\n  - {}", question));
            }
            Ok(out)
        }
        AgentPlanOutcome::Planned {
            itinerary,
            hotel_options,
        } => {
            let mut out = format!("{}\n", "Itinerary".bold());
            out.push_str(&serde_json::to_string_pretty(itinerary)?);
            if !hotel_options.is_empty() {
                out.push_str(&format!("\n\n{} hotel option(s) suggested", hotel_options.len()));
            }
            Ok(out)
        }
    }
}
