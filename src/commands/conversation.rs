//! One-shot conversation commands
//!
//! `send`, `state`, `history`, `map` and `reset` all act on the
//! conversation whose id is persisted in the local store.

use std::sync::Arc;

use colored::Colorize;
use prettytable::{format, row, Table};

use super::render::{format_itinerary, format_map, TranscriptPrinter};
use super::{describe_report, open_session};
use crate::api::{StoredMessage, TripPlan};
use crate::config::Config;
use crate::error::Result;
use crate::map::{markers_from_hotels, markers_from_trip_plan, MapMarker};

const HISTORY_PREVIEW_CHARS: usize = 70;

/// Send one message, stream the answer and reconcile the itinerary
pub async fn run_send(config: &Config, message: &str) -> Result<()> {
    let (_client, mut session) = open_session(config)?;
    session.subscribe(Arc::new(TranscriptPrinter::stdout()));

    let report = session.submit(message).await?;
    if let Some(line) = describe_report(&report) {
        println!("{}", line.cyan());
    }
    if let Some(plan) = &session.store().itinerary().trip_plan {
        if plan.has_days() {
            println!("\n{}", format_itinerary(plan));
        }
    }
    Ok(())
}

/// Print the backend state of the stored conversation
pub async fn run_state(config: &Config) -> Result<()> {
    let (client, session) = open_session(config)?;
    let Some(id) = session.store().conversation_id() else {
        println!("{}", "No conversation yet. Start one with `tripplanner chat`.".yellow());
        return Ok(());
    };

    let state = client.get_conversation_state(id).await?;
    println!("conversation: {}", id.cyan());
    println!(
        "itinerary:    {}",
        if state.itinerary_done { "done" } else { "pending" }
    );
    match &state.trip_plan {
        Some(plan) => {
            println!("\n{}", format_itinerary(plan));
            println!("{}", super::render::format_markers(&plan_markers(plan)));
        }
        None => println!("No itinerary yet."),
    }
    Ok(())
}

/// List the backend messages of the stored conversation
pub async fn run_history(config: &Config) -> Result<()> {
    let (client, session) = open_session(config)?;
    let Some(id) = session.store().conversation_id() else {
        println!("{}", "No conversation yet.".yellow());
        return Ok(());
    };

    let messages = client.list_messages(id).await?;
    if messages.is_empty() {
        println!("{}", "No messages found.".yellow());
        return Ok(());
    }

    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BORDERS_ONLY);
    table.add_row(row!["Role", "Sent", "Message"]);
    for message in &messages {
        let [role, sent, text] = history_row(message);
        table.add_row(row![role, sent, text]);
    }

    println!("\nConversation {}:", id.cyan());
    table.printstd();
    println!();
    Ok(())
}

/// Print markers and the static map for the stored conversation
pub async fn run_map(config: &Config) -> Result<()> {
    let (client, session) = open_session(config)?;
    let markers = match session.store().conversation_id() {
        Some(id) => client
            .get_conversation_state(id)
            .await?
            .trip_plan
            .map(|plan| plan_markers(&plan))
            .unwrap_or_default(),
        None => Vec::new(),
    };
    println!("{}", format_map(&markers, &config.maps));
    Ok(())
}

/// Forget the stored conversation id
pub fn run_reset(config: &Config) -> Result<()> {
    let (_client, mut session) = open_session(config)?;
    match session.store().conversation_id() {
        Some(id) => println!("Forgetting conversation {}", id.cyan()),
        None => println!("No stored conversation."),
    }
    session.reset();
    Ok(())
}

/// Itinerary stops followed by hotels
fn plan_markers(plan: &TripPlan) -> Vec<MapMarker> {
    let mut markers = markers_from_trip_plan(plan);
    markers.extend(markers_from_hotels(&plan.stay_plan));
    markers
}

fn history_row(message: &StoredMessage) -> [String; 3] {
    let flat = message.content.replace('\n', " ");
    let text = if flat.chars().count() > HISTORY_PREVIEW_CHARS {
        let head: String = flat.chars().take(HISTORY_PREVIEW_CHARS - 3).collect();
        format!("{}...", head)
    } else {
        flat
    };
    [
        message.role.clone(),
        message.created_at.clone().unwrap_or_else(|| "-".to_string()),
        text,
    ]
}
