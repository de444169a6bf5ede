//! Terminal rendering for sessions, itineraries and map markers
//!
//! Formatting helpers return strings so the command handlers decide
//! where output goes. [`TranscriptPrinter`] is the store observer that
//! prints assistant text as it streams in.

use std::fmt::Write as _;
use std::io::Write;
use std::sync::Mutex;

use colored::Colorize;

use crate::api::TripPlan;
use crate::config::MapsConfig;
use crate::map::{static_map_url, MapMarker, MapView};
use crate::session::{ChatSession, PollerState, Sender, StoreChange, StoreObserver};

/// Prints assistant messages and streamed deltas as the store changes
///
/// User messages are not echoed; the user just typed them.
pub struct TranscriptPrinter {
    out: Mutex<Box<dyn Write + Send>>,
}

impl TranscriptPrinter {
    /// Printer writing to `out`
    pub fn new(out: Box<dyn Write + Send>) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    /// Printer writing to stdout
    pub fn stdout() -> Self {
        Self::new(Box::new(std::io::stdout()))
    }

    fn emit(&self, text: &str) {
        let Ok(mut out) = self.out.lock() else {
            return;
        };
        if let Err(e) = out.write_all(text.as_bytes()).and_then(|_| out.flush()) {
            tracing::debug!("Could not write transcript: {}", e);
        }
    }
}

impl std::fmt::Debug for TranscriptPrinter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranscriptPrinter").finish_non_exhaustive()
    }
}

impl StoreObserver for TranscriptPrinter {
    fn on_change(&self, change: &StoreChange) {
        match change {
            StoreChange::MessageAdded { message, .. } | StoreChange::InitialReplaced { message }
                if message.sender == Sender::Assistant =>
            {
                self.emit(&format!("\n{} {}", "assistant>".green().bold(), message.text));
            }
            StoreChange::MessageExtended { delta, .. } => self.emit(delta),
            StoreChange::MessageReplaced { text, .. } => {
                self.emit(&format!("\n{} {}", "assistant>".green().bold(), text));
            }
            StoreChange::Typing(false) => self.emit("\n"),
            StoreChange::Reset => self.emit(&format!("{}\n", "Conversation reset.".yellow())),
            _ => {}
        }
    }
}

/// Itinerary as numbered days and stops
pub fn format_itinerary(plan: &TripPlan) -> String {
    if !plan.has_days() {
        return "No itinerary yet.".to_string();
    }

    let mut out = String::new();
    for day in &plan.trip_plan {
        let _ = writeln!(out, "{}", format!("Day {}", day.day).bold());
        for (i, location) in day.locations.iter().enumerate() {
            let _ = write!(out, "  {}. {}", i + 1, location.name);
            if let Some(duration) = &location.estimated_visit_duration {
                let _ = write!(out, " ({})", duration);
            }
            if let Some(rating) = location.rating {
                let _ = write!(out, " ★ {:.1}", rating);
            }
            out.push('\n');
            if let Some(travel) = &location.travel_duration {
                let _ = writeln!(out, "     travel: {}", travel.dimmed());
            }
        }
    }

    if !plan.stay_plan.is_empty() {
        let _ = writeln!(out, "{}", "Stays".bold());
        for hotel in &plan.stay_plan {
            let _ = write!(out, "  - {}", hotel.name);
            if let Some(rating) = hotel.rating {
                let _ = write!(out, " ★ {:.1}", rating);
            }
            if let Some(pricing) = &hotel.pricing {
                if let (Some(min), Some(max)) = (pricing.range_min, pricing.range_max) {
                    let _ = write!(
                        out,
                        " {}-{} {}",
                        min,
                        max,
                        pricing.currency.as_deref().unwrap_or_default()
                    );
                }
            }
            out.push('\n');
        }
    }
    out
}

/// One line per marker
pub fn format_markers(markers: &[MapMarker]) -> String {
    if markers.is_empty() {
        return "No map markers.".to_string();
    }
    markers
        .iter()
        .enumerate()
        .map(|(i, m)| format!("{:>2}. {} ({:.4}, {:.4})", i + 1, m.title, m.lat, m.lon))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Markers, view and static map link
///
/// Without a maps key the link is replaced by an inline error line; the
/// marker list is still shown.
pub fn format_map(markers: &[MapMarker], config: &MapsConfig) -> String {
    let view = MapView::for_markers(markers, config);
    let mut out = format_markers(markers);
    let _ = write!(
        out,
        "\nview: center ({:.4}, {:.4}) zoom {}{}",
        view.center.0,
        view.center.1,
        view.zoom,
        if view.bounds.is_some() { ", fit to markers" } else { "" }
    );
    match static_map_url(markers, &view, config.api_key.as_deref()) {
        Ok(url) => {
            let _ = write!(out, "\nmap: {}", url.cyan());
        }
        Err(e) => {
            tracing::debug!("Static map unavailable: {}", e);
            let _ = write!(out, "\n{}", format!("Map unavailable: {}", e).red());
        }
    }
    out
}

/// Session summary for `/state`
pub fn format_session_state(session: &ChatSession) -> String {
    let store = session.store();
    let retry = session.poller().retry_context();
    let itinerary = store.itinerary();

    let mut out = String::new();
    let _ = writeln!(
        out,
        "conversation: {}",
        store.conversation_id().unwrap_or("(none)")
    );
    let _ = writeln!(out, "messages:     {}", store.messages().len());
    let _ = writeln!(out, "typing:       {}", store.is_typing());
    let days = itinerary
        .trip_plan
        .as_ref()
        .map(|p| p.trip_plan.len())
        .unwrap_or(0);
    let _ = writeln!(
        out,
        "itinerary:    {} ({} day(s))",
        if itinerary.is_done { "done" } else { "pending" },
        days
    );
    let poller = match session.poller().state() {
        PollerState::Idle => "idle".to_string(),
        PollerState::Fetching => "fetching".to_string(),
        PollerState::Resolved => "resolved".to_string(),
        PollerState::Retrying { attempt } => format!("retrying ({})", attempt),
        PollerState::GaveUp => "gave up".to_string(),
    };
    let _ = writeln!(
        out,
        "poller:       {} ({}/{} retries)",
        poller, retry.attempts, retry.max_attempts
    );
    let _ = write!(out, "markers:      {}", session.markers().len());
    out
}
