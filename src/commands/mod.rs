/*!
Command handlers for the CLI

This module provides command handlers invoked by the CLI entrypoint.

- `chat` : Interactive chat with streaming answers and slash commands
- `conversation` : One-shot send and inspection of the stored conversation
- `plan` : Single agent planning turn
- `search` : Auxiliary search and lookup endpoints

Handlers stay thin: the session, client and map projection in the
library do the work, these modules only wire them to the terminal.
*/

use std::sync::Arc;

use crate::api::ApiClient;
use crate::config::Config;
use crate::error::Result;
use crate::session::{ChatSession, PollDecision, SledStore, SubmitReport};

pub mod conversation;
pub mod plan;
pub mod render;
pub mod search;

// Special commands parser for the chat loop
pub mod special_commands;

/// Build the HTTP client and a session persisting its id under the
/// configured storage path
///
/// # Errors
///
/// Returns error if the client cannot be built or the store cannot be opened
pub fn open_session(config: &Config) -> Result<(Arc<ApiClient>, ChatSession)> {
    let client = Arc::new(ApiClient::new(&config.api)?);
    let path = config.storage.resolve_path()?;
    tracing::debug!("Using conversation store at {}", path.display());
    let persistence = SledStore::open(&path)?;
    let session = ChatSession::new(client.clone(), &config.chat, Box::new(persistence));
    Ok((client, session))
}

/// One line describing how a submit ended, if there is anything to say
pub fn describe_report(report: &SubmitReport) -> Option<String> {
    let retries = report.retries();
    let outcome = match report.final_decision()? {
        PollDecision::Resolved { markers } => format!(
            "Itinerary ready with {} mapped stop(s). Type /itinerary or /map.",
            markers.len()
        ),
        PollDecision::GaveUp { .. } => "No itinerary this time.".to_string(),
        PollDecision::Idle | PollDecision::Retry { .. } => return None,
    };
    if retries > 0 {
        Some(format!("{} (after {} automatic retry(s))", outcome, retries))
    } else {
        Some(outcome)
    }
}

// Chat command handler
pub mod chat {
    //! Interactive chat mode handler.
    //!
    //! Opens (or restores) the conversation, prints assistant text as it
    //! streams, and runs a readline loop where plain lines go to the
    //! planner and `/commands` are handled locally.

    use super::*;
    use crate::api::Location;
    use crate::commands::render::{
        format_itinerary, format_map, format_session_state, TranscriptPrinter,
    };
    use crate::commands::special_commands::{parse_special_command, print_help, SpecialCommand};
    use crate::session::Sender;
    use colored::Colorize;
    use rustyline::error::ReadlineError;
    use rustyline::DefaultEditor;

    /// Start interactive chat mode
    ///
    /// # Arguments
    ///
    /// * `config` - Global configuration
    /// * `query` - Message to send right away
    /// * `new` - Forget the stored conversation first
    pub async fn run_chat(config: Config, query: Option<String>, new: bool) -> Result<()> {
        tracing::info!("Starting interactive chat");

        let (_client, mut session) = open_session(&config)?;
        if new {
            session.reset();
        }

        let mut rl = DefaultEditor::new()?;

        print_welcome_banner(session.store().conversation_id());
        if let Some(greeting) = session
            .store()
            .last_message()
            .filter(|m| m.sender == Sender::Assistant)
        {
            println!("{} {}\n", "assistant>".green().bold(), greeting.text);
        }

        session.subscribe(Arc::new(TranscriptPrinter::stdout()));

        if let PollDecision::Resolved { markers } = session.resume().await {
            println!(
                "{}",
                format!(
                    "Restored itinerary with {} mapped stop(s). Type /itinerary to view it.",
                    markers.len()
                )
                .cyan()
            );
        }

        if let Some(query) = query {
            submit(&mut session, &query).await;
        }

        loop {
            let prompt = format!("{} ", "you>".cyan().bold());
            match rl.readline(&prompt) {
                Ok(line) => {
                    let trimmed = line.trim();
                    if trimmed.is_empty() {
                        continue;
                    }
                    if let Err(e) = rl.add_history_entry(trimmed) {
                        tracing::debug!("Could not record history entry: {}", e);
                    }

                    let command = match parse_special_command(trimmed) {
                        Ok(command) => command,
                        Err(e) => {
                            eprintln!("{}\n", e.to_string().red());
                            continue;
                        }
                    };

                    match command {
                        SpecialCommand::Help => print_help(),
                        SpecialCommand::State => {
                            println!("{}\n", format_session_state(&session));
                        }
                        SpecialCommand::Map => {
                            println!("{}\n", format_map(session.markers(), &config.maps));
                        }
                        SpecialCommand::Itinerary => {
                            match &session.store().itinerary().trip_plan {
                                Some(plan) => println!("{}", format_itinerary(plan)),
                                None => println!("No itinerary yet.\n"),
                            }
                        }
                        SpecialCommand::Focus(name) => {
                            match find_location(&session, &name) {
                                Some(location) if session.focus_location(&location) => {
                                    println!("{}\n", format_map(session.markers(), &config.maps));
                                }
                                Some(location) => {
                                    println!(
                                        "{}\n",
                                        format!("{} has no coordinates.", location.name).yellow()
                                    );
                                }
                                None => {
                                    println!(
                                        "{}\n",
                                        format!("No itinerary stop matches '{}'.", name).yellow()
                                    );
                                }
                            }
                        }
                        SpecialCommand::Quick(action) => {
                            let destination = session.poller().current_destination();
                            let prompt = action.prompt(destination.as_deref());
                            println!("{} {}", "you>".cyan().bold(), prompt.dimmed());
                            submit(&mut session, &prompt).await;
                        }
                        SpecialCommand::Reset => session.reset(),
                        SpecialCommand::Exit => break,
                        SpecialCommand::None => submit(&mut session, trimmed).await,
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("CTRL-C");
                    break;
                }
                Err(ReadlineError::Eof) => {
                    println!("CTRL-D");
                    break;
                }
                Err(err) => {
                    tracing::error!("Readline error: {:?}", err);
                    break;
                }
            }
        }

        println!("Goodbye!");
        Ok(())
    }

    async fn submit(session: &mut ChatSession, text: &str) {
        match session.submit(text).await {
            Ok(report) => {
                if let Some(line) = describe_report(&report) {
                    println!("{}\n", line.cyan());
                }
            }
            Err(e) => eprintln!("{}\n", format!("{:#}", e).red()),
        }
    }

    /// First itinerary stop whose name contains `name`, ignoring case
    fn find_location(session: &ChatSession, name: &str) -> Option<Location> {
        let needle = name.to_lowercase();
        session
            .store()
            .itinerary()
            .trip_plan
            .as_ref()?
            .trip_plan
            .iter()
            .flat_map(|day| day.locations.iter())
            .find(|l| l.name.to_lowercase().contains(&needle))
            .cloned()
    }

    fn print_welcome_banner(conversation_id: Option<&str>) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║              Tripplanner - plan your trip by chat            ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");
        match conversation_id {
            Some(id) => println!("Resuming conversation {}", id.cyan()),
            None => println!("Starting a new conversation"),
        }
        println!("Type '/help' for available commands, 'exit' to quit\n");
    }
}
