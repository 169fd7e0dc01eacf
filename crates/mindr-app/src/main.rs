//! mindr application binary - composition root.
//!
//! Ties together all mindr crates into a single interactive executable:
//! 1. Load configuration from TOML
//! 2. Sign in an identity into the credential store
//! 3. Wire the conversation session, thread history, and calendar bridge
//!    to the HTTP backend and calendar clients
//! 4. Run a line-based chat loop (plain lines are prompts; `/` commands
//!    manage threads, speech, and the calendar)

use std::sync::Arc;

use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};

use mindr_auth::{CredentialStore, InMemorySessionCache, StaticTokenIssuer};
use mindr_calendar::{CalendarBridge, CalendarOutcome, HttpCalendarApi};
use mindr_chat::{ConversationSession, HttpAssistantBackend, ThreadHistoryIndex};
use mindr_core::config::MindrConfig;
use mindr_core::{Identity, Message, MindrError, Sender};
use mindr_speech::{SpeechChannel, SpeechEvent, SpeechRecognizer};

mod cli;
use cli::CliArgs;

/// Recognizer for platforms without a speech capture device. A terminal
/// has no microphone hook, so every start reports the device as
/// unsupported rather than pretending to listen.
struct UnavailableRecognizer;

impl SpeechRecognizer for UnavailableRecognizer {
    fn is_supported(&self) -> bool {
        false
    }

    fn begin(&self, _events: tokio::sync::mpsc::UnboundedSender<SpeechEvent>) -> mindr_core::Result<()> {
        Ok(())
    }

    fn end(&self) {}
}

fn print_message(message: &Message) {
    match message.sender {
        Sender::User => println!("you>    {}", message.text),
        Sender::Assistant => {
            println!("mindr>  {}", message.text);
            if let Some(ref url) = message.authorization_link {
                println!("        {}", url);
            }
        }
    }
}

/// Print everything appended to the transcript since the last call.
fn print_new_messages(session: &ConversationSession, printed: &mut usize) {
    let messages = session.messages();
    for message in &messages[*printed..] {
        print_message(message);
    }
    *printed = messages.len();
}

/// Parse a local wall-clock time in `YYYY-MM-DDTHH:MM` form.
fn parse_local(input: &str) -> Option<DateTime<Local>> {
    let naive = NaiveDateTime::parse_from_str(input, "%Y-%m-%dT%H:%M").ok()?;
    Local.from_local_datetime(&naive).single()
}

async fn show_calendar(bridge: &CalendarBridge, store: &CredentialStore) {
    match bridge.list_upcoming().await {
        Ok(CalendarOutcome::NotConnected) => {
            println!("Calendar is not connected. Use /connect <token> first.");
        }
        Ok(CalendarOutcome::CredentialExpired) => {
            store.clear_calendar_credential();
            println!("Calendar access expired. Use /connect <token> to re-authorize.");
        }
        Ok(CalendarOutcome::Ready(events)) => {
            if events.is_empty() {
                println!("No upcoming events.");
            }
            for event in events {
                println!("  {}  {}", event.start.display(), event.summary);
            }
        }
        Err(e) => println!("Calendar request failed: {}", e),
    }
}

async fn schedule_event(bridge: &CalendarBridge, store: &CredentialStore, args: &str) {
    let mut parts = args.splitn(3, ' ');
    let (Some(start_raw), Some(end_raw), Some(summary)) =
        (parts.next(), parts.next(), parts.next())
    else {
        println!("Usage: /schedule <start> <end> <summary>  (times as YYYY-MM-DDTHH:MM)");
        return;
    };
    let (Some(start), Some(end)) = (parse_local(start_raw), parse_local(end_raw)) else {
        println!("Could not parse the event times. Use YYYY-MM-DDTHH:MM.");
        return;
    };

    match bridge.create_event(summary, start, end).await {
        Ok(CalendarOutcome::NotConnected) => {
            println!("Calendar is not connected. Use /connect <token> first.");
        }
        Ok(CalendarOutcome::CredentialExpired) => {
            store.clear_calendar_credential();
            println!("Calendar access expired. Use /connect <token> to re-authorize.");
        }
        Ok(CalendarOutcome::Ready(())) => {
            println!("Event created. /calendar will show it.");
        }
        Err(MindrError::Validation(msg)) => println!("Invalid event: {}", msg),
        Err(e) => println!("Calendar request failed: {}", e),
    }
}

fn show_threads(session: &ConversationSession) {
    let threads = session.history().list();
    if threads.is_empty() {
        println!("No past threads.");
        return;
    }
    for (n, thread) in threads.iter().enumerate() {
        println!(
            "  [{}] {}  ({} messages)",
            n + 1,
            thread.id.display_label(),
            thread.messages.len()
        );
    }
}

async fn resume_thread(session: &ConversationSession, printed: &mut usize, args: &str) {
    let Ok(n) = args.trim().parse::<usize>() else {
        println!("Usage: /resume <number>  (see /threads)");
        return;
    };
    let threads = session.history().list();
    let Some(thread) = threads.get(n.wrapping_sub(1)) else {
        println!("No thread [{}]. /threads lists what is known.", n);
        return;
    };

    session
        .resume_thread(thread.id.clone(), thread.messages.clone())
        .await;
    println!("Resumed thread from {}:", thread.id.display_label());
    *printed = 0;
    print_new_messages(session, printed);
}

fn print_help() {
    println!("Commands:");
    println!("  /new                          start a new thread");
    println!("  /threads                      list past threads");
    println!("  /resume <n>                   resume a past thread");
    println!("  /speak                        take the next prompts by voice");
    println!("  /calendar                     list upcoming events");
    println!("  /schedule <start> <end> <summary>   create an event");
    println!("  /connect <token>              connect a calendar access token");
    println!("  /disconnect                   drop the calendar token");
    println!("  /signout                      sign out");
    println!("  /quit                         exit");
    println!("Anything else is sent to the assistant.");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Config.
    let config_file = args.resolve_config_path();
    let config = MindrConfig::load_or_default(&config_file);

    // Tracing.
    let log_level = args.resolve_log_level(&config.general.log_level);
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .init();

    tracing::info!("Starting mindr v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(path = %config_file.display(), "Configuration loaded");

    // Credential store. The identity token comes from the environment in
    // this client; a deployment fronted by a real identity provider plugs
    // in its own issuer here.
    let id_token =
        std::env::var("MINDR_ID_TOKEN").unwrap_or_else(|_| "dev-token".to_string());
    let store = CredentialStore::new(
        Arc::new(StaticTokenIssuer::new(id_token)),
        Arc::new(InMemorySessionCache::new()),
    );
    store.on_identity_change(Box::new(|identity| match identity {
        Some(identity) => tracing::info!(uid = %identity.uid, "Signed in"),
        None => tracing::info!("Signed out"),
    }));
    store.sign_in(Identity {
        uid: args.uid.clone(),
        display_name: args.display_name.clone(),
        email: args.email.clone(),
    });

    // Backend and calendar clients.
    let mut backend_config = config.backend.clone();
    backend_config.base_url = args.resolve_backend_url(&config.backend.base_url);
    let backend = Arc::new(HttpAssistantBackend::new(&backend_config)?);
    let calendar_api = Arc::new(HttpCalendarApi::new(&config.calendar)?);

    // Session, history, calendar bridge, speech channel.
    let history = ThreadHistoryIndex::new(store.clone(), backend.clone());
    let session = ConversationSession::new(store.clone(), backend, history);
    let bridge = CalendarBridge::new(store.clone(), calendar_api);
    let mut speech = SpeechChannel::new(Arc::new(UnavailableRecognizer));

    session.history().refresh().await;

    println!("mindr is ready. /help lists commands.");

    let mut printed = 0usize;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim().to_string();
        match line.split_once(' ').unwrap_or((line.as_str(), "")) {
            ("/quit", _) | ("/exit", _) => break,
            ("/help", _) => print_help(),
            ("/new", _) => {
                session.start_new_thread();
                printed = 0;
                println!("New thread.");
            }
            ("/threads", _) => {
                session.history().refresh().await;
                show_threads(&session);
            }
            ("/resume", rest) => resume_thread(&session, &mut printed, rest).await,
            ("/speak", _) => match speech.start() {
                Ok(()) => {
                    println!("Listening. Speak; pause to finish.");
                    while let Some(event) = speech.recv().await {
                        match event {
                            SpeechEvent::Transcript(text) => {
                                session.send(&text).await;
                                print_new_messages(&session, &mut printed);
                            }
                            SpeechEvent::Ended => break,
                        }
                    }
                }
                Err(MindrError::UnsupportedDevice) => {
                    println!("Speech input is not supported on this device.");
                }
                Err(e) => println!("Could not start listening: {}", e),
            },
            ("/calendar", _) => show_calendar(&bridge, &store).await,
            ("/schedule", rest) => schedule_event(&bridge, &store, rest).await,
            ("/connect", token) if !token.is_empty() => {
                store.set_calendar_credential(token);
                println!("Calendar connected.");
            }
            ("/connect", _) => println!("Usage: /connect <token>"),
            ("/disconnect", _) => {
                store.clear_calendar_credential();
                println!("Calendar disconnected.");
            }
            ("/signout", _) => {
                store.sign_out();
                printed = 0;
            }
            ("", _) => {}
            _ => {
                session.send(&line).await;
                print_new_messages(&session, &mut printed);
            }
        }
    }

    Ok(())
}
