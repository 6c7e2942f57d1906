//! Seed a user's transcript from a Telegram Desktop export.
//!
//! Usage: cargo run --bin import_transcript <result.json> <transcript.db> <user_id>
//!
//! The export is a personal chat in JSON format (Settings → Advanced →
//! Export Telegram Data). Messages from `user_id` are recorded as the user's,
//! everything else as the bot's. Consecutive messages from one side are
//! written as one batch so their order survives.

use serde::Deserialize;
use std::path::Path;

use relaybot::chatbot::transcript::save_batch;
use relaybot::chatbot::{Database, BOT_SENDER_ID};

#[derive(Deserialize)]
struct TelegramExport {
    name: Option<String>,
    #[serde(rename = "type")]
    chat_type: String,
    messages: Vec<TelegramMessage>,
}

#[derive(Deserialize)]
struct TelegramMessage {
    #[serde(rename = "type")]
    msg_type: String,
    from_id: Option<String>,
    #[serde(default)]
    text: TextContent,
}

/// Text can be a string or array of text entities
#[derive(Deserialize, Default)]
#[serde(untagged)]
enum TextContent {
    #[default]
    Empty,
    Simple(String),
    Complex(Vec<TextEntity>),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TextEntity {
    Plain(String),
    Formatted { text: String },
}

impl std::fmt::Display for TextContent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TextContent::Empty => Ok(()),
            TextContent::Simple(s) => write!(f, "{}", s),
            TextContent::Complex(entities) => {
                for e in entities {
                    match e {
                        TextEntity::Plain(s) => write!(f, "{}", s)?,
                        TextEntity::Formatted { text } => write!(f, "{}", text)?,
                    }
                }
                Ok(())
            }
        }
    }
}

fn parse_user_id(from_id: &str) -> Option<i64> {
    // Format: "user123456789"
    from_id.strip_prefix("user")?.parse().ok()
}

/// Group text messages into runs of consecutive messages from one sender.
fn sender_runs(messages: &[TelegramMessage], user_id: i64) -> Vec<(i64, Vec<String>)> {
    let mut runs: Vec<(i64, Vec<String>)> = Vec::new();
    for msg in messages {
        if msg.msg_type != "message" {
            continue;
        }
        let text = msg.text.to_string();
        if text.is_empty() {
            continue; // media without caption, etc.
        }
        let sender = match msg.from_id.as_deref().and_then(parse_user_id) {
            Some(id) if id == user_id => user_id,
            _ => BOT_SENDER_ID,
        };
        match runs.last_mut() {
            Some((last, texts)) if *last == sender => texts.push(text),
            _ => runs.push((sender, vec![text])),
        }
    }
    runs
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() != 4 {
        eprintln!("Usage: {} <telegram_export.json> <transcript.db> <user_id>", args[0]);
        eprintln!();
        eprintln!("Import a personal chat export into a user's transcript.");
        eprintln!();
        eprintln!("Arguments:");
        eprintln!("  telegram_export.json  Path to Telegram export (result.json)");
        eprintln!("  transcript.db         Path to the bot's transcript database");
        eprintln!("  user_id               Telegram id of the conversation owner");
        std::process::exit(1);
    }

    let export_path = Path::new(&args[1]);
    let db_path = Path::new(&args[2]);
    let user_id: i64 = args[3].parse().map_err(|e| format!("Invalid user_id: {e}"))?;

    println!("Reading Telegram export from {:?}...", export_path);
    let export: TelegramExport = serde_json::from_str(&std::fs::read_to_string(export_path)?)?;

    println!("Chat: {}", export.name.as_deref().unwrap_or("(unnamed)"));
    if export.chat_type != "personal_chat" {
        eprintln!("ERROR: expected a personal chat export, got '{}'.", export.chat_type);
        std::process::exit(1);
    }

    let runs = sender_runs(&export.messages, user_id);
    let db = Database::open(db_path)?;

    let mut total = 0;
    for (sender, texts) in &runs {
        total += save_batch(&db, user_id, *sender, texts).await?.len();
    }

    println!("Imported {} messages in {} batches", total, runs.len());
    println!("Transcript now holds {} entries", db.entry_count()?);
    Ok(())
}
