//! Tracing layer that mirrors log events into a Telegram chat.

use std::time::Duration;

use teloxide::prelude::*;
use teloxide::types::ChatId;
use tokio::sync::mpsc;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;

use crate::chatbot::mask::TokenMask;

/// Telegram rejects messages longer than 4096 chars.
const MAX_LOG_CHARS: usize = 4000;
const FLUSH_INTERVAL: Duration = Duration::from_secs(5);
const MAX_BUFFERED: usize = 50;

enum LogLine {
    /// WARN/ERROR, sent immediately.
    Urgent(String),
    /// INFO, batched.
    Info(String),
}

pub struct LogChatLayer {
    tx: mpsc::UnboundedSender<LogLine>,
    mask: TokenMask,
}

impl LogChatLayer {
    /// Must be called from within a tokio runtime.
    pub fn new(bot: Bot, chat_id: ChatId, mask: TokenMask) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<LogLine>();

        tokio::spawn(async move {
            let mut buffer: Vec<String> = Vec::new();
            let mut interval = tokio::time::interval(FLUSH_INTERVAL);

            loop {
                tokio::select! {
                    line = rx.recv() => {
                        match line {
                            Some(LogLine::Urgent(text)) => send_log(&bot, chat_id, &text).await,
                            Some(LogLine::Info(text)) => {
                                buffer.push(text);
                                if buffer.len() >= MAX_BUFFERED {
                                    flush(&bot, chat_id, &mut buffer).await;
                                }
                            }
                            None => {
                                flush(&bot, chat_id, &mut buffer).await;
                                break;
                            }
                        }
                    }
                    _ = interval.tick() => flush(&bot, chat_id, &mut buffer).await,
                }
            }
        });

        Self { tx, mask }
    }
}

fn truncate_log(text: &str) -> String {
    if text.chars().count() > MAX_LOG_CHARS {
        let truncated: String = text.chars().take(MAX_LOG_CHARS).collect();
        format!("{}...", truncated)
    } else {
        text.to_string()
    }
}

async fn send_log(bot: &Bot, chat_id: ChatId, text: &str) {
    // Logging from here would feed back into this layer.
    if let Err(e) = bot.send_message(chat_id, truncate_log(text)).await {
        eprintln!("Failed to send log to Telegram: {e}");
    }
}

async fn flush(bot: &Bot, chat_id: ChatId, buffer: &mut Vec<String>) {
    if buffer.is_empty() {
        return;
    }
    let combined = buffer.join("\n");
    buffer.clear();
    send_log(bot, chat_id, &combined).await;
}

#[derive(Default)]
struct MessageVisitor {
    message: String,
}

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{:?}", value);
        } else if self.message.is_empty() {
            self.message = format!("{} = {:?}", field.name(), value);
        } else {
            self.message
                .push_str(&format!(", {} = {:?}", field.name(), value));
        }
    }
}

impl<S: Subscriber> Layer<S> for LogChatLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let level = *event.metadata().level();
        if level > Level::INFO {
            return;
        }
        // Ignore teloxide's own request logging; it would echo our sends.
        if event.metadata().target().starts_with("teloxide") {
            return;
        }

        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);
        let text = self.mask.mask(&visitor.message);

        let line = match level {
            Level::ERROR => LogLine::Urgent(format!("❌ {}", text)),
            Level::WARN => LogLine::Urgent(format!("⚠️ {}", text)),
            _ => LogLine::Info(text),
        };

        if self.tx.send(line).is_err() {
            eprintln!("Log channel closed, message dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_log_respects_chars() {
        let long = "é".repeat(MAX_LOG_CHARS + 10);
        let out = truncate_log(&long);
        assert!(out.ends_with("..."));
        assert_eq!(out.chars().count(), MAX_LOG_CHARS + 3);
    }

    #[test]
    fn test_short_log_unchanged() {
        assert_eq!(truncate_log("hello"), "hello");
    }
}
