//! CLI channel: stdin/stdout REPL for local testing.
//!
//! Each line is treated as a direct text message. A line of the form
//! `@<identity> <text>` impersonates another user, which makes it possible
//! to walk the funnel as a foreign-region user.

use async_trait::async_trait;
use futures::stream;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::channels::{Channel, IncomingMessage, MediaRef, MessageStream};
use crate::error::ChannelError;

/// Identity used for lines without an `@` prefix.
const DEFAULT_USER: &str = "51900000000";

/// A simple CLI channel that reads from stdin and writes to stdout.
pub struct CliChannel;

impl CliChannel {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CliChannel {
    fn default() -> Self {
        Self::new()
    }
}

/// Split an input line into `(identity, text)`.
fn parse_line(line: &str) -> (&str, &str) {
    if let Some(rest) = line.strip_prefix('@')
        && let Some((identity, text)) = rest.split_once(char::is_whitespace)
        && !identity.is_empty()
    {
        return (identity, text.trim());
    }
    (DEFAULT_USER, line)
}

#[async_trait]
impl Channel for CliChannel {
    fn name(&self) -> &str {
        "cli"
    }

    async fn start(&self) -> Result<MessageStream, ChannelError> {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();

        tokio::spawn(async move {
            let stdin = tokio::io::stdin();
            let reader = BufReader::new(stdin);
            let mut lines = reader.lines();

            eprint!("> ");

            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        let line = line.trim();
                        if line.is_empty() {
                            eprint!("> ");
                            continue;
                        }
                        let (user, text) = parse_line(line);
                        let msg = IncomingMessage::new("cli", user, text).with_user_name("local");
                        if tx.send(msg).is_err() {
                            break;
                        }
                    }
                    Ok(None) => break, // EOF
                    Err(e) => {
                        tracing::error!("Error reading stdin: {}", e);
                        break;
                    }
                }
            }
        });

        let stream = stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|msg| (msg, rx))
        });

        Ok(Box::pin(stream))
    }

    async fn send_text(&self, reply_to: &str, text: &str) -> Result<(), ChannelError> {
        println!("\n[{reply_to}] {text}\n");
        eprint!("> ");
        Ok(())
    }

    async fn send_media(&self, reply_to: &str, media: &MediaRef) -> Result<(), ChannelError> {
        if !media.path.exists() {
            return Err(ChannelError::MediaUnavailable(media.path.clone()));
        }
        println!("\n[{reply_to}] 📎 {:?} {}\n", media.kind, media);
        eprint!("> ");
        Ok(())
    }

    async fn health_check(&self) -> Result<(), ChannelError> {
        Ok(())
    }

    async fn shutdown(&self) -> Result<(), ChannelError> {
        Ok(())
    }
}
