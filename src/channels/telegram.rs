//! Telegram channel: long-polls the Bot API for updates.
//!
//! The chat id is the reply target; the numeric sender id is the canonical
//! user identity. It is an account number, not a phone number, so the
//! pricing region's country-code prefix does not match it meaningfully.
//! Media is uploaded as multipart from the local media root.

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::multipart::{Form, Part};
use secrecy::{ExposeSecret, SecretString};

use crate::channels::{Channel, IncomingMessage, MediaKind, MediaRef, MessageKind, MessageStream};
use crate::config::TelegramConfig;
use crate::error::ChannelError;

/// Maximum message length for Telegram's sendMessage API.
const TELEGRAM_MAX_MESSAGE_LENGTH: usize = 4096;

/// Pause before polling again after a failed or rejected `getUpdates`.
const POLL_BACKOFF: std::time::Duration = std::time::Duration::from_secs(5);

/// Telegram channel, connected to the Bot API via long-polling.
pub struct TelegramChannel {
    bot_token: SecretString,
    allowed_users: Vec<String>,
    client: reqwest::Client,
}

impl TelegramChannel {
    pub fn new(config: TelegramConfig) -> Self {
        Self {
            bot_token: config.bot_token,
            allowed_users: config.allowed_users,
            client: reqwest::Client::new(),
        }
    }

    fn api_url(&self, method: &str) -> String {
        api_url(self.bot_token.expose_secret(), method)
    }

    /// Send a single message chunk (≤4096 chars), Markdown-first with fallback.
    async fn send_message_chunk(&self, chat_id: &str, text: &str) -> Result<(), ChannelError> {
        let markdown_body = serde_json::json!({
            "chat_id": chat_id,
            "text": text,
            "parse_mode": "Markdown"
        });

        let markdown_resp = self
            .client
            .post(self.api_url("sendMessage"))
            .json(&markdown_body)
            .send()
            .await
            .map_err(map_transport_error)?;

        if markdown_resp.status().is_success() {
            return Ok(());
        }

        let markdown_status = markdown_resp.status();
        if markdown_status == StatusCode::UNAUTHORIZED {
            return Err(session_lost("bot token rejected"));
        }
        tracing::warn!(
            status = ?markdown_status,
            "Telegram sendMessage with Markdown failed; retrying without parse_mode"
        );

        let plain_body = serde_json::json!({
            "chat_id": chat_id,
            "text": text,
        });
        let plain_resp = self
            .client
            .post(self.api_url("sendMessage"))
            .json(&plain_body)
            .send()
            .await
            .map_err(map_transport_error)?;

        if !plain_resp.status().is_success() {
            let plain_err = plain_resp.text().await.unwrap_or_default();
            return Err(ChannelError::SendFailed {
                name: "telegram".into(),
                reason: format!(
                    "sendMessage failed (markdown: {}, plain: {})",
                    markdown_status, plain_err
                ),
            });
        }

        Ok(())
    }

    /// Upload a local file with the method/field pair matching its kind.
    async fn send_file(&self, chat_id: &str, media: &MediaRef) -> Result<(), ChannelError> {
        let (method, field) = upload_method(media.kind);

        let file_bytes = tokio::fs::read(&media.path)
            .await
            .map_err(|_| ChannelError::MediaUnavailable(media.path.clone()))?;
        let part = Part::bytes(file_bytes).file_name(media.file_name().to_string());

        let form = Form::new()
            .text("chat_id", chat_id.to_string())
            .part(field, part);

        let resp = self
            .client
            .post(self.api_url(method))
            .multipart(form)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = resp.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(session_lost("bot token rejected"));
        }
        if !status.is_success() {
            let err = resp.text().await.unwrap_or_default();
            return Err(ChannelError::SendFailed {
                name: "telegram".into(),
                reason: format!("{method} failed: {err}"),
            });
        }

        tracing::info!("Telegram {method} sent to {chat_id}: {}", media.file_name());
        Ok(())
    }
}

// ── Channel trait implementation ────────────────────────────────────

#[async_trait]
impl Channel for TelegramChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn start(&self) -> Result<MessageStream, ChannelError> {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let url = self.api_url("getUpdates");
        let allowed_users = self.allowed_users.clone();
        let client = self.client.clone();

        tokio::spawn(async move {
            let mut offset: i64 = 0;

            tracing::info!("Telegram channel listening for messages...");

            loop {
                let body = serde_json::json!({
                    "offset": offset,
                    "timeout": 30,
                    "allowed_updates": ["message"]
                });

                let resp = match client.post(&url).json(&body).send().await {
                    Ok(r) => r,
                    Err(e) => {
                        tracing::warn!("Telegram poll error: {e}");
                        tokio::time::sleep(POLL_BACKOFF).await;
                        continue;
                    }
                };

                let data: serde_json::Value = match resp.json().await {
                    Ok(d) => d,
                    Err(e) => {
                        tracing::warn!("Telegram parse error: {e}");
                        tokio::time::sleep(POLL_BACKOFF).await;
                        continue;
                    }
                };

                let results = match poll_results(&data) {
                    Ok(results) => results,
                    Err(rejected) => {
                        if rejected.code == Some(i64::from(StatusCode::UNAUTHORIZED.as_u16())) {
                            tracing::error!(
                                error_code = ?rejected.code,
                                description = %rejected.description,
                                "Telegram rejected the bot token"
                            );
                        } else {
                            tracing::warn!(
                                error_code = ?rejected.code,
                                description = %rejected.description,
                                "Telegram getUpdates rejected"
                            );
                        }
                        tokio::time::sleep(POLL_BACKOFF).await;
                        continue;
                    }
                };

                for update in results {
                    if let Some(uid) = update.get("update_id").and_then(serde_json::Value::as_i64) {
                        offset = uid + 1;
                    }

                    let Some(message) = update.get("message") else {
                        continue;
                    };
                    let Some(incoming) = parse_update_message(message) else {
                        continue;
                    };

                    let username = incoming
                        .metadata
                        .get("username")
                        .and_then(|u| u.as_str())
                        .unwrap_or("unknown");
                    if !check_user_allowed(&allowed_users, [username, incoming.user_id.as_str()]) {
                        tracing::warn!(
                            "Telegram: ignoring message from unauthorized user: \
                             username={username}, user_id={}",
                            incoming.user_id
                        );
                        continue;
                    }

                    if tx.send(incoming).is_err() {
                        tracing::info!("Telegram listener channel closed");
                        return;
                    }
                }
            }
        });

        let stream = futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|msg| (msg, rx))
        });

        Ok(Box::pin(stream))
    }

    async fn send_text(&self, reply_to: &str, text: &str) -> Result<(), ChannelError> {
        for chunk in split_message(text, TELEGRAM_MAX_MESSAGE_LENGTH) {
            self.send_message_chunk(reply_to, &chunk).await?;
        }
        Ok(())
    }

    async fn send_media(&self, reply_to: &str, media: &MediaRef) -> Result<(), ChannelError> {
        self.send_file(reply_to, media).await
    }

    async fn health_check(&self) -> Result<(), ChannelError> {
        let resp = self
            .client
            .get(self.api_url("getMe"))
            .send()
            .await
            .map_err(|e| ChannelError::StartupFailed {
                name: "telegram".into(),
                reason: e.to_string(),
            })?;

        if resp.status().is_success() {
            Ok(())
        } else {
            Err(ChannelError::StartupFailed {
                name: "telegram".into(),
                reason: format!("getMe returned {}", resp.status()),
            })
        }
    }

    async fn shutdown(&self) -> Result<(), ChannelError> {
        tracing::info!("Telegram channel shutting down");
        Ok(())
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

fn api_url(token: &str, method: &str) -> String {
    format!("https://api.telegram.org/bot{token}/{method}")
}

fn session_lost(reason: &str) -> ChannelError {
    ChannelError::SessionLost {
        name: "telegram".into(),
        reason: reason.to_string(),
    }
}

/// Connection-level failures mean the session is gone; anything else is a
/// plain send failure.
fn map_transport_error(e: reqwest::Error) -> ChannelError {
    if e.is_connect() {
        session_lost(&e.to_string())
    } else {
        ChannelError::SendFailed {
            name: "telegram".into(),
            reason: e.to_string(),
        }
    }
}

/// A `getUpdates` reply without a result list.
#[derive(Debug, PartialEq)]
struct PollRejected {
    code: Option<i64>,
    description: String,
}

/// Extract the update list, or the API's reason for not sending one.
fn poll_results(data: &serde_json::Value) -> Result<&[serde_json::Value], PollRejected> {
    let ok = data.get("ok").and_then(serde_json::Value::as_bool).unwrap_or(false);
    match data.get("result").and_then(serde_json::Value::as_array) {
        Some(results) if ok => Ok(results),
        _ => Err(PollRejected {
            code: data.get("error_code").and_then(serde_json::Value::as_i64),
            description: data
                .get("description")
                .and_then(serde_json::Value::as_str)
                .unwrap_or("no result in response")
                .to_string(),
        }),
    }
}

fn upload_method(kind: MediaKind) -> (&'static str, &'static str) {
    match kind {
        MediaKind::Video => ("sendVideo", "video"),
        MediaKind::Image => ("sendPhoto", "photo"),
        MediaKind::Document => ("sendDocument", "document"),
    }
}

/// Convert a Bot API `message` object into an inbound message.
///
/// Returns `None` when the sender id is missing.
fn parse_update_message(message: &serde_json::Value) -> Option<IncomingMessage> {
    let from = message.get("from")?;
    let user_id = from.get("id").and_then(serde_json::Value::as_i64)?.to_string();
    let username = from
        .get("username")
        .and_then(|u| u.as_str())
        .unwrap_or("unknown");
    let first_name = from
        .get("first_name")
        .and_then(|n| n.as_str())
        .unwrap_or(username);

    let chat = message.get("chat");
    let chat_id = chat
        .and_then(|c| c.get("id"))
        .and_then(serde_json::Value::as_i64)
        .map(|id| id.to_string())
        .unwrap_or_else(|| user_id.clone());
    let is_private = chat
        .and_then(|c| c.get("type"))
        .and_then(|t| t.as_str())
        .is_some_and(|t| t == "private");

    let text = message.get("text").and_then(serde_json::Value::as_str);
    let kind = match (text, is_private) {
        (Some(_), true) => MessageKind::DirectText,
        (Some(_), false) => MessageKind::GroupText,
        (None, _) => MessageKind::Other,
    };

    Some(
        IncomingMessage::new("telegram", user_id, text.unwrap_or_default())
            .with_reply_to(chat_id)
            .with_user_name(first_name)
            .with_kind(kind)
            .with_metadata(serde_json::json!({ "username": username })),
    )
}

/// Check if any identity in the iterator matches the allowed users list.
fn check_user_allowed<'a>(
    allowed_users: &[String],
    identities: impl IntoIterator<Item = &'a str>,
) -> bool {
    let ids: Vec<&str> = identities.into_iter().collect();
    allowed_users
        .iter()
        .any(|u| u == "*" || ids.contains(&u.as_str()))
}

/// Split a message into chunks that fit Telegram's character limit.
/// Tries to split on newlines, then spaces, then hard-cuts at a char boundary.
fn split_message(text: &str, max_len: usize) -> Vec<String> {
    if text.len() <= max_len {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut remaining = text;

    while !remaining.is_empty() {
        if remaining.len() <= max_len {
            chunks.push(remaining.to_string());
            break;
        }

        let mut boundary = max_len;
        while !remaining.is_char_boundary(boundary) {
            boundary -= 1;
        }
        let chunk = &remaining[..boundary];
        let split_at = chunk
            .rfind('\n')
            .or_else(|| chunk.rfind(' '))
            .unwrap_or(boundary);

        // Don't split at position 0 (infinite loop guard)
        let split_at = if split_at == 0 { boundary } else { split_at };

        chunks.push(remaining[..split_at].to_string());
        remaining = remaining[split_at..].trim_start();
    }

    chunks
}

// ── Tests ───────────────────────────────────────────────────────────
