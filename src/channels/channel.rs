//! Channel trait and the message types that cross it.

use std::fmt;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::Stream;
use uuid::Uuid;

use crate::error::ChannelError;

/// Stream of inbound messages produced by a started channel.
pub type MessageStream = Pin<Box<dyn Stream<Item = IncomingMessage> + Send>>;

/// What kind of inbound event a message is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    /// Plain text in a one-to-one chat. The only kind the funnel handles.
    DirectText,
    /// Text posted in a group chat.
    GroupText,
    /// Anything else (stickers, media, service events).
    Other,
}

/// A message received from a channel.
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    pub id: Uuid,
    /// Channel name that produced the message.
    pub channel: String,
    /// Routing address used for every reply.
    pub reply_to: String,
    /// Canonical user identity used for state lookups.
    pub user_id: String,
    pub user_name: Option<String>,
    pub content: String,
    pub kind: MessageKind,
    pub received_at: DateTime<Utc>,
    pub metadata: serde_json::Value,
}

impl IncomingMessage {
    /// Create a direct text message whose reply target is the user identity.
    pub fn new(
        channel: impl Into<String>,
        user_id: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        let user_id = user_id.into();
        Self {
            id: Uuid::new_v4(),
            channel: channel.into(),
            reply_to: user_id.clone(),
            user_id,
            user_name: None,
            content: content.into(),
            kind: MessageKind::DirectText,
            received_at: Utc::now(),
            metadata: serde_json::Value::Null,
        }
    }

    pub fn with_reply_to(mut self, reply_to: impl Into<String>) -> Self {
        self.reply_to = reply_to.into();
        self
    }

    pub fn with_user_name(mut self, name: impl Into<String>) -> Self {
        self.user_name = Some(name.into());
        self
    }

    pub fn with_kind(mut self, kind: MessageKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }
}

/// How a media file should be delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Video,
    Image,
    Document,
}

impl MediaKind {
    /// Infer the kind from a file extension. Unknown extensions are sent as
    /// documents.
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match ext.as_str() {
            "mp4" | "mov" | "webm" | "3gp" => Self::Video,
            "jpg" | "jpeg" | "png" | "webp" | "gif" => Self::Image,
            _ => Self::Document,
        }
    }
}

/// A resolved media file ready to be sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaRef {
    pub path: PathBuf,
    pub kind: MediaKind,
}

impl MediaRef {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let kind = MediaKind::from_path(&path);
        Self { path, kind }
    }

    /// File name for display and multipart uploads.
    pub fn file_name(&self) -> &str {
        self.path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("file")
    }
}

impl fmt::Display for MediaRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

/// A messaging channel: raises inbound events and delivers outbound ones.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Short channel name for logs.
    fn name(&self) -> &str;

    /// Start listening and return the inbound message stream.
    async fn start(&self) -> Result<MessageStream, ChannelError>;

    /// Send a text message to a reply target.
    async fn send_text(&self, reply_to: &str, text: &str) -> Result<(), ChannelError>;

    /// Send a media file to a reply target.
    async fn send_media(&self, reply_to: &str, media: &MediaRef) -> Result<(), ChannelError>;

    /// Check that the channel can reach its backend.
    async fn health_check(&self) -> Result<(), ChannelError>;

    /// Reinitialize the channel session after a `SessionLost` fault.
    async fn reconnect(&self) -> Result<(), ChannelError> {
        self.health_check().await
    }

    /// Release channel resources.
    async fn shutdown(&self) -> Result<(), ChannelError>;
}
