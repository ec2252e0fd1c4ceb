//! The chat transport seam.
//!
//! The engine never talks to a chat platform directly; it consumes typed
//! [`ChatEvent`]s and produces calls on [`ChatTransport`]. Implementations
//! live outside this crate (a real bot adapter, the console transport in
//! the CLI, mocks in tests).

use async_trait::async_trait;
use thiserror::Error;

use ecoreport_core::{FileRef, Keyboard, MediaAttachment, MediaKind, MessageRef};

/// A conversation (or channel) identifier on the chat platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChatId(pub i64);

impl std::fmt::Display for ChatId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Errors from transport calls.
#[derive(Error, Debug)]
pub enum ChatError {
    #[error("transport call failed: {0}")]
    Failed(String),

    #[error("file unavailable: {0}")]
    FileUnavailable(String),
}

/// A file fetched from the transport's file store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDownload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// One inbound event, already typed by the transport adapter.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatEvent {
    pub chat: ChatId,
    /// Display tag for the submitting user (`@name` or an id tag).
    pub reporter: String,
    pub kind: ChatEventKind,
}

/// The payload of an inbound event.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatEventKind {
    /// A slash command without its arguments (`/start`, `/cancel`).
    Command(String),
    /// A button press: the message carrying the button plus its opaque data.
    Button { message: MessageRef, data: String },
    Text(String),
    Media {
        kind: MediaKind,
        file: FileRef,
        size_bytes: u64,
    },
    Location { latitude: f64, longitude: f64 },
}

/// Narrow interface to the chat platform.
///
/// All calls are fallible and none are retried; a failure on the submit
/// path surfaces to the user, anywhere else it is logged and the
/// conversation re-prompts.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Send a text message, optionally with an inline keyboard.
    async fn send_message(
        &self,
        chat: ChatId,
        text: &str,
        keyboard: Option<&Keyboard>,
    ) -> Result<MessageRef, ChatError>;

    /// Replace the text and keyboard of an existing message.
    async fn edit_message(
        &self,
        chat: ChatId,
        message: MessageRef,
        text: &str,
        keyboard: Option<&Keyboard>,
    ) -> Result<(), ChatError>;

    /// Delete a message. Deleting an already-gone message is an error the
    /// caller is expected to ignore.
    async fn delete_message(&self, chat: ChatId, message: MessageRef) -> Result<(), ChatError>;

    /// Send a media attachment by file reference with an optional caption.
    async fn send_media(
        &self,
        chat: ChatId,
        media: &MediaAttachment,
        caption: Option<&str>,
    ) -> Result<MessageRef, ChatError>;

    /// Send a location marker.
    async fn send_location(
        &self,
        chat: ChatId,
        latitude: f64,
        longitude: f64,
    ) -> Result<MessageRef, ChatError>;

    /// Fetch a file's bytes from the platform's file store.
    async fn download_file(&self, file: &FileRef) -> Result<FileDownload, ChatError>;
}
