//! Console transport: a terminal stand-in for a real chat platform.
//!
//! Outbound messages print to stdout; inline keyboards print as numbered
//! buttons. Inbound lines are parsed into the same typed events a bot
//! adapter would produce:
//!
//! - `/start`, `/cancel`          slash commands
//! - `3`                          press button 3 of the last keyboard
//! - `loc 55.75 37.61`            share a geo location
//! - `photo`, `video 25`, `note`  attach media (size in MB, optional)
//! - anything else                plain text

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use ecoreport_core::{FileRef, Keyboard, MediaAttachment, MediaKind, MessageRef};
use ecoreport_runtime::{
    ChatError, ChatEvent, ChatEventKind, ChatId, ChatTransport, FileDownload,
};

/// The single console conversation.
pub const CONSOLE_CHAT: ChatId = ChatId(1);

#[derive(Default)]
pub struct ConsoleTransport {
    next_id: AtomicI64,
    /// Buttons of the most recently printed keyboard, in display order.
    last_keyboard: Mutex<Option<(MessageRef, Vec<String>)>>,
}

impl ConsoleTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_ref(&self) -> MessageRef {
        MessageRef(self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    fn print_keyboard(&self, message: MessageRef, keyboard: &Keyboard) {
        let mut callbacks = Vec::new();
        for row in &keyboard.rows {
            for button in row {
                callbacks.push(button.callback.clone());
                println!("    [{}] {}", callbacks.len(), button.label);
            }
        }
        *self.last_keyboard.lock().unwrap() = Some((message, callbacks));
    }

    /// Resolve a typed button number against the last printed keyboard.
    pub fn button_press(&self, number: usize) -> Option<(MessageRef, String)> {
        let guard = self.last_keyboard.lock().unwrap();
        let (message, callbacks) = guard.as_ref()?;
        let data = callbacks.get(number.checked_sub(1)?)?;
        Some((*message, data.clone()))
    }

    fn label(&self, chat: ChatId) -> &'static str {
        if chat == CONSOLE_CHAT {
            "bot"
        } else {
            "review-channel"
        }
    }
}

#[async_trait]
impl ChatTransport for ConsoleTransport {
    async fn send_message(
        &self,
        chat: ChatId,
        text: &str,
        keyboard: Option<&Keyboard>,
    ) -> Result<MessageRef, ChatError> {
        let message = self.next_ref();
        println!("[{}] {}", self.label(chat), text);
        if let Some(keyboard) = keyboard {
            self.print_keyboard(message, keyboard);
        }
        Ok(message)
    }

    async fn edit_message(
        &self,
        chat: ChatId,
        message: MessageRef,
        text: &str,
        keyboard: Option<&Keyboard>,
    ) -> Result<(), ChatError> {
        println!("[{} edit #{}] {}", self.label(chat), message.0, text);
        if let Some(keyboard) = keyboard {
            self.print_keyboard(message, keyboard);
        }
        Ok(())
    }

    async fn delete_message(&self, chat: ChatId, message: MessageRef) -> Result<(), ChatError> {
        println!("[{} delete #{}]", self.label(chat), message.0);
        Ok(())
    }

    async fn send_media(
        &self,
        chat: ChatId,
        media: &MediaAttachment,
        caption: Option<&str>,
    ) -> Result<MessageRef, ChatError> {
        let message = self.next_ref();
        println!(
            "[{}] <{}: {}>",
            self.label(chat),
            media.kind.label(),
            media.file.0
        );
        if let Some(caption) = caption {
            println!("[{}] {}", self.label(chat), caption);
        }
        Ok(message)
    }

    async fn send_location(
        &self,
        chat: ChatId,
        latitude: f64,
        longitude: f64,
    ) -> Result<MessageRef, ChatError> {
        let message = self.next_ref();
        println!("[{}] <location: {latitude}, {longitude}>", self.label(chat));
        Ok(message)
    }

    async fn download_file(&self, file: &FileRef) -> Result<FileDownload, ChatError> {
        // The console has no file store; hand back placeholder bytes so the
        // email path stays exercised.
        Ok(FileDownload {
            file_name: format!("{}.bin", file.0),
            bytes: file.0.as_bytes().to_vec(),
        })
    }
}

/// Parse one console input line into a chat event.
pub fn parse_line(transport: &ConsoleTransport, line: &str) -> Option<ChatEvent> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let kind = if let Some(command) = line.strip_prefix('/') {
        ChatEventKind::Command(format!("/{}", command.split_whitespace().next()?))
    } else if let Ok(number) = line.parse::<usize>() {
        let (message, data) = match transport.button_press(number) {
            Some(press) => press,
            None => {
                println!("[console] no button {number} on the last keyboard");
                return None;
            }
        };
        ChatEventKind::Button { message, data }
    } else if let Some(rest) = line.strip_prefix("loc ") {
        let mut parts = rest.split_whitespace();
        match (
            parts.next().and_then(|p| p.parse::<f64>().ok()),
            parts.next().and_then(|p| p.parse::<f64>().ok()),
        ) {
            (Some(latitude), Some(longitude)) => ChatEventKind::Location { latitude, longitude },
            _ => {
                println!("[console] usage: loc <latitude> <longitude>");
                return None;
            }
        }
    } else if let Some(media) = parse_media(line) {
        media
    } else {
        ChatEventKind::Text(line.to_string())
    };

    Some(ChatEvent {
        chat: CONSOLE_CHAT,
        reporter: "@console".to_string(),
        kind,
    })
}

fn parse_media(line: &str) -> Option<ChatEventKind> {
    let mut parts = line.split_whitespace();
    let kind = match parts.next()? {
        "photo" => MediaKind::Photo,
        "video" => MediaKind::Video,
        "note" => MediaKind::VideoNote,
        _ => return None,
    };
    let size_mb: u64 = parts.next().and_then(|p| p.parse().ok()).unwrap_or(1);
    Some(ChatEventKind::Media {
        kind,
        file: FileRef(format!("console-{}-{size_mb}mb", line.split_whitespace().next().unwrap_or("file"))),
        size_bytes: size_mb * 1024 * 1024,
    })
}
