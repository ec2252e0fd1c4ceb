//! Field validation patterns and sanitisation.
//!
//! Shared by the state machine and the delivery path: email and phone
//! regexes, markup escaping for user-supplied text, and media size caps.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// `local@domain.tld` with the usual local-part characters.
    pub static ref EMAIL_PATTERN: Regex = Regex::new(
        r"^[a-zA-Z0-9_.+-]+@[a-zA-Z0-9-]+\.[a-zA-Z0-9-.]+$"
    ).unwrap();

    /// Russian-style phone: leading 7, 8, or +7 (never +8), ten digits,
    /// flexible separators.
    pub static ref PHONE_PATTERN: Regex = Regex::new(
        r"^(?:\+?7|8)[-\s(]*\d{3}[-\s)]*\d{3}[-\s]*\d{2}[-\s]*\d{2}$"
    ).unwrap();
}

/// Check an email address against [`EMAIL_PATTERN`].
pub fn is_valid_email(text: &str) -> bool {
    EMAIL_PATTERN.is_match(text.trim())
}

/// Check a phone number against [`PHONE_PATTERN`].
pub fn is_valid_phone(text: &str) -> bool {
    PHONE_PATTERN.is_match(text.trim())
}

/// Escape structural markup characters in user-supplied text.
///
/// Applied to the contact name before storage and to every user field when
/// rendered into summaries, captions, or email bodies.
pub fn escape_markup(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Byte caps for size-bounded media kinds. Photos are uncapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaLimits {
    pub video_max_bytes: u64,
    pub video_note_max_bytes: u64,
}

impl MediaLimits {
    pub const DEFAULT_VIDEO_MB: u64 = 20;
    pub const DEFAULT_VIDEO_NOTE_MB: u64 = 12;

    pub fn from_megabytes(video_mb: u64, video_note_mb: u64) -> Self {
        Self {
            video_max_bytes: video_mb * 1024 * 1024,
            video_note_max_bytes: video_note_mb * 1024 * 1024,
        }
    }

    pub fn video_max_mb(&self) -> u64 {
        self.video_max_bytes / (1024 * 1024)
    }

    pub fn video_note_max_mb(&self) -> u64 {
        self.video_note_max_bytes / (1024 * 1024)
    }
}

impl Default for MediaLimits {
    fn default() -> Self {
        Self::from_megabytes(Self::DEFAULT_VIDEO_MB, Self::DEFAULT_VIDEO_NOTE_MB)
    }
}
