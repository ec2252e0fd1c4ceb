//! The per-conversation field set and its domain types.
//!
//! A [`FieldSet`] holds everything collected for one report submission. It is
//! created on `/start`, mutated only by the state machine, and fully cleared
//! on submit, cancel, or a fresh start.

use serde::{Deserialize, Serialize};

/// What the user is complaining about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplaintType {
    Garbage,
    AirPollution,
}

impl ComplaintType {
    /// Human-readable label used in summaries and report captions.
    pub fn label(&self) -> &'static str {
        match self {
            ComplaintType::Garbage => "Garbage accumulation",
            ComplaintType::AirPollution => "Air pollution / odour",
        }
    }

    /// Payload tag used in button callbacks (`report_type:<tag>`).
    pub fn tag(&self) -> &'static str {
        match self {
            ComplaintType::Garbage => "garbage",
            ComplaintType::AirPollution => "air",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "garbage" => Some(ComplaintType::Garbage),
            "air" => Some(ComplaintType::AirPollution),
            _ => None,
        }
    }
}

/// Kind of media attached to a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Photo,
    Video,
    VideoNote,
}

impl MediaKind {
    pub fn label(&self) -> &'static str {
        match self {
            MediaKind::Photo => "Photo",
            MediaKind::Video => "Video",
            MediaKind::VideoNote => "Video note",
        }
    }
}

/// Opaque file handle owned by the chat transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRef(pub String);

/// Opaque handle to a previously sent chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRef(pub i64);

/// A single attached media item. Attaching a new one replaces the old:
/// at most one of photo/video/video-note exists at any time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaAttachment {
    pub kind: MediaKind,
    pub file: FileRef,
}

/// Where the problem is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Location {
    Geo { latitude: f64, longitude: f64 },
    Address(String),
}

/// Everything collected for one report, plus transient UI markers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldSet {
    pub complaint_type: Option<ComplaintType>,
    pub media: Option<MediaAttachment>,
    pub description: Option<String>,
    /// Only meaningful when `complaint_type` is `Garbage`.
    pub rodents_present: Option<bool>,
    pub location: Option<Location>,
    /// Escaped against markup injection before storage.
    pub contact_name: Option<String>,
    pub wants_feedback: Option<bool>,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,

    /// Transient: the user is revisiting a single field from the summary.
    #[serde(skip)]
    pub editing: bool,
    /// Transient: media preview message shown with the last summary.
    #[serde(skip)]
    pub media_preview: Option<MessageRef>,
    /// Transient: the last rendered summary text message. Retracted before
    /// the summary is rendered again.
    #[serde(skip)]
    pub summary_message: Option<MessageRef>,
}

impl FieldSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// True for garbage reports; drives the rodents branch and edit menu.
    pub fn is_garbage(&self) -> bool {
        self.complaint_type == Some(ComplaintType::Garbage)
    }

    /// Replace any stored media with the given attachment.
    pub fn attach_media(&mut self, kind: MediaKind, file: FileRef) {
        self.media = Some(MediaAttachment { kind, file });
    }

    /// Force contact details absent; used when feedback is declined.
    pub fn clear_contacts(&mut self) {
        self.contact_email = None;
        self.contact_phone = None;
    }

    /// True when every field required for the confirmation summary is set.
    pub fn is_complete(&self) -> bool {
        self.complaint_type.is_some()
            && self.description.is_some()
            && self.location.is_some()
            && self.contact_name.is_some()
            && self.wants_feedback.is_some()
    }

    /// At least one contact method is stored.
    pub fn has_contact_method(&self) -> bool {
        self.contact_email.is_some() || self.contact_phone.is_some()
    }

    /// Wipe everything, including transient markers.
    pub fn clear(&mut self) {
        *self = FieldSet::default();
    }
}
