//! Typed inbound events.
//!
//! The transport delivers commands, button presses (opaque `prefix:value`
//! strings), free text, media, and locations. Button payloads are parsed
//! into a closed enum before they reach the state machine; unknown payloads
//! are rejected at the boundary.

use thiserror::Error;

use crate::fields::{ComplaintType, FileRef, MediaKind};

/// The text command that cancels an in-progress form.
pub const CANCEL_TEXT: &str = "/cancel";

/// A single user event, already typed by the transport layer.
#[derive(Debug, Clone, PartialEq)]
pub enum FormEvent {
    /// `/start`: begin a fresh report, wiping any prior one.
    Start,
    /// Button press with a parsed payload.
    Button(ButtonPayload),
    /// Free-text message.
    Text(String),
    /// Media attachment with its declared size in bytes.
    Media {
        kind: MediaKind,
        file: FileRef,
        size_bytes: u64,
    },
    /// Location attachment.
    Location { latitude: f64, longitude: f64 },
}

/// Which location entry mode the user picked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationChoice {
    Geo,
    Address,
}

/// Single-field edit targets reachable from the confirmation summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditTarget {
    Media,
    Description,
    Rodents,
    Location,
    FeedbackChoice,
    Contacts,
}

/// Parsed button payload.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ButtonPayload {
    ReportType(ComplaintType),
    LocationChoice(LocationChoice),
    Feedback(bool),
    Rodents(bool),
    ConfirmSend,
    ConfirmEdit,
    Edit(EditTarget),
    BackToConfirm,
    SkipEmail,
    GoBack,
    CancelAll,
    GoHome,
}

/// A button payload the engine does not recognise.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown button payload: {0}")]
pub struct UnknownPayload(pub String);

impl ButtonPayload {
    /// Parse the opaque callback string carried by a button press.
    pub fn parse(data: &str) -> Result<Self, UnknownPayload> {
        let payload = match data {
            "confirm:send" => ButtonPayload::ConfirmSend,
            "confirm:edit" => ButtonPayload::ConfirmEdit,
            "edit:back_to_confirm" => ButtonPayload::BackToConfirm,
            "edit:media" => ButtonPayload::Edit(EditTarget::Media),
            "edit:description" => ButtonPayload::Edit(EditTarget::Description),
            "edit:rodents" => ButtonPayload::Edit(EditTarget::Rodents),
            "edit:location" => ButtonPayload::Edit(EditTarget::Location),
            "edit:feedback_choice" => ButtonPayload::Edit(EditTarget::FeedbackChoice),
            "edit:contacts" => ButtonPayload::Edit(EditTarget::Contacts),
            "loc_choice:geo" => ButtonPayload::LocationChoice(LocationChoice::Geo),
            "loc_choice:address" => ButtonPayload::LocationChoice(LocationChoice::Address),
            "feedback:yes" => ButtonPayload::Feedback(true),
            "feedback:no" => ButtonPayload::Feedback(false),
            "rodents:yes" => ButtonPayload::Rodents(true),
            "rodents:no" => ButtonPayload::Rodents(false),
            "skip:email" => ButtonPayload::SkipEmail,
            "go_back" => ButtonPayload::GoBack,
            "cancel_all" => ButtonPayload::CancelAll,
            "go_to_start" => ButtonPayload::GoHome,
            other => {
                if let Some(tag) = other.strip_prefix("report_type:") {
                    return ComplaintType::from_tag(tag)
                        .map(ButtonPayload::ReportType)
                        .ok_or_else(|| UnknownPayload(other.to_string()));
                }
                return Err(UnknownPayload(other.to_string()));
            }
        };
        Ok(payload)
    }

    /// The opaque string a button carrying this payload transmits.
    pub fn as_callback(&self) -> String {
        match self {
            ButtonPayload::ReportType(kind) => format!("report_type:{}", kind.tag()),
            ButtonPayload::LocationChoice(LocationChoice::Geo) => "loc_choice:geo".into(),
            ButtonPayload::LocationChoice(LocationChoice::Address) => "loc_choice:address".into(),
            ButtonPayload::Feedback(true) => "feedback:yes".into(),
            ButtonPayload::Feedback(false) => "feedback:no".into(),
            ButtonPayload::Rodents(true) => "rodents:yes".into(),
            ButtonPayload::Rodents(false) => "rodents:no".into(),
            ButtonPayload::ConfirmSend => "confirm:send".into(),
            ButtonPayload::ConfirmEdit => "confirm:edit".into(),
            ButtonPayload::Edit(EditTarget::Media) => "edit:media".into(),
            ButtonPayload::Edit(EditTarget::Description) => "edit:description".into(),
            ButtonPayload::Edit(EditTarget::Rodents) => "edit:rodents".into(),
            ButtonPayload::Edit(EditTarget::Location) => "edit:location".into(),
            ButtonPayload::Edit(EditTarget::FeedbackChoice) => "edit:feedback_choice".into(),
            ButtonPayload::Edit(EditTarget::Contacts) => "edit:contacts".into(),
            ButtonPayload::BackToConfirm => "edit:back_to_confirm".into(),
            ButtonPayload::SkipEmail => "skip:email".into(),
            ButtonPayload::GoBack => "go_back".into(),
            ButtonPayload::CancelAll => "cancel_all".into(),
            ButtonPayload::GoHome => "go_to_start".into(),
        }
    }
}
