//! Inline keyboard specifications.
//!
//! Keyboards are plain data (rows of label + callback payload); the
//! transport decides how to render them.

use serde::{Deserialize, Serialize};

use crate::event::{ButtonPayload, EditTarget, LocationChoice};
use crate::fields::ComplaintType;

/// One pressable button.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Button {
    pub label: String,
    pub callback: String,
}

impl Button {
    fn new(label: &str, payload: ButtonPayload) -> Self {
        Self {
            label: label.to_string(),
            callback: payload.as_callback(),
        }
    }
}

/// Rows of buttons attached to a prompt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Keyboard {
    pub rows: Vec<Vec<Button>>,
}

impl Keyboard {
    fn from_rows(rows: Vec<Vec<Button>>) -> Self {
        Self { rows }
    }

    /// Every callback payload reachable from this keyboard, row by row.
    pub fn callbacks(&self) -> impl Iterator<Item = &str> {
        self.rows
            .iter()
            .flat_map(|row| row.iter().map(|button| button.callback.as_str()))
    }
}

fn back_cancel_row() -> Vec<Button> {
    vec![
        Button::new("⬅️ Back", ButtonPayload::GoBack),
        Button::new("❌ Cancel", ButtonPayload::CancelAll),
    ]
}

fn home_row() -> Vec<Button> {
    vec![Button::new("🏠 Start over", ButtonPayload::GoHome)]
}

/// Complaint type chooser shown after `/start`.
pub fn complaint_type() -> Keyboard {
    Keyboard::from_rows(vec![
        vec![Button::new(
            "🗑 Garbage accumulation",
            ButtonPayload::ReportType(ComplaintType::Garbage),
        )],
        vec![Button::new(
            "💨 Air pollution / odour",
            ButtonPayload::ReportType(ComplaintType::AirPollution),
        )],
    ])
}

/// Plain back/cancel keyboard for text and media steps.
pub fn back_cancel() -> Keyboard {
    Keyboard::from_rows(vec![back_cancel_row(), home_row()])
}

/// Geo vs. manual address chooser.
pub fn location_choice() -> Keyboard {
    Keyboard::from_rows(vec![
        vec![Button::new(
            "📍 Current location",
            ButtonPayload::LocationChoice(LocationChoice::Geo),
        )],
        vec![Button::new(
            "✍️ Type an address",
            ButtonPayload::LocationChoice(LocationChoice::Address),
        )],
        back_cancel_row(),
        home_row(),
    ])
}

/// Feedback yes/no chooser.
pub fn feedback_choice() -> Keyboard {
    Keyboard::from_rows(vec![
        vec![Button::new("Yes, keep me posted", ButtonPayload::Feedback(true))],
        vec![Button::new("No, thanks", ButtonPayload::Feedback(false))],
        back_cancel_row(),
        home_row(),
    ])
}

/// Rodents yes/no chooser. While editing, the back button returns to the
/// summary instead of the previous wizard step.
pub fn rodents_choice(editing: bool) -> Keyboard {
    let back = if editing {
        Button::new("⬅️ Back", ButtonPayload::BackToConfirm)
    } else {
        Button::new("⬅️ Back", ButtonPayload::GoBack)
    };
    Keyboard::from_rows(vec![
        vec![
            Button::new("Yes, there are", ButtonPayload::Rodents(true)),
            Button::new("No", ButtonPayload::Rodents(false)),
        ],
        vec![back, Button::new("❌ Cancel", ButtonPayload::CancelAll)],
        home_row(),
    ])
}

/// Email step keyboard with a skip action.
pub fn skip_email() -> Keyboard {
    Keyboard::from_rows(vec![
        vec![Button::new("➡️ Skip email", ButtonPayload::SkipEmail)],
        back_cancel_row(),
        home_row(),
    ])
}

/// Cancel-only keyboard used while revisiting a single field.
pub fn cancel_only() -> Keyboard {
    Keyboard::from_rows(vec![vec![Button::new(
        "❌ Cancel report",
        ButtonPayload::CancelAll,
    )]])
}

/// Send / edit / home keyboard under the confirmation summary.
pub fn confirmation() -> Keyboard {
    Keyboard::from_rows(vec![
        vec![Button::new("✅ All correct, send", ButtonPayload::ConfirmSend)],
        vec![Button::new("✏️ Edit", ButtonPayload::ConfirmEdit)],
        home_row(),
    ])
}

/// Edit menu; the rodents entry appears only for garbage reports.
pub fn edit_menu(is_garbage: bool) -> Keyboard {
    let mut rows = vec![
        vec![Button::new("📷 Photo / video", ButtonPayload::Edit(EditTarget::Media))],
        vec![Button::new("📝 Description", ButtonPayload::Edit(EditTarget::Description))],
    ];
    if is_garbage {
        rows.push(vec![Button::new(
            "🐹 Rodents",
            ButtonPayload::Edit(EditTarget::Rodents),
        )]);
    }
    rows.extend([
        vec![Button::new("🗺️ Location", ButtonPayload::Edit(EditTarget::Location))],
        vec![Button::new(
            "🔔 Feedback preference",
            ButtonPayload::Edit(EditTarget::FeedbackChoice),
        )],
        vec![Button::new("👤 Contact details", ButtonPayload::Edit(EditTarget::Contacts))],
        vec![Button::new("✅ Done, back to summary", ButtonPayload::BackToConfirm)],
    ]);
    Keyboard::from_rows(rows)
}
