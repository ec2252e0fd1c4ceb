//! The wizard states and the backward-navigation map.

use serde::{Deserialize, Serialize};

/// Closed set of wizard states.
///
/// Linear sequence with one conditional branch (rodents, garbage reports
/// only), one two-way split (geo vs. address entry), and an edit sub-graph
/// reachable from [`FormState::AwaitingConfirmation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormState {
    /// No form in progress.
    Idle,
    AwaitingType,
    AwaitingMedia,
    AwaitingDescription,
    AwaitingRodentsChoice,
    AwaitingLocationChoice,
    AwaitingLocationGeo,
    AwaitingLocationAddress,
    AwaitingName,
    AwaitingFeedbackChoice,
    AwaitingContactEmail,
    AwaitingContactPhone,
    AwaitingConfirmation,
}

impl FormState {
    /// The state `go_back` returns to, or `None` where no back edge exists
    /// (idle, the first step, and the confirmation summary, which uses the
    /// edit sub-graph instead).
    ///
    /// The rodents branch is skipped in reverse when the report is not about
    /// garbage.
    pub fn back_target(&self, is_garbage: bool) -> Option<FormState> {
        match self {
            FormState::Idle | FormState::AwaitingType | FormState::AwaitingConfirmation => None,
            FormState::AwaitingMedia => Some(FormState::AwaitingType),
            FormState::AwaitingDescription => Some(FormState::AwaitingMedia),
            FormState::AwaitingRodentsChoice => Some(FormState::AwaitingDescription),
            FormState::AwaitingLocationChoice => {
                if is_garbage {
                    Some(FormState::AwaitingRodentsChoice)
                } else {
                    Some(FormState::AwaitingDescription)
                }
            }
            FormState::AwaitingLocationGeo | FormState::AwaitingLocationAddress => {
                Some(FormState::AwaitingLocationChoice)
            }
            FormState::AwaitingName => Some(FormState::AwaitingLocationChoice),
            FormState::AwaitingFeedbackChoice => Some(FormState::AwaitingName),
            FormState::AwaitingContactEmail => Some(FormState::AwaitingFeedbackChoice),
            FormState::AwaitingContactPhone => Some(FormState::AwaitingContactEmail),
        }
    }

    /// Stable name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            FormState::Idle => "idle",
            FormState::AwaitingType => "awaiting_type",
            FormState::AwaitingMedia => "awaiting_media",
            FormState::AwaitingDescription => "awaiting_description",
            FormState::AwaitingRodentsChoice => "awaiting_rodents_choice",
            FormState::AwaitingLocationChoice => "awaiting_location_choice",
            FormState::AwaitingLocationGeo => "awaiting_location_geo",
            FormState::AwaitingLocationAddress => "awaiting_location_address",
            FormState::AwaitingName => "awaiting_name",
            FormState::AwaitingFeedbackChoice => "awaiting_feedback_choice",
            FormState::AwaitingContactEmail => "awaiting_contact_email",
            FormState::AwaitingContactPhone => "awaiting_contact_phone",
            FormState::AwaitingConfirmation => "awaiting_confirmation",
        }
    }
}

impl Default for FormState {
    fn default() -> Self {
        FormState::Idle
    }
}
