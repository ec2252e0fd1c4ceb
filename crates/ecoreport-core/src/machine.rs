//! The form state machine.
//!
//! One transition function covers the whole wizard: the linear field
//! sequence, the rodents branch, the geo/address split, backward
//! navigation, cancellation, restart, and the edit sub-graph reachable from
//! the confirmation summary. Each state accepts exactly one semantic input
//! type; everything else re-prompts in place without touching the field set.
//!
//! The machine is synchronous and side-effect free: it mutates the session
//! and returns the replies to deliver plus an action for the runtime
//! (render the summary, attempt submission, or nothing).

use tracing::debug;

use crate::event::{ButtonPayload, EditTarget, FormEvent, LocationChoice, CANCEL_TEXT};
use crate::fields::{FieldSet, FileRef, Location, MediaKind};
use crate::keyboards::{self, Keyboard};
use crate::state::FormState;
use crate::validate::{escape_markup, is_valid_email, is_valid_phone, MediaLimits};

/// An outbound prompt with an optional inline keyboard.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub text: String,
    pub keyboard: Option<Keyboard>,
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Self { text: text.into(), keyboard: None }
    }

    pub fn with_keyboard(text: impl Into<String>, keyboard: Keyboard) -> Self {
        Self { text: text.into(), keyboard: Some(keyboard) }
    }
}

/// What the runtime must do after a transition, beyond sending replies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepAction {
    /// Replies only; the wizard stays interactive.
    None,
    /// Render (or re-render) the confirmation summary.
    ShowSummary,
    /// Preconditions passed; deliver the report and clear the session.
    Submit,
    /// The field set was cleared and the conversation returned to idle.
    Cancelled,
}

/// Result of one transition.
#[derive(Debug, Clone, PartialEq)]
pub struct StepOutcome {
    pub replies: Vec<Reply>,
    pub action: StepAction,
}

impl StepOutcome {
    fn reply(reply: Reply) -> Self {
        Self { replies: vec![reply], action: StepAction::None }
    }

    fn replies(replies: Vec<Reply>, action: StepAction) -> Self {
        Self { replies, action }
    }

}

/// One user's wizard: current state plus collected fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormSession {
    pub state: FormState,
    pub fields: FieldSet,
}

impl FormSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one inbound event.
    pub fn handle(&mut self, event: FormEvent, limits: &MediaLimits) -> StepOutcome {
        let before = self.state;
        let outcome = self.dispatch(event, limits);
        if self.state != before {
            debug!(from = before.name(), to = self.state.name(), "form transition");
        }
        outcome
    }

    fn dispatch(&mut self, event: FormEvent, limits: &MediaLimits) -> StepOutcome {
        // Global transitions first: start/restart, cancel, back, and the
        // editing escape hatch back to the summary.
        match &event {
            FormEvent::Start => return self.restart(),
            FormEvent::Button(ButtonPayload::GoHome) if self.state != FormState::Idle => {
                return self.restart();
            }
            FormEvent::Button(ButtonPayload::CancelAll) if self.state != FormState::Idle => {
                return self.cancel();
            }
            FormEvent::Text(text)
                if self.state != FormState::Idle && text.trim() == CANCEL_TEXT =>
            {
                return self.cancel();
            }
            FormEvent::Button(ButtonPayload::GoBack) if self.state != FormState::Idle => {
                return self.go_back();
            }
            FormEvent::Button(ButtonPayload::BackToConfirm)
                if self.fields.editing || self.state == FormState::AwaitingConfirmation =>
            {
                self.state = FormState::AwaitingConfirmation;
                self.fields.editing = false;
                return StepOutcome::replies(vec![], StepAction::ShowSummary);
            }
            _ => {}
        }

        match self.state {
            FormState::Idle => StepOutcome::reply(Reply::text(
                "Nothing in progress. Send /start to file a new report.",
            )),
            FormState::AwaitingType => self.on_type(event),
            FormState::AwaitingMedia => self.on_media(event, limits),
            FormState::AwaitingDescription => self.on_description(event),
            FormState::AwaitingRodentsChoice => self.on_rodents(event),
            FormState::AwaitingLocationChoice => self.on_location_choice(event),
            FormState::AwaitingLocationGeo => self.on_location_geo(event),
            FormState::AwaitingLocationAddress => self.on_location_address(event),
            FormState::AwaitingName => self.on_name(event),
            FormState::AwaitingFeedbackChoice => self.on_feedback_choice(event),
            FormState::AwaitingContactEmail => self.on_email(event),
            FormState::AwaitingContactPhone => self.on_phone(event),
            FormState::AwaitingConfirmation => self.on_confirmation(event),
        }
    }

    // ------------------------------------------------------------------
    // Global transitions
    // ------------------------------------------------------------------

    /// Move to the confirmation summary. Always leaves editing mode so a
    /// later single-field edit starts clean.
    fn to_summary(&mut self, reply: Reply) -> StepOutcome {
        self.state = FormState::AwaitingConfirmation;
        self.fields.editing = false;
        StepOutcome { replies: vec![reply], action: StepAction::ShowSummary }
    }

    fn restart(&mut self) -> StepOutcome {
        self.fields.clear();
        self.state = FormState::AwaitingType;
        StepOutcome::reply(Reply::with_keyboard(
            "👋 <b>Hello!</b>\n\nI will help you report an environmental problem. \
             Please choose the problem type:",
            keyboards::complaint_type(),
        ))
    }

    fn cancel(&mut self) -> StepOutcome {
        self.fields.clear();
        self.state = FormState::Idle;
        StepOutcome::replies(
            vec![Reply::text(
                "Cancelled. You can file a new report at any time with /start.",
            )],
            StepAction::Cancelled,
        )
    }

    fn go_back(&mut self) -> StepOutcome {
        let Some(target) = self.state.back_target(self.fields.is_garbage()) else {
            // No back edge here; repeat what we are waiting for.
            return StepOutcome::reply(self.prompt_for_current());
        };
        self.state = target;
        let mut reply = self.prompt_for_current();
        reply.text = format!("↩️ Went back one step.\n\n{}", reply.text);
        StepOutcome::reply(reply)
    }

    /// The standard prompt for the current state, used for back navigation
    /// and for repeating the expectation on stray input.
    fn prompt_for_current(&self) -> Reply {
        match self.state {
            FormState::Idle => Reply::text("Send /start to file a new report."),
            FormState::AwaitingType => Reply::with_keyboard(
                "Please choose the problem type:",
                keyboards::complaint_type(),
            ),
            FormState::AwaitingMedia => media_prompt(false),
            FormState::AwaitingDescription => description_prompt(&self.fields, false),
            FormState::AwaitingRodentsChoice => rodents_prompt(self.fields.editing),
            FormState::AwaitingLocationChoice => location_choice_prompt(),
            FormState::AwaitingLocationGeo => geo_prompt(),
            FormState::AwaitingLocationAddress => address_prompt(),
            FormState::AwaitingName => name_prompt(false),
            FormState::AwaitingFeedbackChoice => feedback_prompt(None),
            FormState::AwaitingContactEmail => email_prompt(),
            FormState::AwaitingContactPhone => phone_prompt(),
            FormState::AwaitingConfirmation => Reply::text(
                "Please use the buttons under the summary to send or edit your report.",
            ),
        }
    }

    // ------------------------------------------------------------------
    // Per-state handlers
    // ------------------------------------------------------------------

    fn on_type(&mut self, event: FormEvent) -> StepOutcome {
        match event {
            FormEvent::Button(ButtonPayload::ReportType(kind)) => {
                self.fields.complaint_type = Some(kind);
                // A stale rodents answer must not survive switching away
                // from a garbage report.
                if !self.fields.is_garbage() {
                    self.fields.rodents_present = None;
                }
                self.state = FormState::AwaitingMedia;
                StepOutcome::reply(media_prompt(false))
            }
            _ => StepOutcome::reply(Reply::text(
                "Please <b>use the buttons above</b> to choose the problem type.",
            )),
        }
    }

    fn on_media(&mut self, event: FormEvent, limits: &MediaLimits) -> StepOutcome {
        let (kind, file, size_bytes) = match event {
            FormEvent::Media { kind, file, size_bytes } => (kind, file, size_bytes),
            _ => {
                return StepOutcome::reply(Reply::text(
                    "❗️ Please send <b>one photo, one video, or one video note</b> to continue.",
                ))
            }
        };

        if let Some(reject) = oversize_rejection(kind, size_bytes, limits) {
            return StepOutcome::reply(reject);
        }

        self.fields.attach_media(kind, file);
        if self.fields.editing {
            self.to_summary(Reply::text(format!("✅ {} updated.", kind.label())))
        } else {
            self.state = FormState::AwaitingDescription;
            StepOutcome::reply(description_prompt_after_media(kind, &self.fields))
        }
    }

    fn on_description(&mut self, event: FormEvent) -> StepOutcome {
        let text = match non_empty_text(&event) {
            Some(text) => text,
            None => {
                return StepOutcome::reply(Reply::text(
                    "❗️ Please type the <b>description as plain text</b>.",
                ))
            }
        };
        self.fields.description = Some(text);

        if self.fields.editing {
            self.to_summary(Reply::text("✅ Description updated."))
        } else if self.fields.is_garbage() {
            self.state = FormState::AwaitingRodentsChoice;
            StepOutcome::reply(Reply::with_keyboard(
                "📝 Description noted.\n\nOne follow-up: <b>have rodents (rats, mice) been \
                 seen</b> around the garbage site?",
                keyboards::rodents_choice(false),
            ))
        } else {
            self.state = FormState::AwaitingLocationChoice;
            StepOutcome::reply(Reply::with_keyboard(
                "📝 Description noted. Now tell me <b>where this is happening</b>.",
                keyboards::location_choice(),
            ))
        }
    }

    fn on_rodents(&mut self, event: FormEvent) -> StepOutcome {
        match event {
            FormEvent::Button(ButtonPayload::Rodents(present)) => {
                self.fields.rodents_present = Some(present);
                if self.fields.editing {
                    self.to_summary(Reply::text("✅ Rodents status updated."))
                } else {
                    self.state = FormState::AwaitingLocationChoice;
                    StepOutcome::reply(Reply::with_keyboard(
                        "Got it. Now tell me <b>where this is happening</b>.",
                        keyboards::location_choice(),
                    ))
                }
            }
            _ => StepOutcome::reply(Reply::text(
                "Please <b>use the Yes / No buttons</b> to answer.",
            )),
        }
    }

    fn on_location_choice(&mut self, event: FormEvent) -> StepOutcome {
        match event {
            FormEvent::Button(ButtonPayload::LocationChoice(LocationChoice::Geo)) => {
                self.state = FormState::AwaitingLocationGeo;
                StepOutcome::reply(geo_prompt())
            }
            FormEvent::Button(ButtonPayload::LocationChoice(LocationChoice::Address)) => {
                self.state = FormState::AwaitingLocationAddress;
                StepOutcome::reply(address_prompt())
            }
            _ => StepOutcome::reply(Reply::text(
                "Please <b>use the buttons above</b> to choose how to share the location.",
            )),
        }
    }

    fn on_location_geo(&mut self, event: FormEvent) -> StepOutcome {
        match event {
            FormEvent::Location { latitude, longitude } => {
                self.fields.location = Some(Location::Geo { latitude, longitude });
                if self.fields.editing {
                    self.to_summary(Reply::text("✅ Location updated."))
                } else {
                    self.state = FormState::AwaitingName;
                    StepOutcome::reply(name_prompt(true))
                }
            }
            _ => StepOutcome::reply(Reply::text(
                "❗️ That does not look like a location.\n\nPlease <b>attach a location</b> \
                 using the 📎 attachment menu.",
            )),
        }
    }

    fn on_location_address(&mut self, event: FormEvent) -> StepOutcome {
        let text = match non_empty_text(&event) {
            Some(text) => text,
            None => {
                return StepOutcome::reply(Reply::text(
                    "❗️ Please type the <b>address as plain text</b>.",
                ))
            }
        };
        self.fields.location = Some(Location::Address(text));
        if self.fields.editing {
            self.to_summary(Reply::text("✅ Address updated."))
        } else {
            self.state = FormState::AwaitingName;
            StepOutcome::reply(name_prompt(true))
        }
    }

    fn on_name(&mut self, event: FormEvent) -> StepOutcome {
        let text = match non_empty_text(&event) {
            Some(text) => text,
            None => {
                return StepOutcome::reply(Reply::text(
                    "❗️ Please type your <b>name as plain text</b>.",
                ))
            }
        };
        let safe_name = escape_markup(&text);
        self.fields.contact_name = Some(safe_name.clone());

        if self.fields.editing {
            if self.fields.wants_feedback == Some(true) {
                // Contact editing revisits the whole contact block.
                self.state = FormState::AwaitingContactEmail;
                let mut reply = email_prompt();
                reply.text = format!("✅ Name updated, {safe_name}!\n\n{}", reply.text);
                StepOutcome::reply(reply)
            } else {
                self.to_summary(Reply::text("✅ Name updated."))
            }
        } else {
            self.state = FormState::AwaitingFeedbackChoice;
            StepOutcome::reply(feedback_prompt(Some(&safe_name)))
        }
    }

    fn on_feedback_choice(&mut self, event: FormEvent) -> StepOutcome {
        match event {
            FormEvent::Button(ButtonPayload::Feedback(true)) => {
                self.fields.wants_feedback = Some(true);
                self.state = FormState::AwaitingContactEmail;
                StepOutcome::reply(email_prompt())
            }
            FormEvent::Button(ButtonPayload::Feedback(false)) => {
                self.fields.wants_feedback = Some(false);
                self.fields.clear_contacts();
                self.to_summary(Reply::text(
                    "Okay, no feedback needed.\n\nPreparing the summary of your report...",
                ))
            }
            _ => StepOutcome::reply(Reply::text(
                "Please <b>use the Yes / No buttons</b> to answer.",
            )),
        }
    }

    fn on_email(&mut self, event: FormEvent) -> StepOutcome {
        match event {
            FormEvent::Button(ButtonPayload::SkipEmail) => {
                self.fields.contact_email = None;
                self.state = FormState::AwaitingContactPhone;
                let mut reply = phone_prompt();
                reply.text = format!("📞 Email skipped.\n\n{}", reply.text);
                StepOutcome::reply(reply)
            }
            FormEvent::Text(text) if is_valid_email(&text) => {
                self.fields.contact_email = Some(text.trim().to_string());
                if self.fields.editing && self.fields.contact_phone.is_some() {
                    self.to_summary(Reply::text("✅ Email updated."))
                } else {
                    self.state = FormState::AwaitingContactPhone;
                    let mut reply = phone_prompt();
                    reply.text = format!("📞 Email accepted.\n\n{}", reply.text);
                    StepOutcome::reply(reply)
                }
            }
            FormEvent::Text(_) => StepOutcome::reply(Reply::text(
                "❗️ <b>Invalid email format.</b>\n\nPlease enter a valid email \
                 (for example, <i>example@mail.ru</i>).",
            )),
            _ => StepOutcome::reply(Reply::text(
                "❗️ Please enter your <b>email as plain text</b>, or skip it with the button.",
            )),
        }
    }

    fn on_phone(&mut self, event: FormEvent) -> StepOutcome {
        match event {
            FormEvent::Text(text) if is_valid_phone(&text) => {
                self.fields.contact_phone = Some(text.trim().to_string());
                self.to_summary(Reply::text(
                    "✅ Phone accepted.\n\nThank you! Everything is collected, let's double-check.",
                ))
            }
            FormEvent::Text(_) => StepOutcome::reply(Reply::text(
                "❗️ <b>Phone number not recognised.</b>\n\nPlease enter it as \
                 <b>+79991234567</b> or <b>89991234567</b>.",
            )),
            _ => StepOutcome::reply(Reply::text(
                "❗️ Please enter your <b>phone number as plain text</b>.",
            )),
        }
    }

    fn on_confirmation(&mut self, event: FormEvent) -> StepOutcome {
        match event {
            FormEvent::Button(ButtonPayload::ConfirmSend) => {
                // Feedback requested means at least one contact method.
                if self.fields.wants_feedback == Some(true) && !self.fields.has_contact_method() {
                    return StepOutcome::reply(Reply::text(
                        "❗️ You asked for feedback but provided neither an email nor a phone \
                         number. Please tap <b>Edit → Contact details</b> first.",
                    ));
                }
                self.fields.editing = false;
                StepOutcome::replies(
                    vec![Reply::text(
                        "✅ <b>Accepted!</b>\n\nThank you for your help. Sending your report...",
                    )],
                    StepAction::Submit,
                )
            }
            FormEvent::Button(ButtonPayload::ConfirmEdit) => {
                self.fields.editing = true;
                StepOutcome::reply(Reply::with_keyboard(
                    "✏️ <b>Which item would you like to change?</b>",
                    keyboards::edit_menu(self.fields.is_garbage()),
                ))
            }
            FormEvent::Button(ButtonPayload::Edit(target)) => {
                self.fields.editing = true;
                self.enter_edit_target(target)
            }
            _ => StepOutcome::reply(Reply::text(
                "Please use the buttons under the summary to send or edit your report.",
            )),
        }
    }

    fn enter_edit_target(&mut self, target: EditTarget) -> StepOutcome {
        match target {
            EditTarget::Media => {
                self.state = FormState::AwaitingMedia;
                StepOutcome::reply(media_prompt(true))
            }
            EditTarget::Description => {
                self.state = FormState::AwaitingDescription;
                StepOutcome::reply(Reply::with_keyboard(
                    "✍️ Please type a <b>new description</b> of the problem.",
                    keyboards::cancel_only(),
                ))
            }
            EditTarget::Rodents => {
                self.state = FormState::AwaitingRodentsChoice;
                StepOutcome::reply(rodents_prompt(true))
            }
            EditTarget::Location => {
                self.state = FormState::AwaitingLocationChoice;
                StepOutcome::reply(Reply::with_keyboard(
                    "🗺️ Please <b>choose how</b> to share the new location.",
                    keyboards::location_choice(),
                ))
            }
            EditTarget::FeedbackChoice => {
                self.state = FormState::AwaitingFeedbackChoice;
                StepOutcome::reply(Reply::with_keyboard(
                    "🔔 Would you like us to <b>tell you how this problem is resolved</b>?",
                    keyboards::feedback_choice(),
                ))
            }
            EditTarget::Contacts => {
                self.state = FormState::AwaitingName;
                StepOutcome::reply(Reply::with_keyboard(
                    "👤 Please type your <b>name</b>.",
                    keyboards::cancel_only(),
                ))
            }
        }
    }
}

// ----------------------------------------------------------------------
// Prompt builders
// ----------------------------------------------------------------------

fn media_prompt(editing: bool) -> Reply {
    if editing {
        Reply::with_keyboard(
            "📸 Please attach a <b>new photo, video, or video note</b>.",
            keyboards::cancel_only(),
        )
    } else {
        Reply::with_keyboard(
            "📸 Understood. Now please attach <b>one photo, video, or video note</b> \
             that captures the problem.",
            keyboards::back_cancel(),
        )
    }
}

fn description_example(fields: &FieldSet) -> &'static str {
    if fields.is_garbage() {
        "<i>For example: \"The containers have been overflowing for a week\".</i>"
    } else {
        "<i>For example: \"A strong chemical smell from the industrial area\".</i>"
    }
}

fn description_prompt(fields: &FieldSet, _editing: bool) -> Reply {
    Reply::with_keyboard(
        format!(
            "✍️ Please <b>describe the problem</b> in your own words.\n\n{}",
            description_example(fields)
        ),
        keyboards::back_cancel(),
    )
}

fn description_prompt_after_media(kind: MediaKind, fields: &FieldSet) -> Reply {
    Reply::with_keyboard(
        format!(
            "👍 {} received. Now please <b>describe the problem</b> in your own words.\n\n{}",
            kind.label(),
            description_example(fields)
        ),
        keyboards::back_cancel(),
    )
}

fn rodents_prompt(editing: bool) -> Reply {
    Reply::with_keyboard(
        "🐹 <b>Have rodents (rats, mice) been seen</b> around the garbage site?",
        keyboards::rodents_choice(editing),
    )
}

fn location_choice_prompt() -> Reply {
    Reply::with_keyboard(
        "How would you like to share the location?",
        keyboards::location_choice(),
    )
}

fn geo_prompt() -> Reply {
    Reply::with_keyboard(
        "You can <b>send your current location</b> (preferred) or pick a point on the map.\n\n\
         Tap 📎 → Location 📍 → \"Send my current location\".",
        keyboards::back_cancel(),
    )
}

fn address_prompt() -> Reply {
    Reply::with_keyboard(
        "Please <b>type the exact address</b> (city, street, building).",
        keyboards::back_cancel(),
    )
}

fn name_prompt(location_accepted: bool) -> Reply {
    let text = if location_accepted {
        "📍 Location noted.\n\nHow should I address you? (Type your <b>name</b>.)"
    } else {
        "Please type your <b>name</b>."
    };
    Reply::with_keyboard(text, keyboards::back_cancel())
}

fn feedback_prompt(name: Option<&str>) -> Reply {
    let text = match name {
        Some(name) => format!(
            "✅ Nice to meet you, {name}!\n\n🔔 Would you like us to <b>tell you how this \
             problem is resolved</b>?\n\n<i>(If yes, I will ask for an email and phone \
             number next.)</i>"
        ),
        None => "🔔 Would you like us to <b>tell you how this problem is resolved</b>?".to_string(),
    };
    Reply::with_keyboard(text, keyboards::feedback_choice())
}

fn email_prompt() -> Reply {
    Reply::with_keyboard(
        "📧 Please enter your <b>email address</b>.\n\n<i>For example: example@mail.ru\n\
         (You can skip this if you do not have one.)</i>",
        keyboards::skip_email(),
    )
}

fn phone_prompt() -> Reply {
    Reply::with_keyboard(
        "Now enter your <b>contact phone number</b>.\n\n<i>For example: +79991234567</i>",
        keyboards::back_cancel(),
    )
}

fn oversize_rejection(kind: MediaKind, size_bytes: u64, limits: &MediaLimits) -> Option<Reply> {
    match kind {
        MediaKind::Video if size_bytes > limits.video_max_bytes => Some(Reply::text(format!(
            "❗️ <b>The video is too large!</b>\n\nPlease attach a video no larger than \
             <b>{} MB</b>.",
            limits.video_max_mb()
        ))),
        MediaKind::VideoNote if size_bytes > limits.video_note_max_bytes => {
            Some(Reply::text(format!(
                "❗️ <b>The video note is too large!</b>\n\nA video note must not exceed \
                 <b>{} MB</b>. Try recording a shorter one.",
                limits.video_note_max_mb()
            )))
        }
        _ => None,
    }
}

fn non_empty_text(event: &FormEvent) -> Option<String> {
    match event {
        FormEvent::Text(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::ComplaintType;

    fn limits() -> MediaLimits {
        MediaLimits::default()
    }

    fn button(payload: ButtonPayload) -> FormEvent {
        FormEvent::Button(payload)
    }

    fn text(value: &str) -> FormEvent {
        FormEvent::Text(value.to_string())
    }

    fn photo(id: &str) -> FormEvent {
        FormEvent::Media {
            kind: MediaKind::Photo,
            file: FileRef(id.into()),
            size_bytes: 100_000,
        }
    }

    fn started() -> FormSession {
        let mut session = FormSession::new();
        session.handle(FormEvent::Start, &limits());
        session
    }

    #[test]
    fn test_start_resets_previous_form() {
        let mut session = started();
        session.handle(
            button(ButtonPayload::ReportType(ComplaintType::Garbage)),
            &limits(),
        );
        assert_eq!(session.state, FormState::AwaitingMedia);

        session.handle(FormEvent::Start, &limits());
        assert_eq!(session.state, FormState::AwaitingType);
        assert_eq!(session.fields, FieldSet::default());
    }

    #[test]
    fn test_wrong_input_type_reprompts_without_mutation() {
        let mut session = started();
        let before = session.clone();
        let outcome = session.handle(text("garbage please"), &limits());
        assert_eq!(session, before);
        assert_eq!(outcome.action, StepAction::None);
        assert!(outcome.replies[0].text.contains("use the buttons"));
    }

    #[test]
    fn test_air_pollution_happy_path_reaches_confirmation() {
        let mut session = started();
        let limits = limits();
        session.handle(button(ButtonPayload::ReportType(ComplaintType::AirPollution)), &limits);
        session.handle(photo("p1"), &limits);
        session.handle(text("smoke"), &limits);
        // Air pollution skips the rodents branch entirely.
        assert_eq!(session.state, FormState::AwaitingLocationChoice);
        session.handle(
            button(ButtonPayload::LocationChoice(LocationChoice::Address)),
            &limits,
        );
        session.handle(text("Main St 1"), &limits);
        session.handle(text("Ann"), &limits);
        let outcome = session.handle(button(ButtonPayload::Feedback(false)), &limits);

        assert_eq!(outcome.action, StepAction::ShowSummary);
        assert_eq!(session.fields.rodents_present, None);
        assert_eq!(session.fields.contact_email, None);
        assert_eq!(session.fields.contact_phone, None);
        assert!(session.fields.is_complete());
    }

    #[test]
    fn test_garbage_path_with_contact_validation() {
        let mut session = started();
        let limits = limits();
        session.handle(button(ButtonPayload::ReportType(ComplaintType::Garbage)), &limits);
        session.handle(
            FormEvent::Media {
                kind: MediaKind::Video,
                file: FileRef("v1".into()),
                size_bytes: 1_000_000,
            },
            &limits,
        );
        session.handle(text("overflow"), &limits);
        assert_eq!(session.state, FormState::AwaitingRodentsChoice);
        session.handle(button(ButtonPayload::Rodents(true)), &limits);
        session.handle(button(ButtonPayload::LocationChoice(LocationChoice::Geo)), &limits);
        session.handle(FormEvent::Location { latitude: 10.0, longitude: 20.0 }, &limits);
        session.handle(text("Bob"), &limits);
        session.handle(button(ButtonPayload::Feedback(true)), &limits);

        // Invalid email is rejected in place.
        let rejected = session.handle(text("foo"), &limits);
        assert_eq!(session.state, FormState::AwaitingContactEmail);
        assert!(rejected.replies[0].text.contains("Invalid email"));
        assert_eq!(session.fields.contact_email, None);

        session.handle(text("bob@mail.ru"), &limits);
        assert_eq!(session.state, FormState::AwaitingContactPhone);

        // Invalid phone is rejected in place.
        let rejected = session.handle(text("123"), &limits);
        assert_eq!(session.state, FormState::AwaitingContactPhone);
        assert!(rejected.replies[0].text.contains("not recognised"));

        let outcome = session.handle(text("+79991234567"), &limits);
        assert_eq!(outcome.action, StepAction::ShowSummary);
        assert_eq!(session.fields.rodents_present, Some(true));
        assert_eq!(session.fields.contact_email.as_deref(), Some("bob@mail.ru"));
        assert_eq!(session.fields.contact_phone.as_deref(), Some("+79991234567"));
    }

    #[test]
    fn test_video_at_cap_accepted_one_byte_over_rejected() {
        let limits = limits();
        let cap = limits.video_max_bytes;

        let mut session = started();
        session.handle(button(ButtonPayload::ReportType(ComplaintType::Garbage)), &limits);
        let over = session.handle(
            FormEvent::Media {
                kind: MediaKind::Video,
                file: FileRef("big".into()),
                size_bytes: cap + 1,
            },
            &limits,
        );
        assert_eq!(session.state, FormState::AwaitingMedia);
        assert!(session.fields.media.is_none());
        assert!(over.replies[0].text.contains(&format!("{} MB", limits.video_max_mb())));

        let at_cap = session.handle(
            FormEvent::Media {
                kind: MediaKind::Video,
                file: FileRef("ok".into()),
                size_bytes: cap,
            },
            &limits,
        );
        assert_eq!(session.state, FormState::AwaitingDescription);
        assert!(session.fields.media.is_some());
        assert_eq!(at_cap.action, StepAction::None);
    }

    #[test]
    fn test_video_note_has_its_own_cap() {
        let limits = limits();
        let mut session = started();
        session.handle(button(ButtonPayload::ReportType(ComplaintType::Garbage)), &limits);
        let over = session.handle(
            FormEvent::Media {
                kind: MediaKind::VideoNote,
                file: FileRef("note".into()),
                size_bytes: limits.video_note_max_bytes + 1,
            },
            &limits,
        );
        assert!(over.replies[0].text.contains(&format!("{} MB", limits.video_note_max_mb())));
        assert!(session.fields.media.is_none());
    }

    #[test]
    fn test_go_back_preserves_collected_values() {
        let mut session = started();
        let limits = limits();
        session.handle(button(ButtonPayload::ReportType(ComplaintType::Garbage)), &limits);
        session.handle(photo("p1"), &limits);
        session.handle(text("overflow"), &limits);
        assert_eq!(session.state, FormState::AwaitingRodentsChoice);

        session.handle(button(ButtonPayload::GoBack), &limits);
        assert_eq!(session.state, FormState::AwaitingDescription);
        assert_eq!(session.fields.description.as_deref(), Some("overflow"));
        assert!(session.fields.media.is_some());
    }

    #[test]
    fn test_back_from_location_choice_respects_branch() {
        let limits = limits();

        let mut garbage = started();
        garbage.handle(button(ButtonPayload::ReportType(ComplaintType::Garbage)), &limits);
        garbage.handle(photo("p1"), &limits);
        garbage.handle(text("x"), &limits);
        garbage.handle(button(ButtonPayload::Rodents(false)), &limits);
        garbage.handle(button(ButtonPayload::GoBack), &limits);
        assert_eq!(garbage.state, FormState::AwaitingRodentsChoice);

        let mut air = started();
        air.handle(button(ButtonPayload::ReportType(ComplaintType::AirPollution)), &limits);
        air.handle(photo("p1"), &limits);
        air.handle(text("x"), &limits);
        assert_eq!(air.state, FormState::AwaitingLocationChoice);
        air.handle(button(ButtonPayload::GoBack), &limits);
        assert_eq!(air.state, FormState::AwaitingDescription);
    }

    #[test]
    fn test_cancel_clears_everything_from_any_step() {
        let mut session = started();
        let limits = limits();
        session.handle(button(ButtonPayload::ReportType(ComplaintType::Garbage)), &limits);
        session.handle(photo("p1"), &limits);

        let outcome = session.handle(button(ButtonPayload::CancelAll), &limits);
        assert_eq!(outcome.action, StepAction::Cancelled);
        assert_eq!(session.state, FormState::Idle);
        assert_eq!(session.fields, FieldSet::default());
    }

    #[test]
    fn test_cancel_text_command() {
        let mut session = started();
        let outcome = session.handle(text("/cancel"), &limits());
        assert_eq!(outcome.action, StepAction::Cancelled);
        assert_eq!(session.state, FormState::Idle);
    }

    #[test]
    fn test_name_is_escaped_before_storage() {
        let mut session = started();
        let limits = limits();
        session.handle(button(ButtonPayload::ReportType(ComplaintType::AirPollution)), &limits);
        session.handle(photo("p1"), &limits);
        session.handle(text("smoke"), &limits);
        session.handle(button(ButtonPayload::LocationChoice(LocationChoice::Address)), &limits);
        session.handle(text("Main St 1"), &limits);
        session.handle(text("<b>Ann</b>"), &limits);
        assert_eq!(
            session.fields.contact_name.as_deref(),
            Some("&lt;b&gt;Ann&lt;/b&gt;")
        );
    }

    fn at_confirmation(feedback: bool) -> FormSession {
        let mut session = started();
        let limits = limits();
        session.handle(button(ButtonPayload::ReportType(ComplaintType::AirPollution)), &limits);
        session.handle(photo("p1"), &limits);
        session.handle(text("smoke"), &limits);
        session.handle(button(ButtonPayload::LocationChoice(LocationChoice::Address)), &limits);
        session.handle(text("Main St 1"), &limits);
        session.handle(text("Ann"), &limits);
        if feedback {
            session.handle(button(ButtonPayload::Feedback(true)), &limits);
            session.handle(text("ann@mail.ru"), &limits);
            session.handle(text("+79991234567"), &limits);
        } else {
            session.handle(button(ButtonPayload::Feedback(false)), &limits);
        }
        session.state = FormState::AwaitingConfirmation;
        session
    }

    #[test]
    fn test_edit_description_returns_to_confirmation() {
        let mut session = at_confirmation(false);
        let limits = limits();

        session.handle(button(ButtonPayload::ConfirmEdit), &limits);
        assert!(session.fields.editing);

        session.handle(button(ButtonPayload::Edit(EditTarget::Description)), &limits);
        assert_eq!(session.state, FormState::AwaitingDescription);

        let before = session.fields.clone();
        let outcome = session.handle(text("thick smoke at night"), &limits);
        assert_eq!(outcome.action, StepAction::ShowSummary);
        assert_eq!(
            session.fields.description.as_deref(),
            Some("thick smoke at night")
        );
        // Everything else is untouched.
        assert_eq!(session.fields.location, before.location);
        assert_eq!(session.fields.contact_name, before.contact_name);
        assert_eq!(session.fields.wants_feedback, before.wants_feedback);
    }

    #[test]
    fn test_submit_requires_contact_method_when_feedback_wanted() {
        let mut session = at_confirmation(true);
        let limits = limits();
        session.fields.contact_email = None;
        session.fields.contact_phone = None;

        let outcome = session.handle(button(ButtonPayload::ConfirmSend), &limits);
        assert_eq!(outcome.action, StepAction::None);
        assert_eq!(session.state, FormState::AwaitingConfirmation);
        assert!(outcome.replies[0].text.contains("neither an email nor a phone"));
    }

    #[test]
    fn test_submit_allows_single_contact_method() {
        let mut session = at_confirmation(true);
        session.fields.contact_email = None;

        let outcome = session.handle(button(ButtonPayload::ConfirmSend), &limits());
        assert_eq!(outcome.action, StepAction::Submit);
    }

    #[test]
    fn test_submit_without_feedback_needs_no_contacts() {
        let mut session = at_confirmation(false);
        let outcome = session.handle(button(ButtonPayload::ConfirmSend), &limits());
        assert_eq!(outcome.action, StepAction::Submit);
    }

    #[test]
    fn test_back_to_confirm_from_rodents_edit() {
        let mut session = at_confirmation(false);
        session.fields.complaint_type = Some(ComplaintType::Garbage);
        session.fields.rodents_present = Some(false);
        let limits = limits();

        session.handle(button(ButtonPayload::ConfirmEdit), &limits);
        session.handle(button(ButtonPayload::Edit(EditTarget::Rodents)), &limits);
        assert_eq!(session.state, FormState::AwaitingRodentsChoice);

        let outcome = session.handle(button(ButtonPayload::BackToConfirm), &limits);
        assert_eq!(outcome.action, StepAction::ShowSummary);
        assert_eq!(session.state, FormState::AwaitingConfirmation);
        assert!(!session.fields.editing);
        // The stored answer survives the aborted edit.
        assert_eq!(session.fields.rodents_present, Some(false));
    }

    #[test]
    fn test_editing_contacts_walks_email_then_phone() {
        let mut session = at_confirmation(true);
        let limits = limits();
        session.fields.contact_phone = None;

        session.handle(button(ButtonPayload::ConfirmEdit), &limits);
        session.handle(button(ButtonPayload::Edit(EditTarget::Contacts)), &limits);
        assert_eq!(session.state, FormState::AwaitingName);

        session.handle(text("Bob"), &limits);
        assert_eq!(session.state, FormState::AwaitingContactEmail);

        session.handle(text("bob@mail.ru"), &limits);
        // No phone stored yet, so editing continues to the phone step.
        assert_eq!(session.state, FormState::AwaitingContactPhone);

        let outcome = session.handle(text("89991234567"), &limits);
        assert_eq!(outcome.action, StepAction::ShowSummary);
    }

    #[test]
    fn test_editing_email_with_phone_present_returns_to_summary() {
        let mut session = at_confirmation(true);
        let limits = limits();

        session.handle(button(ButtonPayload::ConfirmEdit), &limits);
        session.handle(button(ButtonPayload::Edit(EditTarget::Contacts)), &limits);
        session.handle(text("Bob"), &limits);
        assert_eq!(session.state, FormState::AwaitingContactEmail);

        let outcome = session.handle(text("new@mail.ru"), &limits);
        assert_eq!(outcome.action, StepAction::ShowSummary);
        assert_eq!(session.fields.contact_email.as_deref(), Some("new@mail.ru"));
    }

    #[test]
    fn test_idle_ignores_everything_but_start() {
        let mut session = FormSession::new();
        let outcome = session.handle(text("hello"), &limits());
        assert_eq!(session.state, FormState::Idle);
        assert!(outcome.replies[0].text.contains("/start"));
    }

    #[test]
    fn test_go_home_restarts_from_anywhere() {
        let mut session = at_confirmation(true);
        let outcome = session.handle(button(ButtonPayload::GoHome), &limits());
        assert_eq!(session.state, FormState::AwaitingType);
        assert_eq!(session.fields, FieldSet::default());
        assert!(outcome.replies[0].text.contains("choose the problem type"));
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn arbitrary_event() -> impl Strategy<Value = FormEvent> {
            prop_oneof![
                Just(FormEvent::Start),
                Just(button(ButtonPayload::ReportType(ComplaintType::Garbage))),
                Just(button(ButtonPayload::ReportType(ComplaintType::AirPollution))),
                Just(button(ButtonPayload::LocationChoice(LocationChoice::Geo))),
                Just(button(ButtonPayload::LocationChoice(LocationChoice::Address))),
                Just(button(ButtonPayload::Feedback(true))),
                Just(button(ButtonPayload::Feedback(false))),
                Just(button(ButtonPayload::Rodents(true))),
                Just(button(ButtonPayload::Rodents(false))),
                Just(button(ButtonPayload::ConfirmSend)),
                Just(button(ButtonPayload::ConfirmEdit)),
                Just(button(ButtonPayload::Edit(EditTarget::Description))),
                Just(button(ButtonPayload::Edit(EditTarget::Contacts))),
                Just(button(ButtonPayload::BackToConfirm)),
                Just(button(ButtonPayload::SkipEmail)),
                Just(button(ButtonPayload::GoBack)),
                Just(button(ButtonPayload::CancelAll)),
                Just(button(ButtonPayload::GoHome)),
                "[a-z@. +0-9]{0,20}".prop_map(FormEvent::Text),
                (1u64..50_000_000).prop_map(|size| FormEvent::Media {
                    kind: MediaKind::Video,
                    file: FileRef("v".into()),
                    size_bytes: size,
                }),
                Just(photo("p")),
                (-90.0f64..90.0, -180.0f64..180.0)
                    .prop_map(|(latitude, longitude)| FormEvent::Location { latitude, longitude }),
            ]
        }

        proptest! {
            // Confirmation is unreachable while any required field is missing,
            // rodents only ever exist on garbage reports, and declining
            // feedback always drops the contact details.
            #[test]
            fn machine_invariants_hold(events in proptest::collection::vec(arbitrary_event(), 1..60)) {
                let limits = MediaLimits::default();
                let mut session = FormSession::new();
                for event in events {
                    session.handle(event, &limits);

                    if session.state == FormState::AwaitingConfirmation {
                        prop_assert!(session.fields.is_complete());
                    }
                    if !session.fields.is_garbage() {
                        prop_assert_eq!(session.fields.rodents_present, None);
                    }
                    if session.fields.wants_feedback == Some(false) {
                        prop_assert!(!session.fields.has_contact_method());
                    }
                }
            }
        }
    }
}
