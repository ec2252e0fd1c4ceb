//! The async engine driving the form machine.
//!
//! One engine serves every chat. [`Engine::run`] funnels each chat's events
//! through a dedicated worker task in arrival order, and every transition
//! additionally holds that chat's session lock; distinct chats proceed
//! concurrently. The engine owns all side effects:
//! sending prompts, rendering the confirmation summary, delivering the
//! finished report to the review channel, and firing the notification email
//! as a detached task.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use ecoreport_core::{
    keyboards, render_summary, report_caption, ButtonPayload, FieldSet, FormEvent, FormSession,
    Location, MediaLimits, MessageRef, Reply, StepAction,
};

use crate::mailer::{compose_report_email, EmailAttachment, Mailer};
use crate::session::SessionStore;
use crate::transport::{ChatError, ChatEvent, ChatEventKind, ChatId, ChatTransport};

const SUBMIT_OK: &str = "✅ Thank you! Your report has been submitted for review.";
const SUBMIT_FAILED: &str =
    "⚠️ Something went wrong while submitting your report. Please try again later.";

/// Shared engine handle. Cloning is cheap; all clones serve the same
/// session store.
#[derive(Clone)]
pub struct Engine {
    transport: Arc<dyn ChatTransport>,
    mailer: Option<Arc<dyn Mailer>>,
    sessions: SessionStore,
    review_channel: ChatId,
    limits: MediaLimits,
}

impl Engine {
    pub fn new(
        transport: Arc<dyn ChatTransport>,
        mailer: Option<Arc<dyn Mailer>>,
        review_channel: ChatId,
        limits: MediaLimits,
        session_idle_ttl: Duration,
    ) -> Self {
        Self {
            transport,
            mailer,
            sessions: SessionStore::new(session_idle_ttl),
            review_channel,
            limits,
        }
    }

    /// Consume events until the channel closes.
    ///
    /// Each chat gets its own worker task fed in arrival order, so one
    /// user's events are processed to completion strictly sequentially
    /// while distinct chats run concurrently.
    pub async fn run(self, mut events: mpsc::Receiver<ChatEvent>) {
        let mut workers: HashMap<i64, mpsc::Sender<ChatEvent>> = HashMap::new();
        while let Some(event) = events.recv().await {
            let chat = event.chat;
            let delivered = workers
                .entry(chat.0)
                .or_insert_with(|| self.spawn_worker(chat))
                .send(event)
                .await
                .is_ok();
            if !delivered {
                // Worker died with its queue; the next event recreates it.
                warn!(%chat, "conversation worker gone, event dropped");
                workers.remove(&chat.0);
            }
        }
    }

    fn spawn_worker(&self, chat: ChatId) -> mpsc::Sender<ChatEvent> {
        let (tx, mut rx) = mpsc::channel::<ChatEvent>(32);
        let engine = self.clone();
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                if let Err(err) = engine.handle_event(event).await {
                    error!(%chat, %err, "event handling failed");
                }
            }
        });
        tx
    }

    /// Apply one inbound event and deliver whatever it produces.
    pub async fn handle_event(&self, event: ChatEvent) -> Result<(), ChatError> {
        let ChatEvent { chat, reporter, kind } = event;

        // Button presses update the message that carried the button instead
        // of stacking a new prompt under it.
        let edit_anchor = match &kind {
            ChatEventKind::Button { message, .. } => Some(*message),
            _ => None,
        };
        let form_event = match self.map_event(chat, kind) {
            Some(event) => event,
            None => return Ok(()),
        };

        let session = self.sessions.get_or_create(chat).await;
        let mut session = session.lock().await;

        let outcome = session.handle(form_event, &self.limits);
        let mut anchor = edit_anchor;
        for reply in &outcome.replies {
            match anchor.take() {
                Some(message) => self.edit_or_send(chat, message, reply).await?,
                None => self.send_reply(chat, reply).await?,
            }
        }

        let delivered = match outcome.action {
            StepAction::None | StepAction::Cancelled => Ok(()),
            StepAction::ShowSummary => self.show_summary(chat, &mut session).await,
            StepAction::Submit => self.submit(chat, &reporter, &mut session).await,
        };

        // Submission and cancellation end the conversation; drop the stored
        // session so the next event starts from a fresh one. This must happen
        // even when the submit-path notification failed, or a delivered
        // report could be resubmitted from the stale confirmation step.
        if matches!(outcome.action, StepAction::Submit | StepAction::Cancelled) {
            drop(session);
            self.sessions.remove(chat).await;
        }
        delivered
    }

    fn map_event(&self, chat: ChatId, kind: ChatEventKind) -> Option<FormEvent> {
        match kind {
            ChatEventKind::Command(command) => match command.as_str() {
                "/start" => Some(FormEvent::Start),
                // /cancel and unknown commands reach the machine as text;
                // it cancels or re-prompts in place.
                _ => Some(FormEvent::Text(command)),
            },
            ChatEventKind::Button { data, .. } => match ButtonPayload::parse(&data) {
                Ok(payload) => Some(FormEvent::Button(payload)),
                Err(err) => {
                    warn!(%chat, %err, "ignoring button press");
                    None
                }
            },
            ChatEventKind::Text(text) => Some(FormEvent::Text(text)),
            ChatEventKind::Media { kind, file, size_bytes } => {
                Some(FormEvent::Media { kind, file, size_bytes })
            }
            ChatEventKind::Location { latitude, longitude } => {
                Some(FormEvent::Location { latitude, longitude })
            }
        }
    }

    async fn send_reply(&self, chat: ChatId, reply: &Reply) -> Result<(), ChatError> {
        self.transport
            .send_message(chat, &reply.text, reply.keyboard.as_ref())
            .await?;
        Ok(())
    }

    /// Edit in place when possible; the anchor message may be too old to
    /// edit, in which case a fresh message is sent.
    async fn edit_or_send(
        &self,
        chat: ChatId,
        message: MessageRef,
        reply: &Reply,
    ) -> Result<(), ChatError> {
        match self
            .transport
            .edit_message(chat, message, &reply.text, reply.keyboard.as_ref())
            .await
        {
            Ok(()) => Ok(()),
            Err(err) => {
                debug!(%chat, %err, "edit failed, sending instead");
                self.send_reply(chat, reply).await
            }
        }
    }

    /// Render the confirmation summary: retract the previous rendering
    /// (media preview and summary text) first, then re-send the media if
    /// any and the summary text with its keyboard.
    async fn show_summary(
        &self,
        chat: ChatId,
        session: &mut FormSession,
    ) -> Result<(), ChatError> {
        self.retract_summary(chat, session).await;

        let summary = render_summary(&session.fields);
        if let Some(media) = &summary.media {
            let preview = self.transport.send_media(chat, media, None).await?;
            session.fields.media_preview = Some(preview);
        }
        let message = self
            .transport
            .send_message(chat, &summary.text, Some(&keyboards::confirmation()))
            .await?;
        session.fields.summary_message = Some(message);
        Ok(())
    }

    /// Delete the previously rendered summary messages. Either may have been
    /// deleted by the user already; failures are ignored.
    async fn retract_summary(&self, chat: ChatId, session: &mut FormSession) {
        if let Some(preview) = session.fields.media_preview.take() {
            if let Err(err) = self.transport.delete_message(chat, preview).await {
                debug!(%chat, %err, "stale media preview not deleted");
            }
        }
        if let Some(message) = session.fields.summary_message.take() {
            if let Err(err) = self.transport.delete_message(chat, message).await {
                debug!(%chat, %err, "stale summary message not deleted");
            }
        }
    }

    /// Deliver the report: review channel on the critical path, email
    /// detached. The caller discards the session either way, so the user
    /// never gets stuck in a submitted form.
    async fn submit(
        &self,
        chat: ChatId,
        reporter: &str,
        session: &mut FormSession,
    ) -> Result<(), ChatError> {
        if let Some(preview) = session.fields.media_preview.take() {
            if let Err(err) = self.transport.delete_message(chat, preview).await {
                debug!(%chat, %err, "stale media preview not deleted");
            }
        }

        let fields = session.fields.clone();
        match self.deliver_to_channel(&fields, reporter).await {
            Ok(()) => {
                info!(%chat, "report delivered to review channel");
                self.spawn_email(fields, reporter.to_string());
                self.send_reply(chat, &Reply::text(SUBMIT_OK)).await?;
            }
            Err(err) => {
                error!(%chat, %err, "review channel delivery failed");
                self.send_reply(chat, &Reply::text(SUBMIT_FAILED)).await?;
            }
        }
        Ok(())
    }

    async fn deliver_to_channel(&self, fields: &FieldSet, reporter: &str) -> Result<(), ChatError> {
        let caption = report_caption(fields, reporter);
        match &fields.media {
            Some(media) => {
                self.transport
                    .send_media(self.review_channel, media, Some(&caption))
                    .await?;
            }
            None => {
                self.transport
                    .send_message(self.review_channel, &caption, None)
                    .await?;
            }
        }
        if let Some(Location::Geo { latitude, longitude }) = fields.location {
            self.transport
                .send_location(self.review_channel, latitude, longitude)
                .await?;
        }
        Ok(())
    }

    /// Fire the notification email without joining it. Failures are logged
    /// and never surface to the user.
    fn spawn_email(&self, fields: FieldSet, reporter: String) {
        let mailer = match &self.mailer {
            Some(mailer) => Arc::clone(mailer),
            None => {
                debug!("email delivery disabled, skipping notification");
                return;
            }
        };
        let transport = Arc::clone(&self.transport);
        tokio::spawn(async move {
            let attachment = match &fields.media {
                Some(media) => match transport.download_file(&media.file).await {
                    Ok(download) => Some(EmailAttachment {
                        file_name: download.file_name,
                        bytes: download.bytes,
                    }),
                    Err(err) => {
                        warn!(%err, "media download failed, emailing without attachment");
                        None
                    }
                },
                None => None,
            };
            let message = compose_report_email(&fields, &reporter, Utc::now(), attachment);
            if let Err(err) = mailer.send(message).await {
                warn!(%err, "notification email failed");
            }
        });
    }
}
