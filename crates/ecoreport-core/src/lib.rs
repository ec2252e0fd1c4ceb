//! # ecoreport-core
//!
//! Deterministic conversational form engine for environmental-complaint
//! reports.
//!
//! The crate walks a user through an ordered field sequence (complaint type,
//! media, description, an optional rodents question, location, contact
//! details), supports backward navigation, cancellation, and an edit
//! sub-graph from the confirmation summary, and guarantees the collected
//! field set is internally consistent before a report is considered
//! complete.
//!
//! ## Key guarantees
//!
//! 1. **Deterministic**: same state, field set, and event always produce the
//!    same transition.
//! 2. **No I/O**: the machine returns replies and actions; delivery lives in
//!    `ecoreport-runtime`.
//! 3. **No invalid advance**: a state only changes on its expected input
//!    type, after validation.
//!
//! ## Example
//!
//! ```rust,ignore
//! use ecoreport_core::{FormEvent, FormSession, MediaLimits, StepAction};
//!
//! let mut session = FormSession::new();
//! let limits = MediaLimits::default();
//! let outcome = session.handle(FormEvent::Start, &limits);
//! for reply in outcome.replies {
//!     println!("{}", reply.text);
//! }
//! ```

pub mod event;
pub mod fields;
pub mod keyboards;
pub mod machine;
pub mod state;
pub mod summary;
pub mod validate;

// Re-export main types at crate root
pub use event::{ButtonPayload, EditTarget, FormEvent, LocationChoice, UnknownPayload, CANCEL_TEXT};
pub use fields::{
    ComplaintType, FieldSet, FileRef, Location, MediaAttachment, MediaKind, MessageRef,
};
pub use keyboards::{Button, Keyboard};
pub use machine::{FormSession, Reply, StepAction, StepOutcome};
pub use state::FormState;
pub use summary::{render_summary, report_caption, Summary};
pub use validate::{escape_markup, is_valid_email, is_valid_phone, MediaLimits};
