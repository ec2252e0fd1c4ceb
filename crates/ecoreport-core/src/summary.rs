//! Confirmation summary and review-channel caption rendering.
//!
//! Both renderers read only the non-transient fields and escape every
//! user-supplied value. Rendering the same field set twice produces
//! identical text.

use crate::fields::{FieldSet, Location, MediaAttachment};
use crate::validate::escape_markup;

/// A rendered confirmation preview: the summary text plus the media to show
/// above it, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub text: String,
    pub media: Option<MediaAttachment>,
}

fn location_line(fields: &FieldSet) -> String {
    match &fields.location {
        Some(Location::Geo { latitude, longitude }) => {
            format!("✅ Geo marker: ({latitude:.5}, {longitude:.5})")
        }
        Some(Location::Address(text)) => format!("✅ Address: {}", escape_markup(text)),
        None => "❌ Not provided".to_string(),
    }
}

/// Render the confirmation summary shown before submission.
pub fn render_summary(fields: &FieldSet) -> Summary {
    let type_line = fields
        .complaint_type
        .map(|kind| kind.label().to_string())
        .unwrap_or_else(|| "Not chosen".to_string());

    let media_line = match &fields.media {
        Some(media) => format!("✅ {} attached (see above)", media.kind.label()),
        None => "❌ Not attached".to_string(),
    };

    let description = fields
        .description
        .as_deref()
        .map(escape_markup)
        .unwrap_or_else(|| "Not provided".to_string());

    let mut contact_lines = vec![format!(
        "<b>Name:</b> {}",
        fields
            .contact_name
            .clone()
            .unwrap_or_else(|| "⚠️ <b>Not provided</b>".to_string())
    )];
    match fields.wants_feedback {
        Some(true) => {
            let email = fields
                .contact_email
                .as_deref()
                .map(escape_markup)
                .unwrap_or_else(|| "⚠️ <b>Not provided</b>".to_string());
            let phone = fields
                .contact_phone
                .as_deref()
                .map(escape_markup)
                .unwrap_or_else(|| "⚠️ <b>Not provided</b>".to_string());
            contact_lines.push("Feedback: <b>Required</b>".to_string());
            contact_lines.push(format!("<b>Email:</b> {email}"));
            contact_lines.push(format!("<b>Phone:</b> {phone}"));
        }
        Some(false) => contact_lines.push("Feedback: <b>Not required</b>".to_string()),
        None => contact_lines.push("<i>(Feedback preference not chosen)</i>".to_string()),
    }

    let mut parts = vec![
        "<b>🔍 Please review and confirm your report:</b>\n".to_string(),
        format!("<b>Type:</b> {type_line}"),
        format!("<b>Media:</b> {media_line}"),
        format!("<b>Description:</b>\n{description}"),
    ];
    if fields.is_garbage() {
        if let Some(rodents) = fields.rodents_present {
            parts.push(format!(
                "<b>🐹 Rodents present:</b> {}",
                if rodents { "Yes" } else { "No" }
            ));
        }
    }
    parts.push(format!("<b>Location:</b> {}", location_line(fields)));
    parts.push(format!("\n<b>Contacts:</b>\n{}", contact_lines.join("\n")));

    Summary {
        text: parts.join("\n\n"),
        media: fields.media.clone(),
    }
}

/// Compose the review-channel caption embedding all collected fields.
///
/// `reporter` identifies the submitting chat user (username or id tag).
pub fn report_caption(fields: &FieldSet, reporter: &str) -> String {
    let type_label = fields
        .complaint_type
        .map(|kind| kind.label())
        .unwrap_or("Unspecified");

    let mut parts = vec![
        format!("🚨 <b>New report: {type_label}</b>"),
        format!("From: {}", escape_markup(reporter)),
        format!(
            "<b>Name:</b> {}",
            fields.contact_name.clone().unwrap_or_else(|| "Not provided".to_string())
        ),
    ];

    if fields.wants_feedback == Some(true) {
        parts.push("<b>Feedback: <u>Required</u></b>".to_string());
        parts.push(format!(
            "<b>Phone:</b> {}",
            fields.contact_phone.as_deref().map(escape_markup).unwrap_or_default()
        ));
        parts.push(format!(
            "<b>Email:</b> {}",
            fields.contact_email.as_deref().map(escape_markup).unwrap_or_default()
        ));
    } else {
        parts.push("<i>Feedback not required</i>".to_string());
    }

    parts.push(format!(
        "<b>Description:</b>\n{}",
        fields.description.as_deref().map(escape_markup).unwrap_or_else(|| "Not provided".into())
    ));

    if fields.is_garbage() {
        if let Some(rodents) = fields.rodents_present {
            parts.push(format!(
                "<b>🐹 Rodents present:</b> {}",
                if rodents { "Yes" } else { "No" }
            ));
        }
    }

    match &fields.location {
        Some(Location::Geo { .. }) => {
            parts.push("<b>Location:</b> Geo marker (see below)".to_string());
        }
        Some(Location::Address(text)) => {
            parts.push(format!("<b>Address (manual):</b>\n{}", escape_markup(text)));
        }
        None => {}
    }

    parts.join("\n\n")
}
