//! Email composition and the mail submission seam.
//!
//! The engine composes one [`EmailMessage`] per submission (HTML body,
//! optional attachment) and hands it to a [`Mailer`]. Actual SMTP dispatch
//! is an implementation detail behind the trait; the engine only ever
//! fires it as a detached task and logs failures.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use ecoreport_core::{escape_markup, FieldSet, Location};

/// Errors from mail submission.
#[derive(Error, Debug)]
pub enum MailError {
    #[error("mail submission failed: {0}")]
    Submission(String),
}

/// A single attachment carried by the email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailAttachment {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// One outbound email per submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub subject: String,
    pub html_body: String,
    pub attachment: Option<EmailAttachment>,
}

/// Mail submission seam. Implementations authenticate against the
/// configured SMTP relay; tests record instead.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: EmailMessage) -> Result<(), MailError>;
}

/// Compose the notification email for a completed report.
///
/// All user-supplied values are escaped; the body mirrors the review-channel
/// caption but as an HTML document with a map link for geo locations.
pub fn compose_report_email(
    fields: &FieldSet,
    reporter: &str,
    submitted_at: DateTime<Utc>,
    attachment: Option<EmailAttachment>,
) -> EmailMessage {
    let type_label = fields
        .complaint_type
        .map(|kind| kind.label())
        .unwrap_or("Unspecified");
    let name = fields
        .contact_name
        .clone()
        .unwrap_or_else(|| "Not provided".to_string());
    let description = fields
        .description
        .as_deref()
        .map(escape_markup)
        .unwrap_or_else(|| "No description".to_string())
        .replace('\n', "<br>");

    let location_html = match &fields.location {
        Some(Location::Geo { latitude, longitude }) => format!(
            "<a href=\"https://maps.google.com/?q={latitude},{longitude}\">\
             Open on the map (geo marker)</a>"
        ),
        Some(Location::Address(text)) => {
            format!("<b>Address (manual):</b> {}", escape_markup(text))
        }
        None => "Not provided".to_string(),
    };

    let mut body = format!(
        "<html>\n<body>\n\
         <h2>🚨 New report: {type_label}</h2>\n\
         <p><strong>From user:</strong> {}</p>\n\
         <p><strong>Submitted:</strong> {}</p>\n\
         <h3>Problem description:</h3>\n\
         <p>{description}</p>\n",
        escape_markup(reporter),
        submitted_at.format("%Y-%m-%d %H:%M UTC"),
    );

    if fields.is_garbage() {
        if let Some(rodents) = fields.rodents_present {
            body.push_str(&format!(
                "<p><strong>Rodents present:</strong> {}</p>\n",
                if rodents { "Yes" } else { "No" }
            ));
        }
    }

    body.push_str("<h3>Contact details:</h3>\n<ul>\n");
    body.push_str(&format!("<li><strong>Name:</strong> {name}</li>\n"));
    if fields.wants_feedback == Some(true) {
        let phone = fields
            .contact_phone
            .as_deref()
            .map(escape_markup)
            .unwrap_or_else(|| "Not provided".to_string());
        let email = fields
            .contact_email
            .as_deref()
            .map(escape_markup)
            .unwrap_or_else(|| "Not provided".to_string());
        body.push_str("<li><strong><u>Feedback: required</u></strong></li>\n");
        body.push_str(&format!("<li><strong>Phone:</strong> {phone}</li>\n"));
        body.push_str(&format!("<li><strong>Email:</strong> {email}</li>\n"));
    } else {
        body.push_str("<li><i>Feedback not required</i></li>\n");
    }
    body.push_str("</ul>\n");

    body.push_str(&format!(
        "<h3>Location:</h3>\n<p>{location_html}</p>\n</body>\n</html>\n"
    ));

    EmailMessage {
        subject: format!("New report ({type_label}) from {name}"),
        html_body: body,
        attachment,
    }
}
