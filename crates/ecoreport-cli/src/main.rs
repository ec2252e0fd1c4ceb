//! Console front end for the report wizard.
//!
//! Drives the full conversation engine against a terminal transport, so the
//! whole flow (including review-channel delivery and the email path) can be
//! exercised without a chat platform. Configuration comes from the same
//! environment variables the hosted bot uses; for a local run:
//!
//! ```text
//! BOT_TOKEN=console REVIEW_CHANNEL_ID=-100 ecoreport
//! ```

mod console;

use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use clap::Parser;
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ecoreport_runtime::{
    AppConfig, EmailMessage, Engine, MailError, Mailer, SmtpConfig,
};

use crate::console::{parse_line, ConsoleTransport};

#[derive(Parser, Debug)]
#[command(
    name = "ecoreport",
    about = "Conversational wizard for filing environmental reports",
    version
)]
struct Cli {
    /// Validate the environment configuration and exit.
    #[arg(long)]
    check_config: bool,
}

/// Stand-in mail sink for console runs: logs the submission instead of
/// talking to an SMTP relay.
struct LogMailer {
    recipient: String,
}

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: EmailMessage) -> Result<(), MailError> {
        info!(
            recipient = %self.recipient,
            subject = %message.subject,
            body_bytes = message.html_body.len(),
            attachment = message.attachment.is_some(),
            "email composed"
        );
        Ok(())
    }
}

fn mailer_from(smtp: &Option<SmtpConfig>) -> Option<Arc<dyn Mailer>> {
    smtp.as_ref().map(|smtp| {
        Arc::new(LogMailer { recipient: smtp.recipient.clone() }) as Arc<dyn Mailer>
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ecoreport=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = AppConfig::from_env().context("loading configuration")?;

    if cli.check_config {
        println!("review channel: {}", config.review_channel);
        println!(
            "email delivery: {}",
            if config.smtp.is_some() { "enabled" } else { "disabled" }
        );
        println!(
            "video cap: {} MB, video note cap: {} MB",
            config.media_limits.video_max_mb(),
            config.media_limits.video_note_max_mb()
        );
        return Ok(());
    }

    let transport = Arc::new(ConsoleTransport::new());
    let mailer = mailer_from(&config.smtp);
    let engine = Engine::new(
        Arc::clone(&transport) as Arc<dyn ecoreport_runtime::ChatTransport>,
        mailer,
        config.review_channel,
        config.media_limits,
        config.session_idle_ttl,
    );

    info!(review_channel = %config.review_channel, "console wizard ready, send /start");

    let (tx, rx) = mpsc::channel(32);
    let reader = {
        let transport = Arc::clone(&transport);
        std::thread::spawn(move || {
            let stdin = std::io::stdin();
            let mut line = String::new();
            loop {
                line.clear();
                match stdin.read_line(&mut line) {
                    Ok(0) | Err(_) => break,
                    Ok(_) => {
                        if let Some(event) = parse_line(&transport, &line) {
                            if tx.blocking_send(event).is_err() {
                                break;
                            }
                        }
                    }
                }
            }
        })
    };

    engine.run(rx).await;
    let _ = reader.join();
    Ok(())
}
