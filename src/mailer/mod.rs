use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{error, info, warn};

use crate::config::SmtpConfig;
use crate::error::NotificationError;

/// Anything that can deliver a subject + body report
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, subject: &str, body: &str) -> Result<(), NotificationError>;
}

/// Send a report, logging and swallowing any delivery failure
pub async fn notify(notifier: &dyn Notifier, subject: &str, body: &str) {
    if let Err(e) = notifier.send(subject, body).await {
        error!("Failed to send \"{}\": {}", subject, e);
    }
}

struct SmtpRoute {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Mailbox,
}

/// SMTP notifier. Without complete SMTP settings every send is skipped with a warning.
pub struct Mailer {
    route: Option<SmtpRoute>,
}

impl Mailer {
    pub fn new(smtp: Option<&SmtpConfig>) -> Result<Self, NotificationError> {
        let route = match smtp {
            Some(smtp) => {
                let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&smtp.host)?
                    .port(smtp.port)
                    .credentials(Credentials::new(
                        smtp.username.clone(),
                        smtp.password.clone(),
                    ))
                    .build();
                Some(SmtpRoute {
                    transport,
                    from: smtp.from.parse()?,
                    to: smtp.to.parse()?,
                })
            }
            None => {
                warn!("SMTP settings incomplete, notifications will only be logged");
                None
            }
        };

        Ok(Self { route })
    }

    /// A mailer that never sends
    pub fn disabled() -> Self {
        Self { route: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.route.is_some()
    }
}

impl std::fmt::Debug for Mailer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mailer")
            .field("enabled", &self.is_enabled())
            .finish()
    }
}

#[async_trait]
impl Notifier for Mailer {
    async fn send(&self, subject: &str, body: &str) -> Result<(), NotificationError> {
        let Some(route) = &self.route else {
            warn!("Mail not configured, skipping \"{}\"", subject);
            return Ok(());
        };

        let message = Message::builder()
            .from(route.from.clone())
            .to(route.to.clone())
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())?;

        route.transport.send(message).await?;
        info!("EMail sent: {}", subject);
        Ok(())
    }
}
