//! Ticket delivery by email.
//!
//! Uses SMTP via lettre with Askama templates for the HTML and plain text
//! alternatives. Each call opens one session and submits one message; there
//! is no retry.

use std::future::Future;
use std::sync::Arc;

use askama::Template;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, MultiPart, SinglePart, header::ContentType},
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use secrecy::ExposeSecret;
use thiserror::Error;
use tracing::instrument;
use url::Url;

use pycontg_core::Email;

use crate::config::{EmailConfig, SmtpTls, TicketConfig};

/// HTML body of the ticket email.
#[derive(Template)]
#[template(path = "email/ticket.html")]
struct TicketEmailHtml<'a> {
    name: &'a str,
    event: &'a str,
    ticket_url: &'a str,
    sender: &'a str,
}

/// Plain text body of the ticket email.
#[derive(Template)]
#[template(path = "email/ticket.txt")]
struct TicketEmailText<'a> {
    name: &'a str,
    event: &'a str,
    ticket_url: &'a str,
    sender: &'a str,
}

/// Errors that can occur when delivering a ticket.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// Sender or recipient is not a valid mailbox.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// Template rendering error.
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),

    /// Failed to build email message.
    #[error("Failed to build message: {0}")]
    Message(#[from] lettre::error::Error),

    /// The relay refused the credentials.
    #[error("SMTP authentication failed: {0}")]
    Authentication(String),

    /// The relay answered with a refusal (e.g. recipient rejected).
    #[error("SMTP server rejected the message ({code}): {message}")]
    Rejected { code: String, message: String },

    /// The relay could not be reached or the session broke down.
    #[error("SMTP connection failed: {0}")]
    Connection(String),
}

impl From<SmtpError> for DeliveryError {
    fn from(err: SmtpError) -> Self {
        match err.status() {
            Some(code) => {
                let code = code.to_string();
                // 530, 534 and 535 are the authentication replies.
                if code.starts_with("53") {
                    Self::Authentication(err.to_string())
                } else {
                    Self::Rejected {
                        code,
                        message: err.to_string(),
                    }
                }
            }
            None => Self::Connection(err.to_string()),
        }
    }
}

/// Sends the ticket link to a registrant.
pub trait NotificationDispatcher: Send + Sync {
    /// Deliver one message linking to `ticket_url`. Exactly one attempt.
    fn dispatch(
        &self,
        recipient_name: &str,
        recipient_email: &Email,
        ticket_url: &Url,
    ) -> impl Future<Output = Result<(), DeliveryError>> + Send;
}

impl<T: NotificationDispatcher> NotificationDispatcher for Arc<T> {
    fn dispatch(
        &self,
        recipient_name: &str,
        recipient_email: &Email,
        ticket_url: &Url,
    ) -> impl Future<Output = Result<(), DeliveryError>> + Send {
        (**self).dispatch(recipient_name, recipient_email, ticket_url)
    }
}

/// Builds ticket messages. Split from the transport so it can be tested offline.
#[derive(Debug, Clone)]
pub struct TicketMessageBuilder {
    from: Mailbox,
    event: String,
}

impl TicketMessageBuilder {
    /// Create a builder sending as `from_name <from_address>`.
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryError::InvalidAddress`] if the sender address is invalid.
    pub fn new(email: &EmailConfig, ticket: &TicketConfig) -> Result<Self, DeliveryError> {
        let address = email
            .from_address
            .parse()
            .map_err(|_| DeliveryError::InvalidAddress(email.from_address.clone()))?;
        Ok(Self {
            from: Mailbox::new(Some(email.from_name.clone()), address),
            event: format!("{} {}", ticket.event_name, ticket.event_year),
        })
    }

    /// Subject line, bilingual.
    #[must_use]
    pub fn subject(&self) -> String {
        format!("🎫 Your Ticket | Votre ticket pour le {}", self.event)
    }

    /// Build the `multipart/alternative` message.
    ///
    /// # Errors
    ///
    /// Returns an error if the recipient is invalid, a template fails to
    /// render, or the message cannot be assembled.
    pub fn build(
        &self,
        recipient_name: &str,
        recipient_email: &Email,
        ticket_url: &Url,
    ) -> Result<Message, DeliveryError> {
        let to = recipient_email
            .as_str()
            .parse()
            .map_err(|_| DeliveryError::InvalidAddress(recipient_email.to_string()))?;
        let sender = self.from.name.as_deref().unwrap_or_default();

        let html = TicketEmailHtml {
            name: recipient_name,
            event: &self.event,
            ticket_url: ticket_url.as_str(),
            sender,
        }
        .render()?;
        let text = TicketEmailText {
            name: recipient_name,
            event: &self.event,
            ticket_url: ticket_url.as_str(),
            sender,
        }
        .render()?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(Mailbox::new(Some(recipient_name.to_string()), to))
            .subject(self.subject())
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(text),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html),
                    ),
            )?;
        Ok(message)
    }
}

/// SMTP-backed [`NotificationDispatcher`].
#[derive(Clone)]
pub struct SmtpDispatcher {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    messages: TicketMessageBuilder,
}

impl SmtpDispatcher {
    /// Create a dispatcher from configuration.
    ///
    /// No connection is opened until the first dispatch.
    ///
    /// # Errors
    ///
    /// Returns an error if the relay host is invalid or the sender address is invalid.
    pub fn new(email: &EmailConfig, ticket: &TicketConfig) -> Result<Self, DeliveryError> {
        let credentials = Credentials::new(
            email.smtp_username.clone(),
            email.smtp_password.expose_secret().to_string(),
        );

        let builder = match email.tls {
            SmtpTls::Implicit => AsyncSmtpTransport::<Tokio1Executor>::relay(&email.smtp_host),
            SmtpTls::StartTls => {
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&email.smtp_host)
            }
        }
        .map_err(|e| DeliveryError::Connection(e.to_string()))?;

        let mailer = builder
            .port(email.smtp_port)
            .credentials(credentials)
            .build();

        Ok(Self {
            mailer,
            messages: TicketMessageBuilder::new(email, ticket)?,
        })
    }
}

impl NotificationDispatcher for SmtpDispatcher {
    #[instrument(skip(self, recipient_name, ticket_url), fields(to = %recipient_email))]
    async fn dispatch(
        &self,
        recipient_name: &str,
        recipient_email: &Email,
        ticket_url: &Url,
    ) -> Result<(), DeliveryError> {
        let message = self
            .messages
            .build(recipient_name, recipient_email, ticket_url)?;
        self.mailer.send(message).await?;

        tracing::info!(to = %recipient_email, "Ticket email sent successfully");
        Ok(())
    }
}

impl std::fmt::Debug for SmtpDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpDispatcher")
            .field("from", &self.messages.from.to_string())
            .finish_non_exhaustive()
    }
}
