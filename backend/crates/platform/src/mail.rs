//! Transactional email
//!
//! [`Mailer`] is the seam used by the domain crates. [`SmtpMailer`] sends
//! through an SMTP relay; [`LogMailer`] only logs and is used when no relay
//! is configured.

use std::str::FromStr;

use lettre::message::{Mailbox, MultiPart, SinglePart, header::ContentType};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub to: String,
    pub subject: String,
    pub html: String,
    pub text: String,
}

#[derive(Debug, Error)]
pub enum MailError {
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Failed to build message: {0}")]
    Build(String),

    #[error("SMTP delivery failed: {0}")]
    Transport(String),
}

#[trait_variant::make(Mailer: Send)]
pub trait LocalMailer {
    async fn send(&self, mail: OutgoingMail) -> Result<(), MailError>;
}

// ============================================================================
// SMTP
// ============================================================================

/// Connection security towards the relay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SmtpSecurity {
    /// Implicit TLS (port 465)
    Tls,
    /// STARTTLS upgrade (port 587)
    #[default]
    StartTls,
    /// Plain text; local catch-all relays only
    None,
}

#[derive(Debug, Clone)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub security: SmtpSecurity,
    /// `Name <address>` or a bare address
    pub from: String,
}

#[derive(Clone)]
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(settings: &SmtpSettings) -> Result<Self, MailError> {
        let from = Mailbox::from_str(&settings.from)
            .map_err(|e| MailError::InvalidAddress(format!("{}: {e}", settings.from)))?;

        let builder = match settings.security {
            SmtpSecurity::Tls => AsyncSmtpTransport::<Tokio1Executor>::relay(&settings.host)
                .map_err(|e| MailError::Transport(format!("Invalid SMTP host: {e}")))?,
            SmtpSecurity::StartTls => {
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.host)
                    .map_err(|e| MailError::Transport(format!("Invalid SMTP host: {e}")))?
            }
            SmtpSecurity::None => {
                AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&settings.host)
            }
        };

        let builder = builder.port(settings.port);
        let transport = match (&settings.username, &settings.password) {
            (Some(user), Some(pass)) => builder
                .credentials(Credentials::new(user.clone(), pass.clone()))
                .build(),
            _ => builder.build(),
        };

        Ok(Self { transport, from })
    }
}

impl Mailer for SmtpMailer {
    async fn send(&self, mail: OutgoingMail) -> Result<(), MailError> {
        let to = Mailbox::from_str(&mail.to)
            .map_err(|e| MailError::InvalidAddress(format!("{}: {e}", mail.to)))?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(mail.subject.as_str())
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(mail.text),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(mail.html),
                    ),
            )
            .map_err(|e| MailError::Build(e.to_string()))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?;

        tracing::debug!(subject = %mail.subject, "Mail handed to SMTP relay");
        Ok(())
    }
}

// ============================================================================
// Log only
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct LogMailer;

impl Mailer for LogMailer {
    async fn send(&self, mail: OutgoingMail) -> Result<(), MailError> {
        tracing::info!(
            to = %mail.to,
            subject = %mail.subject,
            body = %mail.text,
            "SMTP not configured; mail logged instead of sent"
        );
        Ok(())
    }
}

// ============================================================================
// Templates
// ============================================================================

/// Escape text for inclusion in HTML element content or attribute values
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Wrap already-escaped `body_html` in the shared mail layout
pub fn render_html_layout(title: &str, body_html: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title}</title>
</head>
<body style="font-family: Arial, sans-serif; line-height: 1.6; color: #333;">
    <div style="max-width: 600px; margin: 0 auto; padding: 20px;">
        <h2 style="color: #2c3e50;">{title}</h2>
        {body_html}
        <hr style="border: none; border-top: 1px solid #eee; margin: 30px 0;">
        <p style="font-size: 12px; color: #888;">
            You received this email because of activity on your account.
            If this was not you, you can ignore this message.
        </p>
    </div>
</body>
</html>"#,
        title = escape_html(title),
        body_html = body_html,
    )
}

/// Paragraph plus a call-to-action button linking to `url`
pub fn render_action_body(paragraph: &str, button_label: &str, url: &str) -> String {
    let url = escape_html(url);
    format!(
        r#"<p>{paragraph}</p>
        <p style="text-align: center; margin: 30px 0;">
            <a href="{url}" style="background-color: #3498db; color: white; padding: 12px 24px; text-decoration: none; border-radius: 4px; display: inline-block;">{label}</a>
        </p>
        <p style="font-size: 13px; word-break: break-all;">{url}</p>"#,
        paragraph = escape_html(paragraph),
        label = escape_html(button_label),
        url = url,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<a href="x">Tom & 'Jerry'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; &#39;Jerry&#39;&lt;/a&gt;"
        );
    }

    #[test]
    fn test_layout_escapes_title_only() {
        let html = render_html_layout("Reset <your> password", "<p>ok</p>");
        assert!(html.contains("Reset &lt;your&gt; password"));
        assert!(html.contains("<p>ok</p>"));
    }

    #[test]
    fn test_action_body_escapes_url() {
        let body = render_action_body("Click", "Go", "https://app.test/r?a=1&b=2");
        assert!(body.contains("https://app.test/r?a=1&amp;b=2"));
    }

    #[test]
    fn test_smtp_mailer_rejects_bad_from() {
        let settings = SmtpSettings {
            host: "localhost".to_string(),
            port: 1025,
            username: None,
            password: None,
            security: SmtpSecurity::None,
            from: "not an address".to_string(),
        };
        assert!(matches!(
            SmtpMailer::new(&settings),
            Err(MailError::InvalidAddress(_))
        ));
    }

    #[tokio::test]
    async fn test_log_mailer_accepts() {
        let mail = OutgoingMail {
            to: "user@example.com".to_string(),
            subject: "Hi".to_string(),
            html: "<p>Hi</p>".to_string(),
            text: "Hi".to_string(),
        };
        assert!(Mailer::send(&LogMailer, mail).await.is_ok());
    }
}
