//! Mailer selection
//!
//! The api binary decides at startup whether an SMTP relay is configured;
//! the use cases stay generic over one concrete [`Mailer`].

use platform::mail::{LogMailer, MailError, Mailer, OutgoingMail, SmtpMailer};

#[derive(Clone)]
pub enum AppMailer {
    Smtp(SmtpMailer),
    Log(LogMailer),
}

impl AppMailer {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Smtp(_) => "smtp",
            Self::Log(_) => "log",
        }
    }
}

impl Mailer for AppMailer {
    async fn send(&self, mail: OutgoingMail) -> Result<(), MailError> {
        match self {
            Self::Smtp(mailer) => mailer.send(mail).await,
            Self::Log(mailer) => mailer.send(mail).await,
        }
    }
}

impl From<SmtpMailer> for AppMailer {
    fn from(mailer: SmtpMailer) -> Self {
        Self::Smtp(mailer)
    }
}

impl Default for AppMailer {
    fn default() -> Self {
        Self::Log(LogMailer)
    }
}
