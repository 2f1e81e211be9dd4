use tracing::info;

use super::{run, shell};
use crate::backend::MailSender;
use crate::config::MailConfig;
use crate::types::error::{FilterError, Result};

/// Delivers plain-text mail by piping it to a sendmail-compatible command
pub struct SendmailSender {
    config: MailConfig,
}

impl SendmailSender {
    pub fn new(config: MailConfig) -> Self {
        Self { config }
    }

    fn message(&self, to: &str, subject: &str, body: &str) -> Result<String> {
        for (name, value) in [("recipient", to), ("subject", subject)] {
            if value.contains(|c: char| c == '\r' || c == '\n') {
                return Err(FilterError::Transport(format!(
                    "{} must not contain line breaks",
                    name
                )));
            }
        }

        let mut message = String::new();
        if let Some(from) = &self.config.from {
            message.push_str(&format!("From: {}\r\n", from));
        }
        message.push_str(&format!("To: {}\r\n", to));
        message.push_str(&format!("Subject: {}\r\n", subject));
        message.push_str(&format!("Date: {}\r\n", chrono::Utc::now().to_rfc2822()));
        message.push_str("MIME-Version: 1.0\r\n");
        message.push_str("Content-Type: text/plain; charset=utf-8\r\n");
        message.push_str("\r\n");
        for line in body.lines() {
            message.push_str(line);
            message.push_str("\r\n");
        }
        Ok(message)
    }
}

impl MailSender for SendmailSender {
    fn send(&self, to: &str, subject: &str, body: &str) -> Result<()> {
        let message = self.message(to, subject, body)?;
        run(shell(&self.config.sendmail, &[]), Some(message.as_bytes()))
            .map_err(|e| FilterError::Transport(format!("sendmail: {}", e)))?;
        info!("Handed message for {} to {:?}", to, self.config.sendmail);
        Ok(())
    }
}
