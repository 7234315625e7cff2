use crate::services::smtp_mailer::{MailError, Mailer};
use async_trait::async_trait;
use std::sync::Mutex;

/// A mock mailer that records sent emails for testing purposes.
#[derive(Debug, Default)]
pub struct MockMailer {
    pub sent_payment_confirmations: Mutex<Vec<(String, String)>>,
    pub sent_suspension_notices: Mutex<Vec<(String, String)>>,
    pub sent_generic: Mutex<Vec<(String, String, String)>>,
    pub fail_send: bool,
}

#[async_trait]
impl Mailer for MockMailer {
    async fn send_payment_confirmation_email(
        &self,
        to: &str,
        plan: &str,
    ) -> Result<(), MailError> {
        if self.fail_send {
            return Err(MailError::Other("mock failure".into()));
        }
        self.sent_payment_confirmations
            .lock()
            .unwrap()
            .push((to.to_string(), plan.to_string()));
        Ok(())
    }

    async fn send_suspension_email(&self, to: &str, reason: &str) -> Result<(), MailError> {
        if self.fail_send {
            return Err(MailError::Other("mock failure".into()));
        }
        self.sent_suspension_notices
            .lock()
            .unwrap()
            .push((to.to_string(), reason.to_string()));
        Ok(())
    }

    async fn send_email_generic(
        &self,
        to: &str,
        subject: &str,
        body: &str,
    ) -> Result<(), MailError> {
        if self.fail_send {
            return Err(MailError::Other("mock fail".into()));
        }
        self.sent_generic.lock().unwrap().push((
            to.to_string(),
            subject.to_string(),
            body.to_string(),
        ));
        Ok(())
    }
}
