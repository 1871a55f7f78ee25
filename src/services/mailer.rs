use crate::{config::AppConfig, errors::ServiceError};
use lettre::{
    message::header::ContentType,
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tracing::info;

/// Outbound SMTP mailer for account verification links.
///
/// Sends are always dispatched fire-and-forget after the primary operation
/// commits; a delivery failure is the spawned task's problem, never the
/// caller's.
pub struct Mailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: String,
}

impl Mailer {
    /// Build from configuration. Returns `None` when no SMTP relay is
    /// configured, which disables outbound mail entirely.
    pub fn from_config(cfg: &AppConfig) -> Option<Self> {
        let host = cfg.smtp_host.as_deref()?;

        let mut builder =
            AsyncSmtpTransport::<Tokio1Executor>::relay(host).ok()?;

        if let (Some(user), Some(pass)) = (&cfg.smtp_username, &cfg.smtp_password) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        Some(Self {
            transport: builder.build(),
            from: cfg.mail_from.clone(),
        })
    }

    pub async fn send_verification(&self, to: &str, link: &str) -> Result<(), ServiceError> {
        let message = Message::builder()
            .from(
                self.from
                    .parse()
                    .map_err(|e| ServiceError::InternalError(format!("bad from address: {}", e)))?,
            )
            .to(to
                .parse()
                .map_err(|e| ServiceError::InternalError(format!("bad recipient: {}", e)))?)
            .subject("Verify your Grandeur account")
            .header(ContentType::TEXT_PLAIN)
            .body(format!(
                "Welcome to Grandeur!\n\nPlease confirm your email address by opening the link below:\n\n{}\n\nIf you did not create an account, you can ignore this message.\n",
                link
            ))
            .map_err(|e| ServiceError::InternalError(format!("failed to build message: {}", e)))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| ServiceError::InternalError(format!("failed to send mail: {}", e)))?;

        info!("Sent verification mail to {}", to);
        Ok(())
    }
}
