//! SMTP digest delivery via lettre.

use anyhow::{Context, Result};
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::{authentication::Credentials, AsyncSmtpTransport};
use lettre::{AsyncTransport, Message, Tokio1Executor};

use super::Notifier;

pub struct EmailNotifier {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl EmailNotifier {
    /// Build from SMTP_HOST / SMTP_USER / SMTP_PASS / DIGEST_EMAIL_FROM.
    pub fn from_env() -> Result<Self> {
        let host = std::env::var("SMTP_HOST").context("SMTP_HOST missing")?;
        let user = std::env::var("SMTP_USER").context("SMTP_USER missing")?;
        let pass = std::env::var("SMTP_PASS").context("SMTP_PASS missing")?;
        let from_addr = std::env::var("DIGEST_EMAIL_FROM").context("DIGEST_EMAIL_FROM missing")?;

        let creds = Credentials::new(user, pass);
        let mailer = AsyncSmtpTransport::<Tokio1Executor>::relay(&host)
            .context("invalid SMTP_HOST")?
            .credentials(creds)
            .build();

        let from = from_addr
            .parse()
            .context("invalid DIGEST_EMAIL_FROM address")?;

        Ok(Self { mailer, from })
    }
}

#[async_trait::async_trait]
impl Notifier for EmailNotifier {
    async fn send(
        &self,
        subject: &str,
        plain_body: &str,
        html_body: &str,
        recipients: &[String],
    ) -> Result<()> {
        anyhow::ensure!(!recipients.is_empty(), "recipients list is empty");

        let mut builder = Message::builder()
            .from(self.from.clone())
            .subject(subject);
        for to in recipients {
            let mailbox: Mailbox = to
                .parse()
                .with_context(|| format!("invalid recipient {to}"))?;
            builder = builder.to(mailbox);
        }

        let msg = builder
            .multipart(MultiPart::alternative_plain_html(
                plain_body.to_string(),
                html_body.to_string(),
            ))
            .context("build digest email")?;

        self.mailer.send(msg).await.context("send digest email")?;
        Ok(())
    }
}
