//! Delivery boundary: hand a rendered digest to the outside world.

pub mod email;

pub use email::EmailNotifier;

use anyhow::Result;

/// Sends one rendered digest. Implementations never retry internally; a
/// failed send is reported verbatim and retry policy stays with the caller.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn send(
        &self,
        subject: &str,
        plain_body: &str,
        html_body: &str,
        recipients: &[String],
    ) -> Result<()>;
}
