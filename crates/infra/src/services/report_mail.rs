//! Nightly report delivery over SMTP.

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::info;

use stockpulse_inventory::InventoryReport;

use super::inventory_sync::{InventorySyncError, ReportSink};

/// Mails each report as a plain-text message to one recipient.
pub struct SmtpReportSink<T = AsyncSmtpTransport<Tokio1Executor>> {
    transport: T,
    from: Mailbox,
    to: Mailbox,
}

impl SmtpReportSink {
    /// Build from an `smtp://` or `smtps://` URL (credentials and port may be
    /// part of the URL).
    pub fn from_url(smtp_url: &str, from: &str, to: &str) -> Result<Self, InventorySyncError> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::from_url(smtp_url)
            .map_err(|e| InventorySyncError::Report(format!("invalid SMTP URL: {e}")))?
            .build();
        Self::with_transport(transport, from, to)
    }
}

impl<T> SmtpReportSink<T> {
    pub fn with_transport(transport: T, from: &str, to: &str) -> Result<Self, InventorySyncError> {
        Ok(Self {
            transport,
            from: mailbox("sender", from)?,
            to: mailbox("recipient", to)?,
        })
    }

    fn message(&self, report: &InventoryReport) -> Result<Message, InventorySyncError> {
        Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(report.subject.as_str())
            .header(ContentType::TEXT_PLAIN)
            .body(report.body.clone())
            .map_err(|e| InventorySyncError::Report(format!("failed to build report mail: {e}")))
    }
}

fn mailbox(role: &str, raw: &str) -> Result<Mailbox, InventorySyncError> {
    raw.parse()
        .map_err(|e| InventorySyncError::Report(format!("invalid report {role} {raw:?}: {e}")))
}

#[async_trait]
impl<T> ReportSink for SmtpReportSink<T>
where
    T: AsyncTransport + Send + Sync,
    T::Ok: Send,
    T::Error: std::fmt::Display + Send,
{
    async fn deliver(&self, report: &InventoryReport) -> Result<(), InventorySyncError> {
        let message = self.message(report)?;
        self.transport
            .send(message)
            .await
            .map_err(|e| InventorySyncError::Report(e.to_string()))?;
        info!(to = %self.to, subject = %report.subject, "inventory report mailed");
        Ok(())
    }
}
