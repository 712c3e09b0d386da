use crate::modules::database::manager::DB_MANAGER;
use crate::modules::database::{insert_impl, paginate_query_primary_scan_all_impl};
use crate::modules::error::code::ErrorCode;
use crate::modules::error::{RustRelayError, RustRelayResult};
use crate::modules::rest::response::DataPage;
use crate::modules::smtp::transport::RenderedMail;
use crate::{id, utc_now};
use native_db::*;
use native_model::{native_model, Model};
use poem_openapi::{Enum, Object};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, Eq, PartialEq, Deserialize, Serialize, Enum)]
pub enum AttemptStatus {
    Sent,
    #[default]
    Failed,
    /// The server accepted the connection but rejected the message
    /// (rate limiting, policy refusal). The rejection text is preserved
    /// verbatim in `error`.
    Bounced,
}

/// One logged try against one SMTP endpoint. Created exactly once per
/// transport invocation and never mutated afterwards; unrelated reporting
/// dashboards read this table.
#[derive(Clone, Debug, Default, Eq, PartialEq, Deserialize, Serialize, Object)]
#[native_model(id = 4, version = 1)]
#[native_db(primary_key(pk -> String))]
pub struct DeliveryAttempt {
    #[secondary_key(unique)]
    pub id: u64,
    /// Recipient address of the delivery request.
    pub recipient: String,
    /// Rendered subject of the delivery request.
    pub subject: String,
    /// Outcome of this attempt.
    pub status: AttemptStatus,
    /// Mailbox used for the attempt; `None` for fallback and direct sends.
    pub mailbox_id: Option<u64>,
    /// SMTP host the attempt was made against.
    pub smtp_host: String,
    /// Error message if the attempt did not succeed.
    pub error: Option<String>,
    /// 1-based position of this attempt within its delivery request.
    pub attempt_ordinal: u32,
    /// Timestamp (Unix epoch milliseconds) when the attempt was made.
    pub created_at: i64,
}

impl DeliveryAttempt {
    fn pk(&self) -> String {
        format!("{}_{}", self.created_at, self.id)
    }

    pub fn sent(
        mail: &RenderedMail,
        mailbox_id: Option<u64>,
        smtp_host: &str,
        attempt_ordinal: u32,
    ) -> Self {
        Self {
            id: id!(64),
            recipient: mail.to_address.clone(),
            subject: mail.subject.clone(),
            status: AttemptStatus::Sent,
            mailbox_id,
            smtp_host: smtp_host.to_string(),
            error: None,
            attempt_ordinal,
            created_at: utc_now!(),
        }
    }

    pub fn failed(
        mail: &RenderedMail,
        mailbox_id: Option<u64>,
        smtp_host: &str,
        attempt_ordinal: u32,
        error: &RustRelayError,
    ) -> Self {
        // SMTP-level rejections are recorded as bounces; connection, TLS and
        // authentication failures stay plain failures.
        let status = match error.code() {
            ErrorCode::SmtpCommandFailed => AttemptStatus::Bounced,
            _ => AttemptStatus::Failed,
        };
        Self {
            id: id!(64),
            recipient: mail.to_address.clone(),
            subject: mail.subject.clone(),
            status,
            mailbox_id,
            smtp_host: smtp_host.to_string(),
            error: Some(error.message().to_string()),
            attempt_ordinal,
            created_at: utc_now!(),
        }
    }

    pub async fn append(self) -> RustRelayResult<()> {
        insert_impl(DB_MANAGER.attempts_db(), self).await
    }

    pub async fn paginate_list(
        page: Option<u64>,
        page_size: Option<u64>,
        desc: Option<bool>,
    ) -> RustRelayResult<DataPage<DeliveryAttempt>> {
        paginate_query_primary_scan_all_impl(DB_MANAGER.attempts_db(), page, page_size, desc)
            .await
            .map(DataPage::from)
    }

    #[cfg(test)]
    pub async fn list_all() -> RustRelayResult<Vec<DeliveryAttempt>> {
        crate::modules::database::list_all_impl(DB_MANAGER.attempts_db()).await
    }
}
