use std::time::Duration;

use ahash::AHashSet;
use tracing::{error, warn};

use crate::modules::error::code::ErrorCode;
use crate::modules::error::{RustRelayError, RustRelayResult};
use crate::modules::settings::cli::SETTINGS;
use crate::modules::smtp::delivery::attempt::DeliveryAttempt;
use crate::modules::smtp::delivery::fallback::EnvFallback;
use crate::modules::smtp::delivery::selector::MailboxSelector;
use crate::modules::smtp::mailbox::entity::Mailbox;
use crate::modules::smtp::transport::{MailTransport, RenderedMail, SmtpCredentials, SmtpTransport};
use crate::raise_error;

pub mod attempt;
pub mod cooldown;
pub mod fallback;
pub mod payload;
pub mod selector;
pub mod send;
#[cfg(test)]
mod tests;

/// One delivery request, rendered and ready to go out.
#[derive(Clone)]
pub struct DeliveryRequest {
    pub mail: RenderedMail,
    /// Caller-supplied credentials tried before the pool (direct/test sends).
    /// Never health-tracked: they do not belong to the pool.
    pub smtp_config: Option<SmtpCredentials>,
}

#[derive(Debug)]
pub struct DeliveryOutcome {
    /// Total transport invocations made for this request.
    pub attempts: u32,
    /// The pool mailbox that carried the message, if any.
    pub mailbox_id: Option<u64>,
    pub via_fallback: bool,
}

/// Drives the failover loop: credential providers are tried in priority
/// order (request-supplied, then the mailbox pool, then the environment
/// fallback), each exposing the same credential shape.
pub struct DeliveryOrchestrator<T: MailTransport> {
    transport: T,
    max_attempts: u32,
    retry_delay: Duration,
    fallback: Option<SmtpCredentials>,
}

impl DeliveryOrchestrator<SmtpTransport> {
    pub fn new() -> Self {
        Self::with_transport(SmtpTransport)
    }
}

impl<T: MailTransport> DeliveryOrchestrator<T> {
    /// An orchestrator is built per request, so the fallback configuration is
    /// read fresh every time and never accumulates state between requests.
    pub fn with_transport(transport: T) -> Self {
        let fallback = if EnvFallback::is_configured() {
            EnvFallback::credentials().ok()
        } else {
            None
        };
        Self {
            transport,
            max_attempts: SETTINGS.rustrelay_max_send_attempts,
            retry_delay: Duration::from_millis(SETTINGS.rustrelay_retry_delay_ms),
            fallback,
        }
    }

    #[cfg(test)]
    fn with_fallback(mut self, fallback: Option<SmtpCredentials>) -> Self {
        self.fallback = fallback;
        self
    }

    pub async fn deliver(&self, request: &DeliveryRequest) -> RustRelayResult<DeliveryOutcome> {
        let mail = &request.mail;
        let mut ordinal: u32 = 0;
        let mut last_error: Option<RustRelayError> = None;

        // Caller-supplied credentials take priority over the pool.
        if let Some(config) = &request.smtp_config {
            ordinal += 1;
            match self.transport.send(config, mail).await {
                Ok(()) => {
                    log_attempt(DeliveryAttempt::sent(mail, None, &config.host, ordinal)).await;
                    return Ok(DeliveryOutcome {
                        attempts: ordinal,
                        mailbox_id: None,
                        via_fallback: false,
                    });
                }
                Err(send_error) => {
                    warn!(
                        host = %config.host,
                        "direct send with caller-supplied credentials failed: {}",
                        send_error.message()
                    );
                    log_attempt(DeliveryAttempt::failed(
                        mail,
                        None,
                        &config.host,
                        ordinal,
                        &send_error,
                    ))
                    .await;
                    last_error = Some(send_error);
                }
            }
        }

        // Mailbox pool loop. The excluded set strictly grows, so no mailbox
        // reaches the transport twice within one request; `max_attempts`
        // bounds the loop independently of pool size.
        let mut excluded: AHashSet<u64> = AHashSet::new();
        let mut pool_attempts: u32 = 0;
        while pool_attempts < self.max_attempts {
            let Some(mailbox) = MailboxSelector::select_next(&excluded).await? else {
                break;
            };
            excluded.insert(mailbox.id);

            let credentials = match mailbox.smtp_credentials() {
                Ok(credentials) => credentials,
                Err(cred_error) => {
                    // An unreadable secret is not a transport attempt, but the
                    // mailbox still earns a cooldown so it stops being picked.
                    warn!(
                        mailbox_id = mailbox.id,
                        "skipping mailbox with unusable credentials: {}",
                        cred_error.message()
                    );
                    if let Err(record_failure) =
                        Mailbox::record_error(mailbox.id, cred_error.message()).await
                    {
                        warn!(
                            mailbox_id = mailbox.id,
                            "failed to record mailbox error: {:#?}", record_failure
                        );
                    }
                    last_error = Some(cred_error);
                    continue;
                }
            };

            ordinal += 1;
            pool_attempts += 1;
            match self.transport.send(&credentials, mail).await {
                Ok(()) => {
                    // The message left the building; bookkeeping trouble must
                    // not turn the success into a failure.
                    if let Err(record_failure) = Mailbox::record_success(mailbox.id).await {
                        warn!(
                            mailbox_id = mailbox.id,
                            "failed to record mailbox success: {:#?}", record_failure
                        );
                    }
                    log_attempt(DeliveryAttempt::sent(
                        mail,
                        Some(mailbox.id),
                        &credentials.host,
                        ordinal,
                    ))
                    .await;
                    return Ok(DeliveryOutcome {
                        attempts: ordinal,
                        mailbox_id: Some(mailbox.id),
                        via_fallback: false,
                    });
                }
                Err(send_error) => {
                    warn!(
                        mailbox_id = mailbox.id,
                        host = %credentials.host,
                        "send attempt {} failed: {}",
                        ordinal,
                        send_error.message()
                    );
                    if let Err(record_failure) =
                        Mailbox::record_error(mailbox.id, send_error.message()).await
                    {
                        warn!(
                            mailbox_id = mailbox.id,
                            "failed to record mailbox error: {:#?}", record_failure
                        );
                    }
                    log_attempt(DeliveryAttempt::failed(
                        mail,
                        Some(mailbox.id),
                        &credentials.host,
                        ordinal,
                        &send_error,
                    ))
                    .await;
                    last_error = Some(send_error);
                    // Fixed pause before the next mailbox; retries are
                    // cross-mailbox, so no exponential backoff here.
                    if !self.retry_delay.is_zero() {
                        tokio::time::sleep(self.retry_delay).await;
                    }
                }
            }
        }

        // The static fallback gets exactly one attempt, and only after the
        // pool is exhausted.
        if let Some(credentials) = &self.fallback {
            ordinal += 1;
            match self.transport.send(credentials, mail).await {
                Ok(()) => {
                    log_attempt(DeliveryAttempt::sent(mail, None, &credentials.host, ordinal))
                        .await;
                    return Ok(DeliveryOutcome {
                        attempts: ordinal,
                        mailbox_id: None,
                        via_fallback: true,
                    });
                }
                Err(send_error) => {
                    warn!(
                        host = %credentials.host,
                        "fallback send failed: {}",
                        send_error.message()
                    );
                    log_attempt(DeliveryAttempt::failed(
                        mail,
                        None,
                        &credentials.host,
                        ordinal,
                        &send_error,
                    ))
                    .await;
                    return Err(send_error);
                }
            }
        }

        // No fallback configured: surface the last transport error, or a
        // configuration error when there was nothing to try at all.
        match last_error {
            Some(send_error) => Err(send_error),
            None => Err(raise_error!(
                "No delivery path configured: the mailbox pool is empty or fully cooling down and no fallback SMTP is set.".into(),
                ErrorCode::NoDeliveryPath
            )),
        }
    }
}

/// Attempt logging is a best-effort side effect: a storage failure here is
/// reported and dropped, never allowed to change the delivery outcome.
async fn log_attempt(attempt: DeliveryAttempt) {
    if let Err(log_error) = attempt.append().await {
        error!("failed to record delivery attempt: {:#?}", log_error);
    }
}
