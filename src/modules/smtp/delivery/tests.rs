use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use ahash::AHashSet;

use crate::modules::error::code::ErrorCode;
use crate::modules::error::RustRelayResult;
use crate::modules::smtp::delivery::attempt::{AttemptStatus, DeliveryAttempt};
use crate::modules::smtp::delivery::selector::MailboxSelector;
use crate::modules::smtp::delivery::{DeliveryOrchestrator, DeliveryRequest};
use crate::modules::smtp::mailbox::entity::{
    Encryption, Mailbox, MailboxCredentials, SmtpServerConfig,
};
use crate::modules::smtp::transport::{MailTransport, RenderedMail, SmtpCredentials};
use crate::{encrypt, id, raise_error, utc_now};

// The pool lives in the shared in-memory metadata database, so tests that
// seed mailboxes serialize on this guard and start from an empty pool.
static POOL_GUARD: Mutex<()> = Mutex::new(());

struct MockState {
    outcomes: Mutex<VecDeque<RustRelayResult<()>>>,
    hosts: Mutex<Vec<String>>,
}

/// Scripted transport: answers sends from a queue of outcomes (then keeps
/// succeeding) and records the hosts it was invoked with.
#[derive(Clone)]
struct MockTransport {
    state: Arc<MockState>,
}

impl MockTransport {
    fn scripted(outcomes: Vec<RustRelayResult<()>>) -> Self {
        Self {
            state: Arc::new(MockState {
                outcomes: Mutex::new(outcomes.into()),
                hosts: Mutex::new(Vec::new()),
            }),
        }
    }

    fn hosts(&self) -> Vec<String> {
        self.state.hosts.lock().unwrap().clone()
    }
}

impl MailTransport for MockTransport {
    async fn send(
        &self,
        credentials: &SmtpCredentials,
        _mail: &RenderedMail,
    ) -> RustRelayResult<()> {
        self.state
            .hosts
            .lock()
            .unwrap()
            .push(credentials.host.clone());
        self.state
            .outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(()))
    }
}

fn connect_refused() -> RustRelayResult<()> {
    Err(raise_error!(
        "connection refused".into(),
        ErrorCode::SmtpConnectionFailed
    ))
}

fn provider_rejection(message: &str) -> RustRelayResult<()> {
    Err(raise_error!(
        message.to_string(),
        ErrorCode::SmtpCommandFailed
    ))
}

fn delivery_request(recipient: &str) -> DeliveryRequest {
    DeliveryRequest {
        mail: RenderedMail {
            to_address: recipient.to_string(),
            to_name: None,
            subject: "Test subject".to_string(),
            text: Some("Test body".to_string()),
            html: None,
        },
        smtp_config: None,
    }
}

fn fallback_credentials() -> SmtpCredentials {
    SmtpCredentials {
        host: "fallback.smtp.example".to_string(),
        port: 587,
        encryption: Encryption::StartTls,
        username: "fallback".to_string(),
        password: "fallback-secret".to_string(),
        from_address: "noreply@fallback.example".to_string(),
        from_name: None,
    }
}

async fn seed_mailbox(
    host: &str,
    sent_count: u64,
    consecutive_errors: u32,
    cooldown_until: Option<i64>,
    active: bool,
) -> u64 {
    let mailbox = Mailbox {
        id: id!(64),
        description: None,
        credentials: MailboxCredentials {
            username: format!("sender@{host}"),
            password: Some(encrypt!("smtp-secret").unwrap()),
        },
        server: SmtpServerConfig {
            host: host.to_string(),
            port: 587,
            encryption: Encryption::StartTls,
        },
        from_address: format!("noreply@{host}"),
        from_name: None,
        active,
        sent_count,
        consecutive_errors,
        cooldown_until,
        last_error: None,
        created_at: utc_now!(),
        updated_at: utc_now!(),
        last_sent_at: 0,
    };
    let id = mailbox.id;
    mailbox.save().await.unwrap();
    id
}

async fn reset_pool() {
    for mailbox in Mailbox::list_all().await.unwrap() {
        Mailbox::delete(mailbox.id).await.unwrap();
    }
}

async fn attempts_for(recipient: &str) -> Vec<DeliveryAttempt> {
    let mut attempts: Vec<DeliveryAttempt> = DeliveryAttempt::list_all()
        .await
        .unwrap()
        .into_iter()
        .filter(|attempt| attempt.recipient == recipient)
        .collect();
    attempts.sort_by_key(|attempt| attempt.attempt_ordinal);
    attempts
}

#[tokio::test]
async fn test_first_eligible_mailbox_succeeds_with_one_attempt() {
    let _guard = POOL_GUARD.lock().unwrap_or_else(PoisonError::into_inner);
    reset_pool().await;
    let first = seed_mailbox("mx-a.example", 0, 0, None, true).await;
    let second = seed_mailbox("mx-b.example", 1, 0, None, true).await;

    let transport = MockTransport::scripted(vec![Ok(())]);
    let orchestrator =
        DeliveryOrchestrator::with_transport(transport.clone()).with_fallback(None);
    let recipient = "scenario-a@example.com";
    let outcome = orchestrator.deliver(&delivery_request(recipient)).await.unwrap();

    assert_eq!(outcome.attempts, 1);
    assert_eq!(outcome.mailbox_id, Some(first));
    assert!(!outcome.via_fallback);
    assert_eq!(transport.hosts(), vec!["mx-a.example".to_string()]);

    let attempts = attempts_for(recipient).await;
    assert_eq!(attempts.len(), 1);
    assert_eq!(attempts[0].status, AttemptStatus::Sent);
    assert_eq!(attempts[0].mailbox_id, Some(first));

    let first = Mailbox::get(first).await.unwrap().unwrap();
    assert_eq!(first.sent_count, 1);
    assert_eq!(first.consecutive_errors, 0);
    assert!(first.cooldown_until.is_none());
    // The other mailbox was never touched.
    let second = Mailbox::get(second).await.unwrap().unwrap();
    assert_eq!(second.sent_count, 1);
    assert!(second.cooldown_until.is_none());
}

#[tokio::test]
async fn test_pool_failures_then_fallback_success() {
    let _guard = POOL_GUARD.lock().unwrap_or_else(PoisonError::into_inner);
    reset_pool().await;
    let first = seed_mailbox("mx-a.example", 0, 0, None, true).await;
    let second = seed_mailbox("mx-b.example", 0, 0, None, true).await;

    let transport = MockTransport::scripted(vec![connect_refused(), connect_refused(), Ok(())]);
    let orchestrator = DeliveryOrchestrator::with_transport(transport.clone())
        .with_fallback(Some(fallback_credentials()));
    let recipient = "scenario-b@example.com";
    let outcome = orchestrator.deliver(&delivery_request(recipient)).await.unwrap();

    assert_eq!(outcome.attempts, 3);
    assert_eq!(outcome.mailbox_id, None);
    assert!(outcome.via_fallback);

    let attempts = attempts_for(recipient).await;
    assert_eq!(attempts.len(), 3);
    assert_eq!(attempts[0].status, AttemptStatus::Failed);
    assert_eq!(attempts[1].status, AttemptStatus::Failed);
    assert_eq!(attempts[2].status, AttemptStatus::Sent);
    // The fallback attempt carries no mailbox id.
    assert_eq!(attempts[2].mailbox_id, None);
    assert_eq!(attempts[2].smtp_host, "fallback.smtp.example");

    let now = utc_now!();
    for id in [first, second] {
        let mailbox = Mailbox::get(id).await.unwrap().unwrap();
        assert_eq!(mailbox.consecutive_errors, 1);
        assert!(mailbox.cooldown_until.unwrap() > now);
        assert_eq!(mailbox.last_error.as_deref(), Some("connection refused"));
    }
}

#[tokio::test]
async fn test_single_mailbox_fails_without_fallback() {
    let _guard = POOL_GUARD.lock().unwrap_or_else(PoisonError::into_inner);
    reset_pool().await;
    let only = seed_mailbox("mx-solo.example", 0, 0, None, true).await;

    let transport =
        MockTransport::scripted(vec![provider_rejection("550 5.7.1 relaying denied")]);
    let orchestrator =
        DeliveryOrchestrator::with_transport(transport.clone()).with_fallback(None);
    let recipient = "scenario-c@example.com";
    let error = orchestrator
        .deliver(&delivery_request(recipient))
        .await
        .unwrap_err();

    // The caller sees the last SMTP error, not a generic message.
    assert!(error.message().contains("550 5.7.1 relaying denied"));

    let attempts = attempts_for(recipient).await;
    assert_eq!(attempts.len(), 1);
    assert_eq!(attempts[0].status, AttemptStatus::Bounced);
    assert_eq!(
        attempts[0].error.as_deref(),
        Some("550 5.7.1 relaying denied")
    );

    let mailbox = Mailbox::get(only).await.unwrap().unwrap();
    assert_eq!(mailbox.consecutive_errors, 1);
    assert!(mailbox.cooldown_until.is_some());
}

#[tokio::test]
async fn test_attempts_are_bounded_below_pool_size() {
    let _guard = POOL_GUARD.lock().unwrap_or_else(PoisonError::into_inner);
    reset_pool().await;
    for index in 0..10 {
        seed_mailbox(&format!("mx-{index}.example"), 0, 0, None, true).await;
    }

    let transport = MockTransport::scripted((0..10).map(|_| connect_refused()).collect());
    let orchestrator =
        DeliveryOrchestrator::with_transport(transport.clone()).with_fallback(None);
    let recipient = "scenario-d@example.com";
    let error = orchestrator
        .deliver(&delivery_request(recipient))
        .await
        .unwrap_err();
    assert_eq!(error.code(), ErrorCode::SmtpConnectionFailed);

    // Five pool attempts, not ten.
    assert_eq!(transport.hosts().len(), 5);
    assert_eq!(attempts_for(recipient).await.len(), 5);
}

#[tokio::test]
async fn test_no_mailbox_is_tried_twice_within_a_request() {
    let _guard = POOL_GUARD.lock().unwrap_or_else(PoisonError::into_inner);
    reset_pool().await;
    for index in 0..3 {
        seed_mailbox(&format!("mx-{index}.example"), 0, 0, None, true).await;
    }

    let transport = MockTransport::scripted((0..3).map(|_| connect_refused()).collect());
    let orchestrator =
        DeliveryOrchestrator::with_transport(transport.clone()).with_fallback(None);
    let recipient = "no-repeat@example.com";
    orchestrator
        .deliver(&delivery_request(recipient))
        .await
        .unwrap_err();

    let hosts = transport.hosts();
    assert_eq!(hosts.len(), 3);
    let distinct: AHashSet<String> = hosts.into_iter().collect();
    assert_eq!(distinct.len(), 3);
}

#[tokio::test]
async fn test_empty_pool_without_fallback_is_a_configuration_error() {
    let _guard = POOL_GUARD.lock().unwrap_or_else(PoisonError::into_inner);
    reset_pool().await;

    let transport = MockTransport::scripted(vec![]);
    let orchestrator =
        DeliveryOrchestrator::with_transport(transport.clone()).with_fallback(None);
    let recipient = "no-path@example.com";
    let error = orchestrator
        .deliver(&delivery_request(recipient))
        .await
        .unwrap_err();

    assert_eq!(error.code(), ErrorCode::NoDeliveryPath);
    assert!(transport.hosts().is_empty());
    assert!(attempts_for(recipient).await.is_empty());
}

#[tokio::test]
async fn test_caller_supplied_credentials_are_tried_before_the_pool() {
    let _guard = POOL_GUARD.lock().unwrap_or_else(PoisonError::into_inner);
    reset_pool().await;
    let pooled = seed_mailbox("mx-pool.example", 0, 0, None, true).await;

    let transport = MockTransport::scripted(vec![connect_refused(), Ok(())]);
    let orchestrator =
        DeliveryOrchestrator::with_transport(transport.clone()).with_fallback(None);
    let recipient = "direct-first@example.com";
    let mut request = delivery_request(recipient);
    request.smtp_config = Some(SmtpCredentials {
        host: "direct.smtp.example".to_string(),
        port: 2525,
        encryption: Encryption::None,
        username: "direct".to_string(),
        password: "direct-secret".to_string(),
        from_address: "tester@example.com".to_string(),
        from_name: None,
    });
    let outcome = orchestrator.deliver(&request).await.unwrap();

    assert_eq!(
        transport.hosts(),
        vec!["direct.smtp.example".to_string(), "mx-pool.example".to_string()]
    );
    assert_eq!(outcome.attempts, 2);
    assert_eq!(outcome.mailbox_id, Some(pooled));

    let attempts = attempts_for(recipient).await;
    assert_eq!(attempts.len(), 2);
    // Caller-supplied credentials are not pool members: no mailbox id.
    assert_eq!(attempts[0].mailbox_id, None);
    assert_eq!(attempts[0].status, AttemptStatus::Failed);
    assert_eq!(attempts[1].mailbox_id, Some(pooled));

    // And the pool mailbox alone was health-tracked.
    let pooled = Mailbox::get(pooled).await.unwrap().unwrap();
    assert_eq!(pooled.sent_count, 1);
}

#[tokio::test]
async fn test_selector_prefers_least_used_mailbox() {
    let _guard = POOL_GUARD.lock().unwrap_or_else(PoisonError::into_inner);
    reset_pool().await;
    seed_mailbox("mx-busy.example", 25, 0, None, true).await;
    let fresh = seed_mailbox("mx-fresh.example", 3, 0, None, true).await;
    seed_mailbox("mx-mid.example", 10, 0, None, true).await;

    let selected = MailboxSelector::select_next(&AHashSet::new())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(selected.id, fresh);
}

#[tokio::test]
async fn test_selector_skips_cooling_and_inactive_mailboxes() {
    let _guard = POOL_GUARD.lock().unwrap_or_else(PoisonError::into_inner);
    reset_pool().await;
    // Least used, but cooling down until one hour from now.
    seed_mailbox("mx-cooling.example", 0, 2, Some(utc_now!() + 3_600_000), true).await;
    // Even less used, but deactivated by an operator.
    seed_mailbox("mx-disabled.example", 0, 0, None, false).await;
    let eligible = seed_mailbox("mx-ok.example", 50, 0, None, true).await;

    let selected = MailboxSelector::select_next(&AHashSet::new())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(selected.id, eligible);
}

#[tokio::test]
async fn test_selector_allows_expired_cooldown() {
    let _guard = POOL_GUARD.lock().unwrap_or_else(PoisonError::into_inner);
    reset_pool().await;
    let recovered = seed_mailbox("mx-back.example", 0, 3, Some(utc_now!() - 1_000), true).await;
    seed_mailbox("mx-other.example", 5, 0, None, true).await;

    let selected = MailboxSelector::select_next(&AHashSet::new())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(selected.id, recovered);
}

#[tokio::test]
async fn test_selector_returns_none_when_all_excluded() {
    let _guard = POOL_GUARD.lock().unwrap_or_else(PoisonError::into_inner);
    reset_pool().await;
    let only = seed_mailbox("mx-only.example", 0, 0, None, true).await;

    let mut excluded = AHashSet::new();
    excluded.insert(only);
    assert!(MailboxSelector::select_next(&excluded)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_record_success_resets_accumulated_failures() {
    let _guard = POOL_GUARD.lock().unwrap_or_else(PoisonError::into_inner);
    reset_pool().await;
    let id = seed_mailbox("mx-reset.example", 7, 4, Some(utc_now!() + 60_000), true).await;

    Mailbox::record_success(id).await.unwrap();

    let mailbox = Mailbox::get(id).await.unwrap().unwrap();
    assert_eq!(mailbox.sent_count, 8);
    assert_eq!(mailbox.consecutive_errors, 0);
    assert!(mailbox.cooldown_until.is_none());
    assert!(mailbox.last_error.is_none());
    assert!(mailbox.last_sent_at > 0);
}

#[tokio::test]
async fn test_repeated_failures_never_shorten_the_cooldown() {
    let _guard = POOL_GUARD.lock().unwrap_or_else(PoisonError::into_inner);
    reset_pool().await;
    let id = seed_mailbox("mx-worse.example", 0, 0, None, true).await;

    Mailbox::record_error(id, "451 try again later").await.unwrap();
    let after_first = Mailbox::get(id).await.unwrap().unwrap();
    Mailbox::record_error(id, "451 try again later").await.unwrap();
    let after_second = Mailbox::get(id).await.unwrap().unwrap();

    assert_eq!(after_first.consecutive_errors, 1);
    assert_eq!(after_second.consecutive_errors, 2);
    assert!(after_second.cooldown_until.unwrap() >= after_first.cooldown_until.unwrap());
    assert_eq!(
        after_second.last_error.as_deref(),
        Some("451 try again later")
    );
}
