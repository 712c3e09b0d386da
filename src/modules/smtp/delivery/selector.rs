use ahash::AHashSet;

use crate::modules::error::RustRelayResult;
use crate::modules::smtp::mailbox::entity::Mailbox;
use crate::utc_now;

pub struct MailboxSelector;

impl MailboxSelector {
    /// Pick the next eligible mailbox for a delivery request.
    ///
    /// Eligible means active, outside any cooldown window, and not already
    /// tried in this request. Ordering is deterministic: least-used first,
    /// then fewest consecutive errors, then stalest cooldown (never-cooled
    /// mailboxes first), then lowest id.
    ///
    /// `Ok(None)` is not an error: it tells the orchestrator the pool is
    /// exhausted and the fallback path is next. Selection has no side
    /// effects; concurrent requests may pick the same mailbox.
    pub async fn select_next(excluded: &AHashSet<u64>) -> RustRelayResult<Option<Mailbox>> {
        let now = utc_now!();
        let mut candidates: Vec<Mailbox> = Mailbox::list_all()
            .await?
            .into_iter()
            .filter(|mailbox| mailbox.selectable(now) && !excluded.contains(&mailbox.id))
            .collect();
        candidates.sort_by_key(|mailbox| {
            (
                mailbox.sent_count,
                mailbox.consecutive_errors,
                mailbox.cooldown_until.unwrap_or(i64::MIN),
                mailbox.id,
            )
        });
        Ok(candidates.into_iter().next())
    }
}
