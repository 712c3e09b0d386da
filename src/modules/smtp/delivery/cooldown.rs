use crate::modules::settings::cli::SETTINGS;

/// Cooldown window in milliseconds for a mailbox at the given consecutive
/// failure count: linear growth, capped. Monotonically non-decreasing so a
/// failing mailbox's exile can never shrink while it keeps failing.
pub fn cooldown_duration_ms(consecutive_errors: u32) -> i64 {
    let base = SETTINGS.rustrelay_cooldown_base_secs;
    let cap = SETTINGS.rustrelay_cooldown_max_secs;
    let scaled = base.saturating_mul(consecutive_errors.max(1) as i64);
    scaled.min(cap).saturating_mul(1000)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::settings::cli::SETTINGS;

    #[test]
    fn test_cooldown_grows_linearly_until_cap() {
        let base_ms = SETTINGS.rustrelay_cooldown_base_secs * 1000;
        assert_eq!(cooldown_duration_ms(1), base_ms);
        assert_eq!(cooldown_duration_ms(2), base_ms * 2);
    }

    #[test]
    fn test_cooldown_is_monotonic_non_decreasing() {
        let mut previous = 0;
        for errors in 1..=100 {
            let current = cooldown_duration_ms(errors);
            assert!(current >= previous);
            previous = current;
        }
    }

    #[test]
    fn test_cooldown_is_capped() {
        let cap_ms = SETTINGS.rustrelay_cooldown_max_secs * 1000;
        assert_eq!(cooldown_duration_ms(10_000), cap_ms);
    }

    #[test]
    fn test_zero_errors_still_yields_base_window() {
        let base_ms = SETTINGS.rustrelay_cooldown_base_secs * 1000;
        assert_eq!(cooldown_duration_ms(0), base_ms);
    }
}
