use crate::modules::error::code::ErrorCode;
use crate::modules::error::RustRelayResult;
use crate::modules::settings::cli::SETTINGS;
use crate::modules::smtp::transport::SmtpCredentials;
use crate::raise_error;

/// The static SMTP configuration from the environment, used only once the
/// mailbox pool is exhausted. Stateless: it is never placed in cooldown and
/// is re-read fresh on every request.
pub struct EnvFallback;

impl EnvFallback {
    pub fn is_configured() -> bool {
        SETTINGS.rustrelay_fallback_smtp_host.is_some()
            && SETTINGS.rustrelay_fallback_smtp_username.is_some()
            && SETTINGS.rustrelay_fallback_smtp_password.is_some()
            && SETTINGS.rustrelay_fallback_smtp_from.is_some()
    }

    pub fn credentials() -> RustRelayResult<SmtpCredentials> {
        let missing = || {
            raise_error!(
                "Fallback SMTP configuration is incomplete: host, username, password and from-address are all required.".into(),
                ErrorCode::MissingConfiguration
            )
        };
        Ok(SmtpCredentials {
            host: SETTINGS
                .rustrelay_fallback_smtp_host
                .clone()
                .ok_or_else(missing)?,
            port: SETTINGS.rustrelay_fallback_smtp_port,
            encryption: SETTINGS.rustrelay_fallback_smtp_encryption,
            username: SETTINGS
                .rustrelay_fallback_smtp_username
                .clone()
                .ok_or_else(missing)?,
            password: SETTINGS
                .rustrelay_fallback_smtp_password
                .clone()
                .ok_or_else(missing)?,
            from_address: SETTINGS
                .rustrelay_fallback_smtp_from
                .clone()
                .ok_or_else(missing)?,
            from_name: None,
        })
    }
}
