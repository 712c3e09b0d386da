use crate::modules::smtp::mailbox::entity::Encryption;
use clap::{builder::ValueParser, Parser};
use std::{collections::HashSet, path::PathBuf, sync::LazyLock};

#[cfg(not(test))]
pub static SETTINGS: LazyLock<Settings> = LazyLock::new(Settings::parse);

#[cfg(test)]
pub static SETTINGS: LazyLock<Settings> = LazyLock::new(Settings::new_for_test);

#[derive(Debug, Parser)]
#[clap(
    name = "rustrelay",
    about = "Outbound mail delivery engine with SMTP mailbox pooling,
    health-based failover and cooldown tracking, driven over a REST API.",
    version = env!("CARGO_PKG_VERSION")
)]
pub struct Settings {
    /// rustrelay log level (default: "info")
    #[clap(
        long,
        default_value = "info",
        env,
        help = "Set the log level for rustrelay"
    )]
    pub rustrelay_log_level: String,

    /// rustrelay HTTP port (default: 15720)
    #[clap(
        long,
        default_value = "15720",
        env,
        help = "Set the HTTP port for rustrelay"
    )]
    pub rustrelay_http_port: i32,

    /// The IP address that the server binds to, in IPv4 format (e.g., 192.168.1.1).
    #[clap(
        long,
        env,
        default_value = "0.0.0.0",
        help = "The IP address that the server binds to, in IPv4 format (e.g., 192.168.1.1).",
        value_parser = ValueParser::new(|s: &str| {
            if s.parse::<std::net::Ipv4Addr>().is_err() {
                return Err("The bind IP address must be a valid IPv4 address.".to_string());
            }
            Ok(s.to_string())
        })
    )]
    pub rustrelay_bind_ip: Option<String>,

    /// CORS allowed origins (default: "*")
    #[clap(
        long,
        default_value = "*",
        env,
        help = "Set the allowed CORS origins (comma-separated list, e.g., \"https://example.com, https://another.com\")",
        value_parser = ValueParser::new(|s: &str| -> Result<HashSet<String>, String> {
            let set: HashSet<String> = s.split(',')
                .map(|origin| origin.trim().to_string())
                .filter(|origin| !origin.is_empty())
                .collect();
            Ok(set)
        })
    )]
    pub rustrelay_cors_origins: HashSet<String>,

    /// CORS max age in seconds (default: 86400)
    #[clap(
        long,
        default_value = "86400",
        env,
        help = "Set the CORS max age in seconds"
    )]
    pub rustrelay_cors_max_age: i32,

    /// Enable ANSI logs (default: true)
    #[clap(long, default_value = "true", env, help = "Enable ANSI formatted logs")]
    pub rustrelay_ansi_logs: bool,

    /// Enable log file output (default: false)
    /// If false, logs will be printed to stdout
    #[clap(
        long,
        default_value = "false",
        env,
        help = "Enable log file output (otherwise logs go to stdout)"
    )]
    pub rustrelay_log_to_file: bool,

    /// Maximum number of log files (default: 5)
    #[clap(
        long,
        default_value = "5",
        env,
        help = "Set the maximum number of server log files"
    )]
    pub rustrelay_max_server_log_files: usize,

    /// rustrelay encryption password
    #[clap(
        long,
        default_value = "change-this-default-password-now",
        env,
        help = "Set the encryption password for mailbox secrets. ⚠️ Change this default in production!"
    )]
    pub rustrelay_encrypt_password: String,

    #[clap(
        long,
        env,
        help = "Set the data directory for the rustrelay databases",
        value_parser = ValueParser::new(|s: &str| {
            let path = PathBuf::from(s);
            if !path.is_absolute() {
                return Err("Path must be an absolute directory path".to_string());
            }
            if !path.exists() {
                return Err(format!("Path {:?} does not exist", path));
            }
            if !path.is_dir() {
                return Err(format!("Path {:?} is not a directory", path));
            }
            Ok(s.to_string())
        })
    )]
    pub rustrelay_root_dir: String,

    #[clap(
        long,
        env,
        default_value = "134217728",
        help = "Set the cache size for the rustrelay metadata database in bytes"
    )]
    pub rustrelay_metadata_cache_size: Option<usize>,

    #[clap(
        long,
        env,
        default_value = "67108864",
        help = "Set the cache size for the delivery attempt log database in bytes"
    )]
    pub rustrelay_attempt_log_cache_size: Option<usize>,

    #[clap(
        long,
        env,
        default_value = "false",
        help = "Keep all databases in memory (testing only; nothing is persisted)"
    )]
    pub rustrelay_memory_mode_enabled: bool,

    #[clap(
        long,
        default_value = "true",
        env,
        help = "Enable compression for the open api server"
    )]
    pub rustrelay_http_compression_enabled: bool,

    /// Upper bound on mailbox-pool attempts for one delivery request,
    /// independent of pool size.
    #[clap(
        long,
        default_value = "5",
        env,
        help = "Set the maximum number of mailbox-pool send attempts per delivery request",
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub rustrelay_max_send_attempts: u32,

    /// Fixed delay between failover attempts. Deliberately not exponential:
    /// retries go to a different mailbox, not back to the one that failed.
    #[clap(
        long,
        default_value = "500",
        env,
        help = "Set the fixed delay in milliseconds between send attempts"
    )]
    pub rustrelay_retry_delay_ms: u64,

    #[clap(
        long,
        default_value = "30",
        env,
        help = "Set the timeout in seconds for a single SMTP connect-and-send attempt",
        value_parser = clap::value_parser!(u64).range(5..)
    )]
    pub rustrelay_smtp_timeout_secs: u64,

    #[clap(
        long,
        default_value = "300",
        env,
        help = "Set the cooldown in seconds applied after a mailbox's first consecutive failure; grows linearly with further failures",
        value_parser = clap::value_parser!(i64).range(1..)
    )]
    pub rustrelay_cooldown_base_secs: i64,

    #[clap(
        long,
        default_value = "3600",
        env,
        help = "Set the upper bound in seconds for a mailbox cooldown window",
        value_parser = clap::value_parser!(i64).range(1..)
    )]
    pub rustrelay_cooldown_max_secs: i64,

    #[clap(
        long,
        env,
        help = "Set the SMTP host of the static fallback used when the mailbox pool is exhausted"
    )]
    pub rustrelay_fallback_smtp_host: Option<String>,

    #[clap(
        long,
        default_value = "587",
        env,
        help = "Set the SMTP port of the static fallback"
    )]
    pub rustrelay_fallback_smtp_port: u16,

    #[clap(
        long,
        env,
        help = "Set the SMTP username of the static fallback"
    )]
    pub rustrelay_fallback_smtp_username: Option<String>,

    #[clap(
        long,
        env,
        help = "Set the SMTP password of the static fallback (plaintext, environment only)"
    )]
    pub rustrelay_fallback_smtp_password: Option<String>,

    #[clap(
        long,
        env,
        help = "Set the from-address used by the static fallback"
    )]
    pub rustrelay_fallback_smtp_from: Option<String>,

    #[clap(
        long,
        default_value = "start-tls",
        env,
        help = "Set the connection encryption of the static fallback (ssl, start-tls, none)"
    )]
    pub rustrelay_fallback_smtp_encryption: Encryption,
}

impl Settings {
    #[cfg(test)]
    fn new_for_test() -> Self {
        Self {
            rustrelay_log_level: "info".to_string(),
            rustrelay_http_port: 15720,
            rustrelay_bind_ip: Default::default(),
            rustrelay_cors_origins: Default::default(),
            rustrelay_cors_max_age: 86400,
            rustrelay_ansi_logs: false,
            rustrelay_log_to_file: false,
            rustrelay_max_server_log_files: 5,
            rustrelay_encrypt_password: "change-this-default-password-now".into(),
            rustrelay_root_dir: std::env::temp_dir()
                .join("rustrelay_test_data")
                .to_string_lossy()
                .into_owned(),
            rustrelay_metadata_cache_size: None,
            rustrelay_attempt_log_cache_size: None,
            rustrelay_memory_mode_enabled: true,
            rustrelay_http_compression_enabled: true,
            rustrelay_max_send_attempts: 5,
            rustrelay_retry_delay_ms: 0,
            rustrelay_smtp_timeout_secs: 30,
            rustrelay_cooldown_base_secs: 300,
            rustrelay_cooldown_max_secs: 3600,
            rustrelay_fallback_smtp_host: None,
            rustrelay_fallback_smtp_port: 587,
            rustrelay_fallback_smtp_username: None,
            rustrelay_fallback_smtp_password: None,
            rustrelay_fallback_smtp_from: None,
            rustrelay_fallback_smtp_encryption: Encryption::StartTls,
        }
    }
}
