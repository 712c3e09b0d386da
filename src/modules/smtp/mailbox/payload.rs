use crate::modules::smtp::mailbox::entity::{MailboxCredentials, SmtpServerConfig};
use poem_openapi::Object;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, Eq, PartialEq, Deserialize, Serialize, Object)]
pub struct MailboxCreateRequest {
    /// Optional descriptive text about the mailbox.
    pub description: Option<String>,
    /// Credentials used for authenticating with the SMTP server.
    pub credentials: MailboxCredentials,
    /// SMTP server configuration details.
    pub server: SmtpServerConfig,
    /// Address placed in the From header of outgoing mail.
    #[oai(validator(max_length = 320, min_length = 3))]
    pub from_address: String,
    /// Optional display name for the From header.
    pub from_name: Option<String>,
    /// Whether the mailbox participates in selection. Defaults to true.
    pub active: Option<bool>,
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Deserialize, Serialize, Object)]
pub struct MailboxUpdateRequest {
    /// Optional descriptive text about the mailbox.
    pub description: Option<String>,
    /// Optional updated credentials.
    pub credentials: Option<MailboxCredentials>,
    /// Optional updated SMTP server configuration.
    pub server: Option<SmtpServerConfig>,
    /// Optional updated from-address.
    pub from_address: Option<String>,
    /// Optional updated from-name.
    pub from_name: Option<String>,
    /// Optional updated selection flag.
    pub active: Option<bool>,
}
