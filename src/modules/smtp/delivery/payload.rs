use std::collections::HashMap;

use poem_openapi::Object;
use serde::{Deserialize, Serialize};

use crate::modules::error::code::ErrorCode;
use crate::modules::error::RustRelayResult;
use crate::modules::smtp::mailbox::entity::Encryption;
use crate::modules::smtp::transport::SmtpCredentials;
use crate::{raise_error, validate_email};

#[derive(Clone, Debug, Default, Eq, PartialEq, Deserialize, Serialize, Object)]
pub struct SendEmailRequest {
    /// Template to render, by id. Either this or `template_kind` is required.
    pub template_id: Option<u64>,
    /// Template to render, by kind slug (e.g. "welcome").
    pub template_kind: Option<String>,
    /// The email address of the recipient.
    pub recipient_email: String,
    /// Optional display name of the recipient, also exposed to the template.
    pub recipient_name: Option<String>,
    /// Extra variables merged into the template data.
    pub custom_variables: Option<HashMap<String, String>>,
}

impl SendEmailRequest {
    pub fn validate(&self) -> RustRelayResult<()> {
        validate_email!(&self.recipient_email)?;
        if self.template_id.is_none() && self.template_kind.is_none() {
            return Err(raise_error!(
                "Either 'template_id' or 'template_kind' must be provided.".into(),
                ErrorCode::InvalidParameter
            ));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Deserialize, Serialize, Object)]
pub struct SmtpConfigPayload {
    /// Hostname or IP address of the SMTP server.
    pub host: String,
    /// Port number on which the SMTP server listens.
    pub port: u16,
    /// Connection encryption method.
    pub encryption: Encryption,
    /// Username for SMTP authentication.
    pub username: String,
    /// Password for SMTP authentication (plaintext; direct sends only).
    pub password: String,
    /// Address placed in the From header.
    pub from_address: String,
    /// Optional display name for the From header.
    pub from_name: Option<String>,
}

impl SmtpConfigPayload {
    pub fn into_credentials(self) -> SmtpCredentials {
        SmtpCredentials {
            host: self.host,
            port: self.port,
            encryption: self.encryption,
            username: self.username,
            password: self.password,
            from_address: self.from_address,
            from_name: self.from_name,
        }
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Deserialize, Serialize, Object)]
pub struct SendTestMailRequest {
    /// The email address of the recipient.
    pub recipient_email: String,
    /// Subject line; a default test subject is used when omitted.
    #[oai(validator(max_length = 256))]
    pub subject: Option<String>,
    /// Plain text body; a default test body is used when omitted.
    #[oai(validator(max_length = 4096))]
    pub body: Option<String>,
    /// Credentials to try before the pool. When omitted, the send goes
    /// through the regular pool-and-fallback path.
    pub smtp_config: Option<SmtpConfigPayload>,
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Deserialize, Serialize, Object)]
pub struct SendMailResponse {
    pub success: bool,
    pub message: String,
    /// The rendered subject that went out.
    pub subject: String,
    /// Human-readable description of the delivery path taken.
    pub details: Option<String>,
}
