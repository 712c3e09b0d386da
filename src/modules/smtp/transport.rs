use std::borrow::Cow;
use std::time::Duration;

use mail_send::{
    mail_builder::{headers::address::Address, MessageBuilder},
    smtp::message::IntoMessage,
    Credentials, SmtpClientBuilder,
};

use crate::modules::error::{code::ErrorCode, RustRelayResult};
use crate::modules::settings::cli::SETTINGS;
use crate::modules::smtp::client::RustRelaySmtpClient;
use crate::modules::smtp::mailbox::entity::Encryption;
use crate::modules::smtp::util::generate_message_id;
use crate::raise_error;

/// The credential shape every provider resolves to: request-supplied
/// configuration, a pooled mailbox, or the environment fallback.
/// No Debug derive: the password is plaintext here.
#[derive(Clone)]
pub struct SmtpCredentials {
    pub host: String,
    pub port: u16,
    pub encryption: Encryption,
    pub username: String,
    pub password: String,
    pub from_address: String,
    pub from_name: Option<String>,
}

/// A fully rendered message, ready to hand to any credential provider.
#[derive(Clone, Debug)]
pub struct RenderedMail {
    pub to_address: String,
    pub to_name: Option<String>,
    pub subject: String,
    pub text: Option<String>,
    pub html: Option<String>,
}

/// One connect-and-send against one SMTP endpoint. Implementations must
/// bound the whole attempt with a timeout.
pub trait MailTransport: Send + Sync {
    async fn send(&self, credentials: &SmtpCredentials, mail: &RenderedMail) -> RustRelayResult<()>;
}

pub struct SmtpTransport;

impl MailTransport for SmtpTransport {
    async fn send(&self, credentials: &SmtpCredentials, mail: &RenderedMail) -> RustRelayResult<()> {
        let from = Address::new_address(
            credentials.from_name.clone(),
            Cow::Owned(credentials.from_address.clone()),
        );
        let to = Address::new_address(mail.to_name.clone(), Cow::Owned(mail.to_address.clone()));
        let mut builder = MessageBuilder::new()
            .from(from)
            .to(to)
            .subject(mail.subject.clone())
            .message_id(generate_message_id());
        if let Some(text) = &mail.text {
            builder = builder.text_body(text.clone());
        }
        if let Some(html) = &mail.html {
            builder = builder.html_body(html.clone());
        }
        let message = builder.into_message().map_err(|e| {
            raise_error!(
                format!("Failed to build message: {}", e),
                ErrorCode::InternalError
            )
        })?;

        let timeout = Duration::from_secs(SETTINGS.rustrelay_smtp_timeout_secs);
        let client_builder = SmtpClientBuilder::new(credentials.host.clone(), credentials.port)
            .credentials(Credentials::new(
                credentials.username.clone(),
                credentials.password.clone(),
            ))
            .timeout(timeout);

        // A hung SMTP server must not pin the request: the whole
        // connect-and-send is bounded by the per-attempt timeout.
        tokio::time::timeout(timeout, async move {
            let mut client = match credentials.encryption {
                Encryption::Ssl => {
                    let client = client_builder.implicit_tls(true).connect().await.map_err(
                        |e| raise_error!(format!("{:#?}", e), ErrorCode::SmtpConnectionFailed),
                    )?;
                    RustRelaySmtpClient::Tls(client)
                }
                Encryption::StartTls => {
                    let client = client_builder.implicit_tls(false).connect().await.map_err(
                        |e| raise_error!(format!("{:#?}", e), ErrorCode::SmtpConnectionFailed),
                    )?;
                    RustRelaySmtpClient::Tls(client)
                }
                Encryption::None => {
                    let client = client_builder.connect_plain().await.map_err(|e| {
                        raise_error!(format!("{:#?}", e), ErrorCode::SmtpConnectionFailed)
                    })?;
                    RustRelaySmtpClient::Plain(client)
                }
            };
            client.send_email(message).await
        })
        .await
        .map_err(|_| {
            raise_error!(
                format!(
                    "SMTP attempt to {}:{} timed out after {}s",
                    credentials.host,
                    credentials.port,
                    timeout.as_secs()
                ),
                ErrorCode::ConnectionTimeout
            )
        })?
    }
}
