use crate::modules::database::manager::DB_MANAGER;
use crate::modules::database::{
    delete_impl, list_all_impl, paginate_query_primary_scan_all_impl, secondary_find_impl,
    update_impl,
};
use crate::modules::error::code::ErrorCode;
use crate::modules::rest::response::DataPage;
use crate::modules::smtp::delivery::cooldown::cooldown_duration_ms;
use crate::modules::smtp::mailbox::payload::{MailboxCreateRequest, MailboxUpdateRequest};
use crate::modules::smtp::transport::SmtpCredentials;
use crate::{decrypt, encrypt, id, raise_error};
use crate::{modules::database::insert_impl, modules::error::RustRelayResult, utc_now};
use clap::ValueEnum;
use native_db::*;
use native_model::{native_model, Model};
use poem_openapi::{Enum, Object};
use serde::{Deserialize, Serialize};

/// One send-capable SMTP credential set of the delivery pool.
///
/// The delivery engine mutates health and usage fields only through
/// `record_success` and `record_error`; everything else is operator CRUD.
#[derive(Clone, Debug, Default, Eq, PartialEq, Deserialize, Serialize, Object)]
#[native_model(id = 2, version = 1)]
#[native_db(primary_key(pk -> String))]
pub struct Mailbox {
    #[secondary_key(unique)]
    pub id: u64,
    /// Optional descriptive text about the mailbox.
    pub description: Option<String>,

    /// Credentials used for authenticating with the SMTP server.
    pub credentials: MailboxCredentials,

    /// SMTP server configuration details.
    pub server: SmtpServerConfig,

    /// Address placed in the From header of outgoing mail.
    pub from_address: String,

    /// Optional display name for the From header.
    pub from_name: Option<String>,

    /// Whether the mailbox participates in selection.
    pub active: bool,

    /// Number of messages successfully sent through this mailbox.
    pub sent_count: u64,

    /// Consecutive failures since the last successful send.
    pub consecutive_errors: u32,

    /// Timestamp (Unix epoch milliseconds) until which the mailbox is
    /// excluded from selection. `None` means no cooldown.
    pub cooldown_until: Option<i64>,

    /// Message of the most recent failure, for operator diagnosis.
    pub last_error: Option<String>,

    /// Timestamp (Unix epoch milliseconds) when the mailbox was created.
    pub created_at: i64,

    /// Timestamp (Unix epoch milliseconds) when the mailbox was last updated.
    pub updated_at: i64,

    /// Timestamp (Unix epoch milliseconds) of the last successful send.
    pub last_sent_at: i64,
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize, Object)]
pub struct MailboxCredentials {
    /// Username for SMTP authentication.
    #[oai(validator(min_length = 1, max_length = 256))]
    pub username: String,

    /// Password for SMTP authentication.
    ///
    /// Users should provide a plaintext password (1 to 256 characters).
    /// The server will encrypt the password using AES-256-GCM and securely store it.
    /// The plaintext password is never stored, so users must remember it for authentication.
    #[oai(validator(min_length = 1, max_length = 256))]
    pub password: Option<String>,
}

impl MailboxCredentials {
    pub fn encrypt(self) -> RustRelayResult<Self> {
        let password = &self.password.ok_or_else(|| {
            raise_error!(
                "Password is required for creating a mailbox.".into(),
                ErrorCode::InternalError
            )
        })?;

        Ok(Self {
            username: self.username,
            password: Some(encrypt!(password)?),
        })
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize, Object)]
pub struct SmtpServerConfig {
    /// Hostname or IP address of the SMTP server.
    #[oai(validator(max_length = 253, pattern = r"^[a-zA-Z0-9\-\.]+$"))]
    pub host: String,

    /// Port number on which the SMTP server listens.
    #[oai(validator(minimum(value = "1"), maximum(value = "65535")))]
    pub port: u16,

    /// Connection encryption method
    pub encryption: Encryption,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize, Enum, ValueEnum)]
pub enum Encryption {
    Ssl,
    #[default]
    StartTls,
    None,
}

impl Mailbox {
    fn pk(&self) -> String {
        format!("{}_{}", self.created_at, self.id)
    }

    pub fn new(value: MailboxCreateRequest) -> RustRelayResult<Self> {
        Ok(Self {
            id: id!(64),
            description: value.description,
            credentials: value.credentials.encrypt()?,
            server: value.server,
            from_address: value.from_address,
            from_name: value.from_name,
            active: value.active.unwrap_or(true),
            sent_count: 0,
            consecutive_errors: 0,
            cooldown_until: None,
            last_error: None,
            created_at: utc_now!(),
            updated_at: utc_now!(),
            last_sent_at: Default::default(),
        })
    }

    /// Selection eligibility: active and not inside a cooldown window.
    pub fn selectable(&self, now: i64) -> bool {
        self.active && self.cooldown_until.map_or(true, |until| now >= until)
    }

    /// Resolve the decrypted connection parameters for the transport.
    pub fn smtp_credentials(&self) -> RustRelayResult<SmtpCredentials> {
        let encrypted_password = self.credentials.password.as_ref().ok_or_else(|| {
            raise_error!(
                format!("mailbox {} has no stored password", self.id),
                ErrorCode::MissingConfiguration
            )
        })?;
        Ok(SmtpCredentials {
            host: self.server.host.clone(),
            port: self.server.port,
            encryption: self.server.encryption,
            username: self.credentials.username.clone(),
            password: decrypt!(encrypted_password)?,
            from_address: self.from_address.clone(),
            from_name: self.from_name.clone(),
        })
    }

    pub async fn paginate_list(
        page: Option<u64>,
        page_size: Option<u64>,
        desc: Option<bool>,
    ) -> RustRelayResult<DataPage<Mailbox>> {
        paginate_query_primary_scan_all_impl(DB_MANAGER.meta_db(), page, page_size, desc)
            .await
            .map(DataPage::from)
    }

    pub async fn list_all() -> RustRelayResult<Vec<Mailbox>> {
        list_all_impl(DB_MANAGER.meta_db()).await
    }

    pub async fn get(id: u64) -> RustRelayResult<Option<Mailbox>> {
        secondary_find_impl(DB_MANAGER.meta_db(), MailboxKey::id, id).await
    }

    pub async fn delete(id: u64) -> RustRelayResult<()> {
        delete_impl(DB_MANAGER.meta_db(), move |rw| {
            rw.get()
                .secondary::<Mailbox>(MailboxKey::id, id)
                .map_err(|e| raise_error!(format!("{:#?}", e), ErrorCode::InternalError))?
                .ok_or_else(|| {
                    raise_error!(
                        format!("The mailbox with id={id} that you want to delete was not found."),
                        ErrorCode::ResourceNotFound
                    )
                })
        })
        .await
    }

    pub async fn save(self) -> RustRelayResult<()> {
        insert_impl(DB_MANAGER.meta_db(), self).await
    }

    pub async fn update(id: u64, request: MailboxUpdateRequest) -> RustRelayResult<()> {
        update_impl(
            DB_MANAGER.meta_db(),
            move |rw| {
                rw.get()
                    .secondary::<Mailbox>(MailboxKey::id, id)
                    .map_err(|e| raise_error!(format!("{:#?}", e), ErrorCode::InternalError))?
                    .ok_or_else(|| {
                        raise_error!(
                            format!(
                                "The mailbox with id={id} that you want to modify was not found."
                            ),
                            ErrorCode::ResourceNotFound
                        )
                    })
            },
            |current| apply_update(current, request),
        )
        .await?;

        Ok(())
    }

    pub async fn set_active(id: u64, active: bool) -> RustRelayResult<()> {
        update_impl(
            DB_MANAGER.meta_db(),
            move |rw| {
                rw.get()
                    .secondary::<Mailbox>(MailboxKey::id, id)
                    .map_err(|e| raise_error!(format!("{:#?}", e), ErrorCode::InternalError))?
                    .ok_or_else(|| {
                        raise_error!(
                            format!("Mailbox with id={id} not found."),
                            ErrorCode::ResourceNotFound
                        )
                    })
            },
            move |current| {
                let mut new = current.clone();
                new.active = active;
                new.updated_at = utc_now!();
                Ok(new)
            },
        )
        .await?;

        Ok(())
    }

    /// Reset the mailbox health after a successful send. Runs as a single
    /// read-modify-write transaction so concurrent requests cannot lose
    /// updates.
    pub async fn record_success(id: u64) -> RustRelayResult<()> {
        update_impl(
            DB_MANAGER.meta_db(),
            move |rw| {
                rw.get()
                    .secondary::<Mailbox>(MailboxKey::id, id)
                    .map_err(|e| raise_error!(format!("{:#?}", e), ErrorCode::InternalError))?
                    .ok_or_else(|| {
                        raise_error!(
                            format!("Mailbox with id={id} not found."),
                            ErrorCode::ResourceNotFound
                        )
                    })
            },
            |current| {
                let mut new = current.clone();
                new.sent_count += 1;
                new.consecutive_errors = 0;
                new.cooldown_until = None;
                new.last_error = None;
                new.last_sent_at = utc_now!();
                Ok(new)
            },
        )
        .await?;

        Ok(())
    }

    /// Count a failure against the mailbox and extend its cooldown. The
    /// cooldown window is derived from the post-increment error count, so
    /// repeated failures never shorten the exile.
    pub async fn record_error(id: u64, message: &str) -> RustRelayResult<()> {
        let message = message.to_string();
        update_impl(
            DB_MANAGER.meta_db(),
            move |rw| {
                rw.get()
                    .secondary::<Mailbox>(MailboxKey::id, id)
                    .map_err(|e| raise_error!(format!("{:#?}", e), ErrorCode::InternalError))?
                    .ok_or_else(|| {
                        raise_error!(
                            format!("Mailbox with id={id} not found."),
                            ErrorCode::ResourceNotFound
                        )
                    })
            },
            move |current| {
                let mut new = current.clone();
                new.consecutive_errors = current.consecutive_errors.saturating_add(1);
                new.cooldown_until =
                    Some(utc_now!() + cooldown_duration_ms(new.consecutive_errors));
                new.last_error = Some(message);
                Ok(new)
            },
        )
        .await?;

        Ok(())
    }
}

fn apply_update(old: &Mailbox, request: MailboxUpdateRequest) -> RustRelayResult<Mailbox> {
    let mut new = old.clone();
    if let Some(credentials) = request.credentials {
        new.credentials.username = credentials.username;
        if let Some(password) = credentials.password {
            new.credentials.password = Some(encrypt!(&password)?);
        }
    }
    if let Some(server) = request.server {
        new.server = server;
    }
    if let Some(description) = request.description {
        new.description = Some(description);
    }
    if let Some(from_address) = request.from_address {
        new.from_address = from_address;
    }
    if let Some(from_name) = request.from_name {
        new.from_name = Some(from_name);
    }
    if let Some(active) = request.active {
        new.active = active;
    }

    new.updated_at = utc_now!();
    Ok(new)
}
