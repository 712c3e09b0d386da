use crate::modules::database::manager::DB_MANAGER;
use crate::modules::database::{
    delete_impl, insert_impl, list_all_impl, paginate_query_primary_scan_all_impl,
    secondary_find_impl, update_impl,
};
use crate::modules::error::code::ErrorCode;
use crate::modules::rest::response::DataPage;
use crate::modules::smtp::template::payload::{TemplateCreateRequest, TemplateUpdateRequest};
use crate::{id, raise_error};
use crate::{modules::error::RustRelayResult, utc_now};
use handlebars::Handlebars;
use native_db::*;
use native_model::{native_model, Model};
use poem_openapi::{Enum, Object};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, Eq, PartialEq, Deserialize, Serialize, Object)]
#[native_model(id = 3, version = 1)]
#[native_db(primary_key(pk -> String))]
pub struct EmailTemplate {
    /// Unique identifier for the template, used as a secondary key.
    #[secondary_key(unique)]
    pub id: u64,
    /// Optional stable slug so callers can send by template kind (e.g.
    /// "welcome", "password_reset") instead of by id.
    pub kind: Option<String>,
    /// Optional description of the template for additional context.
    pub description: Option<String>,
    /// Subject line of the email template.
    pub subject: String,
    /// Plain text content of the email, if provided.
    pub text: Option<String>,
    /// HTML content of the email, if provided.
    pub html: Option<String>,
    /// Format of the HTML email content, either Markdown or HTML. Defaults to HTML if not specified.
    pub format: Option<MessageFormat>,
    /// Timestamp of when the template was created (in Unix epoch milliseconds).
    pub created_at: i64,
    /// Timestamp of when the template was last updated (in Unix epoch milliseconds).
    pub updated_at: i64,
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Deserialize, Serialize, Enum)]
pub enum MessageFormat {
    /// Content is formatted in Markdown.
    Markdown,
    /// Content is formatted in HTML (default).
    #[default]
    Html,
}

impl EmailTemplate {
    fn pk(&self) -> String {
        format!("{}_{}", self.created_at, self.id)
    }

    pub fn new(value: TemplateCreateRequest) -> Self {
        Self {
            id: id!(96),
            kind: value.kind,
            description: value.description,
            subject: value.subject,
            html: value.html,
            text: value.text,
            format: value.format,
            created_at: utc_now!(),
            updated_at: utc_now!(),
        }
    }

    pub async fn paginate_list(
        page: Option<u64>,
        page_size: Option<u64>,
        desc: Option<bool>,
    ) -> RustRelayResult<DataPage<EmailTemplate>> {
        paginate_query_primary_scan_all_impl(DB_MANAGER.meta_db(), page, page_size, desc)
            .await
            .map(DataPage::from)
    }

    pub async fn get(id: u64) -> RustRelayResult<Option<EmailTemplate>> {
        secondary_find_impl(DB_MANAGER.meta_db(), EmailTemplateKey::id, id).await
    }

    /// Resolve a template by its kind slug. Template counts are small, so a
    /// primary scan is fine here.
    pub async fn find_by_kind(kind: &str) -> RustRelayResult<Option<EmailTemplate>> {
        let templates: Vec<EmailTemplate> = list_all_impl(DB_MANAGER.meta_db()).await?;
        Ok(templates
            .into_iter()
            .find(|template| template.kind.as_deref() == Some(kind)))
    }

    pub async fn save(self) -> RustRelayResult<()> {
        self.validate_templates()?;
        if let Some(kind) = &self.kind {
            if Self::find_by_kind(kind).await?.is_some() {
                return Err(raise_error!(
                    format!("A template with kind '{kind}' already exists"),
                    ErrorCode::AlreadyExists
                ));
            }
        }
        insert_impl(DB_MANAGER.meta_db(), self).await
    }

    pub async fn delete(id: u64) -> RustRelayResult<()> {
        delete_impl(DB_MANAGER.meta_db(), move |rw| {
            rw.get()
                .secondary::<EmailTemplate>(EmailTemplateKey::id, id)
                .map_err(|e| raise_error!(format!("{:#?}", e), ErrorCode::InternalError))?
                .ok_or_else(|| {
                    raise_error!(
                        format!("The template with id={id} that you want to delete was not found."),
                        ErrorCode::ResourceNotFound
                    )
                })
        })
        .await
    }

    pub async fn update(id: u64, request: TemplateUpdateRequest) -> RustRelayResult<()> {
        update_impl(
            DB_MANAGER.meta_db(),
            move |rw| {
                rw.get()
                    .secondary::<EmailTemplate>(EmailTemplateKey::id, id)
                    .map_err(|e| raise_error!(format!("{:#?}", e), ErrorCode::InternalError))?
                    .ok_or_else(|| {
                        raise_error!(
                            format!(
                                "The template with id={id} that you want to modify was not found."
                            ),
                            ErrorCode::ResourceNotFound
                        )
                    })
            },
            |current| {
                let new = apply_update(current, request)?;
                new.validate_templates()?;
                Ok(new)
            },
        )
        .await?;

        Ok(())
    }

    /// Reject templates whose handlebars sources do not compile, so broken
    /// syntax is caught at save time instead of at send time.
    fn validate_templates(&self) -> RustRelayResult<()> {
        let mut handlebars = Handlebars::new();
        let mut register = |name: &str, content: &str| {
            handlebars
                .register_template_string(name, content)
                .map_err(|e| {
                    raise_error!(
                        format!("Template '{name}' is not valid handlebars: {e}"),
                        ErrorCode::InvalidParameter
                    )
                })
        };
        register("subject", &self.subject)?;
        if let Some(text) = &self.text {
            register("text", text)?;
        }
        if let Some(html) = &self.html {
            register("html", html)?;
        }
        Ok(())
    }
}

fn apply_update(old: &EmailTemplate, request: TemplateUpdateRequest) -> RustRelayResult<EmailTemplate> {
    let mut new = old.clone();
    if let Some(kind) = request.kind {
        new.kind = Some(kind);
    }
    if let Some(description) = request.description {
        new.description = Some(description);
    }
    if let Some(subject) = request.subject {
        new.subject = subject;
    }
    if let Some(text) = request.text {
        new.text = Some(text);
    }
    if let Some(html) = request.html {
        new.html = Some(html);
    }
    if let Some(format) = request.format {
        new.format = Some(format);
    }
    new.updated_at = utc_now!();
    Ok(new)
}
