use crate::modules::smtp::template::entity::MessageFormat;
use poem_openapi::Object;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, Eq, PartialEq, Deserialize, Serialize, Object)]
pub struct TemplateCreateRequest {
    /// Optional stable slug so callers can send by template kind.
    #[oai(validator(max_length = 64))]
    pub kind: Option<String>,
    /// Optional description of the template for additional context.
    pub description: Option<String>,
    /// Subject line of the email template.
    #[oai(validator(max_length = 256, min_length = 1))]
    pub subject: String,
    /// Plain text content of the email, if provided.
    pub text: Option<String>,
    /// HTML content of the email, if provided.
    pub html: Option<String>,
    /// Format of the HTML email content, either Markdown or HTML.
    pub format: Option<MessageFormat>,
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Deserialize, Serialize, Object)]
pub struct TemplateUpdateRequest {
    /// Optional updated kind slug.
    #[oai(validator(max_length = 64))]
    pub kind: Option<String>,
    /// Optional updated description.
    pub description: Option<String>,
    /// Optional updated subject line.
    #[oai(validator(max_length = 256, min_length = 1))]
    pub subject: Option<String>,
    /// Optional updated plain text content.
    pub text: Option<String>,
    /// Optional updated HTML content.
    pub html: Option<String>,
    /// Optional updated content format.
    pub format: Option<MessageFormat>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, Object)]
pub struct TemplatePreviewRequest {
    /// The id of the template to render.
    pub template_id: u64,
    /// Variables substituted into the template.
    pub template_params: Option<serde_json::Value>,
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Deserialize, Serialize, Object)]
pub struct RenderedTemplate {
    pub subject: String,
    pub text: Option<String>,
    pub html: Option<String>,
}
