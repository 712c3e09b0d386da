use crate::modules::error::code::ErrorCode;
use crate::modules::rest::api::ApiTags;
use crate::modules::rest::response::DataPage;
use crate::modules::rest::ApiResult;
use crate::modules::smtp::template::entity::EmailTemplate;
use crate::modules::smtp::template::payload::{
    RenderedTemplate, TemplateCreateRequest, TemplatePreviewRequest, TemplateUpdateRequest,
};
use crate::modules::smtp::template::render::Templates;
use crate::raise_error;
use poem::web::Path;
use poem_openapi::param::Query;
use poem_openapi::payload::Json;
use poem_openapi::OpenApi;
pub struct TemplatesApi;

#[OpenApi(prefix_path = "/api/v1", tag = "ApiTags::Template")]
impl TemplatesApi {
    /// Retrieves an email template by its unique id.
    #[oai(path = "/template/:id", method = "get", operation_id = "get_template")]
    async fn get_template(
        &self,
        /// The unique id of the template.
        id: Path<u64>,
    ) -> ApiResult<Json<EmailTemplate>> {
        let id = id.0;
        let template = EmailTemplate::get(id).await?.ok_or_else(|| {
            raise_error!(
                format!("Template with id {id} not found"),
                ErrorCode::ResourceNotFound
            )
        })?;
        Ok(Json(template))
    }

    /// Deletes an email template identified by its id.
    #[oai(
        path = "/template/:id",
        method = "delete",
        operation_id = "remove_template"
    )]
    async fn remove_template(
        &self,
        /// The unique id of the template to delete.
        id: Path<u64>,
    ) -> ApiResult<()> {
        Ok(EmailTemplate::delete(id.0).await?)
    }

    /// Creates a new email template. Handlebars syntax is validated on save.
    #[oai(path = "/template", method = "post", operation_id = "create_template")]
    async fn create_template(
        &self,
        /// The template creation request payload.
        request: Json<TemplateCreateRequest>,
    ) -> ApiResult<()> {
        let entity = EmailTemplate::new(request.0);
        Ok(entity.save().await?)
    }

    /// Updates an existing email template by its id.
    #[oai(
        path = "/template/:id",
        method = "post",
        operation_id = "update_template"
    )]
    async fn update_template(
        &self,
        /// The unique id of the template to update.
        id: Path<u64>,
        /// The template update request payload.
        request: Json<TemplateUpdateRequest>,
    ) -> ApiResult<()> {
        Ok(EmailTemplate::update(id.0, request.0).await?)
    }

    /// Retrieves a paginated list of all email templates.
    #[oai(
        path = "/list-template",
        method = "get",
        operation_id = "list_template"
    )]
    async fn list_template(
        &self,
        /// Optional. The page number to retrieve (starting from 1).
        page: Query<Option<u64>>,
        /// Optional. The number of items per page.
        page_size: Query<Option<u64>>,
        /// Optional. Whether to sort the list in descending order.
        desc: Query<Option<bool>>,
    ) -> ApiResult<Json<DataPage<EmailTemplate>>> {
        Ok(Json(
            EmailTemplate::paginate_list(page.0, page_size.0, desc.0).await?,
        ))
    }

    /// Renders a template with the given variables without sending anything.
    #[oai(
        path = "/template-preview",
        method = "post",
        operation_id = "preview_template"
    )]
    async fn preview_template(
        &self,
        /// The preview request payload.
        request: Json<TemplatePreviewRequest>,
    ) -> ApiResult<Json<RenderedTemplate>> {
        let request = request.0;
        let template = EmailTemplate::get(request.template_id).await?.ok_or_else(|| {
            raise_error!(
                format!("Template with id {} not found", request.template_id),
                ErrorCode::ResourceNotFound
            )
        })?;
        let (subject, text, html) = Templates::render(&template, &request.template_params)?;
        Ok(Json(RenderedTemplate {
            subject,
            text,
            html,
        }))
    }
}
