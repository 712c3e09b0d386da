use crate::modules::error::code::ErrorCode;
use crate::modules::rest::api::ApiTags;
use crate::modules::rest::response::DataPage;
use crate::modules::rest::ApiResult;
use crate::modules::smtp::mailbox::entity::Mailbox;
use crate::modules::smtp::mailbox::payload::{MailboxCreateRequest, MailboxUpdateRequest};
use crate::raise_error;
use poem::web::Path;
use poem_openapi::param::Query;
use poem_openapi::payload::Json;
use poem_openapi::OpenApi;
pub struct MailboxApi;

#[OpenApi(prefix_path = "/api/v1", tag = "ApiTags::Mailbox")]
impl MailboxApi {
    /// Retrieves a pool mailbox by its unique id, including health state.
    #[oai(path = "/mailbox/:id", method = "get", operation_id = "get_mailbox")]
    async fn get_mailbox(
        &self,
        /// The unique id of the mailbox.
        id: Path<u64>,
    ) -> ApiResult<Json<Mailbox>> {
        let id = id.0;
        let mailbox = Mailbox::get(id).await?.ok_or_else(|| {
            raise_error!(
                format!("Mailbox with id {id} not found"),
                ErrorCode::ResourceNotFound
            )
        })?;
        Ok(Json(mailbox))
    }

    /// Deletes an existing pool mailbox identified by its id.
    #[oai(
        path = "/mailbox/:id",
        method = "delete",
        operation_id = "remove_mailbox"
    )]
    async fn remove_mailbox(
        &self,
        /// The unique id of the mailbox to delete.
        id: Path<u64>,
    ) -> ApiResult<()> {
        Ok(Mailbox::delete(id.0).await?)
    }

    /// Creates a new pool mailbox. The password is encrypted before storage.
    #[oai(path = "/mailbox", method = "post", operation_id = "create_mailbox")]
    async fn create_mailbox(
        &self,
        /// The mailbox creation request payload.
        request: Json<MailboxCreateRequest>,
    ) -> ApiResult<()> {
        let entity = Mailbox::new(request.0)?;
        Ok(entity.save().await?)
    }

    /// Updates an existing pool mailbox by its id.
    #[oai(path = "/mailbox/:id", method = "post", operation_id = "update_mailbox")]
    async fn update_mailbox(
        &self,
        /// The unique id of the mailbox to update.
        id: Path<u64>,
        /// The mailbox update request payload.
        request: Json<MailboxUpdateRequest>,
    ) -> ApiResult<()> {
        Ok(Mailbox::update(id.0, request.0).await?)
    }

    /// Activates or deactivates a mailbox without touching its other fields.
    ///
    /// Deactivated mailboxes are skipped by selection but keep their health
    /// history.
    #[oai(
        path = "/mailbox/:id/active",
        method = "post",
        operation_id = "set_mailbox_active"
    )]
    async fn set_mailbox_active(
        &self,
        /// The unique id of the mailbox.
        id: Path<u64>,
        /// Whether the mailbox should participate in selection.
        active: Query<bool>,
    ) -> ApiResult<()> {
        Ok(Mailbox::set_active(id.0, active.0).await?)
    }

    /// Retrieves a paginated list of all pool mailboxes.
    #[oai(path = "/list-mailbox", method = "get", operation_id = "list_mailbox")]
    async fn list_mailbox(
        &self,
        /// Optional. The page number to retrieve (starting from 1).
        page: Query<Option<u64>>,
        /// Optional. The number of items per page.
        page_size: Query<Option<u64>>,
        /// Optional. Whether to sort the list in descending order.
        desc: Query<Option<bool>>,
    ) -> ApiResult<Json<DataPage<Mailbox>>> {
        Ok(Json(
            Mailbox::paginate_list(page.0, page_size.0, desc.0).await?,
        ))
    }
}
