use crate::modules::common::paginated::paginate_vec;
use crate::modules::database::{list_all_impl, manager::DB_MANAGER};
use crate::modules::rest::api::ApiTags;
use crate::modules::rest::response::DataPage;
use crate::modules::rest::ApiResult;
use crate::modules::smtp::delivery::attempt::DeliveryAttempt;
use poem_openapi::param::Query;
use poem_openapi::payload::Json;
use poem_openapi::OpenApi;
pub struct DeliveryLogApi;

#[OpenApi(prefix_path = "/api/v1", tag = "ApiTags::DeliveryLog")]
impl DeliveryLogApi {
    /// Retrieves a paginated list of delivery attempts, newest first by
    /// default. The log is append-only; rows are never mutated.
    ///
    /// With `recipient` set, only that address's attempts are returned, which
    /// is the usual entry point when chasing a single undelivered mail.
    #[oai(
        path = "/delivery-attempts",
        method = "get",
        operation_id = "list_delivery_attempts"
    )]
    async fn list_delivery_attempts(
        &self,
        /// Optional. The page number to retrieve (starting from 1).
        page: Query<Option<u64>>,
        /// Optional. The number of items per page.
        page_size: Query<Option<u64>>,
        /// Optional. Whether to sort the list in descending order. Defaults to true.
        desc: Query<Option<bool>>,
        /// Optional. Only return attempts for this recipient address.
        recipient: Query<Option<String>>,
    ) -> ApiResult<Json<DataPage<DeliveryAttempt>>> {
        let sort_desc = desc.0.unwrap_or(true);

        if let Some(recipient) = recipient.0 {
            let all_attempts: Vec<DeliveryAttempt> =
                list_all_impl(DB_MANAGER.attempts_db()).await?;
            let mut filtered: Vec<DeliveryAttempt> = all_attempts
                .into_iter()
                .filter(|attempt| attempt.recipient == recipient)
                .collect();
            filtered.sort_by(|a, b| {
                if sort_desc {
                    b.created_at.cmp(&a.created_at)
                } else {
                    a.created_at.cmp(&b.created_at)
                }
            });
            return Ok(Json(
                paginate_vec(&filtered, page.0, page_size.0).map(DataPage::from)?,
            ));
        }

        Ok(Json(
            DeliveryAttempt::paginate_list(page.0, page_size.0, Some(sort_desc)).await?,
        ))
    }
}
