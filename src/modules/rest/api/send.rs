use crate::modules::rest::api::ApiTags;
use crate::modules::rest::ApiResult;
use crate::modules::smtp::delivery::payload::{
    SendEmailRequest, SendMailResponse, SendTestMailRequest,
};
use crate::modules::smtp::delivery::send::{send_direct_email, send_templated_email};

use poem_openapi::payload::Json;
use poem_openapi::OpenApi;
pub struct SendMailApi;

#[OpenApi(prefix_path = "/api/v1", tag = "ApiTags::SendMail")]
impl SendMailApi {
    /// Renders a stored template and delivers it through the failover engine.
    ///
    /// The mailbox pool is tried first (least-used eligible mailbox, retried
    /// across mailboxes on failure), then the static fallback SMTP if one is
    /// configured. Intermediate retries are invisible to the caller.
    #[oai(path = "/send-mail", method = "post", operation_id = "send_mail")]
    async fn send_mail(
        &self,
        /// A JSON payload naming the template and the recipient
        request: Json<SendEmailRequest>,
    ) -> ApiResult<Json<SendMailResponse>> {
        Ok(Json(send_templated_email(request.0).await?))
    }

    /// Sends a test email, bypassing the template path.
    ///
    /// When `smtp_config` is present those credentials are tried before the
    /// pool; they are never health-tracked.
    #[oai(
        path = "/send-test-mail",
        method = "post",
        operation_id = "send_test_mail"
    )]
    async fn send_test_mail(
        &self,
        /// A JSON payload with the recipient and optional subject/body/credentials
        request: Json<SendTestMailRequest>,
    ) -> ApiResult<Json<SendMailResponse>> {
        Ok(Json(send_direct_email(request.0).await?))
    }
}
