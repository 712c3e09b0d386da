use attempts::DeliveryLogApi;
use mailbox::MailboxApi;
use poem_openapi::{OpenApiService, Tags};
use send::SendMailApi;
use system::SystemApi;
use templates::TemplatesApi;

use crate::rustrelay_version;

pub mod attempts;
pub mod mailbox;
pub mod send;
pub mod system;
pub mod templates;

#[derive(Tags)]
pub enum ApiTags {
    Mailbox,
    Template,
    SendMail,
    DeliveryLog,
    System,
}

type RustRelayOpenApi = (MailboxApi, TemplatesApi, SendMailApi, DeliveryLogApi, SystemApi);

pub fn create_openapi_service() -> OpenApiService<RustRelayOpenApi, ()> {
    OpenApiService::new(
        (
            MailboxApi,
            TemplatesApi,
            SendMailApi,
            DeliveryLogApi,
            SystemApi,
        ),
        "RustRelayApi",
        rustrelay_version!(),
    )
}
