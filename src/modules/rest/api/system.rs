use crate::modules::error::code::ErrorCode;
use crate::modules::rest::api::ApiTags;
use crate::modules::rest::ApiResult;
use crate::modules::settings::system::SystemSetting;
use crate::raise_error;
use poem::web::Path;
use poem_openapi::payload::{Json, PlainText};
use poem_openapi::OpenApi;
pub struct SystemApi;

#[OpenApi(prefix_path = "/api/v1", tag = "ApiTags::System")]
impl SystemApi {
    /// Retrieves a system setting by its key.
    ///
    /// The send path reads `site_name` and `site_url` from here for template
    /// variable substitution.
    #[oai(
        path = "/system-setting/:key",
        method = "get",
        operation_id = "get_system_setting"
    )]
    async fn get_system_setting(
        &self,
        /// The setting key.
        key: Path<String>,
    ) -> ApiResult<Json<SystemSetting>> {
        let key = key.0;
        let setting = SystemSetting::get(&key)?.ok_or_else(|| {
            raise_error!(
                format!("System setting '{key}' not found"),
                ErrorCode::ResourceNotFound
            )
        })?;
        Ok(Json(setting))
    }

    /// Creates or overwrites a system setting.
    #[oai(
        path = "/system-setting/:key",
        method = "post",
        operation_id = "save_system_setting"
    )]
    async fn save_system_setting(
        &self,
        /// The setting key.
        key: Path<String>,
        /// The setting value as plain text.
        value: PlainText<String>,
    ) -> ApiResult<()> {
        Ok(SystemSetting::save_value(&key.0, value.0).await?)
    }
}
