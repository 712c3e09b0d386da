use crate::modules::database::manager::DB_MANAGER;
use crate::modules::database::{find_impl, upsert_impl};
use crate::modules::error::RustRelayResult;
use crate::utc_now;
use native_db::*;
use native_model::{native_model, Model};
use poem_openapi::Object;
use serde::{Deserialize, Serialize};

/// Site-level key-value settings consumed by the send path for variable
/// substitution (`site_name`, `site_url`).
pub const SITE_NAME_KEY: &str = "site_name";
pub const SITE_URL_KEY: &str = "site_url";

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, Object)]
#[native_model(id = 1, version = 1)]
#[native_db]
pub struct SystemSetting {
    #[primary_key]
    pub key: String,
    pub value: String,
    pub created_at: i64,
    pub updated_at: i64,
}

impl SystemSetting {
    pub fn new(key: String, value: String) -> Self {
        Self {
            key,
            value,
            created_at: utc_now!(),
            updated_at: utc_now!(),
        }
    }
    //overwrite
    pub async fn save(&self) -> RustRelayResult<()> {
        upsert_impl(DB_MANAGER.meta_db(), self.to_owned()).await
    }

    pub fn get(key: &str) -> RustRelayResult<Option<SystemSetting>> {
        find_impl(DB_MANAGER.meta_db(), key)
    }

    pub fn get_existing_value(key: &str) -> RustRelayResult<Option<String>> {
        let setting = Self::get(key)?;
        Ok(setting.map(|s| s.value))
    }

    pub async fn save_value(key: &str, value: String) -> RustRelayResult<()> {
        let setting = Self::new(key.to_string(), value);
        setting.save().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_save_and_get_value() {
        SystemSetting::save_value("test_site_name", "TempMail".into())
            .await
            .unwrap();
        let value = SystemSetting::get_existing_value("test_site_name").unwrap();
        assert_eq!(value, Some("TempMail".to_string()));
    }

    #[tokio::test]
    async fn test_get_missing_key() {
        assert!(SystemSetting::get("test_no_such_key").unwrap().is_none());
    }

    #[tokio::test]
    async fn test_overwrite_keeps_latest_value() {
        SystemSetting::save_value("test_site_url", "https://old.example".into())
            .await
            .unwrap();
        SystemSetting::save_value("test_site_url", "https://new.example".into())
            .await
            .unwrap();
        let value = SystemSetting::get_existing_value("test_site_url").unwrap();
        assert_eq!(value, Some("https://new.example".to_string()));
    }
}
