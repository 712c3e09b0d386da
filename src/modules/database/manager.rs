use crate::modules::database::{ATTEMPT_MODELS, META_MODELS};
use crate::modules::error::{code::ErrorCode, RustRelayError, RustRelayResult};
use crate::modules::settings::cli::SETTINGS;
use crate::modules::settings::dir::DATA_DIR_MANAGER;
use crate::modules::Initialize;
use crate::raise_error;
use native_db::{Builder, Database};
use std::sync::{Arc, LazyLock};
use tracing::info;

pub static DB_MANAGER: LazyLock<DatabaseManager> = LazyLock::new(DatabaseManager::new);

pub struct DatabaseManager {
    /// Metadata database instance (mailboxes, templates, settings)
    meta_db: Arc<Database<'static>>,
    /// Append-only delivery attempt log instance
    attempts_db: Arc<Database<'static>>,
}

impl DatabaseManager {
    fn new() -> Self {
        let meta_db = Self::init_meta_database().expect("Failed to initialize metadata database");
        let attempts_db =
            Self::init_attempts_database().expect("Failed to initialize attempt log database");
        DatabaseManager {
            meta_db,
            attempts_db,
        }
    }

    /// Get a reference to the metadata database
    pub fn meta_db(&self) -> &Arc<Database<'static>> {
        &self.meta_db
    }

    /// Get a reference to the delivery attempt log database
    pub fn attempts_db(&self) -> &Arc<Database<'static>> {
        &self.attempts_db
    }

    fn init_meta_database() -> RustRelayResult<Arc<Database<'static>>> {
        if SETTINGS.rustrelay_memory_mode_enabled {
            return Ok(Arc::new(
                Builder::new().create_in_memory(&META_MODELS).unwrap(),
            ));
        }
        let mut database = Builder::new()
            .set_cache_size(
                SETTINGS
                    .rustrelay_metadata_cache_size
                    .unwrap_or(134217728)
                    .max(67108864),
            ) //default 128MB
            .create(&META_MODELS, DATA_DIR_MANAGER.meta_db.clone())
            .map_err(Self::handle_database_error)?;
        database
            .compact()
            .map_err(|e| raise_error!(format!("{:#?}", e), ErrorCode::InternalError))?;
        Ok(Arc::new(database))
    }

    fn init_attempts_database() -> RustRelayResult<Arc<Database<'static>>> {
        if SETTINGS.rustrelay_memory_mode_enabled {
            return Ok(Arc::new(
                Builder::new().create_in_memory(&ATTEMPT_MODELS).unwrap(),
            ));
        }
        info!(
            "Initializing attempt log database at: {:?}",
            &DATA_DIR_MANAGER.attempts_db
        );
        let mut database = Builder::new()
            .set_cache_size(
                SETTINGS
                    .rustrelay_attempt_log_cache_size
                    .unwrap_or(67108864)
                    .max(33554432),
            ) //default 64MB
            .create(&ATTEMPT_MODELS, DATA_DIR_MANAGER.attempts_db.clone())
            .map_err(Self::handle_database_error)?;
        database
            .compact()
            .map_err(|e| raise_error!(format!("{:#?}", e), ErrorCode::InternalError))?;
        Ok(Arc::new(database))
    }

    fn handle_database_error(error: native_db::db_type::Error) -> RustRelayError {
        match error {
            native_db::db_type::Error::RedbDatabaseError(database_error) => match database_error {
                redb::DatabaseError::DatabaseAlreadyOpen => {
                    raise_error!(
                        "Database is already open by another instance".into(),
                        ErrorCode::InternalError
                    )
                }
                other => {
                    raise_error!(
                        format!("Database error: {:?}", other),
                        ErrorCode::InternalError
                    )
                }
            },
            other => {
                raise_error!(
                    format!("Failed to create database: {:?}", other),
                    ErrorCode::InternalError
                )
            }
        }
    }
}

impl Initialize for DatabaseManager {
    async fn initialize() -> RustRelayResult<()> {
        // Force database creation at startup so misconfiguration fails fast.
        let _ = DB_MANAGER.meta_db();
        let _ = DB_MANAGER.attempts_db();
        Ok(())
    }
}
