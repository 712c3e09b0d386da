use mimalloc::MiMalloc;
use modules::{
    common::rustls::RustRelayTls,
    database::manager::DatabaseManager,
    error::RustRelayResult,
    logger,
    rest::start_http_server,
    settings::dir::DataDirManager,
    Initialize,
};
use tracing::info;

mod modules;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

static LOGO: &str = r#"
  ____            _   ____      _
 |  _ \ _   _ ___| |_|  _ \ ___| | __ _ _   _
 | |_) | | | / __| __| |_) / _ \ |/ _` | | | |
 |  _ <| |_| \__ \ |_|  _ <  __/ | (_| | |_| |
 |_| \_\\__,_|___/\__|_| \_\___|_|\__,_|\__, |
                                        |___/
"#;

#[tokio::main]
async fn main() -> RustRelayResult<()> {
    logger::initialize_logging();
    info!("{}", LOGO);
    info!("Starting rustrelay-server");
    info!("Version:  {}", rustrelay_version!());
    info!("Git:      [{}]", env!("GIT_HASH"));

    if let Err(error) = initialize().await {
        eprintln!("{:?}", error);
        return Err(error);
    }

    start_http_server().await
}

/// Initialize the system by validating settings and preparing shared state.
async fn initialize() -> RustRelayResult<()> {
    DataDirManager::initialize().await?;
    DatabaseManager::initialize().await?;
    RustRelayTls::initialize().await?;
    Ok(())
}
