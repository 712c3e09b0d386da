use crate::{
    modules::{
        error::{code::ErrorCode, RustRelayResult},
        Initialize,
    },
    raise_error,
};

pub struct RustRelayTls;

impl Initialize for RustRelayTls {
    async fn initialize() -> RustRelayResult<()> {
        rustls::crypto::CryptoProvider::install_default(rustls::crypto::ring::default_provider())
            .map_err(|_| {
                raise_error!(
                    "failed to set crypto provider".into(),
                    ErrorCode::InternalError
                )
            })
    }
}
