use crate::domain::models::page::Page;
use crate::domain::models::token::{DeviceCode, TokenGrant};
use anyhow::Error;
use async_trait::async_trait;

/// Something that can GET a URL and hand back the response as a [`Page`].
///
/// `Err` is reserved for transport failures; an HTTP error status is an
/// `Ok` page whose status the caller has to check.
#[async_trait]
pub trait Session: Send + Sync {
    async fn get(&self, url: &str) -> Result<Page, Error>;
}

/// The two form-encoded POSTs of the OAuth device flow.
#[async_trait]
pub trait DeviceFlowApi: Send + Sync {
    async fn request_device_code(&self, client_id: &str) -> Result<DeviceCode, Error>;

    /// `Ok(None)` while the user has not authorized the device yet.
    async fn request_token(
        &self,
        client_id: &str,
        device_code: &str,
    ) -> Result<Option<TokenGrant>, Error>;
}
