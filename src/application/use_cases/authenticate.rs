use crate::domain::external_apis::github::DeviceFlowApi;
use crate::domain::models::token::{DeviceCode, StoredToken};
use crate::domain::ports::{Clock, TokenStore, UserPrompt};
use anyhow::{Context, Error};
use chrono::Duration as ChronoDuration;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("The stored token has expired and no app client id is configured to refresh it")]
    NoClientId,

    #[error("The device code expired before the app was authorized")]
    AuthorizationTimedOut,
}

#[derive(Debug, Clone, Default)]
pub struct AuthenticateUseCaseInput {
    /// Token found in configuration, if any.
    pub cached: Option<StoredToken>,
    pub app_client_id: Option<String>,
    /// Skip the cached token and always run the device flow.
    pub force: bool,
}

pub trait AuthenticateUseCase {
    fn execute(
        &self,
        input: AuthenticateUseCaseInput,
    ) -> impl Future<Output = Result<StoredToken, Error>>;
}

pub struct AuthenticateInteractor<D, P, C, T> {
    api: Arc<D>,
    prompt: Arc<P>,
    clock: Arc<C>,
    store: Arc<T>,
}

impl<D, P, C, T> AuthenticateInteractor<D, P, C, T>
where
    D: DeviceFlowApi,
    P: UserPrompt,
    C: Clock,
    T: TokenStore,
{
    pub fn new(api: Arc<D>, prompt: Arc<P>, clock: Arc<C>, store: Arc<T>) -> Self {
        Self {
            api,
            prompt,
            clock,
            store,
        }
    }

    /// Runs the device flow once.
    ///
    /// `Ok(None)` means the device code expired before the user authorized it.
    #[tracing::instrument(name = "AuthenticateInteractor::login", skip(self, client_id))]
    pub async fn login(&self, client_id: &str) -> Result<Option<StoredToken>, Error> {
        let code = self
            .api
            .request_device_code(client_id)
            .await
            .context("Failed to request a device code")?;
        let deadline = self.clock.now() + seconds(code.expires_in);

        self.prompt.acknowledge(&code)?;
        self.poll_for_token(client_id, &code, deadline).await
    }

    async fn poll_for_token(
        &self,
        client_id: &str,
        code: &DeviceCode,
        deadline: chrono::DateTime<chrono::Utc>,
    ) -> Result<Option<StoredToken>, Error> {
        let interval = Duration::from_secs(code.interval + 1);

        while self.clock.now() < deadline {
            if let Some(grant) = self.api.request_token(client_id, &code.device_code).await? {
                let expires_at = grant
                    .expires_in
                    .map(|expires_in| self.clock.now() + seconds(expires_in));
                tracing::info!("Device authorized");
                return Ok(Some(StoredToken {
                    access_token: grant.access_token,
                    expires_at,
                }));
            }
            tracing::debug!("Authorization pending, polling again in {:?}", interval);
            self.clock.sleep(interval).await;
        }

        tracing::warn!("Device code expired without authorization");
        Ok(None)
    }
}

impl<D, P, C, T> AuthenticateUseCase for AuthenticateInteractor<D, P, C, T>
where
    D: DeviceFlowApi,
    P: UserPrompt,
    C: Clock,
    T: TokenStore,
{
    async fn execute(&self, input: AuthenticateUseCaseInput) -> Result<StoredToken, Error> {
        if !input.force
            && let Some(cached) = input.cached
            && cached.is_usable_at(self.clock.now())
        {
            tracing::debug!("Reusing configured access token");
            return Ok(cached);
        }

        let client_id = input.app_client_id.ok_or(AuthError::NoClientId)?;
        let token = self
            .login(&client_id)
            .await?
            .ok_or(AuthError::AuthorizationTimedOut)?;
        self.store
            .save(&token)
            .await
            .context("Failed to persist the new access token")?;
        Ok(token)
    }
}

fn seconds(value: u64) -> ChronoDuration {
    ChronoDuration::seconds(i64::try_from(value).unwrap_or(i64::MAX))
}
