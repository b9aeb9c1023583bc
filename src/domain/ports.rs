use crate::domain::models::archive::ArchiveEntry;
use crate::domain::models::token::{DeviceCode, StoredToken};
use anyhow::Error;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;

/// Wall clock plus the ability to wait on it.
#[async_trait]
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
    async fn sleep(&self, duration: Duration);
}

#[async_trait]
pub trait ArchiveWriter: Send + Sync {
    /// Persists `entry`, creating parent directories as needed.
    async fn write(&self, entry: &ArchiveEntry) -> Result<(), Error>;
}

#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn save(&self, token: &StoredToken) -> Result<(), Error>;
}

/// Shows the device code to the user and blocks until they acknowledge it.
pub trait UserPrompt: Send + Sync {
    fn acknowledge(&self, code: &DeviceCode) -> Result<(), Error>;
}
