use serde_json::Value;
use thiserror::Error;

/// One HTTP response of a paginated listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub url: String,
    pub status: u16,
    pub body: String,
    /// Target of the `rel="next"` link, present only when more pages remain.
    pub next: Option<String>,
}

impl Page {
    pub fn new(url: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            status,
            body: body.into(),
            next: None,
        }
    }

    #[must_use]
    pub fn with_next(mut self, next: impl Into<String>) -> Self {
        self.next = Some(next.into());
        self
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Returns the page unchanged if its status is a success, otherwise
    /// moves it into an [`UnsuccessfulResponse`].
    pub fn into_success(self) -> Result<Self, UnsuccessfulResponse> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(UnsuccessfulResponse {
                page: Box::new(self),
            })
        }
    }

    pub fn json(&self) -> Result<Value, serde_json::Error> {
        serde_json::from_str(&self.body)
    }
}

/// A failed response that is still failing once retries are exhausted.
#[derive(Debug, Error)]
#[error("HTTP status {} for url: {}", .page.status, .page.url)]
pub struct UnsuccessfulResponse {
    pub page: Box<Page>,
}
