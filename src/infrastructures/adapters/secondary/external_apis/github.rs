use crate::domain::external_apis::github::{DeviceFlowApi, Session};
use crate::domain::models::page::Page;
use crate::domain::models::token::{DeviceCode, TokenGrant};
use anyhow::{Context, Error, anyhow};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, LINK, USER_AGENT};
use reqwest::{Client, Url};
use std::collections::HashMap;

const APP_USER_AGENT: &str = "gha-run-archive";

pub const DEFAULT_PER_PAGE: u32 = 100;

/// GitHub's device authorization endpoint.
pub const DEVICE_CODE_URL: &str = "https://github.com/login/device/code";

/// GitHub's OAuth token endpoint.
pub const TOKEN_URL: &str = "https://github.com/login/oauth/access_token";

const DEVICE_GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:device_code";

/// Authenticated GETs against the GitHub REST API.
pub struct GitHubApiAdapter {
    client: Client,
    github_token: String,
    per_page: u32,
}

impl GitHubApiAdapter {
    pub fn new(github_token: String, per_page: u32) -> Self {
        Self {
            client: Client::new(),
            github_token,
            per_page,
        }
    }

    /// Adds `per_page` and `format` unless the URL (e.g. a `next` link) already has them.
    fn with_listing_params(&self, url: &str) -> Result<Url, Error> {
        let mut url = Url::parse(url).with_context(|| format!("Invalid URL {url}"))?;
        let present: Vec<String> = url.query_pairs().map(|(key, _)| key.into_owned()).collect();
        {
            let mut query = url.query_pairs_mut();
            if !present.iter().any(|key| key == "per_page") {
                query.append_pair("per_page", &self.per_page.to_string());
            }
            if !present.iter().any(|key| key == "format") {
                query.append_pair("format", "json");
            }
        }
        Ok(url)
    }
}

#[async_trait]
impl Session for GitHubApiAdapter {
    #[tracing::instrument(name = "GitHubApiAdapter::get", skip(self))]
    async fn get(&self, url: &str) -> Result<Page, Error> {
        let request_url = self.with_listing_params(url)?;
        let response = self
            .client
            .get(request_url)
            .header(AUTHORIZATION, format!("Bearer {}", self.github_token))
            .header(ACCEPT, "application/vnd.github+json")
            .header(USER_AGENT, APP_USER_AGENT)
            .send()
            .await
            .with_context(|| format!("Failed to send request to {url}"))?;

        let status = response.status().as_u16();
        let next = response
            .headers()
            .get(LINK)
            .and_then(|value| value.to_str().ok())
            .and_then(parse_next_link);
        let body = response
            .text()
            .await
            .with_context(|| format!("Failed to read response body from {url}"))?;

        Ok(Page {
            url: url.to_owned(),
            status,
            body,
            next,
        })
    }
}

/// Extracts the `rel="next"` target from a `Link` header.
///
/// GitHub Link headers look like:
/// `<https://api.github.com/organizations/1/repos?page=2>; rel="next", <...&page=5>; rel="last"`
pub fn parse_next_link(link_header: &str) -> Option<String> {
    link_header.split(',').find_map(|part| {
        let mut url = None;
        let mut is_next = false;
        for segment in part.split(';').map(str::trim) {
            if let Some(target) = segment.strip_prefix('<').and_then(|s| s.strip_suffix('>')) {
                url = Some(target);
            } else if let Some(rel) = segment.strip_prefix("rel=") {
                is_next = rel.trim_matches('"').split_whitespace().any(|r| r == "next");
            }
        }
        url.filter(|_| is_next).map(str::to_owned)
    })
}

/// The OAuth device flow endpoints, speaking form-encoded bodies both ways.
pub struct GitHubDeviceFlowAdapter {
    client: Client,
    device_code_url: String,
    token_url: String,
}

impl Default for GitHubDeviceFlowAdapter {
    fn default() -> Self {
        Self::new(DEVICE_CODE_URL.to_owned(), TOKEN_URL.to_owned())
    }
}

impl GitHubDeviceFlowAdapter {
    pub fn new(device_code_url: String, token_url: String) -> Self {
        Self {
            client: Client::new(),
            device_code_url,
            token_url,
        }
    }
}

fn parse_form(body: &str) -> HashMap<String, String> {
    url::form_urlencoded::parse(body.as_bytes())
        .into_owned()
        .collect()
}

fn required<'a>(form: &'a HashMap<String, String>, key: &str) -> Result<&'a str, Error> {
    form.get(key)
        .map(String::as_str)
        .ok_or_else(|| anyhow!("Response is missing {key}"))
}

#[async_trait]
impl DeviceFlowApi for GitHubDeviceFlowAdapter {
    #[tracing::instrument(name = "GitHubDeviceFlowAdapter::request_device_code", skip_all)]
    async fn request_device_code(&self, client_id: &str) -> Result<DeviceCode, Error> {
        let body = self
            .client
            .post(&self.device_code_url)
            .header(USER_AGENT, APP_USER_AGENT)
            .form(&[("client_id", client_id)])
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let form = parse_form(&body);
        Ok(DeviceCode {
            device_code: required(&form, "device_code")?.to_owned(),
            user_code: required(&form, "user_code")?.to_owned(),
            verification_uri: required(&form, "verification_uri")?.to_owned(),
            expires_in: required(&form, "expires_in")?
                .parse()
                .context("Invalid expires_in")?,
            interval: required(&form, "interval")?
                .parse()
                .context("Invalid interval")?,
        })
    }

    #[tracing::instrument(name = "GitHubDeviceFlowAdapter::request_token", skip_all)]
    async fn request_token(
        &self,
        client_id: &str,
        device_code: &str,
    ) -> Result<Option<TokenGrant>, Error> {
        let response = self
            .client
            .post(&self.token_url)
            .header(USER_AGENT, APP_USER_AGENT)
            .form(&[
                ("client_id", client_id),
                ("device_code", device_code),
                ("grant_type", DEVICE_GRANT_TYPE),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            tracing::debug!("Token endpoint answered {}", response.status());
            return Ok(None);
        }

        let form = parse_form(&response.text().await?);
        if let Some(error) = form.get("error") {
            tracing::debug!("Token not issued yet: {}", error);
            return Ok(None);
        }
        let Some(access_token) = form.get("access_token") else {
            return Ok(None);
        };
        let expires_in = form
            .get("expires_in")
            .map(|value| value.parse::<u64>())
            .transpose()
            .context("Invalid expires_in")?;

        Ok(Some(TokenGrant {
            access_token: access_token.clone(),
            expires_in,
        }))
    }
}
