//! HTTP session shared by every request of one backup run.
//!
//! Cookies set by the login response are replayed on later requests through
//! reqwest's cookie store; basic-auth credentials, when configured, are
//! attached to each request individually.

use std::time::Duration;

use reqwest::header::CONTENT_DISPOSITION;
use reqwest::{Client, Method, RequestBuilder, Response};
use tracing::{debug, instrument};
use url::Url;

use super::BackupError;
use crate::config::{Compression, HttpAuth};
use crate::html::{Document, Form};
use crate::user_agent;

/// A fetched HTML page and the URL it was finally served from.
#[derive(Debug, Clone)]
pub struct Page {
    /// URL after redirects; relative links resolve against it.
    pub url: Url,
    /// Body as served.
    pub body: String,
}

impl Page {
    /// Parses the body for querying.
    #[must_use]
    pub fn document(&self) -> Document {
        Document::parse(self.body.as_str())
    }
}

/// Cookie-persistent HTTP session.
#[derive(Debug, Clone)]
pub struct Session {
    client: Client,
    http_auth: Option<HttpAuth>,
}

impl Session {
    /// Builds a session.
    ///
    /// Transport gzip decoding follows
    /// [`Compression::allows_transport_decompression`] so a gzip export lands
    /// on disk still compressed.
    ///
    /// # Errors
    ///
    /// Returns [`BackupError::ClientBuild`] if the client cannot be constructed.
    #[instrument(level = "debug", skip(http_auth), fields(basic_auth = http_auth.is_some()))]
    pub fn new(
        timeout: Duration,
        compression: Compression,
        http_auth: Option<HttpAuth>,
    ) -> Result<Self, BackupError> {
        let client = Client::builder()
            .cookie_store(true)
            .timeout(timeout)
            .gzip(compression.allows_transport_decompression())
            .user_agent(user_agent::default_user_agent())
            .build()
            .map_err(|source| BackupError::ClientBuild { source })?;
        Ok(Self { client, http_auth })
    }

    /// Fetches and parses an HTML page.
    ///
    /// # Errors
    ///
    /// Returns network, timeout or HTTP status errors.
    #[instrument(level = "debug", skip(self), fields(url = %url))]
    pub async fn get_page(&self, url: &Url) -> Result<Page, BackupError> {
        let response = self.send(self.request(Method::GET, url.clone()), url).await?;
        read_page(response, url).await
    }

    /// Submits `form` (taken from a page served at `page_url`) and parses the
    /// resulting HTML page.
    ///
    /// # Errors
    ///
    /// Returns URL, network, timeout or HTTP status errors.
    pub async fn submit_for_page(&self, form: &Form, page_url: &Url) -> Result<Page, BackupError> {
        let action = action_url(form, page_url)?;
        let response = self.submit_form(form, page_url).await?;
        read_page(response, &action).await
    }

    /// Submits `form` and returns the raw response.
    ///
    /// `POST` forms are sent urlencoded in the body; anything else as a `GET`
    /// with the fields replacing the action's query string.
    ///
    /// # Errors
    ///
    /// Returns URL, network, timeout or HTTP status errors.
    #[instrument(level = "debug", skip(self, form), fields(page = %page_url, method = form.method()))]
    pub async fn submit_form(&self, form: &Form, page_url: &Url) -> Result<Response, BackupError> {
        let mut action = action_url(form, page_url)?;
        debug!(action = %action, fields = form.fields().len(), "submitting form");

        let request = if form.method() == "POST" {
            self.request(Method::POST, action.clone()).form(form.fields())
        } else {
            action.set_query(None);
            action.query_pairs_mut().extend_pairs(form.fields());
            self.request(Method::GET, action.clone())
        };
        self.send(request, &action).await
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let request = self.client.request(method, url);
        match &self.http_auth {
            Some(auth) => request.basic_auth(&auth.username, Some(&auth.password)),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder, url: &Url) -> Result<Response, BackupError> {
        let response = request
            .send()
            .await
            .map_err(|e| BackupError::request(url.as_str(), e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(BackupError::http_status(url.as_str(), status.as_u16()));
        }
        debug!(status = status.as_u16(), final_url = %response.url(), "response received");
        Ok(response)
    }
}

/// The `Content-Disposition` header of `response`, decoded lossily.
#[must_use]
pub fn content_disposition(response: &Response) -> Option<String> {
    response
        .headers()
        .get(CONTENT_DISPOSITION)
        .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
}

fn action_url(form: &Form, page_url: &Url) -> Result<Url, BackupError> {
    form.action_url(page_url).map_err(|_| {
        BackupError::invalid_url(form.action().unwrap_or_default().to_string())
    })
}

async fn read_page(response: Response, requested: &Url) -> Result<Page, BackupError> {
    let url = response.url().clone();
    let body = response
        .text()
        .await
        .map_err(|e| BackupError::request(requested.as_str(), e))?;
    Ok(Page { url, body })
}
