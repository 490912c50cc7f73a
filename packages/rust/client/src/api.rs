//! MediaWiki API client.
//!
//! A thin, session-cookie-aware wrapper over the handful of `api.php`
//! endpoints the bot needs: login, revision fetch, edit, and the
//! `embeddedin` work-queue listing. Every call maps API-level failures to
//! [`HistmergeError::Api`] and transport failures to
//! [`HistmergeError::Network`].

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, instrument};
use url::Url;

use histmerge_shared::{HistmergeError, ResumeToken, Result};

/// User-Agent string for API requests.
const USER_AGENT: &str = concat!("histmerge/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// Response shapes (formatversion=2)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct TokenResponse {
    query: TokenQuery,
}

#[derive(Debug, Deserialize)]
struct TokenQuery {
    tokens: Tokens,
}

#[derive(Debug, Deserialize)]
struct Tokens {
    #[serde(default)]
    logintoken: Option<String>,
    #[serde(default)]
    csrftoken: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    login: LoginOutcome,
}

#[derive(Debug, Deserialize)]
struct LoginOutcome {
    result: String,
    #[serde(default)]
    reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RevisionsResponse {
    query: PagesQuery,
}

#[derive(Debug, Deserialize)]
struct PagesQuery {
    #[serde(default)]
    pages: Vec<PageInfo>,
}

#[derive(Debug, Deserialize)]
struct PageInfo {
    #[serde(default)]
    missing: bool,
    #[serde(default)]
    revisions: Vec<Revision>,
}

#[derive(Debug, Deserialize)]
struct Revision {
    slots: Slots,
}

#[derive(Debug, Deserialize)]
struct Slots {
    main: SlotContent,
}

#[derive(Debug, Deserialize)]
struct SlotContent {
    content: String,
}

#[derive(Debug, Deserialize)]
struct EditResponse {
    edit: EditOutcome,
}

#[derive(Debug, Deserialize)]
struct EditOutcome {
    result: String,
}

#[derive(Debug, Deserialize)]
struct EmbeddedInResponse {
    #[serde(default, rename = "continue")]
    continuation: Option<Continuation>,
    #[serde(default)]
    query: Option<EmbeddedInQuery>,
}

#[derive(Debug, Deserialize)]
struct Continuation {
    #[serde(default)]
    eicontinue: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EmbeddedInQuery {
    #[serde(default)]
    embeddedin: Vec<EmbeddedPage>,
}

#[derive(Debug, Deserialize)]
struct EmbeddedPage {
    title: String,
}

/// One page of the transclusion work queue.
#[derive(Debug, Clone)]
pub struct WorkQueuePage {
    /// Talk page titles, API order.
    pub titles: Vec<String>,
    /// Token resuming the listing after this page, if it was truncated.
    pub resume: Option<ResumeToken>,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Session-holding MediaWiki API client.
pub struct MediaWikiClient {
    http: Client,
    api_url: Url,
}

impl MediaWikiClient {
    /// Create a client for the given `api.php` endpoint.
    pub fn new(api_url: &str) -> Result<Self> {
        let api_url = Url::parse(api_url)
            .map_err(|e| HistmergeError::config(format!("invalid api_url '{api_url}': {e}")))?;

        let http = Client::builder()
            .user_agent(USER_AGENT)
            .cookie_store(true)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| HistmergeError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { http, api_url })
    }

    /// Log in with a bot username and BotPassword.
    #[instrument(skip(self, password))]
    pub async fn login(&self, username: &str, password: &str) -> Result<()> {
        let token = self.fetch_token("login").await?;

        let response: LoginResponse = self
            .post(&[
                ("action", "login"),
                ("lgname", username),
                ("lgpassword", password),
                ("lgtoken", &token),
            ])
            .await?;

        if response.login.result != "Success" {
            return Err(HistmergeError::api(format!(
                "login failed: {} ({})",
                response.login.result,
                response.login.reason.as_deref().unwrap_or("no reason given"),
            )));
        }

        info!(username, "logged in");
        Ok(())
    }

    /// Fetch the current wikitext of a page. `None` when the page is missing.
    #[instrument(skip(self))]
    pub async fn fetch_text(&self, title: &str) -> Result<Option<String>> {
        let response: RevisionsResponse = self
            .get(&[
                ("action", "query"),
                ("prop", "revisions"),
                ("rvprop", "content"),
                ("rvslots", "main"),
                ("titles", title),
            ])
            .await?;

        let Some(page) = response.query.pages.into_iter().next() else {
            return Ok(None);
        };
        if page.missing {
            return Ok(None);
        }

        let text = page
            .revisions
            .into_iter()
            .next()
            .map(|rev| rev.slots.main.content)
            .ok_or_else(|| HistmergeError::api(format!("no revision content for '{title}'")))?;

        debug!(title, bytes = text.len(), "fetched page text");
        Ok(Some(text))
    }

    /// Save new wikitext for a page with the given edit summary.
    #[instrument(skip(self, text))]
    pub async fn save_text(&self, title: &str, text: &str, summary: &str) -> Result<()> {
        let token = self.fetch_token("csrf").await?;

        let response: EditResponse = self
            .post(&[
                ("action", "edit"),
                ("title", title),
                ("text", text),
                ("summary", summary),
                ("bot", "1"),
                ("nocreate", "1"),
                ("token", &token),
            ])
            .await?;

        if response.edit.result != "Success" {
            return Err(HistmergeError::api(format!(
                "edit of '{title}' failed: {}",
                response.edit.result
            )));
        }

        info!(title, "page saved");
        Ok(())
    }

    /// One page of talk pages transcluding `template`, resuming from the
    /// given token. The returned token, if any, continues the listing.
    #[instrument(skip(self, resume))]
    pub async fn transclusions_page(
        &self,
        template: &str,
        page_size: u32,
        resume: Option<&ResumeToken>,
    ) -> Result<WorkQueuePage> {
        let limit = page_size.to_string();
        let mut params = vec![
            ("action", "query"),
            ("list", "embeddedin"),
            ("eititle", template),
            // Talk namespace only
            ("einamespace", "1"),
            ("eilimit", limit.as_str()),
        ];
        if let Some(token) = resume {
            params.push(("eicontinue", token.as_str()));
        }

        let response: EmbeddedInResponse = self.get(&params).await?;

        let titles: Vec<String> = response
            .query
            .map(|q| q.embeddedin.into_iter().map(|p| p.title).collect())
            .unwrap_or_default();
        let resume = response
            .continuation
            .and_then(|c| c.eicontinue)
            .map(ResumeToken::new);

        debug!(count = titles.len(), resumable = resume.is_some(), "work queue page");
        Ok(WorkQueuePage { titles, resume })
    }

    // -- plumbing -----------------------------------------------------------

    /// Fetch a `login` or `csrf` token.
    async fn fetch_token(&self, kind: &str) -> Result<String> {
        let response: TokenResponse = self
            .get(&[("action", "query"), ("meta", "tokens"), ("type", kind)])
            .await?;

        let tokens = response.query.tokens;
        let token = match kind {
            "login" => tokens.logintoken,
            _ => tokens.csrftoken,
        };
        token.ok_or_else(|| HistmergeError::api(format!("API returned no {kind} token")))
    }

    /// GET an API query, decoded into `T` after the error check.
    async fn get<T: serde::de::DeserializeOwned>(&self, params: &[(&str, &str)]) -> Result<T> {
        let response = self
            .http
            .get(self.api_url.clone())
            .query(&[("format", "json"), ("formatversion", "2")])
            .query(params)
            .send()
            .await
            .map_err(|e| HistmergeError::Network(e.to_string()))?;

        Self::decode(response).await
    }

    /// POST an API action as form data, decoded into `T` after the error check.
    async fn post<T: serde::de::DeserializeOwned>(&self, form: &[(&str, &str)]) -> Result<T> {
        let response = self
            .http
            .post(self.api_url.clone())
            .query(&[("format", "json"), ("formatversion", "2")])
            .form(form)
            .send()
            .await
            .map_err(|e| HistmergeError::Network(e.to_string()))?;

        Self::decode(response).await
    }

    /// Check HTTP status and the API's `error` envelope, then decode.
    async fn decode<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            return Err(HistmergeError::Network(format!("HTTP {status}")));
        }

        let value: Value = response
            .json()
            .await
            .map_err(|e| HistmergeError::api(format!("undecodable response: {e}")))?;

        if let Some(error) = value.get("error") {
            let code = error.get("code").and_then(Value::as_str).unwrap_or("unknown");
            let info = error.get("info").and_then(Value::as_str).unwrap_or("");
            return Err(HistmergeError::api(format!("{code}: {info}")));
        }

        serde_json::from_value(value)
            .map_err(|e| HistmergeError::api(format!("unexpected response shape: {e}")))
    }
}
