use std::time::Duration;

use reqwest::{Proxy, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use crate::{
    rate::{self, RateControl},
    riot::{Account, MatchId, PlayerRef},
};

// we use separate error types for construction and request

#[derive(Error, Debug)]
pub enum ConstructionError {
    #[error("ProxyError: {0} from scheme: {1}.")]
    ProxyError(reqwest::Error, String),
    #[error("BuildError: {0}.")]
    BuildError(#[from] reqwest::Error),
    #[error("BaseUrlError: {0} is not a usable base url.")]
    BaseUrlError(String),
    #[error("MissingKey: api key is empty.")]
    MissingKey,
}

#[derive(Error, Debug)]
pub enum RequestError {
    #[error("Rejected credentials ({0}): {1}")]
    Auth(StatusCode, String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Upstream responded {status}: {body}")]
    Upstream { status: StatusCode, body: String },
    #[error("Still rate limited after waiting {0:?}")]
    RateLimitExhausted(Duration),
    #[error("Failed to retrive result from web API: {0}")]
    ConnectionError(#[from] reqwest::Error),
    #[error("Failed to decode web API response: {0}")]
    DecodeError(serde_json::Error, String),
}

/// What the fetcher needs from upstream.
#[allow(async_fn_in_trait)]
pub trait MatchSource {
    async fn resolve_player(&self, player: &PlayerRef) -> Result<String, RequestError>;

    async fn list_match_ids(
        &self,
        puuid: &str,
        count: u8,
        queue: Option<u16>,
        start_time: Option<i64>,
        end_time: Option<i64>,
    ) -> Result<Vec<MatchId>, RequestError>;

    async fn get_match(&self, id: &MatchId) -> Result<Value, RequestError>;
}

pub struct Client {
    client: reqwest::Client,
    key: String,
    base: Url,
    max_wait: Duration,
}

impl Client {
    const HEADER_TOKEN: &str = "X-Riot-Token";

    pub fn new(
        key: &str,
        region: &str,
        proxy: Option<&str>,
        max_wait: Duration,
    ) -> Result<Self, ConstructionError> {
        let key = key.trim();
        if key.is_empty() {
            return Err(ConstructionError::MissingKey);
        }
        let builder = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .connect_timeout(Duration::from_secs(60));
        let builder = match proxy {
            Some(proxy) => {
                let proxy = Proxy::all(proxy)
                    .map_err(|err| ConstructionError::ProxyError(err, proxy.to_string()))?;
                builder.proxy(proxy)
            }
            None => builder,
        };
        let client = builder.build()?;
        let base = Self::parse_base(&format!("https://{}.api.riotgames.com", region))?;
        let key = key.to_string();
        Ok(Self {
            client,
            key,
            base,
            max_wait,
        })
    }

    pub fn with_base_url(mut self, base: &str) -> Result<Self, ConstructionError> {
        self.base = Self::parse_base(base)?;
        Ok(self)
    }

    fn parse_base(base: &str) -> Result<Url, ConstructionError> {
        match Url::parse(base) {
            Ok(url) if !url.cannot_be_a_base() => Ok(url),
            _ => Err(ConstructionError::BaseUrlError(base.to_string())),
        }
    }

    // path segments are percent-encoded, game names may contain spaces
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn request(&self, url: Url, query: &[(&str, String)]) -> Result<String, RequestError> {
        let mut rate = RateControl::new(self.max_wait);
        loop {
            log::debug!("GET {}", url.path());
            let resp = self
                .client
                .get(url.clone())
                .header(Self::HEADER_TOKEN, &self.key)
                .query(query)
                .send()
                .await?;
            let status = resp.status();
            if status.is_success() {
                return Ok(resp.text().await?);
            }
            match status {
                StatusCode::TOO_MANY_REQUESTS => {
                    let delay = rate::retry_after(resp.headers());
                    if !rate.wait(delay).await {
                        return Err(RequestError::RateLimitExhausted(rate.waited()));
                    }
                }
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                    let body = resp.text().await.unwrap_or_default();
                    return Err(RequestError::Auth(status, body));
                }
                StatusCode::NOT_FOUND => {
                    return Err(RequestError::NotFound(url.path().to_string()));
                }
                status => {
                    let body = resp.text().await.unwrap_or_default();
                    return Err(RequestError::Upstream { status, body });
                }
            }
        }
    }

    async fn request_json<T: DeserializeOwned>(
        &self,
        url: Url,
        query: &[(&str, String)],
    ) -> Result<T, RequestError> {
        let content = self.request(url, query).await?;
        serde_json::from_str(&content).map_err(|err| RequestError::DecodeError(err, content))
    }

    pub async fn get_account(&self, player: &PlayerRef) -> Result<Account, RequestError> {
        let url = self.endpoint(&[
            "riot",
            "account",
            "v1",
            "accounts",
            "by-riot-id",
            &player.game_name,
            &player.tag,
        ]);
        self.request_json(url, &[]).await
    }
}

impl MatchSource for Client {
    async fn resolve_player(&self, player: &PlayerRef) -> Result<String, RequestError> {
        self.get_account(player).await.map(|account| account.puuid)
    }

    async fn list_match_ids(
        &self,
        puuid: &str,
        count: u8,
        queue: Option<u16>,
        start_time: Option<i64>,
        end_time: Option<i64>,
    ) -> Result<Vec<MatchId>, RequestError> {
        let url = self.endpoint(&["lol", "match", "v5", "matches", "by-puuid", puuid, "ids"]);
        let mut query = vec![("count", count.to_string())];
        if let Some(queue) = queue {
            query.push(("queue", queue.to_string()));
        }
        if let Some(start_time) = start_time {
            query.push(("startTime", start_time.to_string()));
        }
        if let Some(end_time) = end_time {
            query.push(("endTime", end_time.to_string()));
        }
        self.request_json(url, &query).await
    }

    async fn get_match(&self, id: &MatchId) -> Result<Value, RequestError> {
        let url = self.endpoint(&["lol", "match", "v5", "matches", id.as_str()]);
        self.request_json(url, &[]).await
    }
}
