//! Twitch Helix implementation of the [`TwitchApi`] and [`Connector`] traits.

mod mapping;
pub mod models;

use async_trait::async_trait;
use mapping::{map_follow, map_game, map_search_hit, map_stream, map_token_info, map_user};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use twitchy_core::api::{ApiError, ApiResult, Connector, Credentials, TokenInfo, TwitchApi};
use twitchy_core::config::TwitchConfig;
use twitchy_core::models::{Channel, FollowedUser, Game, Page, PageCursor, Stream};
use twitchy_core::redact::redact_secrets;
use url::Url;

/// Helix caps `first` and repeated id/login parameters at 100.
const MAX_PAGE: usize = 100;

fn transport(err: reqwest::Error) -> ApiError {
    ApiError::Transport {
        message: redact_secrets(&err.to_string()).into_owned(),
    }
}

fn check_status(endpoint: &str, status: StatusCode) -> ApiResult<()> {
    match status {
        s if s.is_success() => Ok(()),
        StatusCode::UNAUTHORIZED => Err(ApiError::Unauthorized {
            message: format!("{endpoint} rejected the credentials"),
        }),
        s => Err(ApiError::Status {
            status: s.as_u16(),
            endpoint: endpoint.to_string(),
        }),
    }
}

/// Send a request and decode its JSON body, mapping failures onto [`ApiError`].
async fn fetch_json<T: DeserializeOwned>(endpoint: &str, request: RequestBuilder) -> ApiResult<T> {
    let resp = request.send().await.map_err(transport)?;
    check_status(endpoint, resp.status())?;
    let body = resp.text().await.map_err(transport)?;
    serde_json::from_str(&body).map_err(|e| {
        tracing::debug!(endpoint, error = %e, "undecodable response body");
        ApiError::Malformed {
            endpoint: endpoint.to_string(),
            message: e.to_string(),
        }
    })
}

fn join(base: &Url, endpoint: &str) -> ApiResult<Url> {
    base.join(endpoint).map_err(|e| ApiError::Other {
        message: format!("invalid endpoint {endpoint}: {e}"),
    })
}

fn parse_base(field: &str, raw: &str) -> ApiResult<Url> {
    Url::parse(raw).map_err(|e| ApiError::Other {
        message: format!("invalid {field}: {e}"),
    })
}

/// Builds authenticated [`HelixClient`]s and talks to the OAuth service.
#[derive(Clone)]
pub struct HelixConnector {
    client: Client,
    api_base: Url,
    auth_base: Url,
}

impl HelixConnector {
    pub fn new(config: &TwitchConfig) -> ApiResult<Self> {
        let api_base = parse_base("twitch.api_base", &config.api_base)?;
        let auth_base = parse_base("twitch.auth_base", &config.auth_base)?;
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ApiError::Other {
                message: e.to_string(),
            })?;
        Ok(Self {
            client,
            api_base,
            auth_base,
        })
    }
}

#[async_trait]
impl Connector for HelixConnector {
    async fn validate_token(&self, token: &str) -> ApiResult<TokenInfo> {
        let url = join(&self.auth_base, "validate")?;
        let request = self
            .client
            .get(url)
            .header("Authorization", format!("OAuth {token}"));
        let info: models::ValidateResponse = fetch_json("oauth2/validate", request).await?;
        tracing::debug!(
            client_id = %info.client_id,
            expires_in = ?info.expires_in,
            "token validated"
        );
        Ok(map_token_info(info))
    }

    async fn issue_app_token(&self, client_id: &str, client_secret: &str) -> ApiResult<String> {
        let url = join(&self.auth_base, "token")?;
        let request = self.client.post(url).form(&[
            ("client_id", client_id),
            ("client_secret", client_secret),
            ("grant_type", "client_credentials"),
        ]);
        let token: models::TokenResponse = fetch_json("oauth2/token", request)
            .await
            .map_err(|e| match e {
                // The token endpoint answers 400/403 for unknown clients or bad secrets.
                ApiError::Status { status, .. } if status == 400 || status == 403 => {
                    ApiError::Unauthorized {
                        message: format!("client credentials rejected ({status})"),
                    }
                }
                other => other,
            })?;
        tracing::info!(
            expires_in = ?token.expires_in,
            token_type = ?token.token_type,
            "issued app access token"
        );
        Ok(token.access_token)
    }

    fn connect(&self, credentials: &Credentials) -> ApiResult<Arc<dyn TwitchApi>> {
        Ok(Arc::new(HelixClient {
            client: self.client.clone(),
            base_url: self.api_base.clone(),
            credentials: credentials.clone(),
        }))
    }
}

/// Authenticated Helix client.
#[derive(Clone)]
pub struct HelixClient {
    client: Client,
    base_url: Url,
    credentials: Credentials,
}

impl HelixClient {
    pub fn new(config: &TwitchConfig, credentials: Credentials) -> ApiResult<Self> {
        let connector = HelixConnector::new(config)?;
        Ok(Self {
            client: connector.client,
            base_url: connector.api_base,
            credentials,
        })
    }

    async fn get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&str, &str)],
    ) -> ApiResult<models::DataResponse<T>> {
        let url = join(&self.base_url, endpoint)?;
        let request = self
            .client
            .get(url)
            .query(query)
            .header("Client-Id", &self.credentials.client_id)
            .bearer_auth(&self.credentials.token);
        fetch_json(endpoint, request).await
    }

    /// GET an endpoint that takes a repeated lookup parameter, 100 values per request.
    async fn get_many<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        param: &str,
        values: &[String],
    ) -> ApiResult<Vec<T>> {
        let mut out = Vec::with_capacity(values.len());
        for chunk in values.chunks(MAX_PAGE) {
            let query: Vec<(&str, &str)> = chunk.iter().map(|v| (param, v.as_str())).collect();
            let page: models::DataResponse<T> = self.get(endpoint, &query).await?;
            out.extend(page.data);
        }
        Ok(out)
    }

    async fn user_id(&self, login: &str) -> ApiResult<String> {
        let users: models::DataResponse<models::User> =
            self.get("users", &[("login", login)]).await?;
        users
            .data
            .into_iter()
            .next()
            .map(|u| u.id)
            .ok_or_else(|| ApiError::Other {
                message: format!("unknown Twitch user '{login}'"),
            })
    }

    async fn live_streams(&self, user_ids: &[String]) -> ApiResult<HashMap<String, models::Stream>> {
        if user_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let streams: Vec<models::Stream> = self.get_many("streams", "user_id", user_ids).await?;
        Ok(streams
            .into_iter()
            .map(|s| (s.user_id.clone(), s))
            .collect())
    }
}

#[async_trait]
impl TwitchApi for HelixClient {
    async fn top_games(&self, cursor: Option<&PageCursor>) -> ApiResult<Page<Game>> {
        let first = MAX_PAGE.to_string();
        let mut query = vec![("first", first.as_str())];
        if let Some(cursor) = cursor {
            query.push(("after", cursor.0.as_str()));
        }
        let page: models::DataResponse<models::Game> = self.get("games/top", &query).await?;
        let cursor = page
            .pagination
            .and_then(|p| p.cursor)
            .filter(|c| !c.is_empty())
            .map(PageCursor);
        Ok(Page {
            items: page.data.into_iter().map(map_game).collect(),
            cursor,
        })
    }

    async fn search_channels(&self, query: &str, limit: usize) -> ApiResult<Vec<Channel>> {
        let first = limit.clamp(1, MAX_PAGE).to_string();
        let hits: models::DataResponse<models::SearchChannel> = self
            .get("search/channels", &[("query", query), ("first", first.as_str())])
            .await?;
        let hits: Vec<_> = hits.data.into_iter().take(limit).collect();
        if hits.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<String> = hits.iter().map(|h| h.id.clone()).collect();
        let mut users: HashMap<String, models::User> = self
            .get_many::<models::User>("users", "id", &ids)
            .await?
            .into_iter()
            .map(|u| (u.id.clone(), u))
            .collect();

        let live_ids: Vec<String> = hits
            .iter()
            .filter(|h| h.is_live)
            .map(|h| h.id.clone())
            .collect();
        let streams = self.live_streams(&live_ids).await?;

        Ok(hits
            .into_iter()
            .map(|hit| {
                let user = users.remove(&hit.id);
                let stream = streams.get(&hit.id);
                map_search_hit(hit, user, stream)
            })
            .collect())
    }

    async fn channels_by_login(&self, logins: &[String]) -> ApiResult<Vec<Channel>> {
        if logins.is_empty() {
            return Ok(Vec::new());
        }
        let mut users: HashMap<String, models::User> = self
            .get_many::<models::User>("users", "login", logins)
            .await?
            .into_iter()
            .map(|u| (u.login.to_lowercase(), u))
            .collect();
        let ids: Vec<String> = users.values().map(|u| u.id.clone()).collect();
        let streams = self.live_streams(&ids).await?;

        Ok(logins
            .iter()
            .filter_map(|login| users.remove(&login.to_lowercase()))
            .map(|user| {
                let stream = streams.get(&user.id);
                map_user(user, stream)
            })
            .collect())
    }

    async fn followed_users(&self, username: &str, limit: usize) -> ApiResult<Vec<FollowedUser>> {
        let user_id = self.user_id(username).await?;
        let first = limit.clamp(1, MAX_PAGE).to_string();
        let follows: models::DataResponse<models::Follow> = self
            .get(
                "channels/followed",
                &[("user_id", user_id.as_str()), ("first", first.as_str())],
            )
            .await?;
        Ok(follows
            .data
            .into_iter()
            .take(limit)
            .map(map_follow)
            .collect())
    }

    async fn followed_streams(&self, username: &str, limit: usize) -> ApiResult<Vec<Stream>> {
        let user_id = self.user_id(username).await?;
        let first = limit.clamp(1, MAX_PAGE).to_string();
        let streams: models::DataResponse<models::Stream> = self
            .get(
                "streams/followed",
                &[("user_id", user_id.as_str()), ("first", first.as_str())],
            )
            .await?;
        Ok(streams
            .data
            .into_iter()
            .take(limit)
            .map(map_stream)
            .collect())
    }
}
