//! Query classification and per-category fetch/format dispatch.

use crate::formatters::{format_all, ChannelItem, GameItem, StreamItem, UserItem};
use crate::icons::IconCache;
use std::sync::Arc;
use twitchy_core::api::{ApiResult, TwitchApi};
use twitchy_core::config::{ChannelOrder, SearchConfig};
use twitchy_core::models::{Channel, DisplayItem, Game, PageCursor};

pub const GAMES_LIMIT: usize = 50;
pub const FOLLOWED_LIMIT: usize = 100;
pub const LIVE_LIMIT: usize = 100;
pub const SEARCH_LIMIT: usize = 10;
pub const FALLBACK_LIMIT: usize = 10;

const GAME_PREFIX: char = ':';
const FOLLOWED_PREFIX: char = '#';

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Category {
    /// Top games, optionally narrowed by a case-insensitive name filter.
    Games { filter: Option<String> },
    FollowedUsers { username: String },
    LiveStreams { username: String },
    ChannelSearch { query: String },
    Fallback,
}

impl Category {
    pub fn limit(&self) -> usize {
        match self {
            Category::Games { .. } => GAMES_LIMIT,
            Category::FollowedUsers { .. } => FOLLOWED_LIMIT,
            Category::LiveStreams { .. } => LIVE_LIMIT,
            Category::ChannelSearch { .. } => SEARCH_LIMIT,
            Category::Fallback => FALLBACK_LIMIT,
        }
    }

    /// Followed users and live streams read the user's follows, which Twitch
    /// only grants to user access tokens.
    pub fn reads_follows(&self) -> bool {
        matches!(
            self,
            Category::FollowedUsers { .. } | Category::LiveStreams { .. }
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            Category::Games { .. } => "games",
            Category::FollowedUsers { .. } => "followed-users",
            Category::LiveStreams { .. } => "live-streams",
            Category::ChannelSearch { .. } => "channel-search",
            Category::Fallback => "fallback",
        }
    }
}

/// Pick the category for a raw query. Rules are checked in order:
/// `:` games, `#` followed users (needs a username), any other text is a
/// channel search, empty is live streams (needs a username) or the fallback
/// list.
///
/// A `#` query without a configured username searches channels for the text
/// after the `#`.
pub fn classify(query: &str, username: Option<&str>) -> Category {
    let query = query.trim();
    let username = username.map(str::trim).filter(|u| !u.is_empty());

    if let Some(rest) = query.strip_prefix(GAME_PREFIX) {
        let filter = rest.trim();
        return Category::Games {
            filter: (!filter.is_empty()).then(|| filter.to_string()),
        };
    }
    if let Some(rest) = query.strip_prefix(FOLLOWED_PREFIX) {
        if let Some(username) = username {
            return Category::FollowedUsers {
                username: username.to_string(),
            };
        }
        let rest = rest.trim();
        return if rest.is_empty() {
            Category::Fallback
        } else {
            Category::ChannelSearch {
                query: rest.to_string(),
            }
        };
    }
    if !query.is_empty() {
        return Category::ChannelSearch {
            query: query.to_string(),
        };
    }
    match username {
        Some(username) => Category::LiveStreams {
            username: username.to_string(),
        },
        None => Category::Fallback,
    }
}

pub struct QueryRouter<'a> {
    api: Arc<dyn TwitchApi>,
    search: &'a SearchConfig,
    icons: &'a IconCache,
}

impl<'a> QueryRouter<'a> {
    pub fn new(api: Arc<dyn TwitchApi>, search: &'a SearchConfig, icons: &'a IconCache) -> Self {
        Self { api, search, icons }
    }

    /// Fetch and format the results for `category`, at most `category.limit()`.
    ///
    /// A payload that does not decode yields zero results instead of an
    /// error; every other API failure is returned.
    pub async fn route(&self, category: &Category) -> ApiResult<Vec<DisplayItem>> {
        match self.dispatch(category).await {
            Err(err) if err.is_malformed() => {
                tracing::debug!(
                    category = category.name(),
                    error = %err,
                    "undecodable upstream payload, no results"
                );
                Ok(Vec::new())
            }
            result => result,
        }
    }

    async fn dispatch(&self, category: &Category) -> ApiResult<Vec<DisplayItem>> {
        let limit = category.limit();
        let workers = self.search.icon_workers;
        let items = match category {
            Category::Games { filter } => {
                let games = self.games(filter.as_deref(), limit).await?;
                format_all(&GameItem, games, self.icons, workers).await
            }
            Category::FollowedUsers { username } => {
                let mut users = self.api.followed_users(username, limit).await?;
                users.truncate(limit);
                format_all(&UserItem, users, self.icons, workers).await
            }
            Category::LiveStreams { username } => {
                let mut streams = self.api.followed_streams(username, limit).await?;
                streams.truncate(limit);
                format_all(&StreamItem, streams, self.icons, workers).await
            }
            Category::ChannelSearch { query } => {
                let channels = self.api.search_channels(query, limit).await?;
                let channels = self.order(channels, limit);
                format_all(&ChannelItem, channels, self.icons, workers).await
            }
            Category::Fallback => {
                let mut channels = self
                    .api
                    .channels_by_login(&self.search.fallback_channels)
                    .await?;
                channels.truncate(limit);
                format_all(&ChannelItem, channels, self.icons, workers).await
            }
        };
        tracing::debug!(category = category.name(), count = items.len(), "query routed");
        Ok(items)
    }

    fn order(&self, mut channels: Vec<Channel>, limit: usize) -> Vec<Channel> {
        if self.search.channel_order == ChannelOrder::Views {
            channels.sort_by(|a, b| b.views.cmp(&a.views));
        }
        channels.truncate(limit);
        channels
    }

    /// Walk the top games listing until `limit` matches are found or
    /// `games_scan_limit` games have been looked at.
    async fn games(&self, filter: Option<&str>, limit: usize) -> ApiResult<Vec<Game>> {
        let needle = filter.map(str::to_lowercase);
        let scan_limit = self.search.games_scan_limit;
        let mut matches = Vec::new();
        let mut scanned = 0usize;
        let mut cursor: Option<PageCursor> = None;

        loop {
            let page = self.api.top_games(cursor.as_ref()).await?;
            if page.items.is_empty() {
                break;
            }
            for game in page.items {
                if scanned >= scan_limit {
                    return Ok(matches);
                }
                scanned += 1;
                let keep = needle
                    .as_deref()
                    .map_or(true, |n| game.name.to_lowercase().contains(n));
                if keep {
                    matches.push(game);
                    if matches.len() >= limit {
                        return Ok(matches);
                    }
                }
            }
            match page.cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }
        Ok(matches)
    }
}
