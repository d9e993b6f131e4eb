//! Per-category conversion of API records into [`DisplayItem`]s.

use crate::icons::{IconCache, IconKind};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use twitchy_core::models::{
    channel_url, Action, BuiltinIcon, Channel, DisplayItem, FollowedUser, Game, Icon, ItemContext,
    Stream, TWITCH_WEB,
};
use url::Url;

const BOX_ART_SIZE: (u32, u32) = (52, 72);
const THUMBNAIL_SIZE: (u32, u32) = (320, 180);

#[async_trait]
pub trait ItemFormatter: Send + Sync {
    type Record: Send + 'static;

    async fn format(&self, record: Self::Record, icons: &IconCache) -> DisplayItem;
}

/// Format every record, downloading at most `workers` icons at a time.
/// Output order matches input order.
pub async fn format_all<F: ItemFormatter>(
    formatter: &F,
    records: Vec<F::Record>,
    icons: &IconCache,
    workers: usize,
) -> Vec<DisplayItem> {
    stream::iter(records)
        .map(|record| formatter.format(record, icons))
        .buffered(workers.max(1))
        .collect()
        .await
}

/// Fill a `{width}x{height}` size template.
pub fn sized(template: &str, (width, height): (u32, u32)) -> String {
    template
        .replace("{width}", &width.to_string())
        .replace("{height}", &height.to_string())
}

fn game_directory_url(name: &str) -> String {
    match Url::parse(TWITCH_WEB) {
        Ok(mut url) => {
            if let Ok(mut segments) = url.path_segments_mut() {
                segments.clear().extend(["directory", "game", name]);
            }
            url.to_string()
        }
        Err(_) => format!("{TWITCH_WEB}/directory/game/{name}"),
    }
}

fn live_line(game: &str, viewers: u64, title: &str) -> String {
    format!("Game: {game} - Viewers: {viewers} - {title}")
}

pub struct GameItem;

#[async_trait]
impl ItemFormatter for GameItem {
    type Record = Game;

    async fn format(&self, game: Game, icons: &IconCache) -> DisplayItem {
        let art = sized(&game.box_art_url, BOX_ART_SIZE);
        let icon = icons.fetch(IconKind::Game, &game.id, &art).await;
        DisplayItem::new(&game.name)
            .icon_file(icon)
            .action(Action::OpenUrl {
                url: game_directory_url(&game.name),
            })
    }
}

pub struct ChannelItem;

#[async_trait]
impl ItemFormatter for ChannelItem {
    type Record = Channel;

    async fn format(&self, channel: Channel, icons: &IconCache) -> DisplayItem {
        let icon = match channel.logo_url.as_deref() {
            Some(logo) => icons.fetch(IconKind::Channel, &channel.id, logo).await,
            None => None,
        };
        let subtitle = match &channel.live {
            Some(live) => Some(format!(
                "[LIVE] {}",
                live_line(&live.game, live.viewers, &live.title)
            )),
            None if channel.description.trim().is_empty() => None,
            None => Some(channel.description.clone()),
        };

        let mut item = DisplayItem::new(&channel.display_name)
            .action(Action::OpenChannel {
                login: channel.login.clone(),
            })
            .context(ItemContext::for_login(&channel.login));
        item.subtitle = subtitle;
        match icon {
            Some(path) => item.icon(Icon::File(path)),
            None => item.icon(Icon::Builtin(BuiltinIcon::Twitch)),
        }
    }
}

pub struct UserItem;

#[async_trait]
impl ItemFormatter for UserItem {
    type Record = FollowedUser;

    async fn format(&self, user: FollowedUser, _icons: &IconCache) -> DisplayItem {
        let mut item = DisplayItem::new(&user.display_name)
            .subtitle(channel_url(&user.login))
            .icon(Icon::Builtin(BuiltinIcon::Twitch))
            .action(Action::OpenChannel {
                login: user.login.clone(),
            })
            .context(ItemContext::for_login(&user.login));
        if let Some(since) = user.followed_at.as_deref() {
            item.subtitle = Some(format!("Following since {}", since_date(since)));
        }
        item
    }
}

/// `2021-03-04T05:06:07Z` -> `2021-03-04`.
fn since_date(timestamp: &str) -> &str {
    timestamp.split('T').next().unwrap_or(timestamp)
}

pub struct StreamItem;

#[async_trait]
impl ItemFormatter for StreamItem {
    type Record = Stream;

    async fn format(&self, stream: Stream, icons: &IconCache) -> DisplayItem {
        let thumbnail = sized(&stream.thumbnail_url, THUMBNAIL_SIZE);
        let icon = icons.fetch(IconKind::Stream, &stream.id, &thumbnail).await;
        DisplayItem::new(&stream.user_name)
            .subtitle(live_line(
                &stream.game_name,
                stream.viewer_count,
                &stream.title,
            ))
            .icon(match icon {
                Some(path) => Icon::File(path),
                None => Icon::Builtin(BuiltinIcon::Player),
            })
            .action(Action::OpenProgram {
                channel_url: channel_url(&stream.user_login),
            })
            .context(ItemContext::for_login(&stream.user_login))
    }
}
