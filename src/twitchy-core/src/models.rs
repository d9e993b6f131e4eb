use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const TWITCH_WEB: &str = "https://www.twitch.tv";

/// Channel page URL for a login name.
pub fn channel_url(login: &str) -> String {
    format!("{}/{}", TWITCH_WEB, login)
}

/// A game/category from the top games listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Game {
    pub id: String,
    pub name: String,
    /// May contain the `{width}x{height}` size template.
    pub box_art_url: String,
}

/// Live state attached to a channel that is currently streaming.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveStatus {
    pub game: String,
    pub viewers: u64,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub id: String,
    pub login: String,
    pub display_name: String,
    pub description: String,
    pub logo_url: Option<String>,
    pub views: u64,
    pub live: Option<LiveStatus>,
}

/// A broadcaster followed by the configured user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowedUser {
    pub id: String,
    pub login: String,
    pub display_name: String,
    pub followed_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stream {
    pub id: String,
    pub user_id: String,
    pub user_login: String,
    pub user_name: String,
    pub game_name: String,
    pub title: String,
    pub viewer_count: u64,
    /// May contain the `{width}x{height}` size template.
    pub thumbnail_url: String,
}

/// Cursor returned from a paged API call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageCursor(pub String);

/// A single page of items plus an optional cursor for continuation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub cursor: Option<PageCursor>,
}

impl<T> Page<T> {
    pub fn single_page(items: Vec<T>) -> Self {
        Self {
            items,
            cursor: None,
        }
    }
}

/// Glyphs the host ships with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuiltinIcon {
    Twitch,
    Settings,
    Error,
    Cancel,
    Player,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Icon {
    Builtin(BuiltinIcon),
    File(PathBuf),
}

/// What happens when the user activates an item. Bound when the item is
/// built and sent back verbatim by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    #[default]
    None,
    OpenUrl {
        url: String,
    },
    OpenChannel {
        login: String,
    },
    /// Resolve the channel and hand it to the configured external player.
    OpenProgram {
        channel_url: String,
    },
    SetClientId {
        client_id: String,
    },
    ResetSettings,
}

/// Channel the item refers to, used for context menus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemContext {
    pub channel_login: String,
    pub channel_url: String,
}

impl ItemContext {
    pub fn for_login(login: &str) -> Self {
        Self {
            channel_login: login.to_string(),
            channel_url: channel_url(login),
        }
    }
}

/// Uniform render record submitted to the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayItem {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<Icon>,
    #[serde(default)]
    pub action: Action,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<ItemContext>,
}

impl DisplayItem {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            subtitle: None,
            icon: None,
            action: Action::None,
            context: None,
        }
    }

    pub fn subtitle(mut self, subtitle: impl Into<String>) -> Self {
        self.subtitle = Some(subtitle.into());
        self
    }

    pub fn icon(mut self, icon: Icon) -> Self {
        self.icon = Some(icon);
        self
    }

    pub fn icon_file(mut self, path: Option<PathBuf>) -> Self {
        self.icon = path.map(Icon::File);
        self
    }

    pub fn action(mut self, action: Action) -> Self {
        self.action = action;
        self
    }

    pub fn context(mut self, context: ItemContext) -> Self {
        self.context = Some(context);
        self
    }
}
