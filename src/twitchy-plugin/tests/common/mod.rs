#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use twitchy_core::api::{ApiError, ApiResult, Connector, Credentials, TokenInfo, TwitchApi};
use twitchy_core::config::Config;
use twitchy_core::models::{Channel, FollowedUser, Game, Page, PageCursor, Stream};
use twitchy_core::settings::{MemorySettings, SettingKey};
use twitchy_plugin::{
    LaunchError, Launcher, PluginParts, ResolveError, ResolvedStreams, StreamResolver,
    TwitchyPlugin,
};

pub const CLIENT_ID: &str = "cid";
pub const GOOD_TOKEN: &str = "good-token";
/// Validates with a login attached, like a user access token.
pub const USER_TOKEN: &str = "user-token";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Failure {
    None,
    Transport,
    Unauthorized,
    /// Only the follows endpoints answer 401.
    FollowsUnauthorized,
}

pub struct FakeApi {
    pub games: Vec<String>,
    pub streams: Vec<Stream>,
    pub failure: Failure,
    /// Fail this many calls, then succeed. `None` fails every call.
    pub failure_limit: Option<usize>,
    pub failed: AtomicUsize,
}

impl Default for FakeApi {
    fn default() -> Self {
        Self {
            games: vec![
                "Minecraft".into(),
                "Just Chatting".into(),
                "Minecraft Dungeons".into(),
                "Fortnite".into(),
                "MINECRAFT LEGENDS".into(),
            ],
            streams: Vec::new(),
            failure: Failure::None,
            failure_limit: None,
            failed: AtomicUsize::new(0),
        }
    }
}

impl FakeApi {
    fn fail(&self) -> bool {
        let failed = self.failed.fetch_add(1, Ordering::SeqCst);
        self.failure_limit.map_or(true, |limit| failed < limit)
    }

    fn check(&self) -> ApiResult<()> {
        match self.failure {
            Failure::None | Failure::FollowsUnauthorized => Ok(()),
            Failure::Transport if self.fail() => Err(ApiError::Transport {
                message: "connection reset by peer".into(),
            }),
            Failure::Unauthorized if self.fail() => Err(ApiError::Unauthorized {
                message: "invalid oauth token".into(),
            }),
            _ => Ok(()),
        }
    }

    fn check_follows(&self) -> ApiResult<()> {
        if self.failure == Failure::FollowsUnauthorized {
            return Err(ApiError::Unauthorized {
                message: "missing user:read:follows".into(),
            });
        }
        self.check()
    }
}

pub fn stream(login: &str, viewers: u64) -> Stream {
    Stream {
        id: format!("s-{login}"),
        user_id: format!("u-{login}"),
        user_login: login.to_string(),
        user_name: login.to_uppercase(),
        game_name: "Chess".into(),
        title: format!("{login} plays"),
        viewer_count: viewers,
        thumbnail_url: String::new(),
    }
}

fn channel(login: &str) -> Channel {
    Channel {
        id: login.to_string(),
        login: login.to_string(),
        display_name: login.to_string(),
        description: String::new(),
        logo_url: None,
        views: 0,
        live: None,
    }
}

#[async_trait]
impl TwitchApi for FakeApi {
    async fn top_games(&self, _: Option<&PageCursor>) -> ApiResult<Page<Game>> {
        self.check()?;
        let items = self
            .games
            .iter()
            .enumerate()
            .map(|(i, name)| Game {
                id: i.to_string(),
                name: name.clone(),
                box_art_url: String::new(),
            })
            .collect();
        Ok(Page::single_page(items))
    }

    async fn search_channels(&self, query: &str, _: usize) -> ApiResult<Vec<Channel>> {
        self.check()?;
        Ok(vec![channel(query)])
    }

    async fn channels_by_login(&self, logins: &[String]) -> ApiResult<Vec<Channel>> {
        self.check()?;
        Ok(logins.iter().map(|l| channel(l)).collect())
    }

    async fn followed_users(&self, _: &str, _: usize) -> ApiResult<Vec<FollowedUser>> {
        self.check_follows()?;
        Ok(Vec::new())
    }

    async fn followed_streams(&self, _: &str, limit: usize) -> ApiResult<Vec<Stream>> {
        self.check_follows()?;
        Ok(self.streams.iter().take(limit).cloned().collect())
    }
}

/// Accepts [`GOOD_TOKEN`] and [`USER_TOKEN`] for [`CLIENT_ID`]; issues
/// `issued` when set.
pub struct FakeConnector {
    pub api: Arc<FakeApi>,
    pub issued: Option<String>,
    /// Validate calls that fail with a transport error before Twitch answers.
    pub validate_outages: usize,
    pub validate_calls: AtomicUsize,
    pub connects: Mutex<Vec<Credentials>>,
}

impl FakeConnector {
    pub fn new(api: FakeApi) -> Self {
        Self {
            api: Arc::new(api),
            issued: None,
            validate_outages: 0,
            validate_calls: AtomicUsize::new(0),
            connects: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl Connector for FakeConnector {
    async fn validate_token(&self, token: &str) -> ApiResult<TokenInfo> {
        let call = self.validate_calls.fetch_add(1, Ordering::SeqCst);
        if call < self.validate_outages {
            return Err(ApiError::Transport {
                message: "dns error: failed to lookup address".into(),
            });
        }
        if token == GOOD_TOKEN || token == USER_TOKEN {
            Ok(TokenInfo {
                client_id: CLIENT_ID.into(),
                login: (token == USER_TOKEN).then(|| "alice".to_string()),
                expires_in: Some(3600),
            })
        } else {
            Err(ApiError::Unauthorized {
                message: "invalid access token".into(),
            })
        }
    }

    async fn issue_app_token(&self, client_id: &str, _: &str) -> ApiResult<String> {
        match &self.issued {
            Some(token) if client_id == CLIENT_ID => Ok(token.clone()),
            _ => Err(ApiError::Unauthorized {
                message: "invalid client".into(),
            }),
        }
    }

    fn connect(&self, credentials: &Credentials) -> ApiResult<Arc<dyn TwitchApi>> {
        self.connects.lock().unwrap().push(credentials.clone());
        let api: Arc<dyn TwitchApi> = self.api.clone();
        Ok(api)
    }
}

#[derive(Default)]
pub struct FakeResolver {
    pub resolved: Mutex<Vec<String>>,
}

#[async_trait]
impl StreamResolver for FakeResolver {
    async fn resolve(&self, channel_url: &str) -> Result<ResolvedStreams, ResolveError> {
        self.resolved.lock().unwrap().push(channel_url.to_string());
        Ok(ResolvedStreams {
            streams: BTreeMap::from([
                ("best".to_string(), format!("{channel_url}/1080p60.m3u8")),
                ("worst".to_string(), format!("{channel_url}/160p.m3u8")),
            ]),
        })
    }
}

#[derive(Default)]
pub struct RecordingLauncher {
    pub opened: Mutex<Vec<String>>,
    pub spawned: Mutex<Vec<(String, Vec<String>)>>,
}

impl Launcher for RecordingLauncher {
    fn open_url(&self, url: &str) -> Result<(), LaunchError> {
        self.opened.lock().unwrap().push(url.to_string());
        Ok(())
    }

    fn spawn(&self, program: &str, args: &[String]) -> Result<(), LaunchError> {
        self.spawned
            .lock()
            .unwrap()
            .push((program.to_string(), args.to_vec()));
        Ok(())
    }
}

pub struct Harness {
    pub plugin: TwitchyPlugin,
    pub settings: Arc<MemorySettings>,
    pub connector: Arc<FakeConnector>,
    pub resolver: Arc<FakeResolver>,
    pub launcher: Arc<RecordingLauncher>,
    _icons: TempDir,
}

impl Harness {
    pub fn new(connector: FakeConnector, settings: &[(SettingKey, &str)]) -> Self {
        let icons = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.cache.icon_dir = Some(icons.path().to_path_buf());

        let settings = Arc::new(MemorySettings::with(settings));
        let connector = Arc::new(connector);
        let resolver = Arc::new(FakeResolver::default());
        let launcher = Arc::new(RecordingLauncher::default());
        let plugin = TwitchyPlugin::new(
            config,
            PluginParts {
                connector: connector.clone(),
                settings: settings.clone(),
                resolver: resolver.clone(),
                launcher: launcher.clone(),
            },
        )
        .unwrap();

        Self {
            plugin,
            settings,
            connector,
            resolver,
            launcher,
            _icons: icons,
        }
    }

    /// Valid client id and token plus any extra settings.
    pub fn authenticated(api: FakeApi, extra: &[(SettingKey, &str)]) -> Self {
        let mut settings = vec![
            (SettingKey::ClientId, CLIENT_ID),
            (SettingKey::OAuthToken, GOOD_TOKEN),
        ];
        settings.extend_from_slice(extra);
        Self::new(FakeConnector::new(api), &settings)
    }
}
