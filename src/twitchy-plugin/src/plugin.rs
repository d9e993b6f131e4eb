//! The plugin as the host sees it: initialize, query, context menu, invoke.

use crate::actions::{ActionError, Actions};
use crate::gate::{CredentialGate, GateError, Session, TokenKind};
use crate::icons::{IconCache, IconError};
use crate::launch::{Launcher, StreamResolver};
use crate::notices;
use crate::protocol::{InvokeOutcome, PluginInfo, PROTOCOL_VERSION};
use crate::router::{classify, QueryRouter};
use std::sync::Arc;
use twitchy_core::api::Connector;
use twitchy_core::config::Config;
use twitchy_core::models::{Action, BuiltinIcon, DisplayItem, Icon, ItemContext};
use twitchy_core::settings::{SettingKey, SettingsStore};

pub const PLUGIN_ID: &str = "twitchy";
pub const PLUGIN_NAME: &str = "Twitch";

/// Collaborators the plugin is built from.
pub struct PluginParts {
    pub connector: Arc<dyn Connector>,
    pub settings: Arc<dyn SettingsStore>,
    pub resolver: Arc<dyn StreamResolver>,
    pub launcher: Arc<dyn Launcher>,
}

pub struct TwitchyPlugin {
    config: Config,
    settings: Arc<dyn SettingsStore>,
    gate: CredentialGate,
    actions: Actions,
    icons: IconCache,
    /// `None` until the first Initialize.
    session: Option<Session>,
}

impl TwitchyPlugin {
    pub fn new(config: Config, parts: PluginParts) -> Result<Self, IconError> {
        let icons = IconCache::new(&config.cache, &config.twitch)?;
        Ok(Self {
            gate: CredentialGate::new(parts.connector, parts.settings.clone()),
            actions: Actions::new(parts.settings.clone(), parts.resolver, parts.launcher),
            settings: parts.settings,
            icons,
            config,
            session: None,
        })
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn icons(&self) -> &IconCache {
        &self.icons
    }

    /// Evict stale icons and run the credential gate.
    pub async fn initialize(&mut self) -> PluginInfo {
        self.icons.evict();
        self.open_session().await;
        PluginInfo {
            id: PLUGIN_ID.to_string(),
            name: PLUGIN_NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            protocol_version: PROTOCOL_VERSION,
            authenticated: self.session.as_ref().is_some_and(Session::is_ready),
        }
    }

    async fn start_session(&self) -> Session {
        let session = Session::from(self.gate.open().await);
        match &session {
            Session::Ready(_) => tracing::info!("session ready"),
            Session::Unauthenticated(err) => {
                tracing::warn!(error = %err, "session unauthenticated")
            }
        }
        session
    }

    async fn open_session(&mut self) -> &Session {
        let session = self.start_session().await;
        self.session.insert(session)
    }

    /// The current session. The gate runs again while the last attempt failed
    /// for any reason other than a reset.
    async fn current_session(&mut self) -> &Session {
        let session = match self.session.take() {
            Some(Session::Unauthenticated(err)) if err.is_retryable() => {
                tracing::debug!(previous = %err, "retrying credential gate");
                self.start_session().await
            }
            Some(session) => session,
            None => self.start_session().await,
        };
        self.session.insert(session)
    }

    /// Results for the raw query text. Failures become a single notice item.
    pub async fn query(&mut self, query: &str) -> Vec<DisplayItem> {
        let auth = match self.current_session().await {
            Session::Ready(auth) => auth.clone(),
            Session::Unauthenticated(err) => return vec![notices::credentials(err, query)],
        };

        let username = self.settings.get(SettingKey::Username).unwrap_or_else(|err| {
            tracing::warn!(error = %err, "could not read username");
            None
        });
        let category = classify(query, username.as_deref());
        let router = QueryRouter::new(auth.api, &self.config.search, &self.icons);

        match router.route(&category).await {
            Ok(items) => items,
            Err(err)
                if err.is_unauthorized()
                    && category.reads_follows()
                    && auth.token == TokenKind::App =>
            {
                // App tokens cannot read follows; the token itself is fine.
                tracing::info!(
                    category = category.name(),
                    error = %err,
                    "follows need a user token"
                );
                vec![notices::user_token_required()]
            }
            Err(err) if err.is_unauthorized() => {
                tracing::warn!(error = %err, "token rejected mid-session");
                if let Err(err) = self.settings.remove(SettingKey::OAuthToken) {
                    tracing::warn!(error = %err, "could not clear rejected token");
                }
                self.session = Some(Session::Unauthenticated(GateError::CredentialInvalid {
                    message: err.to_string(),
                }));
                vec![notices::unable_to_login()]
            }
            Err(err) => {
                tracing::warn!(category = category.name(), error = %err, "query failed");
                vec![notices::unable_to_login()]
            }
        }
    }

    /// Secondary actions for a channel item.
    pub fn context_menu(&self, context: &ItemContext) -> Vec<DisplayItem> {
        let mut items = Vec::new();
        match self.actions.program() {
            Ok(Some(program)) => items.push(
                DisplayItem::new("Open in player")
                    .subtitle(program)
                    .icon(Icon::Builtin(BuiltinIcon::Player))
                    .action(Action::OpenProgram {
                        channel_url: context.channel_url.clone(),
                    }),
            ),
            Ok(None) => {}
            Err(err) => tracing::warn!(error = %err, "could not read player setting"),
        }
        items.push(
            DisplayItem::new("Open in browser")
                .subtitle(context.channel_url.clone())
                .icon(Icon::Builtin(BuiltinIcon::Twitch))
                .action(Action::OpenUrl {
                    url: context.channel_url.clone(),
                }),
        );
        items
    }

    /// Run an action bound to an item.
    pub async fn invoke(&mut self, action: &Action) -> InvokeOutcome {
        let result = match action {
            Action::None => Ok(InvokeOutcome::done()),
            Action::OpenUrl { url } => self.actions.open_url(url).map(|_| InvokeOutcome::done()),
            Action::OpenChannel { login } => {
                self.actions.open_channel(login).map(|_| InvokeOutcome::done())
            }
            Action::OpenProgram { channel_url } => self
                .actions
                .open_program(channel_url)
                .await
                .map(|_| InvokeOutcome::done()),
            Action::SetClientId { client_id } => return self.set_client_id(client_id).await,
            Action::ResetSettings => self.reset_settings(),
        };
        result.unwrap_or_else(|err| {
            tracing::warn!(error = %err, "action failed");
            InvokeOutcome::show(notices::action_failed(&err.to_string()))
        })
    }

    async fn set_client_id(&mut self, client_id: &str) -> InvokeOutcome {
        if let Err(err) = self.actions.store_client_id(client_id) {
            return InvokeOutcome::show(notices::client_id_failed(&err.to_string()));
        }
        match self.open_session().await {
            Session::Ready(_) => InvokeOutcome::requery(),
            Session::Unauthenticated(err) => {
                let reason = err.to_string();
                if let Err(err) = self.actions.blank_client_id() {
                    tracing::warn!(error = %err, "could not blank client id");
                }
                InvokeOutcome::show(notices::client_id_failed(&reason))
            }
        }
    }

    fn reset_settings(&mut self) -> Result<InvokeOutcome, ActionError> {
        let outcome = self.actions.reset_credentials();
        self.session = Some(Session::Unauthenticated(GateError::Reset));
        outcome?;
        Ok(InvokeOutcome {
            items: vec![notices::settings_reset()],
            requery: true,
        })
    }
}
