//! Side effects behind the item actions: opening URLs, starting the external
//! player, and writing credential settings.

use crate::launch::{LaunchError, Launcher, ResolveError, ResolvedStreams, StreamResolver};
use std::sync::Arc;
use thiserror::Error;
use twitchy_core::models::channel_url;
use twitchy_core::settings::{SettingKey, SettingsError, SettingsStore};

pub const DEFAULT_PROGRAM_ARGS: &str = "{url}";

const URL_TOKEN: &str = "{url}";
const BEST_TOKEN: &str = "{best}";
const WORST_TOKEN: &str = "{worst}";

#[derive(Debug, Error)]
pub enum ActionError {
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error(transparent)]
    Launch(#[from] LaunchError),
    #[error("no {quality} stream available for {url}")]
    MissingQuality { quality: &'static str, url: String },
}

/// Whether the template needs stream resolution before it can be filled.
pub fn needs_resolution(template: &str) -> bool {
    template.contains(BEST_TOKEN) || template.contains(WORST_TOKEN)
}

/// Split the template on whitespace and substitute the tokens in each word.
pub fn render_args(
    template: &str,
    url: &str,
    streams: Option<&ResolvedStreams>,
) -> Result<Vec<String>, ActionError> {
    let quality = |name: &'static str, found: Option<&str>| {
        found.map(str::to_string).ok_or(ActionError::MissingQuality {
            quality: name,
            url: url.to_string(),
        })
    };

    template
        .split_whitespace()
        .map(|word| -> Result<String, ActionError> {
            let mut word = word.replace(URL_TOKEN, url);
            if word.contains(BEST_TOKEN) {
                let best = quality("best", streams.and_then(ResolvedStreams::best))?;
                word = word.replace(BEST_TOKEN, &best);
            }
            if word.contains(WORST_TOKEN) {
                let worst = quality("worst", streams.and_then(ResolvedStreams::worst))?;
                word = word.replace(WORST_TOKEN, &worst);
            }
            Ok(word)
        })
        .collect()
}

pub struct Actions {
    settings: Arc<dyn SettingsStore>,
    resolver: Arc<dyn StreamResolver>,
    launcher: Arc<dyn Launcher>,
}

impl Actions {
    pub fn new(
        settings: Arc<dyn SettingsStore>,
        resolver: Arc<dyn StreamResolver>,
        launcher: Arc<dyn Launcher>,
    ) -> Self {
        Self {
            settings,
            resolver,
            launcher,
        }
    }

    pub fn open_url(&self, url: &str) -> Result<(), ActionError> {
        tracing::info!(url, "opening in browser");
        Ok(self.launcher.open_url(url)?)
    }

    pub fn open_channel(&self, login: &str) -> Result<(), ActionError> {
        self.open_url(&channel_url(login))
    }

    /// Configured player path, if any.
    pub fn program(&self) -> Result<Option<String>, ActionError> {
        Ok(self.settings.get(SettingKey::ProgramPath)?)
    }

    /// Start the configured player for the channel. Without a player the
    /// channel opens in the browser.
    pub async fn open_program(&self, url: &str) -> Result<(), ActionError> {
        let Some(program) = self.program()? else {
            return self.open_url(url);
        };
        let template = self
            .settings
            .get(SettingKey::ProgramArgs)?
            .unwrap_or_else(|| DEFAULT_PROGRAM_ARGS.to_string());

        let streams = if needs_resolution(&template) {
            Some(self.resolver.resolve(url).await?)
        } else {
            None
        };
        let args = render_args(&template, url, streams.as_ref())?;
        tracing::info!(program = %program, args = args.len(), "opening in player");
        Ok(self.launcher.spawn(&program, &args)?)
    }

    pub fn store_client_id(&self, client_id: &str) -> Result<(), ActionError> {
        self.settings.set(SettingKey::ClientId, client_id.trim())?;
        Ok(())
    }

    pub fn blank_client_id(&self) -> Result<(), ActionError> {
        self.settings.remove(SettingKey::ClientId)?;
        Ok(())
    }

    /// Clear the client id and token, keeping the old id under
    /// `previous_client_id`.
    pub fn reset_credentials(&self) -> Result<(), ActionError> {
        if let Some(previous) = self.settings.get(SettingKey::ClientId)? {
            self.settings.set(SettingKey::PreviousClientId, &previous)?;
        }
        self.settings.remove(SettingKey::ClientId)?;
        self.settings.remove(SettingKey::OAuthToken)?;
        tracing::info!("credentials reset");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn streams() -> ResolvedStreams {
        ResolvedStreams {
            streams: BTreeMap::from([
                ("best".to_string(), "https://video/best.m3u8".to_string()),
                ("worst".to_string(), "https://video/worst.m3u8".to_string()),
            ]),
        }
    }

    #[test]
    fn default_template_passes_url() {
        let args = render_args(DEFAULT_PROGRAM_ARGS, "https://www.twitch.tv/a", None).unwrap();
        assert_eq!(args, vec!["https://www.twitch.tv/a"]);
    }

    #[test]
    fn tokens_are_substituted_per_word() {
        let args = render_args(
            "--title={url}  --low {worst} {best}",
            "https://www.twitch.tv/a",
            Some(&streams()),
        )
        .unwrap();
        assert_eq!(
            args,
            vec![
                "--title=https://www.twitch.tv/a",
                "--low",
                "https://video/worst.m3u8",
                "https://video/best.m3u8",
            ]
        );
    }

    #[test]
    fn missing_quality_is_an_error() {
        let err = render_args("{best}", "https://www.twitch.tv/a", None).unwrap_err();
        assert!(matches!(
            err,
            ActionError::MissingQuality {
                quality: "best",
                ..
            }
        ));
    }

    #[test]
    fn resolution_only_for_quality_tokens() {
        assert!(!needs_resolution("--fullscreen {url}"));
        assert!(needs_resolution("{worst}"));
        assert!(needs_resolution("--x {best}"));
    }
}
