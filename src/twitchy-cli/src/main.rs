use anyhow::Result;
use clap::{Parser, Subcommand};
use helix_provider::HelixConnector;
use std::sync::Arc;
use thiserror::Error;
use twitchy_core::cache::{CacheManager, CachePolicy};
use twitchy_core::models::{Action, DisplayItem, Icon, ItemContext};
use twitchy_core::redact::mask;
use twitchy_core::{
    init_logging, AppDirs, Config, FileSettings, SecureSettings, SettingKey, SettingsStore,
};
use twitchy_plugin::{
    InvokeOutcome, PluginParts, PluginServer, StreamlinkResolver, SystemLauncher, TwitchyPlugin,
};

#[derive(Debug, Parser)]
#[command(name = "twitchy", version, about = "Twitch search for desktop launchers")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Serve the plugin protocol on stdin/stdout (default)
    Serve,
    /// Run one query and print the resulting items
    Query {
        /// Query text; `:` games, `#` followed users, empty for live streams
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        query: Vec<String>,
        /// Print items as JSON lines
        #[arg(long)]
        json: bool,
    },
    /// Print the context menu for a channel
    Context {
        login: String,
        #[arg(long)]
        json: bool,
    },
    /// List stored settings with secrets masked
    Settings,
    /// Store a setting
    Set {
        #[arg(value_parser = parse_key)]
        key: SettingKey,
        value: String,
    },
    /// Store a client id and check it against Twitch
    SetClientId { client_id: String },
    /// Clear the client id and token
    Reset,
}

#[derive(Debug, Error)]
enum KeyError {
    #[error("unknown setting '{0}' (expected one of: {1})")]
    Unknown(String, String),
}

fn parse_key(name: &str) -> Result<SettingKey, KeyError> {
    SettingKey::parse(name).ok_or_else(|| {
        let known: Vec<&str> = SettingKey::ALL.iter().map(|k| k.as_str()).collect();
        KeyError::Unknown(name.to_string(), known.join(", "))
    })
}

fn open_settings(config: &Config, dirs: &AppDirs) -> Result<Arc<dyn SettingsStore>> {
    let file = FileSettings::open(dirs.settings_path())?;
    if config.settings.keyring {
        Ok(Arc::new(SecureSettings::new(file)))
    } else {
        Ok(Arc::new(file))
    }
}

fn build_plugin(config: &Config, settings: Arc<dyn SettingsStore>) -> Result<TwitchyPlugin> {
    let parts = PluginParts {
        connector: Arc::new(HelixConnector::new(&config.twitch)?),
        settings,
        resolver: Arc::new(StreamlinkResolver::new(config.player.streamlink.clone())),
        launcher: Arc::new(SystemLauncher),
    };
    Ok(TwitchyPlugin::new(config.clone(), parts)?)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let dirs = AppDirs::discover()?;
    let config = Config::load_or_default(&dirs)?;
    let _logging = init_logging(&config.logging, &dirs)?;
    let settings = open_settings(&config, &dirs)?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            tracing::info!(config_dir = %dirs.config_dir().display(), "serving plugin protocol");
            let plugin = build_plugin(&config, settings)?;
            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            PluginServer::new(stdin, tokio::io::stdout(), plugin)
                .run()
                .await?;
        }
        Command::Query { query, json } => {
            let mut plugin = build_plugin(&config, settings)?;
            plugin.initialize().await;
            let items = plugin.query(&query.join(" ")).await;
            print_items(&items, json)?;
        }
        Command::Context { login, json } => {
            let plugin = build_plugin(&config, settings)?;
            let items = plugin.context_menu(&ItemContext::for_login(&login));
            print_items(&items, json)?;
        }
        Command::Settings => print_settings(&config, &dirs, settings.as_ref())?,
        Command::Set { key, value } => {
            settings.set(key, &value)?;
            let shown = if key.is_secret() { mask(&value) } else { value };
            println!("{key} = {shown}");
        }
        Command::SetClientId { client_id } => {
            let mut plugin = build_plugin(&config, settings)?;
            let outcome = plugin
                .invoke(&Action::SetClientId { client_id })
                .await;
            print_outcome(&outcome, "Client id accepted")?;
        }
        Command::Reset => {
            let mut plugin = build_plugin(&config, settings)?;
            let outcome = plugin.invoke(&Action::ResetSettings).await;
            print_outcome(&outcome, "Credentials cleared")?;
        }
    }

    Ok(())
}

fn print_outcome(outcome: &InvokeOutcome, success: &str) -> Result<()> {
    if outcome.items.is_empty() {
        println!("{success}");
        Ok(())
    } else {
        print_items(&outcome.items, false)
    }
}

fn describe_action(action: &Action) -> Option<String> {
    match action {
        Action::None => None,
        Action::OpenUrl { url } => Some(format!("open {url}")),
        Action::OpenChannel { login } => Some(format!("open channel {login}")),
        Action::OpenProgram { channel_url } => Some(format!("play {channel_url}")),
        Action::SetClientId { client_id } => Some(format!("set client id '{client_id}'")),
        Action::ResetSettings => Some("reset settings".into()),
    }
}

fn render_item(item: &DisplayItem) -> String {
    let mut out = item.title.clone();
    if let Some(subtitle) = &item.subtitle {
        out.push_str(&format!("\n    {subtitle}"));
    }
    if let Some(Icon::File(path)) = &item.icon {
        out.push_str(&format!("\n    icon: {}", path.display()));
    }
    if let Some(action) = describe_action(&item.action) {
        out.push_str(&format!("\n    -> {action}"));
    }
    out
}

fn print_items(items: &[DisplayItem], json: bool) -> Result<()> {
    if items.is_empty() && !json {
        println!("No results.");
    }
    for item in items {
        if json {
            println!("{}", serde_json::to_string(item)?);
        } else {
            println!("{}", render_item(item));
        }
    }
    Ok(())
}

fn print_settings(config: &Config, dirs: &AppDirs, settings: &dyn SettingsStore) -> Result<()> {
    println!("settings: {}", dirs.settings_path().display());
    let entries = settings.entries()?;
    if entries.is_empty() {
        println!("  (none set)");
    }
    for (key, value) in entries {
        let shown = if key.is_secret() { mask(&value) } else { value };
        println!("  {key} = {shown}");
    }

    let icons = CacheManager::new(config.cache.icon_dir(), CachePolicy::from(&config.cache));
    let stats = icons.stats()?;
    println!(
        "icons: {} ({} files, {} KiB)",
        icons.dir().display(),
        stats.file_count,
        stats.total_size / 1024
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_subcommand_means_serve() {
        let cli = Cli::try_parse_from(["twitchy"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn query_words_are_kept_in_order() {
        let cli = Cli::try_parse_from(["twitchy", "query", "--json", ":just", "chatting"]).unwrap();
        match cli.command {
            Some(Command::Query { query, json }) => {
                assert!(json);
                assert_eq!(query.join(" "), ":just chatting");
            }
            other => panic!("expected query, got {other:?}"),
        }
    }

    #[test]
    fn set_parses_known_keys_only() {
        let cli = Cli::try_parse_from(["twitchy", "set", "program_args", "{best}"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Command::Set {
                key: SettingKey::ProgramArgs,
                ..
            })
        ));

        let err = Cli::try_parse_from(["twitchy", "set", "colour", "red"]).unwrap_err();
        assert!(err.to_string().contains("unknown setting 'colour'"));
    }

    #[test]
    fn rendered_item_shows_subtitle_and_action() {
        let item = DisplayItem::new("Speedy")
            .subtitle("[LIVE] Game: Celeste - Viewers: 42 - any%")
            .action(Action::OpenChannel {
                login: "speedy".into(),
            });
        let text = render_item(&item);
        assert_eq!(
            text,
            "Speedy\n    [LIVE] Game: Celeste - Viewers: 42 - any%\n    -> open channel speedy"
        );
    }
}
