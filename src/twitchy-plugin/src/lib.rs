//! Twitch search plugin for desktop quick-launchers.
//!
//! The launcher host runs the plugin as a child process and talks to it with
//! line-delimited JSON over stdin/stdout (see [`protocol`]):
//! - the host sends [`PluginRequest`] messages, one per line
//! - the plugin answers each with a [`PluginResponse`] on its own line
//!
//! A query is classified by its prefix into a [`Category`]; the
//! [`QueryRouter`] fetches that category from Twitch and turns every record
//! into a [`DisplayItem`](twitchy_core::models::DisplayItem). The
//! [`CredentialGate`] runs first and replaces all results with a single
//! notice while credentials are missing or rejected.
//!
//! ```text
//! > {"id":1,"method":{"type":"Initialize"}}
//! < {"id":1,"result":{"status":"Initialized","id":"twitchy","name":"Twitch","version":"0.1.0","protocol_version":1,"authenticated":true}}
//! > {"id":2,"method":{"type":"Query","params":{"query":":minecraft"}}}
//! < {"id":2,"result":{"status":"Items","items":[{"title":"Minecraft","icon":{"kind":"file","value":"/tmp/twitchy/27471.jpg"},"action":{"type":"open_url","url":"https://www.twitch.tv/directory/game/Minecraft"}}]}}
//! ```

pub mod actions;
pub mod formatters;
pub mod gate;
pub mod icons;
pub mod launch;
pub mod notices;
pub mod plugin;
pub mod protocol;
pub mod router;
pub mod server;

pub use gate::{Authenticated, CredentialGate, GateError, Session, TokenKind};
pub use launch::{
    LaunchError, Launcher, ResolveError, ResolvedStreams, StreamResolver, StreamlinkResolver,
    SystemLauncher,
};
pub use plugin::{PluginParts, TwitchyPlugin};
pub use protocol::{
    InvokeOutcome, PluginError, PluginErrorKind, PluginInfo, PluginMethod, PluginRequest,
    PluginResponse, PluginResult, PROTOCOL_VERSION,
};
pub use router::{classify, Category, QueryRouter};
pub use server::{PluginServer, ServerError};
