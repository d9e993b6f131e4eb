//! Stream resolution through streamlink and hand-off to the OS.

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("{program} not found on PATH")]
    NotInstalled { program: String },
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("could not read streamlink output: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("streamlink: {0}")]
    Failed(String),
}

#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// Playable URLs for a channel keyed by quality name (`best`, `worst`, `720p60`, ...).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedStreams {
    pub streams: BTreeMap<String, String>,
}

impl ResolvedStreams {
    pub fn get(&self, quality: &str) -> Option<&str> {
        self.streams.get(quality).map(String::as_str)
    }

    pub fn best(&self) -> Option<&str> {
        self.get("best")
    }

    pub fn worst(&self) -> Option<&str> {
        self.get("worst")
    }
}

#[async_trait]
pub trait StreamResolver: Send + Sync {
    async fn resolve(&self, channel_url: &str) -> Result<ResolvedStreams, ResolveError>;
}

#[derive(Debug, Deserialize)]
struct StreamlinkOutput {
    #[serde(default)]
    streams: BTreeMap<String, StreamlinkStream>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamlinkStream {
    url: String,
}

/// Parse the document printed by `streamlink --json <url>`.
fn parse_streamlink(stdout: &[u8]) -> Result<ResolvedStreams, ResolveError> {
    let output: StreamlinkOutput = serde_json::from_slice(stdout)?;
    if let Some(error) = output.error {
        return Err(ResolveError::Failed(error));
    }
    Ok(ResolvedStreams {
        streams: output
            .streams
            .into_iter()
            .map(|(quality, stream)| (quality, stream.url))
            .collect(),
    })
}

/// Runs the `streamlink` executable.
#[derive(Debug, Clone)]
pub struct StreamlinkResolver {
    program: String,
}

impl StreamlinkResolver {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn locate(&self) -> Result<PathBuf, ResolveError> {
        which::which(&self.program).map_err(|_| ResolveError::NotInstalled {
            program: self.program.clone(),
        })
    }
}

#[async_trait]
impl StreamResolver for StreamlinkResolver {
    async fn resolve(&self, channel_url: &str) -> Result<ResolvedStreams, ResolveError> {
        let program = self.locate()?;
        tracing::debug!(program = %program.display(), channel_url, "resolving stream");
        let output = tokio::process::Command::new(&program)
            .arg("--json")
            .arg(channel_url)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|source| ResolveError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        // streamlink reports failures as JSON on stdout with a non-zero exit.
        match parse_streamlink(&output.stdout) {
            Err(ResolveError::Parse(_)) if !output.status.success() => Err(ResolveError::Failed(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            )),
            result => result,
        }
    }
}

pub trait Launcher: Send + Sync {
    /// Open a URL with the desktop's default handler.
    fn open_url(&self, url: &str) -> Result<(), LaunchError>;

    /// Start `program` detached from the plugin.
    fn spawn(&self, program: &str, args: &[String]) -> Result<(), LaunchError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemLauncher;

impl SystemLauncher {
    fn opener(url: &str) -> (&'static str, Vec<String>) {
        if cfg!(target_os = "windows") {
            let args = ["/C", "start", "", url];
            ("cmd", args.iter().map(|s| s.to_string()).collect())
        } else if cfg!(target_os = "macos") {
            ("open", vec![url.to_string()])
        } else {
            ("xdg-open", vec![url.to_string()])
        }
    }
}

impl Launcher for SystemLauncher {
    fn open_url(&self, url: &str) -> Result<(), LaunchError> {
        let (program, args) = Self::opener(url);
        self.spawn(program, &args)
    }

    fn spawn(&self, program: &str, args: &[String]) -> Result<(), LaunchError> {
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| LaunchError::Spawn {
                program: program.to_string(),
                source,
            })?;
        tracing::info!(program, pid = child.id(), "started process");
        // Reap the child so it does not linger as a zombie.
        std::thread::spawn(move || {
            let _ = child.wait();
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_streamlink_streams() {
        let json = br#"{
            "plugin": "twitch",
            "metadata": {"author": "alice"},
            "streams": {
                "worst": {"type": "hls", "url": "https://video/160p.m3u8"},
                "720p60": {"type": "hls", "url": "https://video/720p60.m3u8"},
                "best": {"type": "hls", "url": "https://video/1080p60.m3u8"}
            }
        }"#;
        let streams = parse_streamlink(json).unwrap();
        assert_eq!(streams.best(), Some("https://video/1080p60.m3u8"));
        assert_eq!(streams.worst(), Some("https://video/160p.m3u8"));
        assert_eq!(streams.get("720p60"), Some("https://video/720p60.m3u8"));
    }

    #[test]
    fn streamlink_error_field_is_an_error() {
        let json = br#"{"error": "No playable streams found on this URL: https://www.twitch.tv/x"}"#;
        match parse_streamlink(json) {
            Err(ResolveError::Failed(message)) => assert!(message.contains("No playable streams")),
            other => panic!("expected Failed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_executable_is_not_installed() {
        let resolver = StreamlinkResolver::new("twitchy-no-such-streamlink");
        let err = resolver
            .resolve("https://www.twitch.tv/alice")
            .await
            .unwrap_err();
        assert!(matches!(err, ResolveError::NotInstalled { .. }));
    }

    #[test]
    fn spawn_failure_names_program() {
        let err = SystemLauncher
            .spawn("twitchy-no-such-player", &[])
            .unwrap_err();
        assert!(err.to_string().contains("twitchy-no-such-player"));
    }
}
