//! Best-effort mirroring of chat messages into an external Slack workspace.
//!
//! The bridge is strictly fire-and-forget from the caller's point of view:
//! persistence and the room broadcast are the source of truth, and a bridge
//! failure must never roll either back. Callers spawn `mirror_message` on a
//! background task and only log its errors.

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use tracing::debug;

const SLACK_API_URL: &str = "https://slack.com/api/chat.postMessage";

#[derive(Debug, Deserialize)]
struct PostMessageResponse {
    ok: bool,
    error: Option<String>,
}

pub struct SlackBridge {
    client: reqwest::Client,
    token: String,
    /// External channel the mirror posts into. One shared channel keeps the
    /// setup trivial; per-channel mapping is a future concern.
    channel: String,
}

impl SlackBridge {
    /// Build the bridge from `TEAMLINE_SLACK_TOKEN` / `TEAMLINE_SLACK_CHANNEL`.
    /// Returns None when not configured; the chat works fine without it.
    pub fn from_env() -> Option<Self> {
        let token = std::env::var("TEAMLINE_SLACK_TOKEN").ok()?;
        let channel = std::env::var("TEAMLINE_SLACK_CHANNEL").ok()?;
        if !token.starts_with("xoxb-") {
            return None;
        }
        Some(Self {
            client: reqwest::Client::new(),
            token,
            channel,
        })
    }

    /// Post one message line to the external workspace.
    pub async fn mirror_message(&self, channel_name: &str, username: &str, content: &str) -> Result<()> {
        let body = serde_json::json!({
            "channel": self.channel,
            "text": format!("[#{}] {}: {}", channel_name, username, content),
            "username": "Teamline Bridge",
        });

        let response: PostMessageResponse = self
            .client
            .post(SLACK_API_URL)
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await
            .context("Slack request failed")?
            .json()
            .await
            .context("Slack response was not JSON")?;

        if !response.ok {
            bail!(
                "Slack rejected the message: {}",
                response.error.unwrap_or_else(|| "unknown error".into())
            );
        }

        debug!("mirrored message from #{} to Slack", channel_name);
        Ok(())
    }
}
