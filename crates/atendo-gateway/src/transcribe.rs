// SPDX-FileCopyrightText: 2026 Atendo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! On-demand audio transcription.
//!
//! A voice message moves through a three-state terminal machine:
//! idle (NULL status) -> `processing` -> `completed` or `failed`. Both
//! terminal states stick; a failed transcription is never retried. The
//! idle-to-processing transition is a single conditional UPDATE, so exactly
//! one of any number of concurrent requests performs the upstream call.

use std::sync::Arc;

use atendo_core::AtendoError;
use atendo_storage::{Database, queries};
use atendo_sync::{ChangeFeed, Table};
use base64::Engine as _;
use tracing::{info, warn};

/// Upstream transcription API settings.
#[derive(Debug, Clone)]
pub struct TranscriberConfig {
    /// Chat-completions endpoint of the transcription provider.
    pub api_url: String,
    /// Bearer token for the provider. `None` disables transcription.
    pub api_key: Option<String>,
    /// Model identifier sent to the provider.
    pub model: String,
    /// Instruction prepended to the audio payload.
    pub prompt: String,
    /// Completion budget for the transcript.
    pub max_tokens: u32,
}

/// Result of a transcription request against the terminal state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscribeOutcome {
    /// Transcript available, either freshly produced or previously stored.
    Completed { transcription: String },
    /// Another request holds the claim; poll again later.
    Processing,
    /// A previous attempt failed; terminal, never retried.
    Failed,
    /// The message carries no audio attachment to transcribe.
    NoAudio,
}

/// Drives voice message transcription through the upstream provider.
pub struct Transcriber {
    db: Arc<Database>,
    feed: ChangeFeed,
    http: reqwest::Client,
    config: TranscriberConfig,
}

impl Transcriber {
    pub fn new(db: Arc<Database>, feed: ChangeFeed, config: TranscriberConfig) -> Self {
        Self {
            db,
            feed,
            http: reqwest::Client::new(),
            config,
        }
    }

    /// Transcribe the audio attached to `message_id`.
    ///
    /// Idempotent against the stored state: completed messages return the
    /// stored transcript without touching the provider, in-flight messages
    /// report `Processing`, and failed ones report `Failed`.
    pub async fn transcribe(&self, message_id: &str) -> Result<TranscribeOutcome, AtendoError> {
        let Some(message) = queries::messages::get_message(&self.db, message_id).await? else {
            return Err(AtendoError::NotFound {
                entity: "message",
                id: message_id.to_string(),
            });
        };

        if let Some(outcome) = outcome_from_status(
            message.transcription_status.as_deref(),
            message.audio_transcription.as_deref(),
        ) {
            return Ok(outcome);
        }

        let Some(media_url) = message.media_url.clone() else {
            return Ok(TranscribeOutcome::NoAudio);
        };
        let api_key = self
            .config
            .api_key
            .clone()
            .ok_or_else(|| AtendoError::Transcription {
                message: "transcription api key not configured".to_string(),
                source: None,
            })?;

        if !queries::messages::begin_transcription(&self.db, message_id).await? {
            // Lost the claim race; report whatever state the winner left.
            let current = queries::messages::get_message(&self.db, message_id)
                .await?
                .ok_or_else(|| AtendoError::NotFound {
                    entity: "message",
                    id: message_id.to_string(),
                })?;
            return Ok(outcome_from_status(
                current.transcription_status.as_deref(),
                current.audio_transcription.as_deref(),
            )
            .unwrap_or(TranscribeOutcome::Processing));
        }

        match self
            .run_upstream(&media_url, message.media_mimetype.as_deref(), &api_key)
            .await
        {
            Ok(transcription) => {
                queries::messages::complete_transcription(&self.db, message_id, &transcription)
                    .await?;
                self.feed.publish(Table::Messages);
                info!(message_id, chars = transcription.len(), "transcription completed");
                Ok(TranscribeOutcome::Completed { transcription })
            }
            Err(e) => {
                queries::messages::fail_transcription(&self.db, message_id).await?;
                self.feed.publish(Table::Messages);
                warn!(message_id, error = %e, "transcription failed");
                Err(e)
            }
        }
    }

    /// Download the audio and run it through the provider's chat-completions
    /// API with an inline base64 audio part.
    async fn run_upstream(
        &self,
        media_url: &str,
        media_mimetype: Option<&str>,
        api_key: &str,
    ) -> Result<String, AtendoError> {
        let audio_response = self
            .http
            .get(media_url)
            .send()
            .await
            .map_err(|e| upstream_err("audio download failed", e))?;
        if !audio_response.status().is_success() {
            return Err(AtendoError::Transcription {
                message: format!("audio download failed: HTTP {}", audio_response.status()),
                source: None,
            });
        }
        let audio_bytes = audio_response
            .bytes()
            .await
            .map_err(|e| upstream_err("audio download interrupted", e))?;

        let encoded = base64::engine::general_purpose::STANDARD.encode(&audio_bytes);
        let body = serde_json::json!({
            "model": self.config.model,
            "messages": [{
                "role": "user",
                "content": [
                    { "type": "text", "text": self.config.prompt },
                    {
                        "type": "input_audio",
                        "input_audio": {
                            "data": encoded,
                            "format": audio_format(media_mimetype),
                        },
                    },
                ],
            }],
            "max_tokens": self.config.max_tokens,
            "temperature": 0.1,
        });

        let response = self
            .http
            .post(&self.config.api_url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| upstream_err("transcription request failed", e))?;
        if !response.status().is_success() {
            return Err(AtendoError::Transcription {
                message: format!("transcription provider returned HTTP {}", response.status()),
                source: None,
            });
        }

        let payload: serde_json::Value = response
            .json()
            .await
            .map_err(|e| upstream_err("transcription response was not JSON", e))?;
        let transcription = payload["choices"][0]["message"]["content"]
            .as_str()
            .map(str::trim)
            .unwrap_or_default()
            .to_string();
        Ok(transcription)
    }
}

fn outcome_from_status(
    status: Option<&str>,
    transcription: Option<&str>,
) -> Option<TranscribeOutcome> {
    match status {
        Some("completed") => Some(TranscribeOutcome::Completed {
            transcription: transcription.unwrap_or_default().to_string(),
        }),
        Some("processing") => Some(TranscribeOutcome::Processing),
        Some("failed") => Some(TranscribeOutcome::Failed),
        _ => None,
    }
}

fn upstream_err(message: &str, source: reqwest::Error) -> AtendoError {
    AtendoError::Transcription {
        message: message.to_string(),
        source: Some(Box::new(source)),
    }
}

/// Provider-side audio container label derived from the stored mimetype.
fn audio_format(mimetype: Option<&str>) -> &'static str {
    let mimetype = mimetype.unwrap_or("audio/ogg");
    if mimetype.contains("ogg") {
        "ogg"
    } else if mimetype.contains("mp3") {
        "mp3"
    } else {
        "wav"
    }
}
