//! Opens an SSE connection to the Anthropic Messages API and maps events
//! to `jrdev_llm`'s `StreamEvent` type (spec.md §6).

use std::sync::Arc;

use eventsource_stream::Eventsource;
use futures::Stream;
use jrdev_llm::error::Error;
use jrdev_llm::stream::{FinishReason, StreamEvent, Usage};
use tokio_stream::StreamExt;

use crate::ProviderState;
use crate::types::{ContentBlockDelta, ContentDelta, ErrorEvent, MessageDelta, MessageStart, MessagesRequest};

const ANTHROPIC_VERSION: &str = "2023-06-01";

pub fn open(
    state: Arc<ProviderState>,
    body: MessagesRequest,
) -> impl Stream<Item = Result<StreamEvent, Error>> + Send {
    async_stream::try_stream! {
        let url = format!("{}/v1/messages", state.config.base_url);
        let mut req = state
            .client
            .post(&url)
            .header("x-api-key", &state.config.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION);
        for (k, v) in &state.config.extra_headers {
            req = req.header(k, v);
        }

        let resp = req
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Http(Box::new(e)))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body_text = resp.text().await.unwrap_or_default();
            Err(Error::Api {
                code: status.as_str().to_string(),
                message: body_text,
                metadata: Default::default(),
            })?;
            unreachable!();
        }

        let mut sse = resp.bytes_stream().eventsource();
        let mut input_tokens = 0u32;

        while let Some(event) = sse.next().await {
            let event = match event {
                Ok(event) => event,
                Err(e) => Err(Error::Sse(e.to_string()))?,
            };

            match event.event.as_str() {
                "message_start" => {
                    let parsed: MessageStart = serde_json::from_str(&event.data)?;
                    input_tokens = parsed.message.usage.input_tokens;
                }
                "content_block_delta" => {
                    let parsed: ContentBlockDelta = serde_json::from_str(&event.data)?;
                    if let ContentDelta::TextDelta { text } = parsed.delta {
                        yield StreamEvent::TextDelta(text);
                    }
                }
                "message_delta" => {
                    let parsed: MessageDelta = serde_json::from_str(&event.data)?;
                    yield StreamEvent::Finish {
                        reason: map_stop_reason(parsed.delta.stop_reason.as_deref()),
                        usage: Some(Usage {
                            input_tokens,
                            output_tokens: parsed.usage.output_tokens,
                        }),
                    };
                }
                "error" => {
                    let parsed: ErrorEvent = serde_json::from_str(&event.data)?;
                    Err(Error::Api {
                        code: parsed.error.kind,
                        message: parsed.error.message,
                        metadata: Default::default(),
                    })?;
                }
                "message_stop" => break,
                // message_start/content_block_start/content_block_stop/ping
                // carry nothing we need beyond what's handled above.
                _ => {}
            }
        }
    }
}

fn map_stop_reason(reason: Option<&str>) -> FinishReason {
    match reason {
        Some("end_turn") | Some("stop_sequence") => FinishReason::Stop,
        Some("max_tokens") => FinishReason::Length,
        Some(other) => FinishReason::Other(other.to_string()),
        None => FinishReason::Stop,
    }
}
