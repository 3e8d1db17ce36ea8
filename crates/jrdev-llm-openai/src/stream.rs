//! Opens an SSE connection to the OpenAI Chat Completions API and maps
//! chunks to `jrdev_llm`'s `StreamEvent` type (spec.md §6).

use std::sync::Arc;

use eventsource_stream::Eventsource;
use futures::Stream;
use jrdev_llm::error::Error;
use jrdev_llm::stream::{FinishReason, StreamEvent, Usage};
use tokio_stream::StreamExt;

use crate::ProviderState;
use crate::types::{ChatCompletionChunk, ChatCompletionRequest};

pub fn open(
    state: Arc<ProviderState>,
    body: ChatCompletionRequest,
) -> impl Stream<Item = Result<StreamEvent, Error>> + Send {
    async_stream::try_stream! {
        let url = format!("{}/chat/completions", state.config.base_url);
        let mut req = state
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", state.config.api_key));
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
        let mut finish_reason = None;

        while let Some(event) = sse.next().await {
            let event = match event {
                Ok(event) => event,
                Err(e) => Err(Error::Sse(e.to_string()))?,
            };

            if event.data == "[DONE]" {
                break;
            }

            let chunk: ChatCompletionChunk = serde_json::from_str(&event.data)?;

            if let Some(choice) = chunk.choices.first() {
                if let Some(content) = &choice.delta.content {
                    if !content.is_empty() {
                        yield StreamEvent::TextDelta(content.clone());
                    }
                }
                if let Some(reason) = &choice.finish_reason {
                    finish_reason = Some(map_finish_reason(reason));
                }
            }

            if let Some(usage) = chunk.usage {
                yield StreamEvent::Finish {
                    reason: finish_reason.take().unwrap_or(FinishReason::Stop),
                    usage: Some(Usage {
                        input_tokens: usage.prompt_tokens,
                        output_tokens: usage.completion_tokens,
                    }),
                };
            }
        }

        // Some OpenAI-compatible servers omit the trailing usage-only chunk
        // even when requested; still surface the finish reason we saw.
        if let Some(reason) = finish_reason {
            yield StreamEvent::Finish { reason, usage: None };
        }
    }
}

fn map_finish_reason(reason: &str) -> FinishReason {
    match reason {
        "stop" => FinishReason::Stop,
        "length" => FinishReason::Length,
        "content_filter" => FinishReason::ContentFilter,
        other => FinishReason::Other(other.to_string()),
    }
}
