//! Stream transformers composed around a model's raw chunk producer
//! (spec.md §4.5): retry-with-backoff and `<think>`-tag filtering.

use std::pin::Pin;
use std::time::Duration;

use async_stream::stream;
use futures::Stream;
use tokio_stream::StreamExt;

use crate::error::Error;
use crate::stream::StreamEvent;
use crate::usage::UsageTracker;

pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<StreamEvent, Error>> + Send>>;

/// Wraps an async chunk producer with retry-on-failure.
///
/// `make_stream` is invoked once per attempt, since a `Stream` cannot be
/// rewound. Each attempt's chunks are buffered until that attempt either
/// finishes cleanly or fails; only a successful attempt's chunks are ever
/// forwarded, so callers never see a partial attempt interleaved with a
/// retry (spec.md §8 property 5). Cancellation is never retried and
/// propagates immediately, partial buffer discarded.
pub fn retry<F>(max_attempts: u32, backoff: Duration, mut make_stream: F) -> ChunkStream
where
    F: FnMut() -> ChunkStream + Send + 'static,
{
    Box::pin(stream! {
        let max_attempts = max_attempts.max(1);
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let mut inner = make_stream();
            let mut buffer = Vec::new();
            let mut failure = None;

            loop {
                match inner.next().await {
                    Some(Ok(event)) => buffer.push(event),
                    Some(Err(Error::Cancelled)) => {
                        yield Err(Error::Cancelled);
                        return;
                    }
                    Some(Err(err)) => {
                        failure = Some(err);
                        break;
                    }
                    None => break,
                }
            }

            match failure {
                None => {
                    for event in buffer {
                        yield Ok(event);
                    }
                    return;
                }
                Some(err) => {
                    if attempt >= max_attempts {
                        yield Err(err);
                        return;
                    }
                    log::warn!(
                        "llm request failed on attempt {attempt}/{max_attempts}, retrying: {err}"
                    );
                    tokio::time::sleep(backoff * attempt).await;
                }
            }
        }
    })
}

enum ThinkState {
    Initial,
    InThink,
    PostThinkTrim,
    Normal,
}

/// Strips a leading `<think>...</think>` reasoning block out of a chunk
/// sequence (spec.md §4.5). Only ever inspects `TextDelta` chunks; every
/// other event type passes through untouched.
///
/// Idempotent: running the filter twice yields the same sequence as
/// running it once, since after the first pass the leading chunk is never
/// again the literal `<think>` token.
pub fn filter_think_tags(input: ChunkStream) -> ChunkStream {
    Box::pin(stream! {
        let mut state = ThinkState::Initial;
        tokio::pin!(input);
        while let Some(item) = input.next().await {
            let event = match item {
                Ok(event) => event,
                Err(err) => {
                    yield Err(err);
                    continue;
                }
            };

            let StreamEvent::TextDelta(chunk) = event else {
                yield Ok(event);
                continue;
            };

            match state {
                ThinkState::Initial => {
                    if chunk == "<think>" {
                        state = ThinkState::InThink;
                    } else {
                        state = ThinkState::Normal;
                        yield Ok(StreamEvent::TextDelta(chunk));
                    }
                }
                ThinkState::InThink => {
                    if chunk == "</think>" {
                        state = ThinkState::PostThinkTrim;
                    }
                }
                ThinkState::PostThinkTrim => {
                    state = ThinkState::Normal;
                    let trimmed = chunk.trim_start_matches('\n');
                    if !trimmed.is_empty() {
                        yield Ok(StreamEvent::TextDelta(trimmed.to_string()));
                    }
                }
                ThinkState::Normal => {
                    yield Ok(StreamEvent::TextDelta(chunk));
                }
            }
        }
    })
}

/// Runs retry + think-tag filtering and concatenates the result into a
/// single string, recording authoritative usage from the terminal
/// `Finish` event exactly once (spec.md §8 scenario S6).
pub async fn generate_llm_response<F>(
    model_name: &str,
    usage: &UsageTracker,
    max_attempts: u32,
    backoff: Duration,
    make_stream: F,
) -> Result<String, Error>
where
    F: FnMut() -> ChunkStream + Send + 'static,
{
    let filtered = filter_think_tags(retry(max_attempts, backoff, make_stream));
    tokio::pin!(filtered);

    let mut text = String::new();
    while let Some(item) = filtered.next().await {
        match item? {
            StreamEvent::TextDelta(delta) => text.push_str(&delta),
            StreamEvent::Finish {
                usage: Some(tokens),
                ..
            } => {
                usage.add_use(model_name, tokens.input_tokens, tokens.output_tokens);
            }
            StreamEvent::Error(message) => return Err(Error::Other(message)),
            StreamEvent::Finish { usage: None, .. }
            | StreamEvent::InputTokenEstimate { .. }
            | StreamEvent::Progress { .. } => {}
        }
    }
    Ok(text)
}

/// Same composition as [`generate_llm_response`], but returns the live
/// chunk stream for UI display instead of collecting it.
pub fn stream_request<F>(max_attempts: u32, backoff: Duration, make_stream: F) -> ChunkStream
where
    F: FnMut() -> ChunkStream + Send + 'static,
{
    filter_think_tags(retry(max_attempts, backoff, make_stream))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::{FinishReason, Usage};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn ok_stream(chunks: Vec<&'static str>) -> ChunkStream {
        Box::pin(tokio_stream::iter(
            chunks
                .into_iter()
                .map(|c| Ok(StreamEvent::TextDelta(c.to_string())))
                .collect::<Vec<_>>(),
        ))
    }

    #[tokio::test]
    async fn filter_think_tags_strips_leading_reasoning_block() {
        let input = ok_stream(vec!["<think>", "reasoning...", "</think>", "\n\nhello", " world"]);
        let filtered = filter_think_tags(input);
        let events: Vec<_> = filtered.collect::<Vec<_>>().await;
        let text: String = events
            .into_iter()
            .map(|e| match e.unwrap() {
                StreamEvent::TextDelta(d) => d,
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(text, "hello world");
    }

    #[tokio::test]
    async fn filter_think_tags_passes_through_when_no_think_block() {
        let input = ok_stream(vec!["hello", " world"]);
        let filtered = filter_think_tags(input);
        let events: Vec<_> = filtered.collect::<Vec<_>>().await;
        let text: String = events
            .into_iter()
            .map(|e| match e.unwrap() {
                StreamEvent::TextDelta(d) => d,
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(text, "hello world");
    }

    #[tokio::test]
    async fn filter_think_tags_is_idempotent() {
        let input = ok_stream(vec!["<think>", "x", "</think>", "\nhi"]);
        let once = filter_think_tags(input);
        let once_events: Vec<String> = once
            .collect::<Vec<_>>()
            .await
            .into_iter()
            .map(|e| match e.unwrap() {
                StreamEvent::TextDelta(d) => d,
                _ => unreachable!(),
            })
            .collect();

        let reinput: ChunkStream = Box::pin(tokio_stream::iter(
            once_events
                .iter()
                .cloned()
                .map(|d| Ok(StreamEvent::TextDelta(d)))
                .collect::<Vec<_>>(),
        ));
        let twice_events: Vec<String> = filter_think_tags(reinput)
            .collect::<Vec<_>>()
            .await
            .into_iter()
            .map(|e| match e.unwrap() {
                StreamEvent::TextDelta(d) => d,
                _ => unreachable!(),
            })
            .collect();

        assert_eq!(once_events, twice_events);
    }

    #[tokio::test]
    async fn retry_recovers_from_a_failed_attempt_without_interleaving() {
        let attempt = Arc::new(AtomicU32::new(0));
        let attempt_clone = attempt.clone();
        let make_stream = move || -> ChunkStream {
            let n = attempt_clone.fetch_add(1, Ordering::SeqCst);
            if n == 0 {
                Box::pin(tokio_stream::iter(vec![
                    Ok(StreamEvent::TextDelta("A".to_string())),
                    Ok(StreamEvent::TextDelta("B".to_string())),
                    Err(Error::Other("connection reset".to_string())),
                ]))
            } else {
                Box::pin(tokio_stream::iter(vec![
                    Ok(StreamEvent::TextDelta("A".to_string())),
                    Ok(StreamEvent::TextDelta("B".to_string())),
                    Ok(StreamEvent::TextDelta("C".to_string())),
                    Ok(StreamEvent::Finish {
                        reason: FinishReason::Stop,
                        usage: Some(Usage {
                            input_tokens: 10,
                            output_tokens: 3,
                        }),
                    }),
                ]))
            }
        };

        let usage = UsageTracker::new();
        let text = generate_llm_response(
            "test-model",
            &usage,
            3,
            Duration::from_millis(0),
            make_stream,
        )
        .await
        .unwrap();

        assert_eq!(text, "ABC");
        assert_eq!(attempt.load(Ordering::SeqCst), 2);
        let totals = usage.get_usage();
        assert_eq!(totals["test-model"].input_tokens, 10);
        assert_eq!(totals["test-model"].output_tokens, 3);
    }

    #[tokio::test]
    async fn retry_gives_up_after_max_attempts() {
        let make_stream = || -> ChunkStream {
            Box::pin(tokio_stream::iter(vec![Err(Error::Other(
                "boom".to_string(),
            ))]))
        };
        let usage = UsageTracker::new();
        let result = generate_llm_response(
            "test-model",
            &usage,
            2,
            Duration::from_millis(0),
            make_stream,
        )
        .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn retry_never_retries_cancellation() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls_clone = calls.clone();
        let make_stream = move || -> ChunkStream {
            calls_clone.fetch_add(1, Ordering::SeqCst);
            Box::pin(tokio_stream::iter(vec![Err(Error::Cancelled)]))
        };
        let usage = UsageTracker::new();
        let result = generate_llm_response(
            "test-model",
            &usage,
            5,
            Duration::from_millis(0),
            make_stream,
        )
        .await;
        assert!(matches!(result, Err(Error::Cancelled)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
