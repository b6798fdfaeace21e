//! Backend chunk stream to server-sent event translation.

use axum::response::sse::Event;
use futures::future::ready;
use futures::stream::{self, Stream, StreamExt};
use relay_core::{ChunkStream, RelayError, RelayEvent, StreamChunk};
use tracing::{error, info, Span};

/// Maps backend chunks to relay events in arrival order.
///
/// Content fragments become [`RelayEvent::Text`]; [`RelayEvent::Done`] follows
/// once the backend stream is exhausted. A backend error is yielded once and
/// ends the stream without the sentinel.
pub fn relay_events(
    chunks: ChunkStream,
    span: Span,
) -> impl Stream<Item = Result<RelayEvent, RelayError>> + Send {
    chunks
        .filter_map(move |item| {
            let event = match item {
                Ok(StreamChunk::Content(text)) => Some(Ok(RelayEvent::Text(text))),
                Ok(StreamChunk::Finished(stats)) => {
                    span.in_scope(|| {
                        info!(
                            "Ollama finished: {:.1} tok/s, {}/{} tokens, {}ms total",
                            stats.tokens_per_sec(),
                            stats.prompt_eval_count,
                            stats.eval_count,
                            stats.total_duration_ms()
                        )
                    });
                    None
                }
                Err(e) => {
                    span.in_scope(|| error!("Stream error, aborting relay: {}", e));
                    Some(Err(e))
                }
            };
            ready(event)
        })
        .chain(stream::once(ready(Ok(RelayEvent::Done))))
        .scan(false, |failed, item| {
            if *failed {
                return ready(None);
            }
            *failed = item.is_err();
            ready(Some(item))
        })
}

/// [`relay_events`] rendered as SSE frames.
pub fn event_stream(
    chunks: ChunkStream,
    span: Span,
) -> impl Stream<Item = Result<Event, RelayError>> + Send {
    relay_events(chunks, span).map(|item| item.map(|event| Event::default().data(event.data())))
}
