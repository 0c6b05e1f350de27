//! `text/event-stream` decoding.
//!
//! Parsing is left to `eventsource-stream`. Only `data` fields matter to the
//! progress channel: events without data are dropped, and `event`, `id` and
//! `retry` are ignored.

use std::fmt::Display;

use bytes::Bytes;
use coldstore_core::{PayloadStream, UploadError};
use eventsource_stream::Eventsource;
use futures::{future, Stream, StreamExt};

/// Decode a byte stream into a stream of event payloads.
///
/// A transport or parse error is yielded once and ends the stream.
pub fn data_stream<S, E>(bytes: S) -> PayloadStream
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: Display + Send + 'static,
{
    bytes
        .eventsource()
        .filter_map(|item| {
            future::ready(match item {
                Ok(event) if event.data.is_empty() => None,
                Ok(event) => Some(Ok(event.data)),
                Err(err) => Some(Err(UploadError::Stream(err.to_string()))),
            })
        })
        .scan(false, |failed, item| {
            if *failed {
                return future::ready(None);
            }
            *failed = item.is_err();
            future::ready(Some(item))
        })
        .boxed()
}
