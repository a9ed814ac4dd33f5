//! The outward event relay.
//!
//! Every phase that streams to the caller goes through this module so
//! the outward surface stays uniform: a sequence of content events
//! terminated by exactly one stop event, whether the text arrived as a
//! single completion or as live fragments, and whether the phase
//! succeeded or failed.

use std::fmt::Display;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::mpsc;
use tokio::time::sleep;

/// How many characters of a full completion go into one synthetic
/// chunk.
pub const CHUNK_SIZE: usize = 10;

/// The pacing delay between consecutive synthetic chunks.
pub const PACING_DELAY: Duration = Duration::from_millis(10);

/// One event on the outward stream.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct OutwardEvent {
    /// The text payload. Empty on a normal stop event.
    pub content: String,
    /// Whether this event terminates the stream.
    #[serde(skip_serializing_if = "is_false")]
    pub stop: bool,
}

fn is_false(flag: &bool) -> bool {
    !flag
}

impl OutwardEvent {
    /// An ordinary content event.
    pub fn content(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            stop: false,
        }
    }

    /// The terminal event of a successful stream.
    pub fn stop() -> Self {
        Self {
            content: String::new(),
            stop: true,
        }
    }

    /// A terminal event that also carries an error notice as content.
    pub fn stop_with_error(message: impl Into<String>) -> Self {
        Self {
            content: message.into(),
            stop: true,
        }
    }

    /// Renders this event as a server-sent-event frame.
    pub fn to_frame(&self) -> String {
        // `OutwardEvent` contains nothing that can fail to serialize.
        let json = serde_json::to_string(self).unwrap();
        format!("data: {json}\n\n")
    }
}

/// Relays a fully materialized text as a paced synthetic stream.
///
/// The text is split into chunks of [`CHUNK_SIZE`] characters (never
/// inside a character), each chunk is sent as one content event with
/// [`PACING_DELAY`] between consecutive chunks, and a stop event
/// follows the last chunk. A dropped receiver ends the relay early
/// without an error.
pub async fn relay_text(text: &str, tx: &mpsc::Sender<OutwardEvent>) {
    let mut rest = text;
    let mut first = true;
    while !rest.is_empty() {
        if !first {
            sleep(PACING_DELAY).await;
        }
        first = false;

        let split = rest
            .char_indices()
            .nth(CHUNK_SIZE)
            .map(|(idx, _)| idx)
            .unwrap_or(rest.len());
        let (chunk, remainder) = rest.split_at(split);
        rest = remainder;

        if tx.send(OutwardEvent::content(chunk)).await.is_err() {
            debug!("relay receiver dropped, stopping early");
            return;
        }
    }
    let _ = tx.send(OutwardEvent::stop()).await;
}

/// Relays live fragments from a gateway stream.
///
/// Non-empty fragments are forwarded as content events in arrival
/// order with no extra pacing. A stream error terminates the relay
/// with a single stop event carrying the error notice; normal
/// exhaustion terminates it with a plain stop event. Either way
/// exactly one stop event is sent.
pub async fn relay_fragments<E: Display>(
    mut rx: mpsc::Receiver<Result<String, E>>,
    tx: &mpsc::Sender<OutwardEvent>,
) {
    while let Some(result) = rx.recv().await {
        match result {
            Ok(fragment) => {
                if fragment.is_empty() {
                    continue;
                }
                if tx.send(OutwardEvent::content(fragment)).await.is_err() {
                    debug!("relay receiver dropped, stopping early");
                    return;
                }
            }
            Err(err) => {
                error!("fragment stream failed: {err}");
                let _ = tx
                    .send(OutwardEvent::stop_with_error(format!(
                        "Error: {err}"
                    )))
                    .await;
                return;
            }
        }
    }
    let _ = tx.send(OutwardEvent::stop()).await;
}

#[cfg(test)]
mod tests {
    use tokio::time::Instant;

    use super::*;

    async fn collect(
        mut rx: mpsc::Receiver<OutwardEvent>,
    ) -> Vec<OutwardEvent> {
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        events
    }

    #[test]
    fn test_frame_format() {
        assert_eq!(
            OutwardEvent::content("hello").to_frame(),
            "data: {\"content\":\"hello\"}\n\n"
        );
        assert_eq!(
            OutwardEvent::stop().to_frame(),
            "data: {\"content\":\"\",\"stop\":true}\n\n"
        );
        assert_eq!(
            OutwardEvent::stop_with_error("Error: boom").to_frame(),
            "data: {\"content\":\"Error: boom\",\"stop\":true}\n\n"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_relay_text_chunks_and_paces() {
        let (tx, rx) = mpsc::channel(32);
        let start = Instant::now();
        let relay = tokio::spawn(async move {
            relay_text("abcdefghijklmnopqrstuvw", &tx).await;
        });
        let events = collect(rx).await;
        relay.await.unwrap();

        assert_eq!(
            events,
            vec![
                OutwardEvent::content("abcdefghij"),
                OutwardEvent::content("klmnopqrst"),
                OutwardEvent::content("uvw"),
                OutwardEvent::stop(),
            ]
        );
        // Two inter-chunk delays for three chunks.
        assert_eq!(start.elapsed(), PACING_DELAY * 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_relay_text_never_splits_characters() {
        let (tx, rx) = mpsc::channel(32);
        let relay = tokio::spawn(async move {
            relay_text("ééééééééééé", &tx).await;
        });
        let events = collect(rx).await;
        relay.await.unwrap();

        assert_eq!(events.len(), 3);
        assert_eq!(events[0].content.chars().count(), 10);
        assert_eq!(events[1].content, "é");
        assert!(events[2].stop);
    }

    #[tokio::test(start_paused = true)]
    async fn test_relay_text_empty() {
        let (tx, rx) = mpsc::channel(32);
        relay_text("", &tx).await;
        drop(tx);
        let events = collect(rx).await;
        assert_eq!(events, vec![OutwardEvent::stop()]);
    }

    #[tokio::test]
    async fn test_relay_fragments_forwards_in_order() {
        let (fragment_tx, fragment_rx) =
            mpsc::channel::<Result<String, Box<dyn std::error::Error + Send>>>(
                8,
            );
        let (tx, rx) = mpsc::channel(32);

        fragment_tx.send(Ok("The ".to_owned())).await.unwrap();
        fragment_tx.send(Ok(String::new())).await.unwrap();
        fragment_tx.send(Ok("summary".to_owned())).await.unwrap();
        drop(fragment_tx);

        relay_fragments(fragment_rx, &tx).await;
        drop(tx);

        let events = collect(rx).await;
        assert_eq!(
            events,
            vec![
                OutwardEvent::content("The "),
                OutwardEvent::content("summary"),
                OutwardEvent::stop(),
            ]
        );
    }

    #[tokio::test]
    async fn test_relay_fragments_error_becomes_stop() {
        #[derive(Debug)]
        struct Boom;
        impl Display for Boom {
            fn fmt(
                &self,
                f: &mut std::fmt::Formatter<'_>,
            ) -> std::fmt::Result {
                write!(f, "model overloaded")
            }
        }

        let (fragment_tx, fragment_rx) = mpsc::channel::<Result<String, Boom>>(8);
        let (tx, rx) = mpsc::channel(32);

        fragment_tx.send(Ok("partial".to_owned())).await.unwrap();
        fragment_tx.send(Err(Boom)).await.unwrap();
        drop(fragment_tx);

        relay_fragments(fragment_rx, &tx).await;
        drop(tx);

        let events = collect(rx).await;
        assert_eq!(
            events,
            vec![
                OutwardEvent::content("partial"),
                OutwardEvent::stop_with_error("Error: model overloaded"),
            ]
        );
        assert_eq!(events.iter().filter(|e| e.stop).count(), 1);
    }
}
