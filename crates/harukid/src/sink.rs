//! View sink backed by the IPC event broadcast

use async_trait::async_trait;
use haruki_api::{Event, EventPayload, View, ViewRef};
use haruki_remote_api::{RemoteError, RemoteResult, ViewSink};
use tokio::sync::broadcast;
use tracing::debug;

/// Turns pushed views into `view_edited` / `view_posted` events. The
/// subscribed chat bridge applies them.
pub struct IpcViewSink {
    events: broadcast::Sender<Event>,
}

impl IpcViewSink {
    pub fn new(events: broadcast::Sender<Event>) -> Self {
        Self { events }
    }

    fn publish(&self, payload: EventPayload) -> RemoteResult<()> {
        self.events
            .send(Event::new(payload))
            .map(|receivers| debug!(receivers, "Event published"))
            .map_err(|_| RemoteError::Transport("no bridge subscribed".into()))
    }
}

#[async_trait]
impl ViewSink for IpcViewSink {
    async fn edit(&self, target: &ViewRef, view: View) -> RemoteResult<()> {
        self.publish(EventPayload::ViewEdited {
            target: target.clone(),
            view,
        })
    }

    async fn post(&self, channel_id: &str, content: String, view: View) -> RemoteResult<()> {
        self.publish(EventPayload::ViewPosted {
            channel_id: channel_id.to_string(),
            content,
            view,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn edits_become_events() {
        let (tx, mut rx) = broadcast::channel(8);
        let sink = IpcViewSink::new(tx);

        sink.edit(&ViewRef::new("c1", "m1"), View::notice("hi")).await.unwrap();
        match rx.recv().await.unwrap().payload {
            EventPayload::ViewEdited { target, view } => {
                assert_eq!(target, ViewRef::new("c1", "m1"));
                assert_eq!(view.content.as_deref(), Some("hi"));
            }
            other => panic!("unexpected payload: {:?}", other),
        }
    }

    #[tokio::test]
    async fn no_listener_is_an_error() {
        let (tx, rx) = broadcast::channel(8);
        drop(rx);
        let sink = IpcViewSink::new(tx);
        let err = sink.post("c1", String::new(), View::notice("x")).await.unwrap_err();
        assert!(matches!(err, RemoteError::Transport(_)));
    }
}
