//! Client/server round trips over a real Unix socket

use haruki_api::{
    Card, Command, Event, EventPayload, Response, ResponsePayload, ResponseResult, View, ViewRef,
};
use haruki_ipc::{IpcClient, IpcServer, ServerMessage};
use std::sync::Arc;
use tempfile::tempdir;
use tokio::sync::mpsc;

async fn started(path: &std::path::Path) -> (Arc<IpcServer>, mpsc::UnboundedReceiver<ServerMessage>) {
    let mut server = IpcServer::new(path);
    server.start().await.unwrap();
    let rx = server.take_message_receiver().await.unwrap();
    let server = Arc::new(server);
    let runner = server.clone();
    tokio::spawn(async move { runner.run().await });
    (server, rx)
}

/// Answer every request with `Pong` or `Subscribed`
fn answer_all(server: Arc<IpcServer>, mut rx: mpsc::UnboundedReceiver<ServerMessage>) {
    tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if let ServerMessage::Request { client_id, request } = msg {
                let payload = match request.command {
                    Command::SubscribeEvents => ResponsePayload::Subscribed {
                        client_id: client_id.clone(),
                    },
                    _ => ResponsePayload::Pong,
                };
                server
                    .send_response(&client_id, Response::success(request.request_id, payload))
                    .await
                    .unwrap();
            }
        }
    });
}

#[tokio::test]
async fn ping_round_trip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("harukid.sock");
    let (server, rx) = started(&path).await;
    answer_all(server, rx);

    let mut client = IpcClient::connect(&path).await.unwrap();
    let first = client.send(Command::Ping).await.unwrap();
    let second = client.send(Command::GetHealth).await.unwrap();

    assert_eq!(first.request_id, 1);
    assert_eq!(second.request_id, 2);
    assert!(matches!(first.result, ResponseResult::Ok(ResponsePayload::Pong)));
}

#[tokio::test]
async fn subscribers_receive_broadcasts() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("harukid.sock");
    let (server, rx) = started(&path).await;
    answer_all(server.clone(), rx);

    let client = IpcClient::connect(&path).await.unwrap();
    let mut events = client.subscribe().await.unwrap();

    server.broadcast_event(Event::new(EventPayload::ViewEdited {
        target: ViewRef::new("c1", "m1"),
        view: View::terminal(Card::new("Searching...", "Fetching releases, please wait...")),
    }));

    let event = events.next().await.unwrap();
    match event.payload {
        EventPayload::ViewEdited { target, view } => {
            assert_eq!(target, ViewRef::new("c1", "m1"));
            assert_eq!(view.first_card().unwrap().title, "Searching...");
        }
        other => panic!("unexpected event: {:?}", other),
    }
}

#[tokio::test]
async fn malformed_lines_get_an_error_response() {
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

    let dir = tempdir().unwrap();
    let path = dir.path().join("harukid.sock");
    let (_server, _rx) = started(&path).await;

    let stream = tokio::net::UnixStream::connect(&path).await.unwrap();
    let (read, mut write) = stream.into_split();
    write.write_all(b"{not json}\n").await.unwrap();

    let mut line = String::new();
    BufReader::new(read).read_line(&mut line).await.unwrap();
    let response: Response = serde_json::from_str(line.trim()).unwrap();
    match response.result {
        ResponseResult::Err(e) => assert_eq!(e.code, haruki_api::ErrorCode::InvalidRequest),
        other => panic!("unexpected result: {:?}", other),
    }
}
