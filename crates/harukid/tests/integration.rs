//! Service-level tests: protocol handling, the webhook listener and the
//! socket path from relay to subscribed bridge

use haruki_api::{
    Caller, Command, ErrorCode, EventPayload, Invocation, MediaInfo, NotificationPayload, Reply,
    Request, RequestInfo, ResponsePayload, ResponseResult, ViewRef, API_VERSION,
};
use haruki_config::Settings;
use haruki_core::{Collaborators, Dispatcher, NotificationRelay};
use haruki_ipc::{IpcClient, IpcServer, ServerMessage};
use haruki_remote_api::{MockViewSink, ViewSink};
use haruki_util::ClientId;
use harukid::handle_command;
use harukid::sink::IpcViewSink;
use harukid::webhook::{router, WebhookState};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tempfile::tempdir;
use tokio::net::TcpListener;

fn dispatcher(sink: Arc<dyn ViewSink>) -> Dispatcher {
    Dispatcher::new(
        &Settings::default(),
        Collaborators {
            catalog: None,
            identity: None,
            series: None,
            movies: None,
            activity: None,
            sink,
        },
    )
}

fn approved() -> NotificationPayload {
    NotificationPayload {
        notification_type: "MEDIA_APPROVED".into(),
        event: "MEDIA_APPROVED".into(),
        subject: "Heat (1995)".into(),
        message: "Approved".into(),
        media: Some(MediaInfo {
            media_type: "movie".into(),
            tmdb_id: "949".into(),
            ..Default::default()
        }),
        request: Some(RequestInfo {
            username: "ann".into(),
            user_id: "4".into(),
            discord_id: "111".into(),
            ..Default::default()
        }),
        ..Default::default()
    }
}

#[tokio::test]
async fn ping_and_health() {
    let d = dispatcher(Arc::new(MockViewSink::new()));
    let client = ClientId::new();

    let pong = handle_command(&d, &client, Request::new(1, Command::Ping)).await;
    assert_eq!(pong.request_id, 1);
    assert!(pong.is_ok());
    assert!(matches!(pong.result, ResponseResult::Ok(ResponsePayload::Pong)));

    let health = handle_command(&d, &client, Request::new(2, Command::GetHealth)).await;
    match health.result {
        ResponseResult::Ok(ResponsePayload::Health(h)) => {
            assert!(h.live);
            assert_eq!(h.remediation_sessions, 0);
        }
        other => panic!("unexpected result: {:?}", other),
    }
}

#[tokio::test]
async fn version_mismatch_is_rejected() {
    let d = dispatcher(Arc::new(MockViewSink::new()));
    let mut request = Request::new(7, Command::Ping);
    request.api_version = API_VERSION + 1;

    let response = handle_command(&d, &ClientId::new(), request).await;
    assert_eq!(response.request_id, 7);
    assert!(!response.is_ok());
    match response.result {
        ResponseResult::Err(e) => assert_eq!(e.code, ErrorCode::UnsupportedVersion),
        other => panic!("unexpected result: {:?}", other),
    }
}

#[tokio::test]
async fn unknown_component_maps_to_error_code() {
    let d = dispatcher(Arc::new(MockViewSink::new()));
    let response = handle_command(
        &d,
        &ClientId::new(),
        Request::new(
            3,
            Command::Component {
                caller: Caller::new("u1", "ann"),
                target: ViewRef::new("c1", "m1"),
                component_id: "request.explode".into(),
                values: vec![],
            },
        ),
    )
    .await;
    match response.result {
        ResponseResult::Err(e) => {
            assert_eq!(e.code, ErrorCode::UnknownComponent);
            assert!(e.message.contains("request.explode"));
        }
        other => panic!("unexpected result: {:?}", other),
    }
}

#[tokio::test]
async fn invoke_without_collaborators_is_ephemeral() {
    let d = dispatcher(Arc::new(MockViewSink::new()));
    let response = handle_command(
        &d,
        &ClientId::new(),
        Request::new(
            4,
            Command::Invoke {
                caller: Caller::new("u1", "ann"),
                target: ViewRef::new("c1", "m1"),
                invocation: Invocation::Remediation {
                    media_type: "tv".into(),
                    query: "lost".into(),
                    listing_mode: None,
                },
            },
        ),
    )
    .await;
    match response.result {
        ResponseResult::Ok(ResponsePayload::Reply(reply)) => {
            assert_eq!(reply, Reply::ephemeral("Series service is not configured."));
        }
        other => panic!("unexpected result: {:?}", other),
    }
}

async fn spawn_webhook(token: Option<&str>, sink: Arc<MockViewSink>) -> SocketAddr {
    let relay = NotificationRelay::new(
        Duration::from_secs(30),
        Some("default".into()),
        None,
        None,
        sink,
    );
    let app = router(
        "/webhook",
        WebhookState::new(Arc::new(relay), token.map(str::to_string)),
    );
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await });
    addr
}

async fn wait_for_posts(sink: &MockViewSink, count: usize) {
    for _ in 0..100 {
        if sink.posts().len() >= count {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("expected {} posts, saw {}", count, sink.posts().len());
}

#[tokio::test]
async fn webhook_rejects_and_accepts() {
    let sink = Arc::new(MockViewSink::new());
    let addr = spawn_webhook(Some("s3cret"), sink.clone()).await;
    let url = format!("http://{}/webhook", addr);
    let http = reqwest::Client::new();

    let res = http.post(&url).body("{}").send().await.unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::UNAUTHORIZED);

    let res = http
        .post(&url)
        .header("Authorization", "Bearer s3cret")
        .body("not json")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::BAD_REQUEST);
    assert_eq!(res.text().await.unwrap(), "invalid JSON");

    let res = http.get(&url).send().await.unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::METHOD_NOT_ALLOWED);

    let res = http
        .post(&url)
        .header("Authorization", "s3cret")
        .json(&approved())
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::OK);
    assert_eq!(res.text().await.unwrap(), "ok");

    wait_for_posts(&sink, 1).await;
    let posts = sink.posts();
    assert_eq!(posts[0].channel_id, "default");
    assert_eq!(posts[0].content, "<@111>");
}

#[tokio::test]
async fn relayed_notification_reaches_subscribed_bridge() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("harukid.sock");

    let mut server = IpcServer::new(&path);
    server.start().await.unwrap();
    let mut messages = server.take_message_receiver().await.unwrap();
    let server = Arc::new(server);

    let sink: Arc<dyn ViewSink> = Arc::new(IpcViewSink::new(server.event_sender()));
    let relay = NotificationRelay::new(Duration::from_secs(30), Some("chan-1".into()), None, None, sink.clone());
    let d = Arc::new(dispatcher(sink));

    let runner = server.clone();
    tokio::spawn(async move { runner.run().await });

    let responder = server.clone();
    let handler = d.clone();
    tokio::spawn(async move {
        while let Some(msg) = messages.recv().await {
            if let ServerMessage::Request { client_id, request } = msg {
                let response = handle_command(&handler, &client_id, request).await;
                let _ = responder.send_response(&client_id, response).await;
            }
        }
    });

    let client = IpcClient::connect(&path).await.unwrap();
    let mut events = client.subscribe().await.unwrap();

    relay.relay(approved()).await;

    let event = events.next().await.unwrap();
    match event.payload {
        EventPayload::ViewPosted {
            channel_id,
            content,
            view,
        } => {
            assert_eq!(channel_id, "chan-1");
            assert_eq!(content, "<@111>");
            assert!(view.first_card().is_some());
        }
        other => panic!("unexpected event: {:?}", other),
    }
}
