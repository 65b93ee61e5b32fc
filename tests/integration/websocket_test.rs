// tests/integration/websocket_test.rs

//! End-to-end tests over real WebSocket connections to a locally served hub.

use super::test_helpers::{TestServer, assert_no_event, next_event, send_private_message};
use chathub::config::Config;
use chathub::core::protocol::HubEvent;
use futures::SinkExt;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::http::StatusCode;

fn received(sender: &str, body: &str) -> Option<HubEvent> {
    Some(HubEvent::ReceivePrivateMessage(
        sender.to_string(),
        body.to_string(),
    ))
}

#[tokio::test]
async fn test_private_message_fans_out_to_all_receiver_sockets() {
    let server = TestServer::start().await;
    let mut alice_laptop = server.connect("alice").await;
    let mut alice_phone = server.connect("alice").await;
    let mut bob = server.connect("bob").await;
    let mut carol = server.connect("carol").await;

    send_private_message(&mut carol, "carol", "hi", "alice").await;

    assert_eq!(next_event(&mut alice_laptop).await, received("carol", "hi"));
    assert_eq!(next_event(&mut alice_phone).await, received("carol", "hi"));
    assert_no_event(&mut bob).await;
    assert_no_event(&mut carol).await;

    // After one session closes, only the other still receives.
    alice_laptop.close(None).await.unwrap();
    server.wait_for_registered(3).await;
    send_private_message(&mut carol, "carol", "hi again", "alice").await;
    assert_eq!(next_event(&mut alice_phone).await, received("carol", "hi again"));
    server.shutdown();
}

#[tokio::test]
async fn test_unknown_receiver_gets_no_reply() {
    let server = TestServer::start().await;
    let mut alice = server.connect("alice").await;

    send_private_message(&mut alice, "alice", "x", "nobody").await;

    assert_no_event(&mut alice).await;
    assert_eq!(server.state.stats.get_total_messages(), 1);
    server.shutdown();
}

#[tokio::test]
async fn test_closing_socket_unregisters_connection() {
    let server = TestServer::start().await;
    let mut alice = server.connect("alice").await;
    let mut bob = server.connect("bob").await;
    assert_eq!(server.state.registry.len(), 2);

    bob.close(None).await.unwrap();
    server.wait_for_registered(1).await;

    assert!(
        server
            .state
            .registry
            .lookup_connections_by_username("bob")
            .is_empty()
    );
    send_private_message(&mut alice, "alice", "gone?", "bob").await;
    assert_no_event(&mut alice).await;
    server.shutdown();
}

#[tokio::test]
async fn test_missing_username_registers_as_anonymous() {
    let server = TestServer::start().await;
    let (mut anonymous, _) = tokio_tungstenite::connect_async(server.hub_url(None))
        .await
        .unwrap();
    server.wait_for_registered(1).await;
    let mut bob = server.connect("bob").await;

    // An anonymous connection can still send, but nothing routes to it.
    send_private_message(&mut anonymous, "ghost", "boo", "bob").await;
    assert_eq!(next_event(&mut bob).await, received("ghost", "boo"));
    send_private_message(&mut bob, "bob", "hello?", "").await;
    assert_no_event(&mut anonymous).await;
    server.shutdown();
}

#[tokio::test]
async fn test_explicit_empty_username_is_routable() {
    let server = TestServer::start().await;
    let (mut anonymous, _) = tokio_tungstenite::connect_async(server.hub_url(None))
        .await
        .unwrap();
    server.wait_for_registered(1).await;
    let mut blank = server.connect("").await;
    let mut bob = server.connect("bob").await;

    send_private_message(&mut bob, "bob", "hi", "").await;
    assert_eq!(next_event(&mut blank).await, received("bob", "hi"));
    assert_no_event(&mut anonymous).await;
    server.shutdown();
}

#[tokio::test]
async fn test_anonymous_handshake_rejected_when_configured() {
    let mut config = Config::default();
    config.reject_anonymous = true;
    let server = TestServer::start_with(config).await;

    let err = tokio_tungstenite::connect_async(server.hub_url(None))
        .await
        .unwrap_err();
    match err {
        tokio_tungstenite::tungstenite::Error::Http(response) => {
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        }
        other => panic!("expected an HTTP rejection, got {other:?}"),
    }
    assert!(server.state.registry.is_empty());
    server.shutdown();
}

#[tokio::test]
async fn test_handshake_rejected_at_capacity() {
    let mut config = Config::default();
    config.max_clients = 1;
    let server = TestServer::start_with(config).await;
    let _alice = server.connect("alice").await;

    let err = tokio_tungstenite::connect_async(server.hub_url(Some("bob")))
        .await
        .unwrap_err();
    match err {
        tokio_tungstenite::tungstenite::Error::Http(response) => {
            assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        }
        other => panic!("expected an HTTP rejection, got {other:?}"),
    }
    assert_eq!(server.state.registry.len(), 1);
    server.shutdown();
}

#[tokio::test]
async fn test_malformed_frame_returns_error_event_and_keeps_session() {
    let server = TestServer::start().await;
    let mut alice = server.connect("alice").await;
    let mut bob = server.connect("bob").await;

    alice
        .send(Message::Text("not json".into()))
        .await
        .unwrap();
    assert!(matches!(next_event(&mut alice).await, Some(HubEvent::Error(_))));

    alice
        .send(Message::Text(
            r#"{"method":"JoinGroup","args":["x"]}"#.into(),
        ))
        .await
        .unwrap();
    assert!(matches!(next_event(&mut alice).await, Some(HubEvent::Error(_))));

    // The session survives protocol errors.
    send_private_message(&mut alice, "alice", "still here", "bob").await;
    assert_eq!(next_event(&mut bob).await, received("alice", "still here"));
    assert_eq!(server.state.registry.len(), 2);
    server.shutdown();
}

#[tokio::test]
async fn test_shutdown_closes_client_sockets() {
    let server = TestServer::start().await;
    let mut alice = server.connect("alice").await;

    server.shutdown();

    assert_eq!(next_event(&mut alice).await, None);
    server.wait_for_registered(0).await;
}
