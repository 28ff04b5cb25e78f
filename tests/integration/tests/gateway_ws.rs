//! End-to-end WebSocket tests against a live gateway.

use courier_core::Notification;
use courier_gateway::{chat_room, ChatKind};
use courier_integration_tests::{test_config, TestGateway, WsClient};
use serde_json::json;
use tokio_tungstenite::tungstenite;

#[tokio::test]
async fn test_shop_chat_message_reaches_other_participant_only() {
    let gw = TestGateway::start(test_config()).await;

    let mut buyer = gw.connect_as("/chat/shop", "u1", "user").await;
    let hello = buyer.expect("connection").await;
    assert_eq!(hello["namespace"], "/chat/shop");
    assert_eq!(hello["userId"], "u1");

    let mut shop = gw.connect_as("/chat/shop", "u2", "shop").await;
    shop.expect("connection").await;

    for client in [&mut buyer, &mut shop] {
        client
            .send("chat:conversation:join", json!({"conversationId": "conv1"}))
            .await;
        let joined = client.expect("chat:conversation:joined").await;
        assert_eq!(joined["room"], "chat:shop:conv1");
    }

    buyer
        .send(
            "chat:message:send",
            json!({"conversationId": "conv1", "body": "is this in stock?", "senderId": "spoofed"}),
        )
        .await;

    let received = shop.expect("chat:message:receive").await;
    assert_eq!(received["conversationId"], "conv1");
    assert_eq!(received["senderId"], "u1");
    assert_eq!(received["body"], "is this in stock?");
    assert!(received["messageId"].is_string());
    buyer.expect_silence().await;

    shop.send("chat:typing", json!({"conversationId": "conv1", "isTyping": true}))
        .await;
    let typing = buyer.expect("chat:typing").await;
    assert_eq!(typing["userId"], "u2");
    assert_eq!(typing["isTyping"], true);

    gw.stop().await;
}

#[tokio::test]
async fn test_role_outside_namespace_is_rejected() {
    let gw = TestGateway::start(test_config()).await;

    let url = gw.url(
        "/chat/admin",
        &format!("token={}", courier_integration_tests::token("u2", "shop")),
    );
    match WsClient::connect(&url).await {
        Err(tungstenite::Error::Http(response)) => assert_eq!(response.status().as_u16(), 403),
        Err(e) => panic!("expected HTTP 403, got {}", e),
        Ok(_) => panic!("shop role must not reach the admin chat"),
    }

    // Same token is fine on the shop namespace.
    let mut client = gw.connect_as("/chat/shop", "u2", "shop").await;
    client.expect("connection").await;

    gw.stop().await;
}

#[tokio::test]
async fn test_anonymous_user_receives_pushed_notification() {
    let gw = TestGateway::start(test_config()).await;

    let mut client = WsClient::connect(&gw.url("/notifications", "userId=anon1"))
        .await
        .unwrap();
    let hello = client.expect("connection").await;
    assert_eq!(hello["userId"], "anon1");

    client.send("notification:subscribe", json!(null)).await;
    let subscribed = client.expect("notification:subscribed").await;
    assert_eq!(subscribed["room"], "notification:user:anon1");

    let notifier = gw.gateway.notifier().expect("notifications enabled");
    let delivered = notifier
        .publish("anon1", Notification::new("n1", "Order shipped", "On its way", "order"))
        .await
        .unwrap();
    assert_eq!(delivered, 1);

    let pushed = client.expect("notification:send").await;
    assert_eq!(pushed["id"], "n1");
    assert_eq!(pushed["title"], "Order shipped");

    client.send("notification:ack", json!({"id": "n1"})).await;
    client.expect_silence().await;

    gw.stop().await;
}

#[tokio::test]
async fn test_invalid_token_connects_unauthenticated() {
    let gw = TestGateway::start(test_config()).await;

    let mut client = WsClient::connect(&gw.url("/chat/shop", "token=not-a-jwt&userId=u9"))
        .await
        .unwrap();
    let hello = client.expect("connection").await;
    assert!(hello.get("userId").is_none());

    // No identity: sends are dropped silently.
    client
        .send("chat:message:send", json!({"conversationId": "conv1", "body": "hi"}))
        .await;
    client.expect_silence().await;

    gw.stop().await;
}

#[tokio::test]
async fn test_anonymous_socket_on_admin_chat_is_inert() {
    let gw = TestGateway::start(test_config()).await;

    let mut admin = gw.connect_as("/chat/admin", "a1", "admin").await;
    admin.expect("connection").await;
    admin
        .send("chat:conversation:join", json!({"conversationId": "support"}))
        .await;
    admin.expect("chat:conversation:joined").await;

    let mut anonymous = WsClient::connect(&gw.url("/chat/admin", "")).await.unwrap();
    let hello = anonymous.expect("connection").await;
    assert_eq!(hello["namespace"], "/chat/admin");
    assert!(hello.get("userId").is_none());

    anonymous
        .send("chat:message:send", json!({"conversationId": "support", "body": "hello?"}))
        .await;
    anonymous.expect_silence().await;
    admin.expect_silence().await;

    gw.stop().await;
}

#[tokio::test]
async fn test_call_initiate_then_end() {
    let gw = TestGateway::start(test_config()).await;

    let mut caller = gw.connect_as("/chat/shop", "u1", "user").await;
    caller.expect("connection").await;
    let mut callee = gw.connect_as("/chat/shop", "u2", "shop").await;
    callee.expect("connection").await;

    caller
        .send("call:initiate", json!({"calleeId": "u2", "media": "video"}))
        .await;
    let ringing = caller.expect("call:ringing").await;
    let call_id = ringing["callId"].as_str().unwrap().to_string();

    let incoming = callee.expect("call:incoming").await;
    assert_eq!(incoming["callId"], call_id);
    assert_eq!(incoming["callerId"], "u1");
    assert_eq!(incoming["media"], "video");

    callee.send("call:end", json!({"callId": call_id})).await;
    let ended = caller.expect("call:ended").await;
    assert_eq!(ended["callId"], call_id);
    assert_eq!(ended["from"], "u2");

    // Ending never passes through the active state.
    caller.expect_silence().await;
    callee.expect_silence().await;

    gw.stop().await;
}

#[tokio::test]
async fn test_disconnect_leaves_rooms() {
    let gw = TestGateway::start(test_config()).await;
    let room = chat_room(ChatKind::Shop, "conv1");

    let mut first = gw.connect_as("/chat/shop", "u1", "user").await;
    first.expect("connection").await;
    let mut second = gw.connect_as("/chat/shop", "u2", "shop").await;
    second.expect("connection").await;
    for client in [&mut first, &mut second] {
        client
            .send("chat:conversation:join", json!({"conversationId": "conv1"}))
            .await;
        client.expect("chat:conversation:joined").await;
    }

    let size = |gw: &courier_gateway::Gateway| {
        gw.namespaces()
            .get("/chat/shop")
            .map(|ns| ns.rooms().room_size(&room))
            .unwrap_or(0)
    };
    assert_eq!(size(gw.gateway.as_ref()), 2);

    second.close().await;
    assert!(gw.eventually(|gw| size(gw) == 1).await);
    assert!(
        gw.eventually(|gw| gw.namespaces().get("/chat/shop").map(|ns| ns.connection_count()) == Some(1))
            .await
    );

    // Messages to the room now reach nobody.
    first
        .send("chat:message:send", json!({"conversationId": "conv1", "body": "anyone?"}))
        .await;
    first.expect_silence().await;

    gw.stop().await;
}

#[tokio::test]
async fn test_malformed_and_unknown_events_get_error_frames() {
    let gw = TestGateway::start(test_config()).await;
    let mut client = gw.connect_as("/chat/ai", "u1", "user").await;
    client.expect("connection").await;

    client.send_raw("{not json").await;
    let error = client.expect("error").await;
    assert_eq!(error["code"], -32700);

    client.send("chat:teleport", json!({})).await;
    let error = client.expect("error").await;
    assert_eq!(error["code"], -32601);
    assert_eq!(error["event"], "chat:teleport");

    client.send("chat:conversation:join", json!({})).await;
    let error = client.expect("error").await;
    assert_eq!(error["code"], -32602);

    gw.stop().await;
}

#[tokio::test]
async fn test_health_reports_namespace_counts() {
    let gw = TestGateway::start(test_config()).await;
    let mut client = gw.connect_as("/notifications", "u1", "user").await;
    client.expect("connection").await;

    let (status, health) = gw.get_json("/health").await;
    assert_eq!(status, 200);
    assert_eq!(health["status"], "ok");
    assert_eq!(health["namespaces"]["/notifications"], 1);
    assert_eq!(health["namespaces"]["/chat/admin"], 0);

    gw.stop().await;
}
