//! Common test utilities for the gateway crate
//!
//! A scripted gateway on a loopback port, a canned topology and fast
//! session timings.

#[path = "../../../actec-client/tests/common/mock_hub.rs"]
mod mock_hub;

pub use mock_hub::*;

use std::sync::Arc;
use std::time::Duration;

use actec_client::ClientConfig;
use actec_gateway::Gateway;
use actec_protocol::{commands, AreaNameRule, Header, Message, Token};
use serde_json::{json, Value};

pub const MAC: &str = "aa:bb:cc:dd:ee:ff";

/// Token used by every test session
pub fn test_token() -> Token {
    Token::new("0123456789ab").unwrap()
}

/// Session settings with millisecond timings
pub fn fast_config(port: u16) -> ClientConfig {
    let mut config = ClientConfig::new("127.0.0.1", port, test_token());
    config.liveness_grace = Duration::from_millis(20);
    config.reconnect_cooldown = Duration::from_millis(10);
    config.reconnect_poll = Duration::from_millis(10);
    config.ping_interval = Duration::from_secs(60);
    config.stale_after = Duration::from_secs(120);
    config.backoff_base = Duration::from_millis(10);
    config.max_backoff = Duration::from_millis(80);
    config
}

/// Fail the test instead of hanging it
pub async fn within<F: std::future::Future>(future: F) -> F::Output {
    tokio::time::timeout(Duration::from_secs(5), future)
        .await
        .expect("timed out")
}

/// One floor, one room, one two-gang switch, one scene, one group
pub fn topology() -> Value {
    json!({
        "integrated_list": [{
            "floor_name": "1F",
            "rooms": [{
                "name": "Living",
                "devices": [{
                    "name": "Wall switch",
                    "device_id": "dev-1",
                    "product_key": "2002",
                    "product_mode": 1,
                    "product_channel": 2
                }],
                "scenes": [{"name": "Movie", "scene_id": 4}],
                "groups": [{"name": "Downlights", "group_id": 9, "group_type": 2}]
            }]
        }]
    })
}

pub fn report_reply(success: bool, body: Value) -> Message {
    let mut header = Header::response("ha", "get");
    header.success = Some(success);
    Message::new(header, body)
}

pub fn response(namespace: &str, verb: &str, body: Value) -> Message {
    Message::new(Header::response(namespace, verb), body)
}

/// Answer the report request the way a gateway that authorized us would
pub async fn serve_bootstrap(hub: &MockHub, reply: Message) -> HubConnection {
    let mut conn = hub.accept().await;
    let request = conn.recv().await.unwrap();
    assert_eq!(request, commands::report_request());
    conn.send(&reply).await;
    conn
}

/// A bootstrapped gateway with its receive loop running
pub async fn running_gateway(hub: &MockHub) -> (Arc<Gateway>, HubConnection) {
    running_gateway_with(hub, fast_config(hub.port())).await
}

pub async fn running_gateway_with(
    hub: &MockHub,
    config: ClientConfig,
) -> (Arc<Gateway>, HubConnection) {
    let gateway = Arc::new(Gateway::new(config, MAC));
    let (conn, result) = within(async {
        tokio::join!(
            serve_bootstrap(hub, report_reply(true, topology())),
            gateway.bootstrap(AreaNameRule::FloorRoom)
        )
    })
    .await;
    result.unwrap();

    tokio::spawn({
        let gateway = Arc::clone(&gateway);
        async move { gateway.run().await }
    });
    (gateway, conn)
}
