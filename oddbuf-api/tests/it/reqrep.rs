use std::{sync::Arc, time::Duration};

use futures::{SinkExt, StreamExt};
use tokio_util::codec::Framed;

use oddbuf_api::{ApiClient, ApiError, ApiServer, ClientOptions, ServerOptions};
use oddbuf_core::{InterfaceTable, Oddbuf, ODDBUF_FEATURE};
use oddbuf_wire::api::{Codec, EnableDisable, EnableDisableReply, Message};

fn oddbuf_with_port() -> (Arc<Oddbuf<InterfaceTable>>, u32) {
    let table = InterfaceTable::new();
    let port = table.add_hardware_port("GigabitEthernet0/8/0").unwrap();
    (Arc::new(Oddbuf::new(table)), port.index())
}

#[tokio::test]
async fn enable_then_disable_over_tcp() {
    let _ = tracing_subscriber::fmt::try_init();

    let (oddbuf, port) = oddbuf_with_port();
    let mut server = ApiServer::new(Arc::clone(&oddbuf));
    server.bind("127.0.0.1:0").await.unwrap();

    let client = ApiClient::connect(server.local_addr().unwrap()).await.unwrap();

    let armed = |oddbuf: &Oddbuf<InterfaceTable>| {
        oddbuf.graph().is_stage_enabled(
            port.into(),
            ODDBUF_FEATURE.arc_name,
            ODDBUF_FEATURE.node_name,
        )
    };

    client.enable_disable(port, true).await.unwrap();
    assert!(armed(&oddbuf));

    // Enabling twice leaves the stage armed once.
    client.enable_disable(port, true).await.unwrap();
    assert_eq!(oddbuf.graph().enabled_count(), 1);

    client.enable_disable(port, false).await.unwrap();
    assert!(!armed(&oddbuf));

    assert_eq!(client.stats().requests(), 3);
    assert_eq!(client.stats().async_errors(), 0);
    assert_eq!(server.stats().replies(), 3);
}

#[tokio::test]
async fn concurrent_requests_share_one_connection() {
    let table = InterfaceTable::new();
    let ports: Vec<u32> =
        (0..8).map(|i| table.add_hardware_port(format!("eth{i}")).unwrap().index()).collect();
    let oddbuf = Arc::new(Oddbuf::new(table));

    let mut server = ApiServer::new(Arc::clone(&oddbuf));
    server.bind("127.0.0.1:0").await.unwrap();
    let client = ApiClient::connect(server.local_addr().unwrap()).await.unwrap();

    let mut tasks = tokio::task::JoinSet::new();
    for port in ports {
        let client = client.clone();
        tasks.spawn(async move { client.enable_disable(port, true).await });
    }

    while let Some(result) = tasks.join_next().await {
        result.unwrap().unwrap();
    }

    assert_eq!(oddbuf.graph().enabled_count(), 8);
    assert_eq!(client.stats().requests(), 8);
}

#[tokio::test]
async fn replies_echo_request_context() {
    let (oddbuf, port) = oddbuf_with_port();
    let server = ApiServer::new(oddbuf);

    let (client_io, server_io) = tokio::io::duplex(1024);
    tokio::spawn(async move { server.serve_connection(server_io).await });

    let mut conn = Framed::new(client_io, Codec::new());

    for (context, enable_disable) in [(u32::MAX, true), (0, false)] {
        let request = EnableDisable { context, sw_if_index: port, enable_disable };
        conn.send(Message::EnableDisable(request)).await.unwrap();

        let reply = conn.next().await.unwrap().unwrap();
        assert_eq!(reply, Message::EnableDisableReply(EnableDisableReply { context, retval: 0 }));
    }
}

#[tokio::test(start_paused = true)]
async fn silent_server_times_out() {
    // Keep the server end open but never answer.
    let (client_io, _server_io) = tokio::io::duplex(1024);

    let client =
        ApiClient::with_io(client_io, ClientOptions::default().timeout(Duration::from_secs(1)));

    let err = client.enable_disable(1, true).await.unwrap_err();
    assert!(matches!(err, ApiError::Timeout));
    assert_eq!(client.stats().timeouts(), 1);
}

#[tokio::test]
async fn closed_server_fails_pending_requests() {
    let (client_io, server_io) = tokio::io::duplex(1024);
    drop(server_io);

    let client = ApiClient::with_io(client_io, ClientOptions::default());

    let err = client.enable_disable(1, true).await.unwrap_err();
    assert!(matches!(err, ApiError::ConnectionClosed));
}

#[tokio::test]
async fn max_clients_rejects_extra_connections() {
    let _ = tracing_subscriber::fmt::try_init();

    let (oddbuf, port) = oddbuf_with_port();
    let mut server = ApiServer::with_options(oddbuf, ServerOptions::default().max_clients(1));
    server.bind("127.0.0.1:0").await.unwrap();
    let addr = server.local_addr().unwrap();

    let first = ApiClient::connect(addr).await.unwrap();
    first.enable_disable(port, true).await.unwrap();
    assert_eq!(server.stats().active_clients(), 1);

    let second = ApiClient::connect(addr).await.unwrap();
    let err = second.enable_disable(port, false).await.unwrap_err();
    assert!(matches!(err, ApiError::ConnectionClosed));
    assert_eq!(server.stats().rejected_clients(), 1);

    // The admitted client is unaffected.
    first.enable_disable(port, false).await.unwrap();
}
