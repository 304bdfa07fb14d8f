use std::sync::Arc;

use oddbuf_api::{ApiClient, ApiError, ApiServer, ClientOptions};
use oddbuf_core::{status, status_code, InterfaceHandle, InterfaceTable, Oddbuf};

/// Runs the same toggle through the direct call, the admin command and the remote API over an
/// in-memory stream, and returns the three status codes.
async fn codes_for(oddbuf: Arc<Oddbuf<InterfaceTable>>, index: u32) -> (i32, i32, i32) {
    let local = status_code(&oddbuf.set_feature(InterfaceHandle::new(index), true));

    let admin = match oddbuf.run_command(&format!("oddbuf enable-disable sw_if_index {index}")) {
        Ok(_) => status::OK,
        Err(e) => e.code().expect("toggle failure"),
    };

    let (client_io, server_io) = tokio::io::duplex(1024);
    let server = ApiServer::new(oddbuf);
    tokio::spawn(async move { server.serve_connection(server_io).await });

    let client = ApiClient::with_io(client_io, ClientOptions::default());
    let remote = match client.enable_disable(index, true).await {
        Ok(()) => status::OK,
        Err(e) => e.retval().expect("rejected by the server"),
    };

    (local, admin, remote)
}

fn table() -> (InterfaceTable, InterfaceHandle, InterfaceHandle) {
    let table = InterfaceTable::new();
    let port = table.add_hardware_port("GigabitEthernet0/8/0").unwrap();
    let sub = table.add_virtual("GigabitEthernet0/8/0.100").unwrap();
    (table, port, sub)
}

#[tokio::test]
async fn unknown_handle_same_code_everywhere() {
    let _ = tracing_subscriber::fmt::try_init();

    let (table, _, _) = table();
    let oddbuf = Arc::new(Oddbuf::new(table));

    let unknown = rand::random::<u32>() | 0x8000_0000;
    let codes = codes_for(oddbuf, unknown).await;

    assert_eq!(codes, (status::INVALID_SW_IF_INDEX, status::INVALID_SW_IF_INDEX, status::INVALID_SW_IF_INDEX));
}

#[tokio::test]
async fn virtual_interface_same_code_everywhere() {
    let (table, _, sub) = table();
    let oddbuf = Arc::new(Oddbuf::new(table));

    let codes = codes_for(Arc::clone(&oddbuf), sub.index()).await;

    assert_eq!(codes, (status::INVALID_SW_IF_INDEX, status::INVALID_SW_IF_INDEX, status::INVALID_SW_IF_INDEX));
    assert_eq!(oddbuf.graph().enabled_count(), 0);
}

#[tokio::test]
async fn engine_failures_same_code_everywhere() {
    let (table, port, _) = table();
    table.set_redirect_supported(port, false);
    let oddbuf = Arc::new(Oddbuf::new(table));

    let codes = codes_for(Arc::clone(&oddbuf), port.index()).await;
    assert_eq!(codes, (status::UNIMPLEMENTED, status::UNIMPLEMENTED, status::UNIMPLEMENTED));

    oddbuf.graph().set_redirect_supported(port, true);
    oddbuf.graph().inject_failure(port, Some("no buffers".to_string()));

    let codes = codes_for(oddbuf, port.index()).await;
    assert_eq!(codes, (status::UNSPECIFIED, status::UNSPECIFIED, status::UNSPECIFIED));
}

#[tokio::test]
async fn rejected_reply_counts_as_async_error() {
    let (table, _, sub) = table();
    let oddbuf = Arc::new(Oddbuf::new(table));

    let (client_io, server_io) = tokio::io::duplex(1024);
    let server = Arc::new(ApiServer::new(oddbuf));
    let server_task = {
        let server = Arc::clone(&server);
        tokio::spawn(async move { server.serve_connection(server_io).await })
    };

    let client = ApiClient::with_io(client_io, ClientOptions::default());
    let err = client.enable_disable(sub.index(), true).await.unwrap_err();

    assert!(matches!(err, ApiError::Rejected(status::INVALID_SW_IF_INDEX)));
    assert_eq!(client.stats().requests(), 1);
    assert_eq!(client.stats().async_errors(), 1);

    drop(client);
    server_task.await.unwrap().unwrap();

    assert_eq!(server.stats().requests(), 1);
    assert_eq!(server.stats().replies(), 1);
    assert_eq!(server.stats().failed_requests(), 1);
    assert_eq!(server.stats().active_clients(), 0);
}
