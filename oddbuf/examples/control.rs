use std::{sync::Arc, time::Duration};

use oddbuf::{ApiClient, ApiServer, InterfaceTable, Oddbuf, PeriodicOptions};

#[tokio::main]
async fn main() {
    let _ = tracing_subscriber::fmt::try_init();

    let table = InterfaceTable::new();
    let port = table.add_hardware_port("GigabitEthernet0/8/0").unwrap();
    table.add_virtual("loop0").unwrap();

    let oddbuf =
        Arc::new(Oddbuf::with_options(table, PeriodicOptions::default().timeout(Duration::from_secs(1))));

    // Administrative surface
    oddbuf.run_command("oddbuf configure n_to_copy 4 offset 2 first_offset 1").unwrap();
    oddbuf.run_command("oddbuf enable-disable GigabitEthernet0/8/0").unwrap();
    if let Err(e) = oddbuf.run_command("oddbuf enable-disable loop0") {
        println!("loop0: {e}");
    }

    // Periodic process
    oddbuf.create_periodic_process().unwrap();
    oddbuf.signal_timer_enabled(true);
    oddbuf.signal_event1(7);
    tokio::time::sleep(Duration::from_millis(2500)).await;
    oddbuf.signal_timer_enabled(false);

    // Remote surface
    let mut server = ApiServer::new(Arc::clone(&oddbuf));
    server.bind("127.0.0.1:0").await.unwrap();

    let client = ApiClient::connect(server.local_addr().unwrap()).await.unwrap();
    client.enable_disable(port.index(), false).await.unwrap();

    match client.enable_disable(9999, true).await {
        Ok(()) => println!("unexpected success"),
        Err(e) => println!("remote toggle of 9999 rejected with {:?}", e.retval()),
    }

    print!("{}", oddbuf.run_command("oddbuf show").unwrap());
}
