use std::time::Duration;

use signpost_core::Context;
use signpost_http_send_reqwest::ReqwestHttpSend;

#[tokio::main]
async fn main() {
    // Connection pooling and connect timeouts belong to the transport;
    // the dispatch loop above only decides whether to try again.
    let client = reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(5))
        .pool_idle_timeout(Duration::from_secs(30))
        .build()
        .expect("client must build");

    let ctx = Context::new().with_http_send(ReqwestHttpSend::new(client));

    println!("context ready: {ctx:?}");
}
