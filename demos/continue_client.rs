//! Sends one message split across three fragments, then closes.

use rand::distr::Alphanumeric;
use rand::Rng;

fn generate_random_string() -> String {
    rand::rng().sample_iter(&Alphanumeric).take(30).map(char::from).collect()
}

async fn run(addr: &str) {
    let ws = match beacon_ws::handshake::connect_async(addr).await {
        Ok(ws) => ws,
        Err(err) => {
            eprintln!("Error when performing handshake: {err}");
            return;
        }
    };

    let text = generate_random_string();
    log::info!("Sending fragmented string: {text}");
    let bytes = text.into_bytes();
    let (head, rest) = bytes.split_at(bytes.len() / 3);
    let (mid, tail) = rest.split_at(rest.len() / 2);

    if ws.send_fragment_start(head.to_vec()).await.is_err()
        || ws.send_fragment(mid.to_vec()).await.is_err()
        || ws.send_fragment_end(tail.to_vec()).await.is_err()
    {
        log::error!("Error occurred when sending data in fragments");
    }

    let _ = ws.close_normal().await;
}

#[tokio::main]
async fn main() {
    env_logger::init();
    run("ws://127.0.0.1:9002").await;
}
