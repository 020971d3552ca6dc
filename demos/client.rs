//! Connects, sends a random string every few seconds, and closes after receiving three replies.

use beacon_ws::close::CloseCode;
use rand::distr::Alphanumeric;
use rand::Rng;
use tokio::select;
use tokio::time::{interval, Duration};

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
    let (mut reader, writer) = ws.split();

    let mut ticker = interval(Duration::from_secs(5));
    let mut received = 0;

    loop {
        select! {
            message = reader.recv() => {
                match message {
                    Some(Ok(message)) => {
                        println!("Received message: {message:?}");
                        received += 1;
                        if received >= 3 {
                            let _ = writer.close(beacon_ws::close::CloseInfo::new(CloseCode::NORMAL, "done")).await;
                            break;
                        }
                    }
                    Some(Err(err)) => {
                        eprintln!("Received error from the stream: {err}");
                        break;
                    }
                    None => break,
                }
            }
            _ = ticker.tick() => {
                let payload = generate_random_string();
                if writer.send(payload.into(), false).await.is_err() {
                    eprintln!("Failed to send message");
                    break;
                }
            }
        }
    }
}

#[tokio::main]
async fn main() {
    env_logger::init();
    run("ws://127.0.0.1:9002").await;
}
