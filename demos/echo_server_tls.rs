//! Same echo behavior as `echo_server`, but terminating TLS with a certificate/key pair loaded
//! from disk.

use beacon_ws::config::ServerConfig;
use beacon_ws::event::{Event, ID};
use beacon_ws::server::start_server_with_config;
use beacon_ws::split::WSWriter;
use beacon_ws::WsStream;
use futures::StreamExt;
use log::*;
use pki_types::{CertificateDer, PrivateKeyDer};
use rustls_pemfile::{certs, private_key};
use std::collections::HashMap;
use std::fs::File;
use std::io;
use std::io::{BufReader, ErrorKind};
use std::path::Path;
use std::sync::Arc;

fn load_certs(path: &Path) -> io::Result<Vec<CertificateDer<'static>>> {
    certs(&mut BufReader::new(File::open(path)?)).collect()
}

fn load_key(path: &Path) -> io::Result<PrivateKeyDer<'static>> {
    private_key(&mut BufReader::new(File::open(path)?))?
        .ok_or_else(|| io::Error::new(ErrorKind::Other, "no private key found"))
}

#[tokio::main]
async fn main() -> io::Result<()> {
    env_logger::init();

    let certs = load_certs(Path::new("cert.pem"))?;
    let key = load_key(Path::new("key.pem"))?;
    let tls_config = rustls::ServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .map_err(|err| io::Error::new(io::ErrorKind::InvalidInput, err))?;

    let port = 9003;
    let config = ServerConfig { tls: Some(Arc::new(tls_config)), ..Default::default() };
    let mut events = start_server_with_config(port, config).await?;
    info!("Listening on wss://0.0.0.0:{port}");

    let mut clients: HashMap<ID, WSWriter<WsStream>> = HashMap::new();
    while let Some(event) = events.next().await {
        match event {
            Event::NewClient(id, writer) => {
                info!("New client {id} connected");
                clients.insert(id, writer);
            }
            Event::NewMessage(id, message) => {
                if let Some(writer) = clients.get(&id) {
                    let _ = writer.send(message, false).await;
                }
            }
            Event::Disconnect(id) => {
                clients.remove(&id);
            }
            Event::Error(id, err) => {
                error!("Error on connection {id}: {err}");
                clients.remove(&id);
            }
        }
    }

    Ok(())
}
