use crate::protocol::{
    receive_encrypted_message, receive_public_key, send_close, send_encrypted_message,
    send_public_key, BoxedError,
};
use crate::rsa::Rsa;
use log::{error, info, warn};
use std::sync::Arc;
use tokio::io::{self, AsyncBufReadExt, AsyncWriteExt, BufReader as TokioBufReader, BufWriter as TokioBufWriter};
use tokio::net::{TcpListener, TcpStream};

pub async fn run_server(addr: &str, keys: Arc<Rsa>) -> Result<(), BoxedError> {
    let listener = TcpListener::bind(addr).await?;
    println!("Listening on {} with public key ({})", addr, keys.public_key());

    loop {
        match listener.accept().await {
            Ok((stream, peer_addr)) => {
                info!("accepted connection from {}", peer_addr);
                let keys = Arc::clone(&keys);
                tokio::spawn(async move {
                    if let Err(e) = handle_peer(stream, keys, peer_addr.to_string()).await {
                        error!("error handling peer {}: {}", peer_addr, e);
                    }
                    println!("Connection with {} closed.", peer_addr);
                });
            }
            Err(e) => {
                warn!("failed to accept connection: {}", e);
            }
        }
    }
}

async fn handle_peer(stream: TcpStream, keys: Arc<Rsa>, peer_id: String) -> Result<(), BoxedError> {
    let (read_half, write_half) = stream.into_split();
    let mut reader = TokioBufReader::new(read_half);
    let mut writer = TokioBufWriter::new(write_half);

    let peer_key = receive_public_key(&mut reader).await?;
    info!("[{}] peer public key: {}", peer_id, peer_key);
    send_public_key(&mut writer, &keys.public_key()).await?;

    let private_key = keys.private_key();
    let reader_id = peer_id.clone();
    let mut read_task = tokio::spawn(async move {
        loop {
            match receive_encrypted_message(&mut reader).await {
                Ok(Some(units)) => match private_key.recover_units(&units) {
                    Ok(message) => {
                        tokio::task::yield_now().await;
                        println!("\r[{}] Peer: {}", reader_id, message);
                        print!("[{}] You: ", reader_id);
                        io::stdout().flush().await.unwrap_or_default();
                    }
                    Err(e) => warn!("[{}] could not decrypt message: {}", reader_id, e),
                },
                Ok(None) => {
                    println!("\n[{}] Peer closed the connection.", reader_id);
                    break;
                }
                Err(e) => {
                    warn!("[{}] error receiving message: {}", reader_id, e);
                    break;
                }
            }
        }
    });

    let mut stdin_reader = TokioBufReader::new(io::stdin());
    loop {
        print!("[{}] You: ", peer_id);
        io::stdout().flush().await?;

        let mut line = String::new();
        tokio::select! {
            biased;
            _ = &mut read_task => {
                info!("[{}] reader finished, stopping input loop", peer_id);
                break;
            }
            result = stdin_reader.read_line(&mut line) => {
                match result {
                    Ok(0) => break,
                    Ok(_) => {
                        let message_to_send = line.trim();
                        if message_to_send.is_empty() { continue; }
                        if message_to_send.eq_ignore_ascii_case("exit") {
                            send_close(&mut writer).await?;
                            break;
                        }
                        let units = match peer_key.apply_units(message_to_send) {
                            Ok(units) => units,
                            Err(e) => {
                                warn!("[{}] could not encrypt message: {}", peer_id, e);
                                continue;
                            }
                        };
                        if let Err(e) = send_encrypted_message(&mut writer, &units).await {
                            error!("[{}] failed to send message: {}", peer_id, e);
                            break;
                        }
                    }
                    Err(e) => {
                        error!("[{}] error reading stdin: {}", peer_id, e);
                        break;
                    }
                }
            }
        }
    }

    if !read_task.is_finished() {
        read_task.abort();
    }
    Ok(())
}
