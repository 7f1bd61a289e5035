use crate::protocol::{
    receive_encrypted_message, receive_public_key, send_close, send_encrypted_message,
    send_public_key, BoxedError,
};
use crate::rsa::Rsa;
use log::{error, info, warn};
use std::sync::Arc;
use tokio::io::{self, AsyncBufReadExt, AsyncWriteExt, BufReader as TokioBufReader, BufWriter as TokioBufWriter};
use tokio::net::TcpStream;

pub async fn run_client(server_addr: &str, keys: Arc<Rsa>) -> Result<(), BoxedError> {
    println!("Connecting to {}...", server_addr);
    let stream = TcpStream::connect(server_addr).await?;
    let (read_half, write_half) = stream.into_split();
    let mut reader = TokioBufReader::new(read_half);
    let mut writer = TokioBufWriter::new(write_half);

    send_public_key(&mut writer, &keys.public_key()).await?;
    let server_key = receive_public_key(&mut reader).await?;
    info!("server public key: {}", server_key);
    println!("Connected. Type a message, or `exit` to leave.");

    let private_key = keys.private_key();
    let mut read_task = tokio::spawn(async move {
        loop {
            match receive_encrypted_message(&mut reader).await {
                Ok(Some(units)) => match private_key.recover_units(&units) {
                    Ok(message) => {
                        tokio::task::yield_now().await;
                        println!("\rPeer: {}", message);
                        print!("You: ");
                        io::stdout().flush().await.unwrap_or_default();
                    }
                    Err(e) => warn!("could not decrypt message: {}", e),
                },
                Ok(None) => {
                    println!("\nServer closed the connection.");
                    break;
                }
                Err(e) => {
                    warn!("error receiving message: {}", e);
                    break;
                }
            }
        }
    });

    let mut stdin_reader = TokioBufReader::new(io::stdin());
    loop {
        print!("You: ");
        io::stdout().flush().await?;

        let mut line = String::new();
        tokio::select! {
            biased;
            _ = &mut read_task => {
                info!("connection handler finished");
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
                        let units = match server_key.apply_units(message_to_send) {
                            Ok(units) => units,
                            Err(e) => {
                                warn!("could not encrypt message: {}", e);
                                continue;
                            }
                        };
                        if let Err(e) = send_encrypted_message(&mut writer, &units).await {
                            error!("failed to send message: {}", e);
                            break;
                        }
                    }
                    Err(e) => {
                        error!("error reading stdin: {}", e);
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
