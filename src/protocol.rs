use crate::key::Key;
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use std::error::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader, BufWriter};

pub type BoxedError = Box<dyn Error + Send + Sync>;

#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct EncryptedMessage {
    /// One decimal integer per plaintext character.
    units: Vec<String>,
}

async fn write_frame<W>(stream: &mut BufWriter<W>, body: &[u8]) -> Result<(), BoxedError>
where
    W: AsyncWrite + Unpin,
{
    stream.write_u32(body.len() as u32).await?;
    stream.write_all(body).await?;
    stream.flush().await?;
    Ok(())
}

/// Reads one length-prefixed frame; `None` when the peer sent the zero-length close frame.
async fn read_frame<R>(stream: &mut BufReader<R>) -> Result<Option<Vec<u8>>, BoxedError>
where
    R: AsyncRead + Unpin,
{
    let len = stream.read_u32().await? as usize;
    if len == 0 {
        return Ok(None);
    }
    let mut buffer = vec![0; len];
    stream.read_exact(&mut buffer).await?;
    Ok(Some(buffer))
}

pub async fn send_public_key<W>(stream: &mut BufWriter<W>, key: &Key) -> Result<(), BoxedError>
where
    W: AsyncWrite + Unpin,
{
    let key_json = serde_json::to_vec(key)?;
    write_frame(stream, &key_json).await
}

pub async fn receive_public_key<R>(stream: &mut BufReader<R>) -> Result<Key, BoxedError>
where
    R: AsyncRead + Unpin,
{
    let buffer = read_frame(stream)
        .await?
        .ok_or("peer closed the connection before sending its public key")?;
    let key: Key = serde_json::from_slice(&buffer)?;
    Ok(key)
}

pub async fn send_encrypted_message<W>(
    stream: &mut BufWriter<W>,
    units: &[BigUint],
) -> Result<(), BoxedError>
where
    W: AsyncWrite + Unpin,
{
    let msg_to_send = EncryptedMessage {
        units: units.iter().map(BigUint::to_string).collect(),
    };
    let serialized_msg = serde_json::to_vec(&msg_to_send)?;
    write_frame(stream, &serialized_msg).await
}

/// `Ok(None)` means the peer closed the session.
pub async fn receive_encrypted_message<R>(
    stream: &mut BufReader<R>,
) -> Result<Option<Vec<BigUint>>, BoxedError>
where
    R: AsyncRead + Unpin,
{
    let Some(buffer) = read_frame(stream).await? else {
        return Ok(None);
    };
    let deserialized_msg: EncryptedMessage = serde_json::from_slice(&buffer)?;

    let units = deserialized_msg
        .units
        .iter()
        .map(|unit| unit.parse::<BigUint>())
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Some(units))
}

pub async fn send_close<W>(stream: &mut BufWriter<W>) -> Result<(), BoxedError>
where
    W: AsyncWrite + Unpin,
{
    write_frame(stream, &[]).await
}
