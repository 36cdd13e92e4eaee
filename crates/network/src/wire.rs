//! Line and frame codecs
//!
//! A connection carries newline-terminated ASCII lines (command, optional
//! argument) followed by zero or more frames: a 4-byte big-endian length
//! prefix and a bincode payload. Frames are capped to bound allocation from
//! untrusted peers.

use anyhow::{bail, Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Upper bound for a single frame.
pub const MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
pub const READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Write one newline-terminated line.
pub async fn write_line<W: AsyncWrite + Unpin>(writer: &mut W, line: &str) -> Result<()> {
    writer.write_all(line.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    Ok(())
}

/// Read one line, without its terminator. EOF before a newline is an error.
pub async fn read_line<R: AsyncBufRead + Unpin>(reader: &mut R) -> Result<String> {
    let mut line = String::new();
    let n = reader.read_line(&mut line).await.context("read line")?;
    if n == 0 {
        bail!("connection closed before line");
    }
    Ok(line.trim_end_matches(['\n', '\r']).to_string())
}

/// Write one length-prefixed frame.
pub async fn write_frame<W: AsyncWrite + Unpin>(writer: &mut W, payload: &[u8]) -> Result<()> {
    if payload.len() > MAX_FRAME_LEN {
        bail!("frame of {} bytes exceeds cap", payload.len());
    }
    writer.write_all(&(payload.len() as u32).to_be_bytes()).await?;
    writer.write_all(payload).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one length-prefixed frame.
pub async fn read_frame<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Vec<u8>> {
    let mut len_bytes = [0u8; 4];
    reader.read_exact(&mut len_bytes).await.context("read frame length")?;
    let len = u32::from_be_bytes(len_bytes) as usize;
    if len > MAX_FRAME_LEN {
        bail!("peer announced frame of {len} bytes, cap is {MAX_FRAME_LEN}");
    }
    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await.context("read frame payload")?;
    Ok(payload)
}

/// Serialize a value into one frame.
pub async fn write_message<W, T>(writer: &mut W, value: &T) -> Result<()>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let payload = bincode::serialize(value).context("encode payload")?;
    write_frame(writer, &payload).await
}

/// Read one frame and decode it. A decode failure poisons only this
/// connection; nothing is applied from a partially decoded payload.
pub async fn read_message<R, T>(reader: &mut R) -> Result<T>
where
    R: AsyncRead + Unpin,
    T: DeserializeOwned,
{
    let payload = read_frame(reader).await?;
    bincode::deserialize(&payload).context("decode payload")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tokio::io::BufReader;

    #[tokio::test]
    async fn lines_round_trip() {
        let mut buf = Vec::new();
        write_line(&mut buf, "General TCP").await.unwrap();
        write_line(&mut buf, "alice@x.com/docs").await.unwrap();

        let mut reader = BufReader::new(Cursor::new(buf));
        assert_eq!(read_line(&mut reader).await.unwrap(), "General TCP");
        assert_eq!(read_line(&mut reader).await.unwrap(), "alice@x.com/docs");
        assert!(read_line(&mut reader).await.is_err());
    }

    #[tokio::test]
    async fn frames_round_trip() {
        let mut buf = Vec::new();
        write_message(&mut buf, &vec!["a".to_string(), "b".to_string()])
            .await
            .unwrap();
        write_frame(&mut buf, b"raw bytes").await.unwrap();

        let mut reader = Cursor::new(buf);
        let strings: Vec<String> = read_message(&mut reader).await.unwrap();
        assert_eq!(strings, vec!["a", "b"]);
        assert_eq!(read_frame(&mut reader).await.unwrap(), b"raw bytes");
    }

    #[tokio::test]
    async fn empty_frame_is_valid() {
        let mut buf = Vec::new();
        write_frame(&mut buf, b"").await.unwrap();
        let mut reader = Cursor::new(buf);
        assert!(read_frame(&mut reader).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn oversized_frames_are_rejected() {
        let mut buf = Vec::new();
        buf.extend(((MAX_FRAME_LEN + 1) as u32).to_be_bytes());
        let mut reader = Cursor::new(buf);
        assert!(read_frame(&mut reader).await.is_err());
    }

    #[tokio::test]
    async fn truncated_frame_fails() {
        let mut buf = Vec::new();
        buf.extend(8u32.to_be_bytes());
        buf.extend(b"shrt");
        let mut reader = Cursor::new(buf);
        assert!(read_frame(&mut reader).await.is_err());
    }
}
