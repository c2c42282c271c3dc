//! Frame read/write primitives.

// Layer 1: Standard library imports
use std::marker::Unpin;

// Layer 2: Third-party crate imports
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Maximum frame body size accepted by [`read_frame`]. Guards against a
/// corrupt or hostile length prefix causing an unbounded allocation.
const MAX_FRAME_BYTES: u32 = 64 * 1024 * 1024;

/// Error returned by frame read/write operations.
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("frame of {0} bytes exceeds the {MAX_FRAME_BYTES}-byte limit")]
    TooLarge(u32),

    #[error("failed to encode frame payload: {0}")]
    Encode(serde_json::Error),

    #[error("failed to decode frame payload: {0}")]
    Decode(serde_json::Error),

    #[error("stream closed before a complete frame was read")]
    Eof,
}

/// Serializes `value` as JSON and writes it as one length-prefixed frame.
pub async fn write_frame<W, T>(writer: &mut W, value: &T) -> Result<(), FrameError>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let body = serde_json::to_vec(value).map_err(FrameError::Encode)?;
    let len: u32 = body
        .len()
        .try_into()
        .map_err(|_| FrameError::TooLarge(u32::MAX))?;
    if len > MAX_FRAME_BYTES {
        return Err(FrameError::TooLarge(len));
    }
    writer.write_all(&len.to_be_bytes()).await?;
    writer.write_all(&body).await?;
    writer.flush().await?;
    Ok(())
}

/// Reads one length-prefixed frame and deserializes it as JSON.
///
/// Returns `Err(FrameError::Eof)` if the stream is closed before the length
/// prefix can be read (a clean disconnect, distinguished from a short read
/// mid-frame which surfaces as `FrameError::Io`).
pub async fn read_frame<R, T>(reader: &mut R) -> Result<T, FrameError>
where
    R: AsyncRead + Unpin,
    T: DeserializeOwned,
{
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Err(FrameError::Eof),
        Err(e) => return Err(FrameError::Io(e)),
    }
    let len = u32::from_be_bytes(len_buf);
    if len > MAX_FRAME_BYTES {
        return Err(FrameError::TooLarge(len));
    }
    let mut body = vec![0u8; len as usize];
    reader.read_exact(&mut body).await?;
    serde_json::from_slice(&body).map_err(FrameError::Decode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Sample {
        id: u32,
        label: String,
    }

    #[tokio::test]
    async fn round_trips_through_an_in_memory_duplex() {
        let (mut client, mut server) = tokio::io::duplex(4096);

        let sample = Sample {
            id: 7,
            label: "payload".to_string(),
        };
        write_frame(&mut client, &sample).await.expect("write");

        let received: Sample = read_frame(&mut server).await.expect("read");
        assert_eq!(received, sample);
    }

    #[tokio::test]
    async fn writes_multiple_frames_sequentially() {
        let (mut client, mut server) = tokio::io::duplex(4096);

        for i in 0..3u32 {
            write_frame(&mut client, &Sample { id: i, label: i.to_string() })
                .await
                .expect("write");
        }
        drop(client);

        for i in 0..3u32 {
            let received: Sample = read_frame(&mut server).await.expect("read");
            assert_eq!(received.id, i);
        }
        let eof = read_frame::<_, Sample>(&mut server).await;
        assert!(matches!(eof, Err(FrameError::Eof)));
    }

    #[tokio::test]
    async fn rejects_a_frame_over_the_size_limit() {
        let (mut client, mut server) = tokio::io::duplex(16);
        client
            .write_all(&(MAX_FRAME_BYTES + 1).to_be_bytes())
            .await
            .expect("write length prefix");

        let result = read_frame::<_, Sample>(&mut server).await;
        assert!(matches!(result, Err(FrameError::TooLarge(_))));
    }

    #[tokio::test]
    async fn eof_before_any_bytes_is_reported_distinctly() {
        let (client, mut server) = tokio::io::duplex(16);
        drop(client);

        let result = read_frame::<_, Sample>(&mut server).await;
        assert!(matches!(result, Err(FrameError::Eof)));
    }
}
