//! Frame codecs for both wire legs.
//!
//! POS leg: `u16` big-endian length prefix, then the body. Bank leg: 4
//! ASCII decimal digits of length, then the body (the convention spoken by
//! ASCII-channel bank hosts). Both sides cap frames at [`MAX_FRAME_LEN`].

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Largest body either leg will read or write.
pub const MAX_FRAME_LEN: usize = 10_240;

/// Framing failures. All of them are fatal for the connection.
#[derive(Debug, Error)]
pub enum FramingError {
    /// Peer closed between frames.
    #[error("connection closed")]
    Closed,

    /// Declared length exceeds the frame cap.
    #[error("oversize frame: {length} bytes")]
    Oversize { length: usize },

    /// Bank length header was not 4 ASCII digits.
    #[error("bad length header: {0}")]
    BadLengthHeader(String),

    /// Body larger than the header can express (bank leg).
    #[error("body of {length} bytes does not fit the length header")]
    BodyTooLarge { length: usize },

    /// Socket error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Read one POS frame: 2-byte big-endian length, then exactly that many
/// bytes.
pub async fn read_pos_frame<R>(reader: &mut R) -> Result<Vec<u8>, FramingError>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; 2];
    match reader.read_exact(&mut header).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            return Err(FramingError::Closed)
        }
        Err(e) => return Err(e.into()),
    }

    let length = u16::from_be_bytes(header) as usize;
    if length > MAX_FRAME_LEN {
        return Err(FramingError::Oversize { length });
    }

    let mut body = vec![0u8; length];
    reader.read_exact(&mut body).await?;
    Ok(body)
}

/// Write one POS frame.
pub async fn write_pos_frame<W>(writer: &mut W, body: &[u8]) -> Result<(), FramingError>
where
    W: AsyncWrite + Unpin,
{
    if body.len() > MAX_FRAME_LEN {
        return Err(FramingError::Oversize { length: body.len() });
    }
    writer.write_all(&(body.len() as u16).to_be_bytes()).await?;
    writer.write_all(body).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one bank frame: 4 ASCII decimal digits of length, then the body.
pub async fn read_bank_frame<R>(reader: &mut R) -> Result<Vec<u8>, FramingError>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; 4];
    match reader.read_exact(&mut header).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            return Err(FramingError::Closed)
        }
        Err(e) => return Err(e.into()),
    }

    let header_str = std::str::from_utf8(&header)
        .map_err(|_| FramingError::BadLengthHeader(format!("{header:02X?}")))?;
    let length: usize = header_str
        .parse()
        .map_err(|_| FramingError::BadLengthHeader(header_str.to_string()))?;
    if length > MAX_FRAME_LEN {
        return Err(FramingError::Oversize { length });
    }

    let mut body = vec![0u8; length];
    reader.read_exact(&mut body).await?;
    Ok(body)
}

/// Write one bank frame. The header caps the body at 9999 bytes.
pub async fn write_bank_frame<W>(writer: &mut W, body: &[u8]) -> Result<(), FramingError>
where
    W: AsyncWrite + Unpin,
{
    if body.len() > 9_999 {
        return Err(FramingError::BodyTooLarge { length: body.len() });
    }
    writer.write_all(format!("{:04}", body.len()).as_bytes()).await?;
    writer.write_all(body).await?;
    writer.flush().await?;
    Ok(())
}
