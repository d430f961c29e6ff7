use bytes::BytesMut;
use std::fmt;
use std::io;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpStream, UdpSocket};

use dns_types::protocol::types::{Flags, HEADER_LEN};

/// Largest message which can be sent over UDP without EDNS.
pub const UDP_MESSAGE_MAX_LEN: usize = 512;

/// Read a DNS message from a TCP stream.
///
/// A DNS TCP message is slightly different to a DNS UDP message: it
/// has a big-endian u16 prefix giving the total length of the
/// message.  This is redundant (since the header is fixed-size and
/// says how many fields there are, and the fields contain length
/// information), but it means the entire message can be read before
/// parsing begins.
pub async fn read_tcp_bytes(stream: &mut TcpStream) -> Result<BytesMut, TcpError> {
    let expected = stream
        .read_u16()
        .await
        .map_err(|error| TcpError::IO { id: None, error })?;
    let expected = usize::from(expected);

    let mut bytes = BytesMut::with_capacity(expected);
    while bytes.len() < expected {
        match stream.read_buf(&mut bytes).await {
            Ok(0) => {
                return Err(TcpError::TooShort {
                    id: message_id(&bytes),
                    expected,
                    actual: bytes.len(),
                })
            }
            Ok(_) => (),
            Err(error) => {
                return Err(TcpError::IO {
                    id: message_id(&bytes),
                    error,
                })
            }
        }
    }

    Ok(bytes)
}

fn message_id(bytes: &[u8]) -> Option<u16> {
    if bytes.len() >= 2 {
        Some(u16::from_be_bytes([bytes[0], bytes[1]]))
    } else {
        None
    }
}

/// An error that can occur when reading a DNS TCP message.
#[derive(Debug)]
pub enum TcpError {
    TooShort {
        id: Option<u16>,
        expected: usize,
        actual: usize,
    },
    IO {
        id: Option<u16>,
        error: io::Error,
    },
}

impl fmt::Display for TcpError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TcpError::TooShort {
                expected, actual, ..
            } => write!(f, "connection closed after {actual} of {expected} octets"),
            TcpError::IO { error, .. } => write!(f, "{error}"),
        }
    }
}

impl std::error::Error for TcpError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TcpError::TooShort { .. } => None,
            TcpError::IO { error, .. } => Some(error),
        }
    }
}

/// Write a serialised message to a connected UDP socket.  This sets
/// or clears the TC flag as appropriate.
pub async fn send_udp_bytes(sock: &UdpSocket, bytes: &mut [u8]) -> Result<(), io::Error> {
    check_header(bytes)?;

    if bytes.len() > UDP_MESSAGE_MAX_LEN {
        set_truncated(bytes, true);
        sock.send(&bytes[..UDP_MESSAGE_MAX_LEN]).await?;
    } else {
        set_truncated(bytes, false);
        sock.send(bytes).await?;
    }

    Ok(())
}

/// Write a serialised message to a TCP channel.  This sends a
/// two-byte length prefix (big-endian u16) and sets or clears the TC
/// flag as appropriate.
pub async fn send_tcp_bytes(stream: &mut TcpStream, bytes: &mut [u8]) -> Result<(), io::Error> {
    check_header(bytes)?;

    let len = if let Ok(len) = u16::try_from(bytes.len()) {
        set_truncated(bytes, false);
        len
    } else {
        set_truncated(bytes, true);
        u16::MAX
    };

    stream.write_all(&len.to_be_bytes()).await?;
    stream.write_all(&bytes[..usize::from(len)]).await?;

    Ok(())
}

/// Flip the TC flag of an already-serialised message.
fn set_truncated(bytes: &mut [u8], truncated: bool) {
    let mut flags = Flags::from_bits(u16::from_be_bytes([bytes[2], bytes[3]]));
    flags.set_truncated(truncated);
    bytes[2..4].copy_from_slice(&flags.bits().to_be_bytes());
}

fn check_header(bytes: &[u8]) -> Result<(), io::Error> {
    if bytes.len() < HEADER_LEN {
        tracing::error!(length = %bytes.len(), "message too short");
        Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "message shorter than a DNS header",
        ))
    } else {
        Ok(())
    }
}
