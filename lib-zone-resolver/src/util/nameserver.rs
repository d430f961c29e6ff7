use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::{TcpStream, UdpSocket};
use tokio::time::timeout;

use dns_types::protocol::types::*;

use crate::client::QueryError;
use crate::util::net::{read_tcp_bytes, send_tcp_bytes, send_udp_bytes, UDP_MESSAGE_MAX_LEN};

/// Send a message to a remote nameserver over UDP, returning the
/// response.  The response is NOT validated: consumers MUST check it
/// with `response_matches_request` before using it!
pub async fn query_nameserver_udp(
    address: SocketAddr,
    query_timeout: Duration,
    serialised_request: &mut [u8],
) -> Result<Message, QueryError> {
    timeout(
        query_timeout,
        query_nameserver_udp_notimeout(address, serialised_request),
    )
    .await
    .unwrap_or(Err(QueryError::Timeout))
}

/// Timeout-less version of `query_nameserver_udp`.
async fn query_nameserver_udp_notimeout(
    address: SocketAddr,
    serialised_request: &mut [u8],
) -> Result<Message, QueryError> {
    if serialised_request.len() > UDP_MESSAGE_MAX_LEN {
        return Err(QueryError::Truncated);
    }

    let bind_address = if address.is_ipv4() {
        "0.0.0.0:0"
    } else {
        "[::]:0"
    };

    let mut buf = vec![0u8; UDP_MESSAGE_MAX_LEN];
    let sock = UdpSocket::bind(bind_address).await.map_err(QueryError::Io)?;
    sock.connect(address).await.map_err(QueryError::Io)?;
    send_udp_bytes(&sock, serialised_request)
        .await
        .map_err(QueryError::Io)?;
    let size = sock.recv(&mut buf).await.map_err(QueryError::Io)?;

    Message::from_octets(&buf[..size]).map_err(QueryError::Malformed)
}

/// Send a message to a remote nameserver over TCP, returning the
/// response.  This has the same caveats as `query_nameserver_udp`.
pub async fn query_nameserver_tcp(
    address: SocketAddr,
    query_timeout: Duration,
    serialised_request: &mut [u8],
) -> Result<Message, QueryError> {
    timeout(
        query_timeout,
        query_nameserver_tcp_notimeout(address, serialised_request),
    )
    .await
    .unwrap_or(Err(QueryError::Timeout))
}

/// Timeout-less version of `query_nameserver_tcp`.
async fn query_nameserver_tcp_notimeout(
    address: SocketAddr,
    serialised_request: &mut [u8],
) -> Result<Message, QueryError> {
    let mut stream = TcpStream::connect(address).await.map_err(QueryError::Io)?;
    send_tcp_bytes(&mut stream, serialised_request)
        .await
        .map_err(QueryError::Io)?;
    let bytes = read_tcp_bytes(&mut stream).await.map_err(QueryError::Tcp)?;

    Message::from_octets(bytes.as_ref()).map_err(QueryError::Malformed)
}

/// Very basic validation that a nameserver response matches a
/// message:
///
/// - Check the ID, opcode, and questions match the question.
///
/// - Check it is a response.
///
/// Truncation and the rcode are left to the caller, since a name
/// error is a perfectly good answer to a recursive query.
pub fn response_matches_request(request: &Message, response: &Message) -> bool {
    if request.header.id != response.header.id {
        return false;
    }
    if !response.header.flags.is_response() {
        return false;
    }
    if request.header.flags.opcode() != response.header.flags.opcode() {
        return false;
    }
    if request.questions != response.questions {
        return false;
    }

    true
}


#[cfg(test)]
pub mod test_util {
    use dns_types::protocol::types::test_util::*;
    use dns_types::test_util::domain;
    use std::net::Ipv4Addr;

    use super::*;

    pub fn matching_nameserver_response() -> (Message, Message) {
        nameserver_response(
            "www.example.com.",
            RecordType::A,
            &[wire_a_record("www.example.com.", Ipv4Addr::new(1, 1, 1, 1))],
            &[],
            &[],
        )
    }

    pub fn wire_a_record_for(request: &Message) -> WireRecord {
        WireRecord::new(
            request.questions[0].name.clone(),
            RecordData::A {
                address: Ipv4Addr::new(192, 0, 2, 1),
            },
        )
    }

    pub fn nameserver_response(
        name: &str,
        qtype: RecordType,
        answers: &[WireRecord],
        authority: &[WireRecord],
        additional: &[WireRecord],
    ) -> (Message, Message) {
        let request = Message::recursive_query(
            1234,
            Question {
                name: domain(name),
                qtype,
                qclass: RecordClass::IN,
            },
        );

        let mut response = Message::reply_to(&request);
        response.answers = answers.into();
        response.authority = authority.into();
        response.additional = additional.into();

        (request, response)
    }
}
