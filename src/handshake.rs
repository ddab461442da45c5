use crate::priv_prelude::*;

/// Every handshake datagram starts with these bytes. Anything else is data.
pub const TAG: &[u8] = b"HELLO ";

/// An endpoint's announcement of the port its peer is listening on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handshake {
    peer_port: i64,
}

/// What a received datagram turned out to be.
#[derive(Debug, PartialEq, Eq)]
pub enum Message<'a> {
    /// A well-formed handshake.
    Handshake(Handshake),
    /// Starts with the handshake tag but the port isn't a number.
    MalformedHandshake,
    /// Opaque payload to be forwarded untouched.
    Data(&'a [u8]),
}

impl Handshake {
    /// Create a handshake declaring `peer_port`.
    pub fn new(peer_port: u16) -> Handshake {
        Handshake { peer_port: i64::from(peer_port) }
    }

    /// The declared peer port. Endpoints may declare numbers which aren't valid ports, in which
    /// case this returns `None` and the endpoint will never pair.
    pub fn peer_port(&self) -> Option<u16> {
        u16::try_from(self.peer_port).ok()
    }

    /// Whether this handshake names `addr` as the peer.
    pub fn declares(&self, addr: SocketAddr) -> bool {
        self.peer_port == i64::from(addr.port())
    }

    /// Serialize the handshake the way endpoints send it.
    pub fn encode(&self) -> Bytes {
        Bytes::from(format!("HELLO {}", self.peer_port))
    }

    fn parse_port(suffix: &[u8]) -> Option<i64> {
        let text: String = {
            suffix
            .iter()
            .copied()
            .filter(u8::is_ascii)
            .map(char::from)
            .collect()
        };
        text.trim().parse::<i64>().ok()
    }
}

impl fmt::Display for Handshake {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "HELLO {}", self.peer_port)
    }
}

/// Work out whether `payload` is a handshake or data.
pub fn classify(payload: &[u8]) -> Message<'_> {
    match payload.strip_prefix(TAG) {
        None => Message::Data(payload),
        Some(suffix) => match Handshake::parse_port(suffix) {
            Some(peer_port) => Message::Handshake(Handshake { peer_port }),
            None => Message::MalformedHandshake,
        },
    }
}

/// Build the handshake datagram announcing `peer_port`.
pub fn encode(peer_port: u16) -> Bytes {
    Handshake::new(peer_port).encode()
}
