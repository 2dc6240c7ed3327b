//! UDP discovery packet framing.
//!
//! Every datagram is `hash(32) || sig(65) || type(1) || [magic] ||
//! rlp(payload)`: the signature covers everything after itself, and the
//! hash covers the signature and the content. Aqua networks prefix the
//! payload with the four-byte `"aqua"` magic and use a dedicated
//! type-byte range; the eth-compatibility mode (chain id 1) keeps the
//! legacy bytes and no magic.

use std::time::Duration;

use alloy_primitives::{keccak256, Bytes, B512};
use alloy_rlp::{Decodable, RlpDecodable, RlpEncodable};
use aquachain_crypto::{recover_pubkey, SecretKey, SIGNATURE_LENGTH};

use crate::{P2pError, Result};

/// Maximum datagram size.
pub const MAX_PACKET_SIZE: usize = 1280;

/// How long to wait for a reply to a discovery request.
pub const RESP_TIMEOUT: Duration = Duration::from_secs(4);

const MAC_SIZE: usize = 32;
const HEAD_SIZE: usize = MAC_SIZE + SIGNATURE_LENGTH;

const AQUA_MAGIC: &[u8] = b"aqua";

// legacy type bytes; zero is reserved
const ETH_PING: u8 = 1;
const ETH_NEIGHBORS: u8 = 4;
// aqua type bytes live in their own range
const AQUA_PING: u8 = 134;
const AQUA_PONG: u8 = 135;
const AQUA_FINDNODE: u8 = 136;
const AQUA_NEIGHBORS: u8 = 137;
const AQUA_RANGE_OFFSET: u8 = 133;

/// A node's identity: the 64-byte uncompressed public key without the
/// SEC1 prefix.
pub type NodeId = B512;

/// A network endpoint as carried in discovery payloads: raw ip bytes
/// (4 or 16), discovery port, protocol port.
#[derive(Debug, Clone, Default, PartialEq, Eq, RlpEncodable, RlpDecodable)]
pub struct Endpoint {
    /// IP address bytes, 4 for v4 or 16 for v6.
    pub ip: Bytes,
    /// UDP (discovery) port.
    pub udp: u16,
    /// TCP (protocol) port.
    pub tcp: u16,
}

/// Ping request.
#[derive(Debug, Clone, PartialEq, Eq, RlpEncodable, RlpDecodable)]
pub struct Ping {
    /// Discovery protocol version.
    pub version: u32,
    /// Sender endpoint.
    pub from: Endpoint,
    /// Receiver endpoint as seen by the sender.
    pub to: Endpoint,
    /// Absolute unix time after which the packet is invalid.
    pub expiration: u64,
}

/// Pong reply; `reply_tok` echoes the hash of the answered ping.
#[derive(Debug, Clone, PartialEq, Eq, RlpEncodable, RlpDecodable)]
pub struct Pong {
    /// Mirror of the ping's UDP envelope address.
    pub to: Endpoint,
    /// Hash of the ping packet being answered.
    pub reply_tok: Bytes,
    /// Absolute unix time after which the packet is invalid.
    pub expiration: u64,
}

/// Query for nodes close to a target.
#[derive(Debug, Clone, PartialEq, Eq, RlpEncodable, RlpDecodable)]
pub struct FindNode {
    /// The queried target; need not be a live key.
    pub target: NodeId,
    /// Absolute unix time after which the packet is invalid.
    pub expiration: u64,
}

/// One node in a neighbors reply.
#[derive(Debug, Clone, PartialEq, Eq, RlpEncodable, RlpDecodable)]
pub struct NodeRecord {
    /// IP address bytes.
    pub ip: Bytes,
    /// Discovery port.
    pub udp: u16,
    /// Protocol port.
    pub tcp: u16,
    /// Node identity.
    pub id: NodeId,
}

/// Reply to [`FindNode`].
#[derive(Debug, Clone, PartialEq, Eq, RlpEncodable, RlpDecodable)]
pub struct Neighbors {
    /// Nodes close to the queried target.
    pub nodes: Vec<NodeRecord>,
    /// Absolute unix time after which the packet is invalid.
    pub expiration: u64,
}

/// Any discovery packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoverPacket {
    /// Liveness probe.
    Ping(Ping),
    /// Probe reply.
    Pong(Pong),
    /// Node lookup.
    FindNode(FindNode),
    /// Lookup reply.
    Neighbors(Neighbors),
}

impl DiscoverPacket {
    fn aqua_type(&self) -> u8 {
        match self {
            DiscoverPacket::Ping(_) => AQUA_PING,
            DiscoverPacket::Pong(_) => AQUA_PONG,
            DiscoverPacket::FindNode(_) => AQUA_FINDNODE,
            DiscoverPacket::Neighbors(_) => AQUA_NEIGHBORS,
        }
    }

    fn encode_payload(&self) -> Vec<u8> {
        match self {
            DiscoverPacket::Ping(p) => alloy_rlp::encode(p),
            DiscoverPacket::Pong(p) => alloy_rlp::encode(p),
            DiscoverPacket::FindNode(p) => alloy_rlp::encode(p),
            DiscoverPacket::Neighbors(p) => alloy_rlp::encode(p),
        }
    }

    /// The packet's expiration timestamp.
    pub fn expiration(&self) -> u64 {
        match self {
            DiscoverPacket::Ping(p) => p.expiration,
            DiscoverPacket::Pong(p) => p.expiration,
            DiscoverPacket::FindNode(p) => p.expiration,
            DiscoverPacket::Neighbors(p) => p.expiration,
        }
    }
}

/// Which framing variant a chain uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketFormat {
    /// `"aqua"` magic plus the aqua type-byte range.
    Aqua,
    /// Legacy type bytes, no magic (chain id 1).
    EthCompat,
}

impl PacketFormat {
    /// The framing a chain id mandates.
    pub fn for_chain(chain_id: u64) -> Self {
        if chain_id == 1 {
            PacketFormat::EthCompat
        } else {
            PacketFormat::Aqua
        }
    }

    fn magic(&self) -> &'static [u8] {
        match self {
            PacketFormat::Aqua => AQUA_MAGIC,
            PacketFormat::EthCompat => &[],
        }
    }

    fn type_byte(&self, packet: &DiscoverPacket) -> u8 {
        let aqua = packet.aqua_type();
        match self {
            PacketFormat::Aqua => aqua,
            PacketFormat::EthCompat => aqua - AQUA_RANGE_OFFSET,
        }
    }
}

/// Frame, sign and hash a discovery packet. Returns the datagram and
/// its hash (the pong reply token).
pub fn encode_packet(
    key: &SecretKey,
    format: PacketFormat,
    packet: &DiscoverPacket,
) -> Result<(Vec<u8>, alloy_primitives::B256)> {
    let payload = packet.encode_payload();
    let magic = format.magic();

    let mut out = Vec::with_capacity(HEAD_SIZE + 1 + magic.len() + payload.len());
    out.resize(HEAD_SIZE, 0);
    out.push(format.type_byte(packet));
    out.extend_from_slice(magic);
    out.extend_from_slice(&payload);

    if out.len() >= MAX_PACKET_SIZE {
        return Err(P2pError::PacketTooLarge(out.len()));
    }

    let sig = key
        .sign_hash(&keccak256(&out[HEAD_SIZE..]))
        .map_err(|_| P2pError::BadSignature)?;
    out[MAC_SIZE..HEAD_SIZE].copy_from_slice(&sig);

    let hash = keccak256(&out[MAC_SIZE..]);
    out[..MAC_SIZE].copy_from_slice(hash.as_slice());
    Ok((out, hash))
}

/// Verify and decode a discovery datagram into its packet, the
/// sender's node id and the packet hash.
pub fn decode_packet(
    format: PacketFormat,
    buf: &[u8],
) -> Result<(DiscoverPacket, NodeId, alloy_primitives::B256)> {
    if buf.len() < HEAD_SIZE + 1 {
        return Err(P2pError::PacketTooSmall);
    }
    if buf.len() > MAX_PACKET_SIZE {
        return Err(P2pError::PacketTooLarge(buf.len()));
    }
    let (hash, rest) = buf.split_at(MAC_SIZE);
    let (sig, sigdata) = rest.split_at(SIGNATURE_LENGTH);

    if keccak256(rest).as_slice() != hash {
        return Err(P2pError::BadHash);
    }

    let sig: &[u8; SIGNATURE_LENGTH] = sig.try_into().expect("split at signature length");
    let pubkey =
        recover_pubkey(&keccak256(sigdata), sig).map_err(|_| P2pError::BadSignature)?;
    let node_id = NodeId::from_slice(&pubkey[1..]);

    let mut ptype = sigdata[0];
    if format == PacketFormat::EthCompat && (ETH_PING..=ETH_NEIGHBORS).contains(&ptype) {
        ptype += AQUA_RANGE_OFFSET;
    }
    let body = &sigdata[1 + format.magic().len()..];

    let packet = match ptype {
        AQUA_PING => DiscoverPacket::Ping(decode_payload(body)?),
        AQUA_PONG => DiscoverPacket::Pong(decode_payload(body)?),
        AQUA_FINDNODE => DiscoverPacket::FindNode(decode_payload(body)?),
        AQUA_NEIGHBORS => DiscoverPacket::Neighbors(decode_payload(body)?),
        other => return Err(P2pError::UnknownPacketType(other)),
    };
    Ok((packet, node_id, alloy_primitives::B256::from_slice(hash)))
}

fn decode_payload<T: Decodable>(mut body: &[u8]) -> Result<T> {
    T::decode(&mut body).map_err(|e| P2pError::Malformed(e.to_string()))
}

/// Reject packets whose expiration has passed.
pub fn check_expiration(expiration: u64, now: u64) -> Result<()> {
    if expiration < now {
        return Err(P2pError::Expired);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;

    fn sample_ping() -> DiscoverPacket {
        DiscoverPacket::Ping(Ping {
            version: 4,
            from: Endpoint {
                ip: Bytes::from_static(&[127, 0, 0, 1]),
                udp: 21_303,
                tcp: 21_303,
            },
            to: Endpoint {
                ip: Bytes::from_static(&[10, 0, 0, 2]),
                udp: 21_000,
                tcp: 0,
            },
            expiration: 1_700_000_000,
        })
    }

    #[test]
    fn test_roundtrip_aqua_format() {
        let key = SecretKey::generate(&mut OsRng);
        let packet = sample_ping();
        let (datagram, hash) = encode_packet(&key, PacketFormat::Aqua, &packet).unwrap();

        // magic sits right after the frame and the type byte
        assert_eq!(&datagram[HEAD_SIZE + 1..HEAD_SIZE + 5], b"aqua");

        let (decoded, node_id, decoded_hash) =
            decode_packet(PacketFormat::Aqua, &datagram).unwrap();
        assert_eq!(decoded, packet);
        assert_eq!(decoded_hash, hash);
        assert_eq!(node_id.as_slice(), &key.public_key()[1..]);
    }

    #[test]
    fn test_roundtrip_eth_compat_format() {
        let key = SecretKey::generate(&mut OsRng);
        let packet = sample_ping();
        let (datagram, _) = encode_packet(&key, PacketFormat::EthCompat, &packet).unwrap();

        // legacy type byte, no magic
        assert_eq!(datagram[HEAD_SIZE], ETH_PING);

        let (decoded, _, _) = decode_packet(PacketFormat::EthCompat, &datagram).unwrap();
        assert_eq!(decoded, packet);
    }

    #[test]
    fn test_tampered_packet_rejected() {
        let key = SecretKey::generate(&mut OsRng);
        let (mut datagram, _) = encode_packet(&key, PacketFormat::Aqua, &sample_ping()).unwrap();

        // flipping payload bytes breaks the hash
        let last = datagram.len() - 1;
        datagram[last] ^= 0xff;
        assert_eq!(
            decode_packet(PacketFormat::Aqua, &datagram),
            Err(P2pError::BadHash)
        );
    }

    #[test]
    fn test_truncated_packet_rejected() {
        assert_eq!(
            decode_packet(PacketFormat::Aqua, &[0u8; 10]),
            Err(P2pError::PacketTooSmall)
        );
    }

    #[test]
    fn test_neighbors_roundtrip() {
        let key = SecretKey::generate(&mut OsRng);
        let packet = DiscoverPacket::Neighbors(Neighbors {
            nodes: vec![NodeRecord {
                ip: Bytes::from_static(&[192, 168, 0, 1]),
                udp: 21_000,
                tcp: 21_303,
                id: NodeId::repeat_byte(0x11),
            }],
            expiration: 1_700_000_000,
        });
        let (datagram, _) = encode_packet(&key, PacketFormat::Aqua, &packet).unwrap();
        let (decoded, _, _) = decode_packet(PacketFormat::Aqua, &datagram).unwrap();
        assert_eq!(decoded, packet);
    }

    #[test]
    fn test_format_by_chain_id() {
        assert_eq!(PacketFormat::for_chain(1), PacketFormat::EthCompat);
        assert_eq!(PacketFormat::for_chain(61_717_561), PacketFormat::Aqua);
    }

    #[test]
    fn test_expiration() {
        assert!(check_expiration(100, 50).is_ok());
        assert_eq!(check_expiration(100, 101), Err(P2pError::Expired));
    }
}
