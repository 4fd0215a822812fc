//! Wire messages exchanged over the peer transport (spec §6): a 16-bit
//! big-endian opcode header followed by an opcode-specific payload, every
//! field in network byte order.
use mlag_net::wire::{peek_opcode, Decode, Encode};

const OPCODE_PEER_START: u16 = 1;
const OPCODE_PEER_ENABLE: u16 = 2;
const OPCODE_IGMP_MESSAGE: u16 = 3;

fn put_u32(buf: &mut Vec<u8>, v: u32) {
    buf.extend_from_slice(&v.to_be_bytes());
}

fn put_u64(buf: &mut Vec<u8>, v: u64) {
    buf.extend_from_slice(&v.to_be_bytes());
}

fn get_u32(buf: &[u8]) -> Option<u32> {
    buf.get(..4).map(|b| u32::from_be_bytes(b.try_into().unwrap()))
}

fn get_u64(buf: &[u8]) -> Option<u64> {
    buf.get(..8).map(|b| u64::from_be_bytes(b.try_into().unwrap()))
}

/// `PEER_START { mlag_id, health_state }` (spec §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeerStart {
    /// The sender's negotiated mlag_id.
    pub mlag_id: u32,
    /// The sender's current health state.
    pub health_state: u32,
}

/// `PEER_ENABLE { mlag_id, state }` (spec §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeerEnable {
    /// The sender's negotiated mlag_id.
    pub mlag_id: u32,
    /// The enable state being announced.
    pub state: u32,
}

/// `IGMP_MESSAGE { opcode, sending_peer_id, trap_id, source_port, is_mlag,
/// size, buffer[size] }` (spec §6). The trailing `buffer` is tunneled
/// opaquely and is not byte-swapped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IgmpMessage {
    /// The tunneled protocol's own opcode, passed through unexamined.
    pub opcode: u32,
    /// The peer id that originated this frame.
    pub sending_peer_id: u32,
    /// The IGMP snooping trap id.
    pub trap_id: u32,
    /// The hardware port the frame was trapped from.
    pub source_port: u32,
    /// Non-zero if the frame should be treated as already having crossed
    /// the MLAG link once.
    pub is_mlag: u32,
    /// The tunneled frame, verbatim.
    pub buffer: Vec<u8>,
}

/// Every message the peer transport can carry (spec §6).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// See [`PeerStart`].
    PeerStart(PeerStart),
    /// See [`PeerEnable`].
    PeerEnable(PeerEnable),
    /// See [`IgmpMessage`].
    IgmpMessage(IgmpMessage),
    /// An opcode this core doesn't own (spec §6: "others belong to feature
    /// managers"). Carries only the header so the stream can keep moving
    /// (spec §4.3: "Unknown opcodes are logged and dropped, not fatal");
    /// the core never constructs one to send.
    Unknown(u16),
}

impl Encode for Message {
    fn encode(&self, buf: &mut Vec<u8>) {
        match self {
            Message::PeerStart(m) => {
                buf.extend_from_slice(&OPCODE_PEER_START.to_be_bytes());
                put_u32(buf, m.mlag_id);
                put_u32(buf, m.health_state);
            }
            Message::PeerEnable(m) => {
                buf.extend_from_slice(&OPCODE_PEER_ENABLE.to_be_bytes());
                put_u32(buf, m.mlag_id);
                put_u32(buf, m.state);
            }
            Message::IgmpMessage(m) => {
                buf.extend_from_slice(&OPCODE_IGMP_MESSAGE.to_be_bytes());
                put_u32(buf, m.opcode);
                put_u32(buf, m.sending_peer_id);
                put_u32(buf, m.trap_id);
                put_u32(buf, m.source_port);
                put_u32(buf, m.is_mlag);
                put_u64(buf, m.buffer.len() as u64);
                buf.extend_from_slice(&m.buffer);
            }
            Message::Unknown(opcode) => {
                buf.extend_from_slice(&opcode.to_be_bytes());
            }
        }
    }
}

impl Decode for Message {
    fn decode(buf: &[u8]) -> Option<(Self, usize)> {
        let opcode = peek_opcode(buf)?;
        let body = &buf[2..];
        match opcode {
            OPCODE_PEER_START => {
                let mlag_id = get_u32(body)?;
                let health_state = get_u32(body.get(4..)?)?;
                Some((
                    Message::PeerStart(PeerStart { mlag_id, health_state }),
                    2 + 8,
                ))
            }
            OPCODE_PEER_ENABLE => {
                let mlag_id = get_u32(body)?;
                let state = get_u32(body.get(4..)?)?;
                Some((Message::PeerEnable(PeerEnable { mlag_id, state }), 2 + 8))
            }
            OPCODE_IGMP_MESSAGE => {
                let opcode = get_u32(body)?;
                let sending_peer_id = get_u32(body.get(4..)?)?;
                let trap_id = get_u32(body.get(8..)?)?;
                let source_port = get_u32(body.get(12..)?)?;
                let is_mlag = get_u32(body.get(16..)?)?;
                let size = get_u64(body.get(20..)?)? as usize;
                let buffer_start = 28;
                let buffer = body.get(buffer_start..buffer_start + size)?.to_vec();
                Some((
                    Message::IgmpMessage(IgmpMessage {
                        opcode,
                        sending_peer_id,
                        trap_id,
                        source_port,
                        is_mlag,
                        buffer,
                    }),
                    2 + buffer_start + size,
                ))
            }
            other => Some((Message::Unknown(other), 2)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peer_start_round_trips() {
        let msg = Message::PeerStart(PeerStart { mlag_id: 1, health_state: 1 });
        let mut buf = Vec::new();
        msg.encode(&mut buf);
        let (decoded, consumed) = Message::decode(&buf).unwrap();
        assert_eq!(decoded, msg);
        assert_eq!(consumed, buf.len());
    }

    #[test]
    fn peer_enable_round_trips() {
        let msg = Message::PeerEnable(PeerEnable { mlag_id: 0, state: 1 });
        let mut buf = Vec::new();
        msg.encode(&mut buf);
        let (decoded, consumed) = Message::decode(&buf).unwrap();
        assert_eq!(decoded, msg);
        assert_eq!(consumed, buf.len());
    }

    #[test]
    fn igmp_message_round_trips_with_buffer() {
        let msg = Message::IgmpMessage(IgmpMessage {
            opcode: 0x16,
            sending_peer_id: 1,
            trap_id: 4,
            source_port: 12,
            is_mlag: 0,
            buffer: vec![0xde, 0xad, 0xbe, 0xef, 0x01],
        });
        let mut buf = Vec::new();
        msg.encode(&mut buf);
        let (decoded, consumed) = Message::decode(&buf).unwrap();
        assert_eq!(decoded, msg);
        assert_eq!(consumed, buf.len());
    }

    #[test]
    fn decode_reports_insufficient_bytes_as_none() {
        let msg = Message::IgmpMessage(IgmpMessage {
            opcode: 1,
            sending_peer_id: 1,
            trap_id: 1,
            source_port: 1,
            is_mlag: 0,
            buffer: vec![1, 2, 3],
        });
        let mut buf = Vec::new();
        msg.encode(&mut buf);
        buf.truncate(buf.len() - 1);
        assert!(Message::decode(&buf).is_none());
    }

    proptest::proptest! {
        #[test]
        fn igmp_message_round_trip_arbitrary(
            opcode: u32, sending_peer_id: u32, trap_id: u32, source_port: u32,
            is_mlag: u32, buffer in proptest::collection::vec(proptest::prelude::any::<u8>(), 0..256),
        ) {
            let msg = Message::IgmpMessage(IgmpMessage {
                opcode, sending_peer_id, trap_id, source_port, is_mlag, buffer,
            });
            let mut buf = Vec::new();
            msg.encode(&mut buf);
            let (decoded, consumed) = Message::decode(&buf).unwrap();
            proptest::prop_assert_eq!(decoded, msg);
            proptest::prop_assert_eq!(consumed, buf.len());
        }
    }
}
