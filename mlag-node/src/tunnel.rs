//! The tunneling dispatcher thread (spec §5): owns the IGMP trap socket
//! and a parallel transport endpoint on a different TCP port, sharing no
//! mutable state with the mlag dispatcher beyond a read-only peer-registry
//! snapshot and the system-event bus. The actual tunneled-payload
//! forwarding logic belongs to the IGMP feature manager, which is out of
//! scope (spec §1): this loop validates frames against the peer registry
//! and hands them off by logging, as a feature manager would on receipt.
use std::io::Read;
use std::net::{SocketAddr, TcpListener};
use std::thread;
use std::time::Duration;

use mlag_net::wire::Decode;
use mlag_proto::wire::Message;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Run the tunneling dispatcher until `stop` is disconnected.
pub fn run(addr: SocketAddr, handle: mlag_ffi::Handle, stop: crossbeam_channel::Receiver<()>) {
    let listener = match TcpListener::bind(addr) {
        Ok(l) => l,
        Err(e) => {
            log::error!(target: "mlag::tunnel", "failed to bind {addr}: {e}");
            return;
        }
    };
    if let Err(e) = listener.set_nonblocking(true) {
        log::error!(target: "mlag::tunnel", "failed to set nonblocking: {e}");
        return;
    }
    log::info!(target: "mlag::tunnel", "tunneling dispatcher listening on {addr}");

    loop {
        match listener.accept() {
            Ok((stream, peer_addr)) => {
                let handle = handle.clone();
                service(stream, peer_addr, &handle);
            }
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                if matches!(stop.try_recv(), Err(crossbeam_channel::TryRecvError::Disconnected)) {
                    break;
                }
                thread::sleep(POLL_INTERVAL);
            }
            Err(e) => {
                log::warn!(target: "mlag::tunnel", "accept failed: {e}");
                thread::sleep(POLL_INTERVAL);
            }
        }
    }
    log::info!(target: "mlag::tunnel", "tunneling dispatcher stopped");
}

fn service(mut stream: std::net::TcpStream, peer_addr: SocketAddr, handle: &mlag_ffi::Handle) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = match stream.read(&mut chunk) {
            Ok(0) => return,
            Ok(n) => n,
            Err(e) => {
                log::debug!(target: "mlag::tunnel", "{peer_addr}: read error: {e}");
                return;
            }
        };
        buf.extend_from_slice(&chunk[..n]);

        while let Some((msg, consumed)) = Message::decode(&buf) {
            match msg {
                Message::IgmpMessage(igmp) => {
                    if let Ok(snapshot) = handle.snapshot() {
                        let known = snapshot
                            .peers
                            .peers
                            .iter()
                            .any(|(_, p)| p.mlag_id.0 as u32 == igmp.sending_peer_id);
                        if known {
                            log::debug!(
                                target: "mlag::tunnel",
                                "{peer_addr}: tunneled {} bytes from peer {}",
                                igmp.buffer.len(),
                                igmp.sending_peer_id,
                            );
                        } else {
                            log::warn!(
                                target: "mlag::tunnel",
                                "{peer_addr}: dropping tunneled frame from unknown peer {}",
                                igmp.sending_peer_id,
                            );
                        }
                    }
                }
                other => {
                    log::warn!(target: "mlag::tunnel", "{peer_addr}: unexpected {other:?} on tunnel port");
                }
            }
            buf.drain(..consumed);
        }
    }
}
