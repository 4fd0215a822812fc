//! The API/RPC receive thread (spec §5): terminates external requests and
//! forwards them as commands. The socket's own wire format is out of
//! scope (spec §1: "the facade's own wire format ... packaging [is] out
//! of scope"); this is the line-oriented stand-in a local caller (CLI,
//! future real RPC transport) speaks against `mlag-ffi::Handle` directly.
use std::io::{BufRead, BufReader, Write};
use std::net::{SocketAddr, TcpListener};
use std::thread;
use std::time::Duration;

use mlag_common::ids::IplId;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Run the control socket until `stop` is disconnected.
pub fn run(addr: SocketAddr, handle: mlag_ffi::Handle, stop: crossbeam_channel::Receiver<()>) {
    let listener = match TcpListener::bind(addr) {
        Ok(l) => l,
        Err(e) => {
            log::error!(target: "mlag::control", "failed to bind {addr}: {e}");
            return;
        }
    };
    if let Err(e) = listener.set_nonblocking(true) {
        log::error!(target: "mlag::control", "failed to set nonblocking: {e}");
        return;
    }
    log::info!(target: "mlag::control", "control socket listening on {addr}");

    loop {
        match listener.accept() {
            Ok((stream, peer_addr)) => {
                let handle = handle.clone();
                if let Err(e) = service(stream, &handle) {
                    log::debug!(target: "mlag::control", "{peer_addr}: {e}");
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                if matches!(stop.try_recv(), Err(crossbeam_channel::TryRecvError::Disconnected)) {
                    break;
                }
                thread::sleep(POLL_INTERVAL);
            }
            Err(e) => {
                log::warn!(target: "mlag::control", "accept failed: {e}");
                thread::sleep(POLL_INTERVAL);
            }
        }
    }
    log::info!(target: "mlag::control", "control socket stopped");
}

fn service(stream: std::net::TcpStream, handle: &mlag_ffi::Handle) -> std::io::Result<()> {
    let mut writer = stream.try_clone()?;
    let mut lines = BufReader::new(stream).lines();

    while let Some(line) = lines.next() {
        let line = line?;
        let reply = dispatch(line.trim(), handle);
        writeln!(writer, "{reply}")?;
    }
    Ok(())
}

fn dispatch(line: &str, handle: &mlag_ffi::Handle) -> String {
    let mut parts = line.split_whitespace();
    let Some(cmd) = parts.next() else {
        return "ERR -22 empty command".into();
    };

    let result = match cmd {
        "start" => handle.start().map(|()| "OK".to_string()),
        "stop" => handle.stop().map(|()| "OK".to_string()),
        "peer_add" => parse_ip(parts.next()).and_then(|ip| handle.peer_add(ip)).map(|()| "OK".to_string()),
        "peer_delete" => parse_ip(parts.next()).and_then(|ip| handle.peer_delete(ip)).map(|()| "OK".to_string()),
        "set_reload_delay_ms" => parse_u32(parts.next())
            .and_then(|ms| handle.set_reload_delay_ms(ms))
            .map(|()| "OK".to_string()),
        "ipl_create" => handle.ipl_create().map(|id| format!("OK {id}")),
        "ipl_delete" => parse_u32(parts.next())
            .and_then(|n| handle.ipl_delete(IplId(n as usize)))
            .map(|()| "OK".to_string()),
        "snapshot" => handle.snapshot().map(|s| format!("OK {:?}", s.role)),
        other => return format!("ERR -22 unknown command {other}"),
    };

    match result {
        Ok(text) => text,
        Err(e) => format!("ERR {} {e}", e.code()),
    }
}

fn parse_ip(arg: Option<&str>) -> mlag_ffi::Result<std::net::Ipv4Addr> {
    arg.and_then(|s| s.parse().ok())
        .ok_or_else(|| mlag_ffi::FacadeError(mlag_common::error::Error::invalid("bad ip argument")))
}

fn parse_u32(arg: Option<&str>) -> mlag_ffi::Result<u32> {
    arg.and_then(|s| s.parse().ok())
        .ok_or_else(|| mlag_ffi::FacadeError(mlag_common::error::Error::invalid("bad integer argument")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_ip_rejects_garbage() {
        assert!(parse_ip(Some("not-an-ip")).is_err());
        assert!(parse_ip(None).is_err());
        assert_eq!(
            parse_ip(Some("10.0.0.1")).unwrap(),
            std::net::Ipv4Addr::new(10, 0, 0, 1)
        );
    }

    #[test]
    fn parse_u32_rejects_garbage() {
        assert!(parse_u32(Some("not-a-number")).is_err());
        assert!(parse_u32(Some("-1")).is_err());
        assert_eq!(parse_u32(Some("42")).unwrap(), 42);
    }

    #[test]
    fn dispatch_rejects_empty_and_unknown_commands() {
        let (tx, _rx) = crossbeam_channel::unbounded();
        let handle = mlag_ffi::Handle::new(tx, test_waker());
        assert_eq!(dispatch("", &handle), "ERR -22 empty command");
        assert!(dispatch("frobnicate", &handle).starts_with("ERR -22 unknown command"));
    }

    fn test_waker() -> mlag_net::WakeHandle {
        mlag_net::Reactor::<mlag_common::time::SystemClock, ()>::new(
            mlag_common::time::SystemClock,
            crossbeam_channel::unbounded().1,
        )
        .expect("reactor for test waker")
        .waker()
    }
}
