//! Wires `mlag-proto::Core` to `mlag-net`'s reactor and spawns the
//! cooperating threads spec §5 describes: the mlag dispatcher (owns the
//! reactor and all protocol state), the tunneling dispatcher (owns the
//! IGMP trap socket on a second port, read-only peer view), and the
//! API/RPC receive thread (terminates external requests, forwards them as
//! commands). The timer role (spec §5, C8) has no persistent thread of
//! its own: `Core` arms a one-shot per reload-delay/reconnect timer
//! directly (`mlag_net::timer::OneShotTimer`), each living only as long
//! as its own sleep. Grounded on `nakamoto-wallet::run`'s `t1`/`t2`/`t3`
//! thread spawns coordinating over `crossbeam-channel` and joined at
//! shutdown.
pub mod config;
pub mod control;
pub mod tunnel;

use std::net::{Ipv4Addr, SocketAddr};
use std::thread;

use mlag_common::error::Error as CoreError;
use mlag_common::time::SystemClock;
use mlag_net::Reactor;
use mlag_proto::{hal::Collaborators, manager::ManagerConfig, Command, Core};

pub use config::Config;

/// Daemon-level errors (teacher: `nakamoto_node::Error`'s
/// `#[error(transparent)] #[from]` chains).
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The core rejected a startup configuration value.
    #[error(transparent)]
    Core(#[from] CoreError),
    /// The reactor's `mio` backend failed.
    #[error(transparent)]
    Reactor(#[from] mlag_net::Error),
    /// A spawned thread panicked.
    #[error("a worker thread panicked")]
    ThreadPanic,
    /// The facade rejected a request (remapped POSIX code, spec §7).
    #[error(transparent)]
    Facade(#[from] mlag_ffi::FacadeError),
}

/// Start the daemon and block until `control::run` observes a shutdown
/// request. Returns once every spawned thread has been joined.
pub fn run(config: Config) -> Result<(), Error> {
    log::info!("initializing mlag core..");

    let (command_tx, command_rx) = crossbeam_channel::unbounded::<Command>();

    let manager_config = ManagerConfig {
        reload_delay: config.reload_delay,
        tcp_port: config.listen_port,
    };
    let mut core = Core::new(manager_config, Collaborators::default());

    if let Some(ip) = config.local_ip {
        core.configure_local_ip(ip);
    }
    if let Some(ip) = config.peer_ip {
        core.configure_peer_ip(ip);
    }

    let mut reactor: Reactor<SystemClock, Command> = Reactor::new(SystemClock, command_rx)?;
    let listen_addr: SocketAddr = (Ipv4Addr::UNSPECIFIED, config.listen_port).into();
    reactor.listen(listen_addr)?;
    log::info!("listening for peer transport on {listen_addr}");

    let waker = reactor.waker();
    let handle = mlag_ffi::Handle::new(command_tx, waker);

    log::info!("spawning worker threads..");

    // The mlag dispatcher: owns the reactor and all protocol state.
    let dispatcher = thread::spawn(move || -> Result<(), Error> {
        reactor.run(&mut core, Some(config.poll_timeout))?;
        Ok(())
    });

    // Dropped once the mlag dispatcher returns, to tell the other two
    // threads' accept loops to stop (teacher: `nakamoto-wallet::run`'s
    // `exit_tx`/`exit_rx` pair).
    let (stop_tx, stop_rx) = crossbeam_channel::bounded::<()>(0);

    // The tunneling dispatcher: owns the IGMP trap socket and a parallel
    // transport endpoint on a different port (spec §5); shares no mutable
    // state with the mlag dispatcher beyond a read-only snapshot.
    let tunnel_handle = handle.clone();
    let tunnel_addr: SocketAddr = (Ipv4Addr::UNSPECIFIED, config.tunnel_port).into();
    let tunnel_stop = stop_rx.clone();
    let tunneling = thread::spawn(move || tunnel::run(tunnel_addr, tunnel_handle, tunnel_stop));

    // The API/RPC receive thread: terminates external requests and
    // forwards them as commands (spec §1's "thin request/response API
    // facade"; the socket's own wire format is out of scope per spec §1,
    // so this speaks a minimal line-oriented stand-in protocol).
    let control_handle = handle.clone();
    let control_addr: SocketAddr = (Ipv4Addr::LOCALHOST, config.control_port).into();
    let control_stop = stop_rx;
    let api = thread::spawn(move || control::run(control_addr, control_handle, control_stop));

    handle.start()?;
    log::info!("core started");

    let dispatcher_result = dispatcher.join().map_err(|_| Error::ThreadPanic)?;
    drop(stop_tx);
    dispatcher_result?;

    tunneling.join().map_err(|_| Error::ThreadPanic)?;
    api.join().map_err(|_| Error::ThreadPanic)?;

    log::info!("all worker threads joined, exiting");
    Ok(())
}
