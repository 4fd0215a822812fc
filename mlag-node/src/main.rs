use std::net::Ipv4Addr;
use std::time::Duration;

use argh::FromArgs;
use mlag_node::Config;

/// Run the mlag peer-coordination daemon.
#[derive(FromArgs)]
struct Options {
    /// this node's own IPL ip
    #[argh(option)]
    local_ip: Option<Ipv4Addr>,

    /// the peer's IPL ip
    #[argh(option)]
    peer_ip: Option<Ipv4Addr>,

    /// peer transport TCP port (default 7000)
    #[argh(option, default = "7000")]
    listen_port: u16,

    /// tunneling dispatcher TCP port (default 7001)
    #[argh(option, default = "7001")]
    tunnel_port: u16,

    /// control socket TCP port (default 7002)
    #[argh(option, default = "7002")]
    control_port: u16,

    /// reload-delay window, in milliseconds (default 30000)
    #[argh(option, default = "30_000")]
    reload_delay_ms: u64,
}

fn main() {
    env_logger::init();

    let opts: Options = argh::from_env();
    let config = Config {
        local_ip: opts.local_ip,
        peer_ip: opts.peer_ip,
        listen_port: opts.listen_port,
        tunnel_port: opts.tunnel_port,
        control_port: opts.control_port,
        reload_delay: Duration::from_millis(opts.reload_delay_ms),
        ..Config::default()
    };

    if let Err(e) = mlag_node::run(config) {
        log::error!("fatal: {e}");
        std::process::exit(1);
    }
}
