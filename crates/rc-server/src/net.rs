//! Local network address discovery for the startup banner.

use std::net::{IpAddr, Ipv4Addr, UdpSocket};

/// Best-effort LAN address of this host.
///
/// Connecting a UDP socket sends nothing but makes the OS pick the outbound
/// interface, whose address is then read back. Falls back to loopback when
/// there is no route.
pub fn local_ip() -> IpAddr {
    outbound_ip().unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST))
}

fn outbound_ip() -> std::io::Result<IpAddr> {
    let socket = UdpSocket::bind("0.0.0.0:0")?;
    socket.connect("8.8.8.8:80")?;
    Ok(socket.local_addr()?.ip())
}
