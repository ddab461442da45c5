use crate::priv_prelude::*;

/// Create a non-blocking UDP socket with `SO_REUSEADDR` set, bound to `addr`, and register it
/// with the current tokio runtime.
pub(crate) fn bind_udp(addr: SocketAddr) -> io::Result<tokio::net::UdpSocket> {
    let domain = match addr {
        SocketAddr::V4(..) => libc::AF_INET,
        SocketAddr::V6(..) => libc::AF_INET6,
    };
    let fd = {
        let raw_fd = unsafe {
            libc::socket(domain, libc::SOCK_DGRAM | libc::SOCK_NONBLOCK | libc::SOCK_CLOEXEC, 0)
        };
        if raw_fd < 0 {
            let err = io::Error::last_os_error();
            return Err(io::Error::new(err.kind(), format!("creating udp socket: {}", err)));
        }
        unsafe {
            OwnedFd::from_raw_fd(raw_fd)
        }
    };

    let reuse: libc::c_int = 1;
    let res = unsafe {
        libc::setsockopt(
            fd.as_raw_fd(),
            libc::SOL_SOCKET,
            libc::SO_REUSEADDR,
            &reuse as *const libc::c_int as *const libc::c_void,
            mem::size_of::<libc::c_int>() as libc::socklen_t,
        )
    };
    if res < 0 {
        let err = io::Error::last_os_error();
        return Err(io::Error::new(err.kind(), format!("setting SO_REUSEADDR: {}", err)));
    }

    let res = match addr {
        SocketAddr::V4(addr) => {
            let mut sockaddr: libc::sockaddr_in = unsafe { mem::zeroed() };
            sockaddr.sin_family = libc::AF_INET as libc::sa_family_t;
            sockaddr.sin_port = addr.port().to_be();
            sockaddr.sin_addr = libc::in_addr {
                s_addr: u32::from_ne_bytes(addr.ip().octets()),
            };
            unsafe {
                libc::bind(
                    fd.as_raw_fd(),
                    &sockaddr as *const libc::sockaddr_in as *const libc::sockaddr,
                    mem::size_of::<libc::sockaddr_in>() as libc::socklen_t,
                )
            }
        },
        SocketAddr::V6(addr) => {
            let mut sockaddr: libc::sockaddr_in6 = unsafe { mem::zeroed() };
            sockaddr.sin6_family = libc::AF_INET6 as libc::sa_family_t;
            sockaddr.sin6_port = addr.port().to_be();
            sockaddr.sin6_flowinfo = addr.flowinfo();
            sockaddr.sin6_addr = libc::in6_addr {
                s6_addr: addr.ip().octets(),
            };
            sockaddr.sin6_scope_id = addr.scope_id();
            unsafe {
                libc::bind(
                    fd.as_raw_fd(),
                    &sockaddr as *const libc::sockaddr_in6 as *const libc::sockaddr,
                    mem::size_of::<libc::sockaddr_in6>() as libc::socklen_t,
                )
            }
        },
    };
    if res < 0 {
        return Err(io::Error::last_os_error());
    }

    let socket = std::net::UdpSocket::from(fd);
    tokio::net::UdpSocket::from_std(socket)
}
