//! Endpoint registration and pairing.
//!
//! Endpoints announce themselves with a [`Handshake`](crate::Handshake) naming their peer's port.
//! Two endpoints which name each other are paired, and datagrams from either are forwarded to
//! the other. The pairing is recomputed from scratch every time the registry changes, so it
//! only ever reflects what's currently registered.

use crate::priv_prelude::*;

/// An endpoint which has announced itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Endpoint {
    /// The address the endpoint's datagrams arrive from.
    pub addr: SocketAddr,
    /// What the endpoint last announced.
    pub handshake: Handshake,
}

impl Endpoint {
    /// Whether `self` and `other` are distinct and each declares the other's port.
    pub fn pairs_with(&self, other: &Endpoint) -> bool {
        self.addr != other.addr
        && self.handshake.declares(other.addr)
        && other.handshake.declares(self.addr)
    }
}

/// Every endpoint that has announced itself, keyed by address. Entries are never removed. A
/// repeated announcement from the same address overwrites the previous one.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    endpoints: BTreeMap<SocketAddr, Handshake>,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Registry {
        Registry::default()
    }

    /// Record `handshake` as the latest announcement from `addr`.
    pub fn announce(mut self, addr: SocketAddr, handshake: Handshake) -> Registry {
        self.endpoints.insert(addr, handshake);
        self
    }

    /// Look up a registered endpoint.
    pub fn get(&self, addr: SocketAddr) -> Option<Endpoint> {
        let handshake = *self.endpoints.get(&addr)?;
        Some(Endpoint { addr, handshake })
    }

    /// Iterate over registered endpoints in address order.
    pub fn iter(&self) -> impl Iterator<Item = Endpoint> + '_ {
        self.endpoints.iter().map(|(&addr, &handshake)| Endpoint { addr, handshake })
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }
}

/// Which address each paired endpoint's traffic goes to. Symmetric as long as no endpoint has
/// more than one mutual candidate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ForwardingTable {
    routes: BTreeMap<SocketAddr, SocketAddr>,
}

impl ForwardingTable {
    /// Derive the forwarding table from a registry.
    ///
    /// Checks every ordered pair of registered endpoints, which is quadratic but the registry is
    /// expected to hold exactly two. With more than two endpoints competing for the same peer the
    /// result is whichever mutual pair comes last in address order.
    pub fn resolve(registry: &Registry) -> ForwardingTable {
        let mut routes = BTreeMap::new();
        for a in registry.iter() {
            for b in registry.iter() {
                if a.pairs_with(&b) {
                    routes.insert(a.addr, b.addr);
                    routes.insert(b.addr, a.addr);
                }
            }
        }
        ForwardingTable { routes }
    }

    /// Where datagrams from `src` should be sent, if `src` is paired.
    pub fn destination(&self, src: SocketAddr) -> Option<SocketAddr> {
        self.routes.get(&src).copied()
    }

    /// Number of addresses with a route. Twice the number of pairs.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

/// The registry together with the forwarding table derived from it.
#[derive(Debug, Default)]
pub struct Endpoints {
    registry: Registry,
    forwarding: ForwardingTable,
}

impl Endpoints {
    pub fn new() -> Endpoints {
        Endpoints::default()
    }

    /// Register (or re-register) `addr` and recompute the pairing. Returns the peer `addr` is
    /// now paired with, if any.
    pub fn handle_handshake(&mut self, addr: SocketAddr, handshake: Handshake) -> Option<SocketAddr> {
        let registry = mem::take(&mut self.registry).announce(addr, handshake);
        let forwarding = ForwardingTable::resolve(&registry);
        if forwarding != self.forwarding {
            debug!("pairing changed: {:?}", forwarding.routes);
        }
        self.registry = registry;
        self.forwarding = forwarding;
        self.forwarding.destination(addr)
    }

    /// Where datagrams from `src` should be sent, if `src` is paired.
    pub fn destination(&self, src: SocketAddr) -> Option<SocketAddr> {
        self.forwarding.destination(src)
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn forwarding(&self) -> &ForwardingTable {
        &self.forwarding
    }
}
