pub(crate) use {
    std::{
        cmp, fmt, io, mem,
        collections::{BTreeMap, HashMap},
        convert::Infallible,
        net::SocketAddr,
        os::fd::{AsRawFd, FromRawFd, OwnedFd},
        sync::Arc,
        time::{Duration, Instant},
    },
    bytes::Bytes,
    log::{debug, info, trace, warn},
    rand::{rngs::StdRng, Rng, SeedableRng},
    net_literals::ipv4,
    crate::{
        config::{ConfigError, EmulatorConfig, ImpairmentConfig},
        handshake::{Handshake, Message},
        impairment::{Impairment, Verdict},
        registry::Endpoints,
        scheduler::{Delivery, Scheduler},
        stats::Stats,
    },
};
