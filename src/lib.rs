//! A single-cycle-accurate, fully-blocking cache stage for discrete-event
//! memory hierarchy simulation: one outstanding request, fully-associative
//! store with seeded random replacement, writeback on eviction, and
//! credit-style retry flow control on both sides.

pub mod cache;
pub mod commons;
pub mod delayed_q;
pub mod link;
pub mod memory;
pub mod requestor;
pub mod stats;
pub mod store;
pub mod system;

pub use cache::BlockingCache;
pub use commons::{Addr, AddrRange, CacheConfig, Event, LinkId, Packet, Tick};
pub use link::{DownstreamPeer, UpstreamPeer};
pub use memory::MainMemory;
pub use requestor::{Instr, Instructions, TraceRequestor};
pub use stats::CacheStats;
pub use store::BlockStore;
pub use system::System;
