use log::info;

use crate::cache::BlockingCache;
use crate::commons::{AddrRange, CacheConfig, Event, LinkId, Tick};
use crate::delayed_q::DelayedQ;
use crate::link::UpstreamPeer;
use crate::memory::MainMemory;
use crate::requestor::{Instructions, TraceRequestor};

/// Wires requestors, cache and memory together and drives the event loop.
/// Components never call each other directly; every cross-component hop
/// goes through the delayed queue and is dispatched here, so there is
/// exactly one logical thread of control.
pub struct System {
    pub cache: BlockingCache,
    pub mem: MainMemory,
    pub cpus: Vec<TraceRequestor>,
    q: DelayedQ<Event>,
}

impl System {
    pub fn new(
        cfg: CacheConfig,
        mem_range: AddrRange,
        mem_latency: Tick,
        traces: Vec<Instructions>,
    ) -> Self {
        let (q, tx) = DelayedQ::new();
        let cache = BlockingCache::new(cfg, traces.len(), tx.clone());
        let mem = MainMemory::new(mem_range, mem_latency, tx.clone());
        let cpus = traces
            .into_iter()
            .enumerate()
            .map(|(i, t)| TraceRequestor::new(LinkId(i), t, tx.clone()))
            .collect();
        System { cache, mem, cpus, q }
    }

    pub fn done(&self) -> bool {
        self.cpus.iter().all(|c| c.done())
    }

    /// Run until the event queue drains. Returns the final simulated time.
    pub fn run(&mut self) -> Tick {
        while let Some(ev) = self.q.pop_next() {
            let now = self.q.now();
            match ev {
                Event::CpuNext(link) => {
                    if let Some(pkt) = self.cpus[link.0].next_request() {
                        if !self.cache.recv_timing_req(link, &pkt) {
                            // the link keeps the request until its retry
                            self.cpus[link.0].resend_rejected(pkt);
                        }
                    }
                }
                Event::CacheAccess(pkt) => {
                    self.cache
                        .access_timing(pkt, now, &mut self.cpus, &mut self.mem);
                }
                Event::MemComplete(pkt) => {
                    let (resp, raise_retry) = self.mem.complete(pkt);
                    if let Some(resp) = resp {
                        self.cache
                            .recv_timing_resp(resp, now, &mut self.cpus, &mut self.mem);
                    }
                    if raise_retry {
                        self.cache.recv_req_retry(&mut self.mem);
                    }
                }
            }
        }
        info!("event queue drained at t={}", self.q.now());
        self.q.now()
    }
}
