use log::{debug, trace};

use crate::commons::{Addr, AddrRange, CacheConfig, Event, LinkId, Packet, Tick};
use crate::delayed_q::{DelQSender, DelayedMsg};
use crate::link::{CpuSidePort, DownstreamPeer, MemSidePort, UpstreamPeer};
use crate::stats::CacheStats;
use crate::store::{BlockStore, CacheBlock};

/// The single request currently occupying the cache. Its existence IS the
/// blocked state: at most one of these is alive at any time.
struct PendingRequest {
    link: LinkId,
    /// the original request, stashed while a block fetch is in flight
    original: Option<Packet>,
    /// when the miss was detected, for latency accounting
    miss_start: Option<Tick>,
}

/// A fully-blocking, fully-associative writeback cache with random
/// replacement. One request may be outstanding at a time; everything else
/// is pushed back to the senders through the retry protocol.
pub struct BlockingCache {
    cfg: CacheConfig,
    store: BlockStore,
    cpu_ports: Vec<CpuSidePort>,
    mem_port: MemSidePort,
    pending: Option<PendingRequest>,
    tx: DelQSender<Event>,
    pub stats: CacheStats,
}

impl BlockingCache {
    pub fn new(cfg: CacheConfig, num_links: usize, tx: DelQSender<Event>) -> Self {
        assert!(num_links > 0, "cache needs at least one upstream link");
        BlockingCache {
            store: BlockStore::new(cfg.block_size, cfg.capacity, cfg.eviction_seed),
            cpu_ports: (0..num_links).map(|i| CpuSidePort::new(LinkId(i))).collect(),
            mem_port: MemSidePort::new(),
            pending: None,
            tx,
            stats: CacheStats::default(),
            cfg,
        }
    }

    pub fn blocked(&self) -> bool {
        self.pending.is_some()
    }
    pub fn resident_blocks(&self) -> usize {
        self.store.len()
    }

    /// Timing request coming in on a CPU-side link. Rejected while blocked;
    /// the link is flagged for a retry once the cache frees up.
    pub fn recv_timing_req(&mut self, link: LinkId, pkt: &Packet) -> bool {
        assert!(
            !pkt.is_response,
            "link {}: expected a request, got a response",
            link.0
        );
        if self.blocked() {
            trace!("link {}: rejecting {:?}, cache blocked", link.0, pkt.addr);
            self.cpu_ports[link.0].mark_retry();
            return false;
        }
        self.handle_request(link, pkt);
        true
    }

    fn handle_request(&mut self, link: LinkId, pkt: &Packet) {
        assert!(
            self.pending.is_none(),
            "request accepted while another request is already in flight"
        );
        debug!(
            "link {}: accepted {} for {:?}",
            link.0,
            if pkt.is_write { "write" } else { "read" },
            pkt.addr
        );
        self.pending = Some(PendingRequest {
            link,
            original: None,
            miss_start: None,
        });
        // one-shot latency timer; the cache never has more than one running
        self.tx
            .send(DelayedMsg {
                t: self.cfg.latency,
                msg: Event::CacheAccess(pkt.clone()),
            })
            .expect("event queue gone");
    }

    /// The access latency has elapsed; resolve the request against the
    /// store. Hits answer immediately, misses go downstream at block
    /// granularity. The cache stays blocked throughout either way.
    pub fn access_timing<U: UpstreamPeer>(
        &mut self,
        mut pkt: Packet,
        now: Tick,
        upstreams: &mut [U],
        downstream: &mut dyn DownstreamPeer,
    ) {
        assert!(
            self.pending.is_some(),
            "timed access fired with no request in flight"
        );
        if self.store.access(&mut pkt) {
            trace!("hit for {:?}", pkt.addr);
            self.stats.record_hit();
            pkt.make_response();
            self.send_response(pkt, upstreams);
        } else {
            trace!("miss for {:?}", pkt.addr);
            self.stats.record_miss();
            let base = pkt.addr.block_base(self.cfg.block_size);
            let pending = self.pending.as_mut().unwrap();
            pending.miss_start = Some(now);
            pending.original = Some(pkt);
            // fetch the whole block; the original access is re-resolved
            // against the store once the fill lands
            let fetch = Packet::block_fetch(base, self.cfg.block_size);
            self.mem_port.send_req(downstream, fetch);
        }
    }

    /// Fill response from downstream: insert the block (evicting and
    /// writing back if needed), replay the stashed access, answer upstream.
    pub fn recv_timing_resp<U: UpstreamPeer>(
        &mut self,
        resp: Packet,
        now: Tick,
        upstreams: &mut [U],
        downstream: &mut dyn DownstreamPeer,
    ) {
        assert!(resp.is_response, "downstream delivered a non-response");
        let (miss_start, mut original) = {
            let pending = self
                .pending
                .as_mut()
                .expect("downstream response while no request is in flight");
            (
                pending
                    .miss_start
                    .take()
                    .expect("downstream response without an outstanding miss"),
                pending
                    .original
                    .take()
                    .expect("downstream response but no stashed access"),
            )
        };
        self.stats.record_miss_latency(now - miss_start);
        self.insert(resp.addr, resp.data, downstream);
        let hit = self.store.access(&mut original);
        assert!(
            hit,
            "fetched block does not cover the pending access at {:?}",
            original.addr
        );
        original.make_response();
        self.send_response(original, upstreams);
    }

    /// Insert a fetched block, evicting one uniformly-random victim first
    /// if the store is full. A dirty victim is written back downstream
    /// before the new block claims the slot.
    fn insert(&mut self, base: Addr, data: Vec<u8>, downstream: &mut dyn DownstreamPeer) {
        if self.store.at_capacity() {
            let (victim_base, victim) = self.store.evict_random();
            if victim.dirty {
                debug!("writing back dirty victim at {:?}", victim_base);
                self.stats.record_writeback();
                let wb = Packet::writeback(victim_base, victim.data);
                self.mem_port.send_req(downstream, wb);
            }
        }
        self.store.insert(
            base,
            CacheBlock {
                data,
                dirty: false,
            },
        );
    }

    /// Dispatch a response to the link that issued the pending request.
    /// Only a send that truly succeeds unblocks the cache; a buffered
    /// response keeps it blocked until the link's response retry.
    fn send_response<U: UpstreamPeer>(&mut self, pkt: Packet, upstreams: &mut [U]) {
        let link = self
            .pending
            .as_ref()
            .expect("response with no request in flight")
            .link;
        if self.cpu_ports[link.0].send_resp(&mut upstreams[link.0], pkt) {
            self.unblock(upstreams);
        } else {
            debug!("link {}: staying blocked until the response goes out", link.0);
        }
    }

    /// Clear the blocked state and fire one retry per flagged link, in link
    /// order. A retried send may re-block the cache immediately; later
    /// links still get their callback and are re-flagged on rejection.
    fn unblock<U: UpstreamPeer>(&mut self, upstreams: &mut [U]) {
        self.pending = None;
        trace!("unblocked");
        for i in 0..self.cpu_ports.len() {
            if !self.cpu_ports[i].take_retry() {
                continue;
            }
            trace!("link {}: retry", i);
            if let Some(pkt) = upstreams[i].take_resend() {
                if !self.recv_timing_req(LinkId(i), &pkt) {
                    upstreams[i].resend_rejected(pkt);
                }
            }
        }
    }

    /// The link that refused our response is ready for it now.
    pub fn recv_resp_retry<U: UpstreamPeer>(&mut self, link: LinkId, upstreams: &mut [U]) {
        if self.cpu_ports[link.0].retry_resp(&mut upstreams[link.0]) {
            self.unblock(upstreams);
        }
    }

    /// Downstream signalled readiness; resend the buffered request.
    pub fn recv_req_retry(&mut self, downstream: &mut dyn DownstreamPeer) {
        self.mem_port.retry_req(downstream);
    }

    /// Debug side channel: resolve against the store, fall through to the
    /// downstream peer on a miss. Legal at any time, even while blocked.
    pub fn handle_functional(&mut self, pkt: &mut Packet, downstream: &mut dyn DownstreamPeer) {
        if !self.store.access(pkt) {
            downstream.functional_access(pkt);
        }
    }

    /// Atomic mode is not supported by the blocking engine.
    pub fn recv_atomic(&mut self, pkt: &Packet) -> ! {
        panic!(
            "atomic access for {:?} received; the blocking cache only supports timing and functional mode",
            pkt.addr
        );
    }

    /// The ranges this cache answers for: whatever the downstream covers.
    pub fn addr_ranges(&self, downstream: &dyn DownstreamPeer) -> Vec<AddrRange> {
        downstream.addr_ranges()
    }
}
