use log::trace;

use crate::commons::{AddrRange, Event, Packet, Tick};
use crate::delayed_q::{DelQSender, DelayedMsg};
use crate::link::DownstreamPeer;

/// Fixed-latency backing memory over a single contiguous range. Handles one
/// access at a time; a rejected sender gets a request retry signal once the
/// in-flight access completes.
pub struct MainMemory {
    range: AddrRange,
    bytes: Vec<u8>,
    latency: Tick,
    tx: DelQSender<Event>,
    inflight: bool,
    need_retry: bool,
}

impl MainMemory {
    pub fn new(range: AddrRange, latency: Tick, tx: DelQSender<Event>) -> Self {
        MainMemory {
            bytes: vec![0; range.size() as usize],
            range,
            latency,
            tx,
            inflight: false,
            need_retry: false,
        }
    }

    fn apply(&mut self, pkt: &mut Packet) {
        assert!(
            self.range.contains(pkt.addr),
            "access at {:?} is outside the memory range",
            pkt.addr
        );
        let off = (pkt.addr.0 - self.range.start) as usize;
        let size = pkt.size as usize;
        if pkt.is_write {
            self.bytes[off..off + size].copy_from_slice(&pkt.data);
        } else {
            pkt.data.clear();
            pkt.data.extend_from_slice(&self.bytes[off..off + size]);
        }
    }

    /// Finish the in-flight access once its latency has elapsed. Returns
    /// the response to deliver (if the request wanted one) and whether a
    /// request retry signal should be raised for a sender we turned away.
    pub fn complete(&mut self, mut pkt: Packet) -> (Option<Packet>, bool) {
        assert!(self.inflight, "memory completion with nothing in flight");
        self.apply(&mut pkt);
        self.inflight = false;
        let raise_retry = std::mem::take(&mut self.need_retry);
        let resp = if pkt.needs_response {
            pkt.make_response();
            Some(pkt)
        } else {
            None
        };
        (resp, raise_retry)
    }
}

impl DownstreamPeer for MainMemory {
    fn recv_timing_req(&mut self, pkt: &Packet) -> bool {
        if self.inflight {
            trace!("memory busy, rejecting {:?}", pkt.addr);
            self.need_retry = true;
            return false;
        }
        self.inflight = true;
        self.tx
            .send(DelayedMsg {
                t: self.latency,
                msg: Event::MemComplete(pkt.clone()),
            })
            .expect("event queue gone");
        true
    }

    fn functional_access(&mut self, pkt: &mut Packet) {
        self.apply(pkt);
    }

    fn addr_ranges(&self) -> Vec<AddrRange> {
        vec![self.range]
    }
}
