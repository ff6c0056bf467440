// This module defines the link contract between the cache and its peers:
// the traits the collaborators implement, and the per-link adapter state the
// cache keeps for retry bookkeeping.

use log::trace;

use crate::commons::{AddrRange, LinkId, Packet};

/// A requestor attached to one of the cache's CPU-side links.
pub trait UpstreamPeer {
    /// Deliver a response. `false` means the peer cannot take it right now;
    /// the adapter buffers it and the peer signals a response retry later.
    fn recv_timing_resp(&mut self, pkt: &Packet) -> bool;
    /// Retry callback: hand over the request the peer wants to resend, if
    /// it still wants to.
    fn take_resend(&mut self) -> Option<Packet>;
    /// The resend was rejected again; the peer keeps the request for the
    /// next retry round.
    fn resend_rejected(&mut self, pkt: Packet);
}

/// Whatever sits below the cache (memory, or the next cache level).
pub trait DownstreamPeer {
    /// Try to hand a request downstream. `false` means busy; the sender
    /// buffers the packet and waits for a request retry signal.
    fn recv_timing_req(&mut self, pkt: &Packet) -> bool;
    /// Debug access, applied immediately with no timing or flow control.
    fn functional_access(&mut self, pkt: &mut Packet);
    fn addr_ranges(&self) -> Vec<AddrRange>;
}

/// Adapter state for one CPU-side link: the retry flag set when a request
/// is rejected while the cache is blocked, and the slot for a response the
/// peer could not accept.
pub struct CpuSidePort {
    pub id: LinkId,
    need_retry: bool,
    blocked_resp: Option<Packet>,
}

impl CpuSidePort {
    pub fn new(id: LinkId) -> Self {
        CpuSidePort {
            id,
            need_retry: false,
            blocked_resp: None,
        }
    }

    pub fn mark_retry(&mut self) {
        self.need_retry = true;
    }
    /// clear and report the retry flag; at most one retry per unblock
    pub fn take_retry(&mut self) -> bool {
        std::mem::take(&mut self.need_retry)
    }
    pub fn has_blocked_resp(&self) -> bool {
        self.blocked_resp.is_some()
    }

    /// Send a response across this link, buffering it if the peer cannot
    /// accept. All response-side flow control lives here.
    pub fn send_resp(&mut self, peer: &mut dyn UpstreamPeer, pkt: Packet) -> bool {
        assert!(
            self.blocked_resp.is_none(),
            "link {}: response sent while one is already waiting for a retry",
            self.id.0
        );
        if peer.recv_timing_resp(&pkt) {
            true
        } else {
            trace!("link {}: peer cannot take the response, buffering", self.id.0);
            self.blocked_resp = Some(pkt);
            false
        }
    }

    /// The peer signalled it can take the response now; resend exactly the
    /// buffered packet.
    pub fn retry_resp(&mut self, peer: &mut dyn UpstreamPeer) -> bool {
        let pkt = self
            .blocked_resp
            .take()
            .expect("response retry but nothing is buffered");
        self.send_resp(peer, pkt)
    }
}

/// Adapter state for the single memory-side link: one slot for a request
/// the downstream peer could not accept.
pub struct MemSidePort {
    blocked_req: Option<Packet>,
}

impl MemSidePort {
    pub fn new() -> Self {
        MemSidePort { blocked_req: None }
    }

    pub fn has_blocked_req(&self) -> bool {
        self.blocked_req.is_some()
    }

    /// Send a request downstream, buffering it on rejection. All request
    /// side flow control lives here.
    pub fn send_req(&mut self, peer: &mut dyn DownstreamPeer, pkt: Packet) {
        assert!(
            self.blocked_req.is_none(),
            "downstream send while a packet is already waiting for a retry"
        );
        if !peer.recv_timing_req(&pkt) {
            trace!("downstream busy, buffering {:?}", pkt.addr);
            self.blocked_req = Some(pkt);
        }
    }

    /// Downstream signalled readiness; resend exactly the buffered packet.
    pub fn retry_req(&mut self, peer: &mut dyn DownstreamPeer) {
        let pkt = self
            .blocked_req
            .take()
            .expect("request retry but nothing is buffered");
        self.send_req(peer, pkt);
    }
}

impl Default for MemSidePort {
    fn default() -> Self {
        Self::new()
    }
}
