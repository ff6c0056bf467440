use std::collections::VecDeque;

use log::trace;

use crate::commons::{Addr, Event, LinkId, Packet, Tick};
use crate::delayed_q::{DelQSender, DelayedMsg};
use crate::link::UpstreamPeer;

// instructions

#[derive(Clone)]
pub enum Instr {
    Read(Addr, u32),
    Write(Addr, Vec<u8>),
    Other(Tick),
}

pub type Instructions = VecDeque<Instr>;

#[derive(PartialEq)]
enum ReqState {
    Ready,
    WaitingForCache,
    Done,
}

/// Replays an instruction trace against the cache, one access at a time.
/// Keeps hold of a rejected request until the cache's retry callback asks
/// for it back.
pub struct TraceRequestor {
    link: LinkId,
    insts: Instructions,
    state: ReqState,
    rejected: Option<Packet>,
    tx: DelQSender<Event>,

    // instruction counters
    pub load_count: u64,
    pub store_count: u64,
    pub resp_count: u64,
}

impl TraceRequestor {
    pub fn new(link: LinkId, insts: Instructions, tx: DelQSender<Event>) -> Self {
        // kick off at t=0
        tx.send(DelayedMsg {
            t: 0,
            msg: Event::CpuNext(link),
        })
        .expect("event queue gone");
        TraceRequestor {
            link,
            insts,
            state: ReqState::Ready,
            rejected: None,
            tx,
            load_count: 0,
            store_count: 0,
            resp_count: 0,
        }
    }

    pub fn done(&self) -> bool {
        self.state == ReqState::Done
    }

    /// Called by the system when this requestor's turn comes up. `None`
    /// means nothing to issue this turn (waiting, pausing or finished).
    pub fn next_request(&mut self) -> Option<Packet> {
        if self.state != ReqState::Ready {
            return None;
        }
        match self.insts.pop_front() {
            Some(Instr::Read(addr, size)) => {
                self.load_count += 1;
                self.state = ReqState::WaitingForCache;
                Some(Packet::read_req(addr, size))
            }
            Some(Instr::Write(addr, data)) => {
                self.store_count += 1;
                self.state = ReqState::WaitingForCache;
                Some(Packet::write_req(addr, data))
            }
            Some(Instr::Other(d)) => {
                self.tx
                    .send(DelayedMsg {
                        t: d,
                        msg: Event::CpuNext(self.link),
                    })
                    .expect("event queue gone");
                None
            }
            None => {
                trace!("link {}: trace finished", self.link.0);
                self.state = ReqState::Done;
                None
            }
        }
    }
}

impl UpstreamPeer for TraceRequestor {
    fn recv_timing_resp(&mut self, _pkt: &Packet) -> bool {
        self.resp_count += 1;
        self.state = ReqState::Ready;
        self.tx
            .send(DelayedMsg {
                t: 1,
                msg: Event::CpuNext(self.link),
            })
            .expect("event queue gone");
        true
    }

    fn take_resend(&mut self) -> Option<Packet> {
        self.rejected.take()
    }

    fn resend_rejected(&mut self, pkt: Packet) {
        self.rejected = Some(pkt);
    }
}
