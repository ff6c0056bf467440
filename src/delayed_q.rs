// implements an event queue with discrete delays, based on std::sync::mpsc

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::mpsc;

use crate::commons::Tick;

// delayed message type

#[derive(Clone)]
pub struct DelayedMsg<MsgType> {
    /// delay relative to the queue's current time
    pub t: Tick,
    pub msg: MsgType,
}

pub type DelQSender<MsgType> = mpsc::Sender<DelayedMsg<MsgType>>;

// timed message type

/*
    to avoid having to mutate every element in the queue, the queue does not
    decrease delays but instead stamps each submission with its absolute due
    time. the ord counter breaks ties: messages scheduled for the same tick
    come back out in submission order.
 */

struct TimedMsg<MsgType> {
    t: Tick,
    ord: u64,
    msg: MsgType,
}

impl<MsgType> Eq for TimedMsg<MsgType> {}

impl<MsgType> PartialEq for TimedMsg<MsgType> {
    fn eq(&self, other: &Self) -> bool {
        (self.t, self.ord) == (other.t, other.ord)
    }
}

impl<MsgType> Ord for TimedMsg<MsgType> {
    fn cmp(&self, other: &Self) -> Ordering {
        // lexicographically, reversed for the max-heap
        (other.t, other.ord).cmp(&(self.t, self.ord))
    }
}

impl<MsgType> PartialOrd for TimedMsg<MsgType> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// delayed message queue

pub struct DelayedQ<MsgType> {
    q: BinaryHeap<TimedMsg<MsgType>>,
    rx: mpsc::Receiver<DelayedMsg<MsgType>>,
    time: Tick,
    ord_ctr: u64,
}

impl<MsgType> DelayedQ<MsgType> {
    pub fn new() -> (Self, DelQSender<MsgType>) {
        let (tx, rx) = mpsc::channel();
        (
            DelayedQ {
                q: BinaryHeap::new(),
                rx,
                time: 0,
                ord_ctr: 0,
            },
            tx,
        )
    }
    pub fn now(&self) -> Tick {
        self.time
    }
    /// pull pending submissions from the channel into the heap
    pub fn update_q(&mut self) {
        while let Ok(DelayedMsg { t: d, msg: m }) = self.rx.try_recv() {
            self.q.push(TimedMsg {
                t: self.time + d,
                ord: self.ord_ctr,
                msg: m,
            });
            self.ord_ctr += 1;
        }
    }
    pub fn is_empty(&mut self) -> bool {
        self.update_q();
        self.q.is_empty()
    }
    /// pop the earliest message and advance the queue's time to it
    pub fn pop_next(&mut self) -> Option<MsgType> {
        self.update_q();
        let next = self.q.pop()?;
        debug_assert!(next.t >= self.time, "delayed queue is out of sync: missed message");
        self.time = next.t;
        Some(next.msg)
    }
}
