// simulated time

pub type Tick = u64;

// addresses

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct Addr(pub u64);

impl Addr {
    /// base address of the block covering this address
    pub fn block_base(&self, block_size: u32) -> Addr {
        Addr(self.0 & !(block_size as u64 - 1))
    }
    /// byte offset of this address within its block
    pub fn block_offset(&self, block_size: u32) -> usize {
        (self.0 & (block_size as u64 - 1)) as usize
    }
}

/// half-open address interval [start, end)
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct AddrRange {
    pub start: u64,
    pub end: u64,
}

impl AddrRange {
    pub fn contains(&self, addr: Addr) -> bool {
        addr.0 >= self.start && addr.0 < self.end
    }
    pub fn size(&self) -> u64 {
        self.end - self.start
    }
}

/// index of an upstream link attached to the cache
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct LinkId(pub usize);

// cache parameters

#[derive(Clone, Copy, Debug)]
pub struct CacheConfig {       // unit         reasonable defaults
    pub latency: Tick,         // ticks        1
    pub block_size: u32,       // bytes        64
    pub capacity: usize,       // blocks       16
    pub eviction_seed: u64,    //              0
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            latency: 1,
            block_size: 64,
            capacity: 16,
            eviction_seed: 0,
        }
    }
}

// MESSAGE TYPES

/// The request/response envelope moved across links. The cache only looks at
/// the address, size and write flag, and reads or fills `data`.
#[derive(Clone, Debug)]
pub struct Packet {
    pub addr: Addr,
    pub size: u32,
    pub is_write: bool,
    pub needs_response: bool,
    pub is_response: bool,
    pub data: Vec<u8>,
}

impl Packet {
    pub fn read_req(addr: Addr, size: u32) -> Self {
        Packet {
            addr,
            size,
            is_write: false,
            needs_response: true,
            is_response: false,
            data: Vec::new(),
        }
    }
    pub fn write_req(addr: Addr, data: Vec<u8>) -> Self {
        Packet {
            addr,
            size: data.len() as u32,
            is_write: true,
            needs_response: true,
            is_response: false,
            data,
        }
    }
    /// block-granularity fetch issued on a miss
    pub fn block_fetch(base: Addr, block_size: u32) -> Self {
        Packet::read_req(base, block_size)
    }
    /// dirty victim going back to memory; nobody waits for an answer
    pub fn writeback(base: Addr, data: Vec<u8>) -> Self {
        Packet {
            addr: base,
            size: data.len() as u32,
            is_write: true,
            needs_response: false,
            is_response: false,
            data,
        }
    }
    /// flip a request into its response in place
    pub fn make_response(&mut self) {
        assert!(
            self.needs_response && !self.is_response,
            "make_response on a packet that is not an outstanding request"
        );
        self.is_response = true;
    }
}

/// events routed through the delayed queue by the system loop
#[derive(Clone)]
pub enum Event {
    /// cache access latency elapsed for this request
    CacheAccess(Packet),
    /// memory finished its in-flight access
    MemComplete(Packet),
    /// requestor on this link is ready to issue its next instruction
    CpuNext(LinkId),
}
