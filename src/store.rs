use std::collections::HashMap;

use log::trace;
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::commons::{Addr, Packet};

/// one cached block; owned by the store, never shared
pub struct CacheBlock {
    pub data: Vec<u8>,
    pub dirty: bool,
}

/// A fully-associative mapping from block base address to block data with
/// uniform-random replacement. The store itself knows nothing about timing
/// or flow control; the cache sequences evictions and writebacks around it.
pub struct BlockStore {
    blocks: HashMap<Addr, CacheBlock>,
    block_size: u32,
    capacity: usize,
    rng: ChaCha8Rng,
}

impl BlockStore {
    pub fn new(block_size: u32, capacity: usize, seed: u64) -> Self {
        assert!(
            block_size.is_power_of_two(),
            "block size must be a power of two, got {}",
            block_size
        );
        assert!(capacity > 0, "cache capacity must be at least one block");
        BlockStore {
            blocks: HashMap::new(),
            block_size,
            capacity,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    pub fn block_size(&self) -> u32 {
        self.block_size
    }
    pub fn len(&self) -> usize {
        self.blocks.len()
    }
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
    pub fn at_capacity(&self) -> bool {
        self.blocks.len() >= self.capacity
    }

    pub fn lookup(&self, addr: Addr) -> Option<&CacheBlock> {
        self.blocks.get(&addr.block_base(self.block_size))
    }

    /// Remove one resident block chosen uniformly at random and hand it to
    /// the caller, who is responsible for writing it back if dirty.
    pub fn evict_random(&mut self) -> (Addr, CacheBlock) {
        assert!(!self.blocks.is_empty(), "evict_random on an empty store");
        // HashMap iteration order is unstable; index a sorted copy of the
        // occupant set so a fixed seed replays the same victim sequence
        let mut bases: Vec<Addr> = self.blocks.keys().copied().collect();
        bases.sort();
        let base = bases[self.rng.gen_range(0..bases.len())];
        let block = self.blocks.remove(&base).unwrap();
        trace!("evicting block at {:?}", base);
        (base, block)
    }

    /// Insert a block. The caller must have made room first.
    pub fn insert(&mut self, base: Addr, block: CacheBlock) {
        assert!(
            !self.at_capacity(),
            "insert into a full store: evict before inserting"
        );
        assert_eq!(
            base.block_offset(self.block_size),
            0,
            "insert base {:?} is not block aligned",
            base
        );
        assert_eq!(
            block.data.len(),
            self.block_size as usize,
            "inserted block has the wrong size"
        );
        self.blocks.insert(base, block);
    }

    /// Functional read/write in place. Both the timed path and the debug
    /// side channel end up here. Only reports hit or miss, never fails.
    pub fn access(&mut self, pkt: &mut Packet) -> bool {
        let base = pkt.addr.block_base(self.block_size);
        let off = pkt.addr.block_offset(self.block_size);
        let size = pkt.size as usize;
        assert!(
            off + size <= self.block_size as usize,
            "access at {:?} size {} straddles a block boundary",
            pkt.addr,
            size
        );
        let block = match self.blocks.get_mut(&base) {
            Some(b) => b,
            None => return false,
        };
        if pkt.is_write {
            block.data[off..off + size].copy_from_slice(&pkt.data);
            block.dirty = true;
        } else {
            pkt.data.clear();
            pkt.data.extend_from_slice(&block.data[off..off + size]);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(block_size: u32, byte: u8) -> CacheBlock {
        CacheBlock {
            data: vec![byte; block_size as usize],
            dirty: false,
        }
    }

    #[test]
    fn read_and_write_in_place() {
        let mut store = BlockStore::new(64, 4, 0);
        store.insert(Addr(0x40), filled(64, 0));

        let mut w = Packet::write_req(Addr(0x44), vec![1, 2, 3, 4]);
        assert!(store.access(&mut w));
        assert!(store.lookup(Addr(0x44)).unwrap().dirty);

        let mut r = Packet::read_req(Addr(0x44), 4);
        assert!(store.access(&mut r));
        assert_eq!(r.data, vec![1, 2, 3, 4]);

        let mut miss = Packet::read_req(Addr(0x80), 4);
        assert!(!store.access(&mut miss));
    }

    #[test]
    fn never_exceeds_capacity() {
        let mut store = BlockStore::new(64, 4, 0);
        for i in 0..32u64 {
            if store.at_capacity() {
                store.evict_random();
            }
            store.insert(Addr(i * 64), filled(64, i as u8));
            assert!(store.len() <= 4);
        }
        assert_eq!(store.len(), 4);
    }

    #[test]
    fn victim_sequence_is_reproducible_under_a_fixed_seed() {
        let run = |seed: u64| -> Vec<Addr> {
            let mut store = BlockStore::new(64, 4, seed);
            let mut victims = Vec::new();
            for i in 0..16u64 {
                if store.at_capacity() {
                    victims.push(store.evict_random().0);
                }
                store.insert(Addr(i * 64), filled(64, 0));
            }
            victims
        };
        assert_eq!(run(7), run(7));
    }

    #[test]
    #[should_panic(expected = "straddles")]
    fn straddling_access_is_rejected() {
        let mut store = BlockStore::new(64, 4, 0);
        store.insert(Addr(0), filled(64, 0));
        let mut pkt = Packet::read_req(Addr(0x3c), 8);
        store.access(&mut pkt);
    }
}
