use std::collections::VecDeque;
use std::env;

use env_logger::Env;

use cachesim_blocking::{Addr, AddrRange, CacheConfig, Instr, System};

fn main() {
    // logging
    let env = Env::default()
        .filter_or("CACHESIM_LOG_LEVEL", "info")
        .write_style_or("CACHESIM_LOG_STYLE", "auto");
    env_logger::init_from_env(env);

    // optional positional overrides: latency block_size capacity
    let args: Vec<String> = env::args().collect();
    let mut cfg = CacheConfig {
        capacity: 4,
        ..Default::default()
    };
    if args.len() > 1 {
        cfg.latency = args[1].parse().expect("latency must be a tick count");
    }
    if args.len() > 2 {
        cfg.block_size = args[2].parse().expect("block size must be in bytes");
    }
    if args.len() > 3 {
        cfg.capacity = args[3].parse().expect("capacity must be in blocks");
    }

    let bs = cfg.block_size as u64;

    // two requestors hammering a working set slightly larger than the
    // cache, so the run shows hits, misses, evictions and retries
    let trace_a: VecDeque<Instr> = VecDeque::from(vec![
        Instr::Write(Addr(0), vec![0xAA; 8]),
        Instr::Read(Addr(0), 8),
        Instr::Other(5),
        Instr::Read(Addr(bs), 4),
        Instr::Read(Addr(2 * bs), 4),
        Instr::Write(Addr(4 * bs), vec![0x11; 4]),
        Instr::Read(Addr(0), 8),
    ]);
    let trace_b: VecDeque<Instr> = VecDeque::from(vec![
        Instr::Read(Addr(bs), 4),
        Instr::Write(Addr(3 * bs), vec![0xBB; 16]),
        Instr::Read(Addr(3 * bs), 16),
        Instr::Other(2),
        Instr::Read(Addr(5 * bs), 4),
        Instr::Read(Addr(bs), 4),
    ]);

    let mut sys = System::new(
        cfg,
        AddrRange {
            start: 0,
            end: 0x1_0000,
        },
        100,
        vec![trace_a, trace_b],
    );

    let ticks = sys.run();
    if !sys.done() {
        println!("warning: traces did not run to completion");
    }

    println!("finished simulation in {} ticks", ticks);
    for cpu in &sys.cpus {
        println!(
            "  link loads/stores/responses: {}/{}/{}",
            cpu.load_count, cpu.store_count, cpu.resp_count
        );
    }
    println!("{}", sys.cache.stats.summary());
}
