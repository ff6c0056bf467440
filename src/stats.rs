use crate::commons::Tick;

/// Fire-and-forget counters for the cache. Nothing in here ever feeds back
/// into the flow control.
#[derive(Default, Debug)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub writebacks: u64,
    pub miss_latency_sum: Tick,
    pub miss_latency_samples: u64,
    pub miss_latency_max: Tick,
}

impl CacheStats {
    pub fn record_hit(&mut self) {
        self.hits += 1;
    }
    pub fn record_miss(&mut self) {
        self.misses += 1;
    }
    pub fn record_writeback(&mut self) {
        self.writebacks += 1;
    }
    pub fn record_miss_latency(&mut self, lat: Tick) {
        self.miss_latency_sum += lat;
        self.miss_latency_samples += 1;
        self.miss_latency_max = self.miss_latency_max.max(lat);
    }
    pub fn hit_ratio(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            return 0.0;
        }
        self.hits as f64 / total as f64
    }
    pub fn avg_miss_latency(&self) -> f64 {
        if self.miss_latency_samples == 0 {
            return 0.0;
        }
        self.miss_latency_sum as f64 / self.miss_latency_samples as f64
    }
    pub fn summary(&self) -> String {
        format!(
            "hits: {}  misses: {}  hit ratio: {:.2}  writebacks: {}  \
             miss latency avg/max: {:.1}/{} ticks",
            self.hits,
            self.misses,
            self.hit_ratio(),
            self.writebacks,
            self.avg_miss_latency(),
            self.miss_latency_max,
        )
    }
}
