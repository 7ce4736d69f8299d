use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use spdlog::warn;

struct IpRecord {
    window_start: Instant,
    count: u32,
}

/// Per-source-address accept/reject with abuse counters.
///
/// Every connection task calls `allowed` concurrently; the counters live
/// behind one mutex and the critical section is a map lookup. An address
/// over the per-window connection budget is denied until its window rolls
/// over.
pub struct AdmissionControl {
    window: Duration,
    max_per_window: u32,
    records: Mutex<HashMap<IpAddr, IpRecord>>,
}

impl AdmissionControl {
    pub fn new(window: Duration, max_per_window: u32) -> Self {
        AdmissionControl {
            window,
            max_per_window,
            records: Mutex::new(HashMap::new()),
        }
    }

    pub fn allowed(&self, addr: IpAddr) -> bool {
        let mut records = self.records.lock().unwrap();
        let now = Instant::now();

        let record = records.entry(addr).or_insert(IpRecord {
            window_start: now,
            count: 0,
        });

        if now.duration_since(record.window_start) >= self.window {
            record.window_start = now;
            record.count = 0;
        }

        record.count += 1;
        if record.count > self.max_per_window {
            if record.count == self.max_per_window + 1 {
                warn!("denying {}: over {} connections per window", addr, self.max_per_window);
            }
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(last: u8) -> IpAddr {
        IpAddr::from([10, 0, 0, last])
    }

    #[test]
    fn test_allows_under_budget() {
        let ac = AdmissionControl::new(Duration::from_secs(60), 3);
        for _ in 0..3 {
            assert!(ac.allowed(ip(1)));
        }
    }

    #[test]
    fn test_denies_over_budget() {
        let ac = AdmissionControl::new(Duration::from_secs(60), 2);
        assert!(ac.allowed(ip(1)));
        assert!(ac.allowed(ip(1)));
        assert!(!ac.allowed(ip(1)));
        assert!(!ac.allowed(ip(1)));
    }

    #[test]
    fn test_addresses_tracked_independently() {
        let ac = AdmissionControl::new(Duration::from_secs(60), 1);
        assert!(ac.allowed(ip(1)));
        assert!(!ac.allowed(ip(1)));
        assert!(ac.allowed(ip(2)));
    }

    #[test]
    fn test_window_rollover_absolves() {
        let ac = AdmissionControl::new(Duration::from_millis(20), 1);
        assert!(ac.allowed(ip(1)));
        assert!(!ac.allowed(ip(1)));

        std::thread::sleep(Duration::from_millis(30));
        assert!(ac.allowed(ip(1)));
    }
}
