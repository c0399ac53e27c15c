use parking_lot::Mutex;
use serde::Serialize;

/// 保持するレイテンシ記録の上限
const LATENCY_CAP: usize = 1000;

/// ポーリング統計の収集器
pub struct PollMetrics {
    counters: Mutex<PollCounters>,
    latencies: Mutex<Vec<LatencyRecord>>,
}

#[derive(Debug, Default)]
struct PollCounters {
    jobs_submitted: u64,
    status_polls: u64,
    status_ok: u64,
    status_failed: u64,
    results_fetched: u64,
    results_failed: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct LatencyRecord {
    pub call: String,
    pub duration_ms: u64,
    pub timestamp: String,
}

/// メトリクスサマリー（表示用）
#[derive(Debug, Clone, Serialize)]
pub struct PollMetricsSummary {
    pub jobs_submitted: u64,
    pub status_polls: u64,
    pub status_ok: u64,
    pub status_failed: u64,
    pub results_fetched: u64,
    pub results_failed: u64,
    pub avg_latency_ms: AvgLatency,
    pub recent_latencies: Vec<LatencyRecord>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AvgLatency {
    pub submit: Option<f64>,
    pub status: Option<f64>,
    pub result: Option<f64>,
}

impl PollMetrics {
    pub fn new() -> Self {
        Self {
            counters: Mutex::new(PollCounters::default()),
            latencies: Mutex::new(Vec::new()),
        }
    }

    pub fn inc_jobs_submitted(&self) {
        self.counters.lock().jobs_submitted += 1;
    }

    pub fn inc_status_polls(&self) {
        self.counters.lock().status_polls += 1;
    }

    pub fn record_status(&self, ok: bool) {
        let mut c = self.counters.lock();
        if ok {
            c.status_ok += 1;
        } else {
            c.status_failed += 1;
        }
    }

    pub fn record_result(&self, ok: bool) {
        let mut c = self.counters.lock();
        if ok {
            c.results_fetched += 1;
        } else {
            c.results_failed += 1;
        }
    }

    pub fn record_latency(&self, call: &str, duration_ms: u64) {
        let record = LatencyRecord {
            call: call.to_string(),
            duration_ms,
            timestamp: chrono::Utc::now().to_rfc3339(),
        };
        let mut latencies = self.latencies.lock();
        latencies.push(record);
        if latencies.len() > LATENCY_CAP {
            let excess = latencies.len() - LATENCY_CAP;
            latencies.drain(0..excess);
        }
    }

    pub fn summary(&self) -> PollMetricsSummary {
        let c = self.counters.lock();
        let latencies = self.latencies.lock();

        let avg = |call: &str| -> Option<f64> {
            let vals: Vec<f64> = latencies
                .iter()
                .filter(|r| r.call == call)
                .map(|r| r.duration_ms as f64)
                .collect();
            if vals.is_empty() {
                None
            } else {
                Some(vals.iter().sum::<f64>() / vals.len() as f64)
            }
        };

        let recent: Vec<LatencyRecord> = latencies.iter().rev().take(20).cloned().collect();

        PollMetricsSummary {
            jobs_submitted: c.jobs_submitted,
            status_polls: c.status_polls,
            status_ok: c.status_ok,
            status_failed: c.status_failed,
            results_fetched: c.results_fetched,
            results_failed: c.results_failed,
            avg_latency_ms: AvgLatency {
                submit: avg("submit"),
                status: avg("status"),
                result: avg("result"),
            },
            recent_latencies: recent,
        }
    }
}

impl Default for PollMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters() {
        let m = PollMetrics::new();
        m.inc_jobs_submitted();
        m.inc_status_polls();
        m.inc_status_polls();
        m.record_status(true);
        m.record_status(false);
        m.record_result(true);

        let s = m.summary();
        assert_eq!(s.jobs_submitted, 1);
        assert_eq!(s.status_polls, 2);
        assert_eq!(s.status_ok, 1);
        assert_eq!(s.status_failed, 1);
        assert_eq!(s.results_fetched, 1);
        assert_eq!(s.results_failed, 0);
    }

    #[test]
    fn test_latency_recording() {
        let m = PollMetrics::new();
        m.record_latency("status", 120);
        m.record_latency("status", 80);
        m.record_latency("result", 200);

        let s = m.summary();
        assert!((s.avg_latency_ms.status.unwrap() - 100.0).abs() < f64::EPSILON);
        assert!((s.avg_latency_ms.result.unwrap() - 200.0).abs() < f64::EPSILON);
        assert!(s.avg_latency_ms.submit.is_none());
        assert_eq!(s.recent_latencies.len(), 3);
        assert_eq!(s.recent_latencies[0].call, "result");
    }

    #[test]
    fn test_latency_cap() {
        let m = PollMetrics::new();
        for i in 0..1100 {
            m.record_latency("status", i);
        }
        assert_eq!(m.latencies.lock().len(), LATENCY_CAP);
    }
}
