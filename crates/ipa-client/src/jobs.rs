//! Request/response correlation and per-job measurements.

use std::collections::BTreeMap;
use std::time::Instant;

use ipa_telegram::pretty::{pretty_duration_ms, pretty_size};
use serde::Serialize;

#[derive(Debug, Clone)]
struct JobRecord {
    request_size: u64,
    start: Instant,
}

/// Size and duration of one finished request/response pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct JobMeasurement {
    /// Request bytes plus response bytes.
    pub total_size: u64,
    pub duration_ms: u64,
}

/// Snapshot of the tracker counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct JobStats {
    pub total_requests: u64,
    pub in_progress: Vec<u32>,
    pub success: u64,
    pub fail: u64,
    pub broken_responses: u64,
    pub max_size: u64,
    pub max_duration_ms: u64,
}

impl std::fmt::Display for JobStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let in_progress = self
            .in_progress
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",");
        write!(
            f,
            "requests[total:{},inprogress:[{}],success:{},fail:{}], responses[broken:{}], max size:{}, max duration:{}",
            self.total_requests,
            in_progress,
            self.success,
            self.fail,
            self.broken_responses,
            pretty_size(self.max_size),
            pretty_duration_ms(self.max_duration_ms),
        )
    }
}

/// Tracks pending jobs by id and aggregates outcome statistics.
#[derive(Debug, Default)]
pub struct JobTracker {
    pending: BTreeMap<u32, JobRecord>,
    total_requests: u64,
    success: u64,
    fail: u64,
    broken_responses: u64,
    max_size: u64,
    max_duration_ms: u64,
    last_report: Option<String>,
}

impl JobTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking a sent request.
    ///
    /// A job id that is already pending keeps its first record.
    pub fn track_request(&mut self, job_id: u32, request_size: u64) {
        self.track_request_at(job_id, request_size, Instant::now());
    }

    pub fn track_request_at(&mut self, job_id: u32, request_size: u64, now: Instant) {
        if self.pending.contains_key(&job_id) {
            return;
        }
        self.pending.insert(
            job_id,
            JobRecord {
                request_size,
                start: now,
            },
        );
        self.total_requests += 1;
    }

    /// Finish a pending job and return its measurement.
    ///
    /// An unknown job id counts as a broken response and yields `None`.
    pub fn track_finish(
        &mut self,
        job_id: u32,
        success: bool,
        response_size: u64,
    ) -> Option<JobMeasurement> {
        self.track_finish_at(job_id, success, response_size, Instant::now())
    }

    pub fn track_finish_at(
        &mut self,
        job_id: u32,
        success: bool,
        response_size: u64,
        now: Instant,
    ) -> Option<JobMeasurement> {
        let Some(record) = self.pending.remove(&job_id) else {
            self.broken_responses += 1;
            return None;
        };

        if success {
            self.success += 1;
        } else {
            self.fail += 1;
        }

        let total_size = record.request_size + response_size;
        let duration_ms = u64::try_from(now.saturating_duration_since(record.start).as_millis())
            .unwrap_or(u64::MAX);
        self.max_size = self.max_size.max(total_size);
        self.max_duration_ms = self.max_duration_ms.max(duration_ms);

        Some(JobMeasurement {
            total_size,
            duration_ms,
        })
    }

    /// Count a response that could not be decoded or parsed.
    pub fn track_response_broken(&mut self) {
        self.broken_responses += 1;
    }

    /// Drop every pending job without recording an outcome.
    ///
    /// Returns how many were dropped.
    pub fn abandon_pending(&mut self) -> usize {
        let count = self.pending.len();
        self.pending.clear();
        count
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn is_pending(&self, job_id: u32) -> bool {
        self.pending.contains_key(&job_id)
    }

    pub fn stats(&self) -> JobStats {
        JobStats {
            total_requests: self.total_requests,
            in_progress: self.pending.keys().copied().collect(),
            success: self.success,
            fail: self.fail,
            broken_responses: self.broken_responses,
            max_size: self.max_size,
            max_duration_ms: self.max_duration_ms,
        }
    }

    /// Render the statistics line.
    ///
    /// With `skip_if_unchanged`, returns `None` when the line equals the last
    /// one returned.
    pub fn report(&mut self, skip_if_unchanged: bool) -> Option<String> {
        let line = self.stats().to_string();
        if skip_if_unchanged && self.last_report.as_deref() == Some(line.as_str()) {
            return None;
        }
        self.last_report = Some(line.clone());
        Some(line)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn finish_returns_total_size_and_duration() {
        let mut tracker = JobTracker::new();
        let start = Instant::now();
        tracker.track_request_at(7, 100, start);

        let m = tracker
            .track_finish_at(7, true, 50, start + Duration::from_millis(30))
            .unwrap();
        assert_eq!(m.total_size, 150);
        assert_eq!(m.duration_ms, 30);
        assert_eq!(tracker.pending_count(), 0);
    }

    #[test]
    fn immediate_finish_is_near_zero() {
        let mut tracker = JobTracker::new();
        tracker.track_request(7, 100);
        let m = tracker.track_finish(7, true, 50).unwrap();
        assert_eq!(m.total_size, 150);
        assert!(m.duration_ms < 1000);
    }

    #[test]
    fn unknown_job_counts_as_broken() {
        let mut tracker = JobTracker::new();
        tracker.track_request(7, 100);

        assert!(tracker.track_finish(8, true, 50).is_none());
        let stats = tracker.stats();
        assert_eq!(stats.broken_responses, 1);
        assert_eq!(stats.in_progress, vec![7]);
    }

    #[test]
    fn duplicate_request_keeps_first_record() {
        let mut tracker = JobTracker::new();
        let start = Instant::now();
        tracker.track_request_at(1, 10, start);
        tracker.track_request_at(1, 999, start + Duration::from_millis(5));

        let m = tracker
            .track_finish_at(1, false, 0, start + Duration::from_millis(10))
            .unwrap();
        assert_eq!(m.total_size, 10);
        assert_eq!(m.duration_ms, 10);

        let stats = tracker.stats();
        assert_eq!(stats.total_requests, 1);
        assert_eq!(stats.fail, 1);
    }

    #[test]
    fn maxima_follow_largest_job() {
        let mut tracker = JobTracker::new();
        let start = Instant::now();
        tracker.track_request_at(1, 10, start);
        tracker.track_request_at(2, 2000, start);
        tracker.track_finish_at(2, true, 48, start + Duration::from_millis(1500));
        tracker.track_finish_at(1, true, 0, start + Duration::from_millis(2));

        let stats = tracker.stats();
        assert_eq!(stats.max_size, 2048);
        assert_eq!(stats.max_duration_ms, 1500);
        assert_eq!(stats.success, 2);
    }

    #[test]
    fn abandon_drops_pending_without_outcome() {
        let mut tracker = JobTracker::new();
        tracker.track_request(1, 1);
        tracker.track_request(2, 1);

        assert_eq!(tracker.abandon_pending(), 2);
        assert!(!tracker.is_pending(1));
        let stats = tracker.stats();
        assert_eq!(stats.success + stats.fail, 0);
        assert_eq!(stats.total_requests, 2);
    }

    #[test]
    fn report_format_and_dedup() {
        let mut tracker = JobTracker::new();
        tracker.track_request(3, 10);
        tracker.track_request(4, 10);

        let line = tracker.report(true).unwrap();
        assert_eq!(
            line,
            "requests[total:2,inprogress:[3,4],success:0,fail:0], responses[broken:0], max size:0bytes, max duration:0 ms"
        );
        assert!(tracker.report(true).is_none());
        assert!(tracker.report(false).is_some());

        tracker.track_response_broken();
        assert!(tracker
            .report(true)
            .unwrap()
            .contains("responses[broken:1]"));
    }
}
