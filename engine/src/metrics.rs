//! Prometheus metrics for the engine.
//!
//! [`EngineMetrics`] owns a dedicated [`Registry`]; [`EngineMetrics::encode`]
//! renders it in the Prometheus text exposition format.

use prometheus::{
    register_histogram_with_registry, register_int_counter_with_registry, Encoder, Histogram,
    HistogramOpts, IntCounter, Opts, Registry, TextEncoder,
};

pub struct EngineMetrics {
    pub registry: Registry,

    // ── Counters ────────────────────────────────────────────────────────
    pub submissions: IntCounter,
    /// Votes recorded, affirmative or negative.
    pub votes: IntCounter,
    pub verifications: IntCounter,
    pub rejections: IntCounter,
    pub overrides: IntCounter,
    pub transfers: IntCounter,
    /// Tokens credited through rewards.
    pub tokens_rewarded: IntCounter,
    /// Commits refused because another writer got there first.
    pub version_conflicts: IntCounter,
    /// Store or identity calls that failed or timed out.
    pub backend_failures: IntCounter,
    /// Commits that outlived the io timeout and were waited out.
    pub slow_commits: IntCounter,

    // ── Histograms ──────────────────────────────────────────────────────
    /// Wall time of batch commits, in milliseconds.
    pub commit_latency_ms: Histogram,
}

impl EngineMetrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let submissions = register_int_counter_with_registry!(
            Opts::new("roadwatch_submissions_total", "Reports accepted"),
            registry
        )
        .expect("failed to register submissions counter");

        let votes = register_int_counter_with_registry!(
            Opts::new("roadwatch_votes_total", "Votes recorded on reports"),
            registry
        )
        .expect("failed to register votes counter");

        let verifications = register_int_counter_with_registry!(
            Opts::new(
                "roadwatch_verifications_total",
                "Reports that reached quorum"
            ),
            registry
        )
        .expect("failed to register verifications counter");

        let rejections = register_int_counter_with_registry!(
            Opts::new(
                "roadwatch_rejections_total",
                "Reports rejected by vote or by an administrator"
            ),
            registry
        )
        .expect("failed to register rejections counter");

        let overrides = register_int_counter_with_registry!(
            Opts::new(
                "roadwatch_admin_overrides_total",
                "Reports verified by administrator override"
            ),
            registry
        )
        .expect("failed to register overrides counter");

        let transfers = register_int_counter_with_registry!(
            Opts::new("roadwatch_transfers_total", "Token transfers between accounts"),
            registry
        )
        .expect("failed to register transfers counter");

        let tokens_rewarded = register_int_counter_with_registry!(
            Opts::new("roadwatch_tokens_rewarded_total", "Tokens paid as rewards"),
            registry
        )
        .expect("failed to register tokens_rewarded counter");

        let version_conflicts = register_int_counter_with_registry!(
            Opts::new(
                "roadwatch_version_conflicts_total",
                "Commits retried after a concurrent write"
            ),
            registry
        )
        .expect("failed to register version_conflicts counter");

        let backend_failures = register_int_counter_with_registry!(
            Opts::new(
                "roadwatch_backend_failures_total",
                "Store or identity calls that failed or timed out"
            ),
            registry
        )
        .expect("failed to register backend_failures counter");

        let slow_commits = register_int_counter_with_registry!(
            Opts::new(
                "roadwatch_slow_commits_total",
                "Commits that outlived the io timeout"
            ),
            registry
        )
        .expect("failed to register slow_commits counter");

        // 0.1 ms → ~1.6 s.
        let commit_latency_ms = register_histogram_with_registry!(
            HistogramOpts::new(
                "roadwatch_commit_latency_ms",
                "Batch commit latency in milliseconds"
            )
            .buckets(prometheus::exponential_buckets(0.1, 2.0, 15).expect("valid bucket layout")),
            registry
        )
        .expect("failed to register commit_latency_ms histogram");

        Self {
            registry,
            submissions,
            votes,
            verifications,
            rejections,
            overrides,
            transfers,
            tokens_rewarded,
            version_conflicts,
            backend_failures,
            slow_commits,
            commit_latency_ms,
        }
    }

    /// Render every metric in the Prometheus text format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer)
            .map_err(|e| prometheus::Error::Msg(format!("metrics are not UTF-8: {e}")))
    }

    /// Name and help text of every exported metric family, sorted by name.
    pub fn describe(&self) -> Vec<(String, String)> {
        let mut families: Vec<(String, String)> = self
            .registry
            .gather()
            .iter()
            .map(|mf| (mf.get_name().to_string(), mf.get_help().to_string()))
            .collect();
        families.sort();
        families
    }
}

impl Default for EngineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_contains_counters() {
        let m = EngineMetrics::new();
        m.submissions.inc();
        m.commit_latency_ms.observe(1.5);
        let text = m.encode().unwrap();
        assert!(text.contains("roadwatch_submissions_total 1"));
        assert!(text.contains("roadwatch_commit_latency_ms_bucket"));
    }

    #[test]
    fn describe_lists_every_family() {
        let m = EngineMetrics::new();
        let names: Vec<String> = m.describe().into_iter().map(|(name, _)| name).collect();
        assert!(names.contains(&"roadwatch_submissions_total".to_string()));
        assert!(names.contains(&"roadwatch_slow_commits_total".to_string()));
        assert!(names.contains(&"roadwatch_commit_latency_ms".to_string()));
        assert_eq!(names.len(), 11);
    }
}
