use serde::Deserialize;

/// Resolution policy for ambiguous numeric dates such as `01/02/2024`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatePolicy {
    /// Month first (US convention): `01/02/2024` is January 2.
    Mdy,
    /// Day first: `01/02/2024` is February 1.
    Dmy,
}

/// Tuning knobs for the extraction core.
///
/// All fields have working defaults; construct with `CoreConfig::default()`
/// and override what you need. The struct also deserializes from YAML/JSON so
/// callers can thread it through their own configuration layer.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// Threads driving ingest and emit (the I/O stages).
    pub io_workers: usize,
    /// Threads driving structure/classify/detect/normalize.
    pub cpu_workers: usize,
    /// Capacity of each inter-stage channel. Senders block when full.
    pub queue_max_size: usize,
    /// Combined detect+normalize budget per document, in milliseconds.
    /// On expiry the document is emitted with `status=partial`.
    pub per_doc_timeout_ms: u64,
    /// Documents larger than this are rejected at ingest with `InputTooLarge`.
    pub max_bytes: usize,
    pub ambiguous_date_policy: DatePolicy,
    /// First month of the fiscal year, 1..=12. The default of 1 makes fiscal
    /// years coincide with calendar years.
    pub fiscal_year_anchor: u32,
    /// Sink delivery attempts before a record is dropped and reported.
    pub sink_retry_max: u32,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            io_workers: 1,
            cpu_workers: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            queue_max_size: 100,
            per_doc_timeout_ms: 5_000,
            max_bytes: 50 * 1024 * 1024,
            ambiguous_date_policy: DatePolicy::Mdy,
            fiscal_year_anchor: 1,
            sink_retry_max: 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let cfg = CoreConfig::default();
        assert_eq!(cfg.io_workers, 1);
        assert!(cfg.cpu_workers >= 1);
        assert_eq!(cfg.queue_max_size, 100);
        assert_eq!(cfg.ambiguous_date_policy, DatePolicy::Mdy);
    }

    #[test]
    fn deserializes_partial_overrides() {
        let cfg: CoreConfig =
            serde_yaml::from_str("cpu_workers: 2\nambiguous_date_policy: dmy\n").unwrap();
        assert_eq!(cfg.cpu_workers, 2);
        assert_eq!(cfg.ambiguous_date_policy, DatePolicy::Dmy);
        assert_eq!(cfg.queue_max_size, 100);
    }
}
