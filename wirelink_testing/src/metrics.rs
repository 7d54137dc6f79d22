//! Helpers around `metrics_util`'s debugging recorder.
//!
//! Taking a snapshot drains the recorder's counters, so tests take one
//! [`CounterSnapshot`] after the work under test and query it as often as
//! they need.

use metrics_util::debugging::{DebugValue, DebuggingRecorder, Snapshotter};

/// Create a debugging recorder and its snapshotter.
#[must_use]
pub fn debugging_recorder() -> (Snapshotter, DebuggingRecorder) {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    (snapshotter, recorder)
}

#[derive(Debug, Clone)]
struct CounterSample {
    name: String,
    labels: Vec<(String, String)>,
    value: u64,
}

/// Counter values captured from a single recorder snapshot.
#[derive(Debug, Clone, Default)]
pub struct CounterSnapshot {
    samples: Vec<CounterSample>,
}

impl CounterSnapshot {
    /// Capture every counter currently held by the recorder.
    #[must_use]
    pub fn take(snapshotter: &Snapshotter) -> Self {
        let samples = snapshotter
            .snapshot()
            .into_vec()
            .into_iter()
            .filter_map(|(key, _, _, value)| match value {
                DebugValue::Counter(value) => Some(CounterSample {
                    name: key.key().name().to_owned(),
                    labels: key
                        .key()
                        .labels()
                        .map(|l| (l.key().to_owned(), l.value().to_owned()))
                        .collect(),
                    value,
                }),
                _ => None,
            })
            .collect();
        Self { samples }
    }

    /// Sum of counter `name` across series carrying `label = value`, or all
    /// series when `label` is `None`.
    #[must_use]
    pub fn counter(&self, name: &str, label: Option<(&str, &str)>) -> u64 {
        self.samples
            .iter()
            .filter(|sample| sample.name == name)
            .filter(|sample| {
                label.is_none_or(|(k, v)| sample.labels.iter().any(|(lk, lv)| lk == k && lv == v))
            })
            .map(|sample| sample.value)
            .sum()
    }
}
