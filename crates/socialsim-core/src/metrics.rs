//! Metric definitions and their time series.
//!
//! Every defined metric owns a series, created empty when the metric is
//! created and dropped when it is deleted. Samples are only appended by the
//! evaluator, always clamped into the metric's range.

use std::collections::BTreeMap;

use socialsim_types::{Metric, MetricData, MetricDraft, MetricId, MetricSample};

use crate::error::StateError;

/// Metric definitions plus one sample series per metric.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricStore {
    metrics: Vec<Metric>,
    data: MetricData,
}

impl MetricStore {
    /// Create an empty store.
    pub const fn new() -> Self {
        Self {
            metrics: Vec::new(),
            data: BTreeMap::new(),
        }
    }

    /// All metric definitions in creation order.
    pub fn list(&self) -> &[Metric] {
        &self.metrics
    }

    /// Whether no metric is defined.
    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }

    /// Every series, keyed by metric ID.
    pub const fn data(&self) -> &MetricData {
        &self.data
    }

    /// The series of one metric.
    pub fn series(&self, id: MetricId) -> Option<&[MetricSample]> {
        self.data.get(&id).map(Vec::as_slice)
    }

    /// Create a metric or replace an existing definition.
    ///
    /// Replacing keeps the metric's series.
    ///
    /// # Errors
    ///
    /// [`StateError::EmptyName`], [`StateError::InvalidRange`] when the
    /// bounds are inverted or not finite, or [`StateError::MetricNotFound`]
    /// for an unknown ID.
    pub fn upsert(&mut self, draft: MetricDraft) -> Result<Metric, StateError> {
        validate_draft(&draft)?;

        match draft.id {
            None => {
                let metric = draft.into_metric(MetricId::new());
                self.data.insert(metric.id, Vec::new());
                self.metrics.push(metric.clone());
                Ok(metric)
            }
            Some(id) => {
                let slot = self
                    .metrics
                    .iter_mut()
                    .find(|m| m.id == id)
                    .ok_or(StateError::MetricNotFound(id))?;
                *slot = draft.into_metric(id);
                Ok(slot.clone())
            }
        }
    }

    /// Delete a metric and its series.
    ///
    /// # Errors
    ///
    /// [`StateError::MetricNotFound`] if no metric has this ID.
    pub fn remove(&mut self, id: MetricId) -> Result<Metric, StateError> {
        let position = self
            .metrics
            .iter()
            .position(|m| m.id == id)
            .ok_or(StateError::MetricNotFound(id))?;
        self.data.remove(&id);
        Ok(self.metrics.remove(position))
    }

    /// Record evaluated scores for `round`, keyed by metric name.
    ///
    /// Names that match no metric are ignored, as are non-finite values.
    /// Returns the number of samples appended.
    pub fn apply_scores(&mut self, round: u64, scores: &BTreeMap<String, f64>) -> usize {
        let mut applied = 0_usize;
        for metric in &self.metrics {
            let Some(raw) = scores.get(&metric.name) else {
                continue;
            };
            if !raw.is_finite() {
                continue;
            }
            self.data.entry(metric.id).or_default().push(MetricSample {
                round,
                value: metric.clamp(*raw),
            });
            applied = applied.saturating_add(1);
        }
        applied
    }

    /// Empty every series, keeping the definitions.
    pub(crate) fn truncate_series(&mut self) {
        for series in self.data.values_mut() {
            series.clear();
        }
    }

    /// Replace definitions and data wholesale.
    ///
    /// Every metric ends up with a series; data for unknown IDs is dropped.
    /// Samples are clamped into their metric's range and non-finite ones
    /// are dropped.
    pub(crate) fn replace(&mut self, metrics: Vec<Metric>, mut data: MetricData) {
        self.data = metrics
            .iter()
            .map(|m| {
                let series = data
                    .remove(&m.id)
                    .unwrap_or_default()
                    .into_iter()
                    .filter(|s| s.value.is_finite())
                    .map(|s| MetricSample {
                        round: s.round,
                        value: m.clamp(s.value),
                    })
                    .collect();
                (m.id, series)
            })
            .collect();
        self.metrics = metrics;
    }
}

/// Check a metric draft without storing it.
///
/// # Errors
///
/// [`StateError::EmptyName`] or [`StateError::InvalidRange`].
pub fn validate_draft(draft: &MetricDraft) -> Result<(), StateError> {
    validate_definition(&draft.name, draft.min, draft.max)
}

/// Check a stored metric, as found in an imported snapshot.
///
/// # Errors
///
/// [`StateError::EmptyName`] or [`StateError::InvalidRange`].
pub fn validate_metric(metric: &Metric) -> Result<(), StateError> {
    validate_definition(&metric.name, metric.min, metric.max)
}

fn validate_definition(name: &str, min: f64, max: f64) -> Result<(), StateError> {
    if name.trim().is_empty() {
        return Err(StateError::EmptyName);
    }
    if !min.is_finite() || !max.is_finite() || min > max {
        return Err(StateError::InvalidRange { min, max });
    }
    Ok(())
}
