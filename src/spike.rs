// src/spike.rs

use crate::error::QcError;
use crate::types::{qc_key, Verdict, VerdictRecord};

/// Verdict key recording whether the spike-in control was seen at all.
pub const SPIKE_DETECTED: &str = "spike_detected";
pub const SPIKE_IN_COUNT: &str = "count_descendants_spike_in";
pub const SPIKE_IN_PERCENTAGE: &str = "percentage_spike_in";

/// Record spike-in detection on top of the threshold verdicts.
///
/// With zero spike-in reads the control failed outright, and a percentage of
/// nothing says nothing, so the percentage verdict becomes `NA`. Otherwise
/// the percentage verdict is left as it was.
pub fn apply_spike_override(record: VerdictRecord) -> Result<VerdictRecord, QcError> {
    let count = record
        .value(SPIKE_IN_COUNT)
        .ok_or_else(|| QcError::MissingMetric(SPIKE_IN_COUNT.to_string()))?;

    if count == 0.0 {
        log::info!("Spike-in not detected");
        Ok(record
            .with_verdict(SPIKE_DETECTED, Verdict::Fail)
            .with_verdict(qc_key(SPIKE_IN_PERCENTAGE), Verdict::NotApplicable))
    } else {
        Ok(record.with_verdict(SPIKE_DETECTED, Verdict::Pass))
    }
}
