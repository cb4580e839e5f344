// src/thresholds.rs

use std::collections::BTreeMap;

use crate::config::{Polarity, Threshold, ThresholdSpec};
use crate::error::QcError;
use crate::types::{qc_key, MetricValues, Verdict, VerdictRecord};

/// Place `value` in the pass, warn or fail band of `threshold`.
///
/// Ascending (higher is better):  v >= pass -> Pass, fail < v < pass -> Warn, v <= fail -> Fail
/// Descending (lower is better):  v <= pass -> Pass, pass < v < fail -> Warn, v >= fail -> Fail
///
/// A NaN value falls through to Fail.
pub fn classify_value(value: f64, threshold: &Threshold) -> Verdict {
    match threshold.polarity() {
        Polarity::Ascending => {
            if value >= threshold.pass {
                Verdict::Pass
            } else if value > threshold.fail {
                Verdict::Warn
            } else {
                Verdict::Fail
            }
        }
        Polarity::Descending => {
            if value <= threshold.pass {
                Verdict::Pass
            } else if value < threshold.fail {
                Verdict::Warn
            } else {
                Verdict::Fail
            }
        }
    }
}

/// Judge every thresholded metric and return the values together with a
/// `<metric>_qc` verdict for each. Values without a threshold are carried
/// through unjudged.
pub fn classify(
    values: &MetricValues,
    thresholds: &ThresholdSpec,
) -> Result<VerdictRecord, QcError> {
    let mut verdicts = BTreeMap::new();

    for (metric, threshold) in thresholds.iter() {
        let value = values
            .get(metric)
            .copied()
            .ok_or_else(|| QcError::MissingMetric(metric.clone()))?;
        let verdict = classify_value(value, threshold);
        log::debug!(
            "{metric} = {value} (pass {}, fail {}) => {verdict}",
            threshold.pass,
            threshold.fail
        );
        verdicts.insert(qc_key(metric), verdict);
    }

    Ok(VerdictRecord::new(values.clone(), verdicts))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::QcConfig;

    const ASC: Threshold = Threshold { pass: 80.0, fail: 60.0 };
    const DESC: Threshold = Threshold { pass: 5.0, fail: 20.0 };

    #[test]
    fn ascending_bands() {
        assert_eq!(classify_value(95.0, &ASC), Verdict::Pass);
        assert_eq!(classify_value(80.0, &ASC), Verdict::Pass);
        assert_eq!(classify_value(79.9, &ASC), Verdict::Warn);
        assert_eq!(classify_value(60.1, &ASC), Verdict::Warn);
        assert_eq!(classify_value(60.0, &ASC), Verdict::Fail);
        assert_eq!(classify_value(-1.0, &ASC), Verdict::Fail);
    }

    #[test]
    fn descending_bands() {
        assert_eq!(classify_value(0.0, &DESC), Verdict::Pass);
        assert_eq!(classify_value(5.0, &DESC), Verdict::Pass);
        assert_eq!(classify_value(5.1, &DESC), Verdict::Warn);
        assert_eq!(classify_value(19.9, &DESC), Verdict::Warn);
        assert_eq!(classify_value(20.0, &DESC), Verdict::Fail);
        assert_eq!(classify_value(1e9, &DESC), Verdict::Fail);
    }

    #[test]
    fn bands_partition_the_line() {
        // Walk across both thresholds; verdicts must step monotonically
        // through the three bands with no value left out.
        for threshold in [ASC, DESC] {
            let mut seen = Vec::new();
            let mut v = -10.0;
            while v <= 110.0 {
                let verdict = classify_value(v, &threshold);
                if seen.last() != Some(&verdict) {
                    seen.push(verdict);
                }
                v += 0.25;
            }
            let expected = match threshold.polarity() {
                Polarity::Ascending => [Verdict::Fail, Verdict::Warn, Verdict::Pass],
                Polarity::Descending => [Verdict::Pass, Verdict::Warn, Verdict::Fail],
            };
            assert_eq!(seen, expected);
        }
    }

    #[test]
    fn nan_fails() {
        assert_eq!(classify_value(f64::NAN, &ASC), Verdict::Fail);
        assert_eq!(classify_value(f64::NAN, &DESC), Verdict::Fail);
    }

    #[test]
    fn missing_metric_is_an_error() {
        let config = QcConfig::bundled().unwrap();
        let mut values = MetricValues::new();
        values.insert("total_reads".into(), 50_000.0);
        let err = classify(&values, &config.thresholds).unwrap_err();
        assert!(matches!(err, QcError::MissingMetric(_)));
    }

    #[test]
    fn unthresholded_values_are_carried() {
        let config = QcConfig::from_yaml_str(
            "sample_thresholds:\n  total_reads:\n    pass: 10000\n    fail: 2000\n",
        )
        .unwrap();
        let mut values = MetricValues::new();
        values.insert("total_reads".into(), 5000.0);
        values.insert("percentage_host".into(), 3.0);

        let record = classify(&values, &config.thresholds).unwrap();
        assert_eq!(record.verdict("total_reads_qc"), Some(Verdict::Warn));
        assert_eq!(record.verdict("percentage_host_qc"), None);
        assert_eq!(record.value("percentage_host"), Some(3.0));
        assert_eq!(record.verdicts().len(), 1);
    }
}
