// src/proportions.rs

use ahash::AHashMap;
use serde::Serialize;

use crate::config::{CategoryMarkers, TaxonMarker};
use crate::error::QcError;
use crate::types::{Category, ClassificationRecord, MetricValues};

/// Read count and share of total reads for one slice of the sample.
#[derive(Default, Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CategoryStats {
    /// Reads in the category, descendants included
    pub count_descendants: u64,
    /// Share of all reads, 0-100
    pub percentage: f64,
}

/// Summary statistics for one sample's classifier calls.
///
/// Every category is always present; one with no matching records holds
/// zero reads at zero percent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProportionSummary {
    /// Sum of `count_direct` over every record
    pub total_reads: u64,
    pub unclassified: CategoryStats,
    pub spike_in: CategoryStats,
    pub host: CategoryStats,
    /// All genus-rank records summed together
    pub genus: CategoryStats,
}

impl ProportionSummary {
    pub fn category(&self, category: Category) -> CategoryStats {
        match category {
            Category::Unclassified => self.unclassified,
            Category::SpikeIn => self.spike_in,
            Category::Host => self.host,
        }
    }

    /// Flatten into `total_reads`, `count_descendants_<x>` and
    /// `percentage_<x>` metrics, the names thresholds are written against.
    pub fn metrics(&self) -> MetricValues {
        let mut metrics = MetricValues::new();
        metrics.insert("total_reads".to_string(), self.total_reads as f64);

        let named = Category::ALL
            .iter()
            .map(|&c| (c.key(), self.category(c)))
            .chain(std::iter::once(("genus", self.genus)));
        for (key, stats) in named {
            metrics.insert(format!("count_descendants_{key}"), stats.count_descendants as f64);
            metrics.insert(format!("percentage_{key}"), stats.percentage);
        }
        metrics
    }
}

/// Index the records by taxon id so id-based category lookups are a single
/// lookup instead of a scan per category.
pub fn build_taxon_index(
    records: &[ClassificationRecord],
) -> AHashMap<u32, Vec<&ClassificationRecord>> {
    let mut index: AHashMap<u32, Vec<&ClassificationRecord>> = AHashMap::new();
    for record in records {
        index.entry(record.taxon_id).or_default().push(record);
    }
    index
}

/// Find the single record for `category`.
///  - no match     => zero reads, zero percent
///  - one match    => its descendant count and percentage verbatim
///  - more matches => `AmbiguousCategory`, the input is malformed
pub fn lookup_category(
    records: &[ClassificationRecord],
    index: &AHashMap<u32, Vec<&ClassificationRecord>>,
    marker: &TaxonMarker,
    category: Category,
) -> Result<CategoryStats, QcError> {
    let matches: Vec<&ClassificationRecord> = match marker {
        TaxonMarker::TaxonId(id) => index.get(id).cloned().unwrap_or_default(),
        TaxonMarker::Name(_) => records.iter().filter(|r| marker.matches(r)).collect(),
    };

    match matches.as_slice() {
        [] => {
            log::debug!("No {category} record found, counting it as zero");
            Ok(CategoryStats::default())
        }
        [record] => Ok(CategoryStats {
            count_descendants: record.count_descendants,
            percentage: record.percentage,
        }),
        many => Err(QcError::AmbiguousCategory {
            category,
            matches: many.len(),
        }),
    }
}

/// Sum descendant counts over every record at `genus_rank`.
/// The percentage is taken against `total_reads`, and is zero when there are
/// no reads at all.
pub fn genus_stats(
    records: &[ClassificationRecord],
    genus_rank: &str,
    total_reads: u64,
) -> CategoryStats {
    let count_descendants: u64 = records
        .iter()
        .filter(|r| r.rank == genus_rank)
        .map(|r| r.count_descendants)
        .sum();

    let percentage = if total_reads == 0 {
        0.0
    } else {
        100.0 * count_descendants as f64 / total_reads as f64
    };

    CategoryStats {
        count_descendants,
        percentage,
    }
}

/// Reduce a sample's classifier calls to its proportion summary:
///  1) total reads from the direct counts
///  2) unclassified, spike-in and host lookups
///  3) genus aggregation
pub fn summarize(
    records: &[ClassificationRecord],
    markers: &CategoryMarkers,
) -> Result<ProportionSummary, QcError> {
    if records.is_empty() {
        return Err(QcError::EmptyInput);
    }

    let total_reads: u64 = records.iter().map(|r| r.count_direct).sum();
    let index = build_taxon_index(records);

    let [unclassified, spike_in, host] = Category::ALL
        .map(|category| lookup_category(records, &index, markers.marker(category), category));
    let (unclassified, spike_in, host) = (unclassified?, spike_in?, host?);
    let genus = genus_stats(records, &markers.genus_rank, total_reads);

    log::debug!(
        "Summarized {} records: {} reads, {:.2}% unclassified, {:.2}% genus",
        records.len(),
        total_reads,
        unclassified.percentage,
        genus.percentage
    );

    Ok(ProportionSummary {
        total_reads,
        unclassified,
        spike_in,
        host,
        genus,
    })
}
