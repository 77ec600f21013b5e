//! Collapsing of per-gene star alleles into diplotypes.

use crate::common::Gene;

use super::vcf::{VariantRecord, UNKNOWN_ALLELE};

/// Mapping from gene to diplotype string such as `*1/*4`.
pub type DiplotypeMap = rustc_hash::FxHashMap<Gene, String>;

/// Build the diplotypes of all genes that have at least one record.
///
/// The alleles of each gene are taken in file order.  The first two form the
/// diplotype and any further alleles are ignored.  A single allele is paired
/// with `Unknown`.
///
/// # Arguments
///
/// * `records` - The retained variant records of one analysis.
///
/// # Returns
///
/// The diplotype per gene; genes without records have no entry.
pub fn build(records: &[VariantRecord]) -> DiplotypeMap {
    let mut alleles: rustc_hash::FxHashMap<Gene, Vec<&str>> = Default::default();
    for record in records {
        alleles
            .entry(record.gene)
            .or_default()
            .push(record.star_allele.as_str());
    }

    alleles
        .into_iter()
        .filter_map(|(gene, stars)| {
            let diplotype = match stars.as_slice() {
                [] => return None,
                [first] => format!("{}/{}", first, UNKNOWN_ALLELE),
                [first, second, ..] => format!("{}/{}", first, second),
            };
            Some((gene, diplotype))
        })
        .collect()
}

/// Diplotype of `gene`, or `Unknown` if the gene had no records.
pub fn diplotype_of(diplotypes: &DiplotypeMap, gene: Gene) -> String {
    diplotypes
        .get(&gene)
        .cloned()
        .unwrap_or_else(|| UNKNOWN_ALLELE.to_string())
}
