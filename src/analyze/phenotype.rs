//! Mapping of diplotypes to metabolizer phenotypes.

use std::str::FromStr as _;

use crate::common::Gene;

/// Metabolizer phenotype of a gene.
///
/// Parsing from text ignores ASCII case.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Deserialize,
    serde::Serialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[strum(ascii_case_insensitive)]
pub enum Phenotype {
    /// Poor metabolizer.
    #[serde(rename = "PM")]
    #[strum(serialize = "PM")]
    Poor,
    /// Intermediate metabolizer.
    #[serde(rename = "IM")]
    #[strum(serialize = "IM")]
    Intermediate,
    /// Normal metabolizer.
    #[serde(rename = "NM")]
    #[strum(serialize = "NM")]
    Normal,
    /// Rapid metabolizer.
    #[serde(rename = "RM")]
    #[strum(serialize = "RM")]
    Rapid,
    /// Ultra-rapid metabolizer.
    #[serde(rename = "URM")]
    #[strum(serialize = "URM")]
    UltraRapid,
    /// Not determinable.
    #[serde(rename = "Unknown")]
    #[strum(serialize = "Unknown")]
    Unknown,
}

/// Determine the phenotype for a gene given by its symbol.
///
/// Symbols outside of the supported pharmacogenes yield
/// [`Phenotype::Unknown`].
pub fn determine(gene: &str, diplotype: &str) -> Phenotype {
    match Gene::from_str(gene) {
        Ok(gene) => determine_for(gene, diplotype),
        Err(_) => Phenotype::Unknown,
    }
}

/// Determine the phenotype of `gene` from its `diplotype`.
///
/// The diplotype string is tested for containing allele patterns, the most
/// severe category first.  Containment is textual, so `*2` also matches
/// inside `*21`.
pub fn determine_for(gene: Gene, diplotype: &str) -> Phenotype {
    let has = |pattern: &str| diplotype.contains(pattern);
    let has_any = |patterns: &[&str]| patterns.iter().any(|&pattern| has(pattern));

    let phenotype = match gene {
        Gene::Cyp2d6 => {
            if has("*4/*4") {
                Phenotype::Poor
            } else if has("*4") {
                Phenotype::Intermediate
            } else if has("*2") {
                Phenotype::Rapid
            } else {
                Phenotype::Normal
            }
        }
        Gene::Cyp2c19 => {
            if has("*2/*2") {
                Phenotype::Poor
            } else if has("*2") {
                Phenotype::Intermediate
            } else if has("*17") {
                Phenotype::Rapid
            } else {
                Phenotype::Normal
            }
        }
        Gene::Cyp2c9 => {
            if has("*3/*3") {
                Phenotype::Poor
            } else if has_any(&["*2", "*3"]) {
                Phenotype::Intermediate
            } else {
                Phenotype::Normal
            }
        }
        Gene::Slco1b1 | Gene::Tpmt | Gene::Dpyd => {
            if has_any(&["*2", "*3", "*5"]) {
                Phenotype::Intermediate
            } else {
                Phenotype::Normal
            }
        }
    };

    tracing::debug!("{} {} -> {}", gene, diplotype, phenotype);
    phenotype
}
