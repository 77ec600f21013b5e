//! CPIC-style clinical rules from drug and phenotype to risk.
//!
//! The table is the clinical source of truth.  Advisory estimates from a
//! predictor are reported alongside but never replace it.

use std::str::FromStr as _;

use crate::common::Drug;

use super::phenotype::Phenotype;

/// Risk label of a drug for a patient.
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
    strum::EnumIter,
)]
pub enum RiskLabel {
    /// Standard use.
    Safe,
    /// Dose needs adjustment.
    #[serde(rename = "Adjust Dosage")]
    #[strum(serialize = "Adjust Dosage")]
    AdjustDosage,
    /// Increased risk of toxicity.
    Toxic,
    /// Reduced or absent efficacy.
    Ineffective,
    /// No rule applies.
    Unknown,
}

/// Severity of the risk.
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
    strum::EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Severity {
    /// No clinical concern.
    None,
    /// Low, used for the unknown-drug sentinel.
    Low,
    /// Moderate.
    Moderate,
    /// High.
    High,
    /// Critical.
    Critical,
}

/// The outcome of the rule table for one drug and phenotype.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct Verdict {
    /// The risk label.
    pub risk_label: RiskLabel,
    /// The severity.
    pub severity: Severity,
}

impl Verdict {
    /// Construct from label and severity.
    pub const fn new(risk_label: RiskLabel, severity: Severity) -> Self {
        Self {
            risk_label,
            severity,
        }
    }

    /// Sentinel for drugs without rules.
    pub const UNKNOWN: Self = Self::new(RiskLabel::Unknown, Severity::Low);

    /// Default outcome of phenotypes without a specific rule.
    pub const SAFE: Self = Self::new(RiskLabel::Safe, Severity::None);
}

/// Assess the risk of a drug given by name.
///
/// The name is matched ignoring ASCII case but otherwise verbatim, so
/// surrounding whitespace is not stripped.  Drugs without rules yield the
/// `Unknown`/`low` sentinel.
pub fn assess(drug: &str, phenotype: Phenotype) -> Verdict {
    match Drug::from_str(drug) {
        Ok(drug) => assess_drug(drug, phenotype),
        Err(_) => {
            tracing::debug!("no rules for drug {:?}", drug);
            Verdict::UNKNOWN
        }
    }
}

/// Assess the risk of `drug` for a patient with `phenotype`.
pub fn assess_drug(drug: Drug, phenotype: Phenotype) -> Verdict {
    use Phenotype::{Intermediate, Poor, Rapid, UltraRapid};
    use RiskLabel::{AdjustDosage, Ineffective, Toxic};
    use Severity::{Critical, High, Moderate};

    match (drug, phenotype) {
        (Drug::Codeine, Poor) => Verdict::new(Ineffective, Moderate),
        (Drug::Codeine, Rapid | UltraRapid) => Verdict::new(Toxic, High),

        (Drug::Warfarin, Poor | Intermediate) => Verdict::new(AdjustDosage, Moderate),

        (Drug::Clopidogrel, Poor) => Verdict::new(Ineffective, High),
        (Drug::Clopidogrel, Intermediate) => Verdict::new(AdjustDosage, Moderate),

        (Drug::Simvastatin, Intermediate) => Verdict::new(AdjustDosage, Moderate),

        (Drug::Azathioprine, Intermediate) => Verdict::new(Toxic, High),

        (Drug::Fluorouracil, Intermediate) => Verdict::new(Toxic, Critical),

        (_, _) => Verdict::SAFE,
    }
}
