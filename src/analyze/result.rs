//! Data structures for the final analysis result and their assembly.

use chrono::{DateTime, Utc};
use itertools::Itertools as _;

use crate::common::{Drug, Gene};
use crate::predict::Prediction;

use super::{
    explain::{Context, Explanation},
    phenotype::Phenotype,
    rules::{RiskLabel, Severity, Verdict},
    vcf::VariantRecord,
};

/// Everything the pipeline stages determined for one drug.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct Assessment {
    /// The drug.
    pub drug: Drug,
    /// The gene governing the drug.
    pub gene: Gene,
    /// The diplotype of `gene`, `Unknown` if it had no records.
    pub diplotype: String,
    /// The phenotype of `gene`.
    pub phenotype: Phenotype,
    /// All retained records, of all genes.
    pub records: Vec<VariantRecord>,
    /// The verdict of the clinical rules.
    pub verdict: Verdict,
    /// The parser warnings.
    pub warnings: Vec<String>,
}

impl Assessment {
    /// The context handed to the explanation generator.
    pub fn context(&self) -> Context {
        Context {
            drug: self.drug,
            gene: self.gene,
            diplotype: self.diplotype.clone(),
            phenotype: self.phenotype,
            risk_label: self.verdict.risk_label,
        }
    }
}

/// Risk assessment section.
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct RiskAssessment {
    /// Risk label from the clinical rules.
    pub risk_label: RiskLabel,
    /// Probability of the advisory estimate, if one was made.
    pub confidence_score: Option<f64>,
    /// Severity from the clinical rules.
    pub severity: Severity,
    /// Label of the advisory estimate, if one was made.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub advisory_label: Option<String>,
}

/// Pharmacogenomic profile section.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct PharmacogenomicProfile {
    /// Gene governing the drug.
    pub primary_gene: Gene,
    /// Its diplotype.
    pub diplotype: String,
    /// Its phenotype.
    pub phenotype: Phenotype,
    /// All retained variant records.
    pub detected_variants: Vec<VariantRecord>,
}

/// Clinical recommendation section.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct ClinicalRecommendation {
    /// One-sentence recommendation.
    pub recommendation_summary: String,
    /// The guideline the rules follow.
    pub cpic_guideline_reference: String,
    /// The action to take.
    pub recommended_action: String,
}

/// Quality metrics section.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct QualityMetrics {
    /// Always `true`; structural failures produce no result.
    pub vcf_parsing_success: bool,
    /// Number of retained records.
    pub variants_detected: usize,
    /// Number of distinct genes among the retained records.
    pub genes_matched: usize,
    /// Number of drugs evaluated.
    pub drugs_processed: usize,
    /// Parser warnings.
    pub annotation_warnings: Vec<String>,
}

/// The final, immutable result of one analysis.
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct AnalysisResult {
    /// Identifier derived from the time of the analysis.
    pub patient_id: String,
    /// The drug.
    pub drug: Drug,
    /// Time of the analysis.
    pub timestamp: DateTime<Utc>,
    /// Risk assessment.
    pub risk_assessment: RiskAssessment,
    /// Pharmacogenomic profile.
    pub pharmacogenomic_profile: PharmacogenomicProfile,
    /// Clinical recommendation.
    pub clinical_recommendation: ClinicalRecommendation,
    /// Explanation, generated or templated.
    pub llm_generated_explanation: Explanation,
    /// Quality metrics.
    pub quality_metrics: QualityMetrics,
}

/// Recommendation sentence for `drug` with the given risk.
pub fn recommendation_summary(drug: Drug, risk_label: RiskLabel) -> String {
    match risk_label {
        RiskLabel::Safe => format!("{} can be prescribed at standard dosage.", drug),
        RiskLabel::AdjustDosage => format!("{} requires dosage adjustment.", drug),
        RiskLabel::Toxic => format!("Avoid {} due to high toxicity risk.", drug),
        RiskLabel::Ineffective => format!("{} may be ineffective due to metabolic variation.", drug),
        RiskLabel::Unknown => String::from("Consult specialist."),
    }
}

/// Action to take for the given risk.
pub fn recommended_action(risk_label: RiskLabel) -> &'static str {
    match risk_label {
        RiskLabel::Safe => "Proceed with standard treatment.",
        RiskLabel::AdjustDosage => "Reduce or adjust dosage.",
        RiskLabel::Toxic => "Avoid drug and use alternative.",
        RiskLabel::Ineffective => "Consider alternative therapy.",
        RiskLabel::Unknown => "Further evaluation required.",
    }
}

/// Assemble the final result.
///
/// # Arguments
///
/// * `assessment` - Outcome of the pipeline stages.
/// * `advisory` - Advisory estimate, if any.
/// * `explanation` - Generated or templated explanation.
/// * `now` - Time of the analysis, used for identifier and timestamp.
///
/// # Returns
///
/// The analysis result.
pub fn assemble(
    assessment: Assessment,
    advisory: Option<Prediction>,
    explanation: Explanation,
    now: DateTime<Utc>,
) -> AnalysisResult {
    let Assessment {
        drug,
        gene,
        diplotype,
        phenotype,
        records,
        verdict,
        warnings,
    } = assessment;

    let quality_metrics = QualityMetrics {
        vcf_parsing_success: true,
        variants_detected: records.len(),
        genes_matched: records.iter().map(|record| record.gene).unique().count(),
        drugs_processed: 1,
        annotation_warnings: warnings,
    };
    let (advisory_label, confidence_score) = match advisory {
        Some(Prediction { label, confidence }) => (Some(label), Some(confidence)),
        None => (None, None),
    };

    AnalysisResult {
        patient_id: format!("PATIENT_{}", now.format("%H%M%S")),
        drug,
        timestamp: now,
        risk_assessment: RiskAssessment {
            risk_label: verdict.risk_label,
            confidence_score,
            severity: verdict.severity,
            advisory_label,
        },
        pharmacogenomic_profile: PharmacogenomicProfile {
            primary_gene: gene,
            diplotype,
            phenotype,
            detected_variants: records,
        },
        clinical_recommendation: ClinicalRecommendation {
            recommendation_summary: recommendation_summary(drug, verdict.risk_label),
            cpic_guideline_reference: format!("CPIC Guideline for {} and {}", gene, drug),
            recommended_action: recommended_action(verdict.risk_label).to_string(),
        },
        llm_generated_explanation: explanation,
        quality_metrics,
    }
}
