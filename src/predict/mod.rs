//! Advisory risk estimates from a trained classifier.
//!
//! The classifier is exported as a TSV table of class probabilities per drug
//! and phenotype.  Its estimates are metadata only; the clinical rules in
//! [`crate::analyze::rules`] always decide the risk label.

use std::{io::BufReader, path::Path, path::PathBuf};

use clap::Parser;

use crate::{analyze::phenotype::Phenotype, common::Drug};

/// An advisory risk estimate.
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Prediction {
    /// The predicted class label.
    pub label: String,
    /// Probability of the predicted class, in `[0, 1]`.
    pub confidence: f64,
}

/// A source of advisory risk estimates.
#[async_trait::async_trait]
pub trait Predictor: Send + Sync {
    /// Estimate the risk label of `drug` for a patient with `phenotype`.
    ///
    /// # Errors
    ///
    /// If no estimate can be made, it returns a generic `anyhow::Error`.
    async fn predict(&self, drug: Drug, phenotype: Phenotype) -> Result<Prediction, anyhow::Error>;
}

/// One line of the model TSV file.
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct ClassProbability {
    /// Drug name, case is ignored.
    pub drug: String,
    /// Phenotype, e.g., `PM`.
    pub phenotype: String,
    /// Class label.
    pub risk_label: String,
    /// Class probability.
    pub probability: f64,
}

/// Load model TSV file.
///
/// # Arguments
///
/// * `path` - Path to the TSV file with the columns `drug`, `phenotype`,
///   `risk_label`, `probability`.
///
/// # Returns
///
/// The class probabilities.
///
/// # Errors
///
/// If anything goes wrong, it returns a generic `anyhow::Error`.
pub fn load_file<P>(path: P) -> Result<Vec<ClassProbability>, anyhow::Error>
where
    P: AsRef<Path>,
{
    let reader = std::fs::File::open(path)
        .map_err(|e| anyhow::anyhow!("problem opening file: {}", e))
        .map(BufReader::new)?;
    let mut csv_reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .flexible(false)
        .comment(Some(b'#'))
        .from_reader(reader);
    let mut result = Vec::new();
    for record in csv_reader.deserialize() {
        let record: ClassProbability =
            record.map_err(|e| anyhow::anyhow!("problem parsing record: {}", e))?;
        if !(0.0..=1.0).contains(&record.probability) {
            anyhow::bail!("probability out of range: {:?}", &record);
        }
        result.push(record);
    }

    Ok(result)
}

/// Predictor backed by a table of class probabilities.
#[derive(Debug, Clone, Default)]
pub struct TablePredictor {
    /// Best class per drug and phenotype.
    best: rustc_hash::FxHashMap<(Drug, Phenotype), Prediction>,
}

impl TablePredictor {
    /// Load from file and construct.
    ///
    /// # Errors
    ///
    /// If anything goes wrong, it returns a generic `anyhow::Error`.
    pub fn load<P>(path: P) -> Result<Self, anyhow::Error>
    where
        P: AsRef<Path>,
    {
        tracing::info!("Loading risk model from {}", path.as_ref().display());
        let rows = load_file(path)?;
        let result = Self::new(rows)?;
        tracing::info!("... done loading {} model entries", result.best.len());
        Ok(result)
    }

    /// Create a new `TablePredictor`.
    ///
    /// For every drug and phenotype, the class with the highest probability
    /// wins; ties go to the class listed first.
    ///
    /// # Arguments
    ///
    /// * `rows` - The class probabilities.
    ///
    /// # Errors
    ///
    /// Fails on unsupported drugs or unparseable phenotypes.
    pub fn new(rows: Vec<ClassProbability>) -> Result<Self, anyhow::Error> {
        let mut best: rustc_hash::FxHashMap<(Drug, Phenotype), Prediction> = Default::default();
        for row in rows {
            let drug: Drug = row
                .drug
                .parse()
                .map_err(|e| anyhow::anyhow!("invalid drug {:?} in model: {}", &row.drug, e))?;
            let phenotype: Phenotype = row.phenotype.parse().map_err(|e| {
                anyhow::anyhow!("invalid phenotype {:?} in model: {}", &row.phenotype, e)
            })?;
            let candidate = Prediction {
                label: row.risk_label,
                confidence: row.probability,
            };
            best.entry((drug, phenotype))
                .and_modify(|current| {
                    if candidate.confidence > current.confidence {
                        *current = candidate.clone();
                    }
                })
                .or_insert_with(|| candidate.clone());
        }

        Ok(Self { best })
    }
}

#[async_trait::async_trait]
impl Predictor for TablePredictor {
    async fn predict(&self, drug: Drug, phenotype: Phenotype) -> Result<Prediction, anyhow::Error> {
        let prediction = self
            .best
            .get(&(drug, phenotype))
            .ok_or_else(|| anyhow::anyhow!("model has no estimate for {} / {}", drug, phenotype))?;
        Ok(Prediction {
            label: prediction.label.clone(),
            confidence: (prediction.confidence * 10_000.0).round() / 10_000.0,
        })
    }
}

/// Command line arguments for `predict` command.
#[derive(Parser, Debug)]
#[command(about = "Advisory risk estimate for a drug and phenotype", long_about = None)]
pub struct Args {
    /// Path to the risk model TSV file.
    #[clap(long)]
    pub path_model: PathBuf,
    /// The drug, e.g., `CODEINE`.
    #[clap(long)]
    pub drug: Drug,
    /// The metabolizer phenotype, e.g., `PM`.
    #[clap(long)]
    pub phenotype: Phenotype,
}

/// Output of the `predict` command.
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Output {
    /// The drug.
    pub drug: Drug,
    /// The phenotype.
    pub phenotype: Phenotype,
    /// The predicted class label.
    pub predicted_risk: String,
    /// Probability of the predicted class.
    pub confidence_score: f64,
}

/// Main entry point for the `predict` command.
///
/// # Arguments
///
/// * `common_args` - Commonly used command line arguments.
/// * `args` - Command line arguments specific to `predict` command.
///
/// # Errors
///
/// If anything goes wrong, it returns a generic `anyhow::Error`.
pub async fn run(common_args: &crate::common::Args, args: &Args) -> Result<(), anyhow::Error> {
    tracing::info!("  running command `predict`");
    tracing::info!("  common_args = {:?}", &common_args);
    tracing::info!("  args = {:?}", &args);

    let output = predict(args).await?;
    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}

/// Load the model of `args` and produce the estimate.
async fn predict(args: &Args) -> Result<Output, anyhow::Error> {
    let predictor = TablePredictor::load(&args.path_model)
        .map_err(|e| anyhow::anyhow!("failed to load risk model: {}", e))?;
    let prediction = predictor.predict(args.drug, args.phenotype).await?;

    Ok(Output {
        drug: args.drug,
        phenotype: args.phenotype,
        predicted_risk: prediction.label,
        confidence_score: prediction.confidence,
    })
}
