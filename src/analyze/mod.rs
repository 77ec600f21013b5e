//! Pharmacogenomic risk analysis of a variant file for one drug.

pub mod diplotype;
pub mod explain;
pub mod phenotype;
pub mod result;
pub mod rules;
pub mod vcf;

use std::{path::PathBuf, sync::Arc, time::Duration};

use clap::Parser;

use crate::{
    common::Drug,
    predict::{Prediction, Predictor, TablePredictor},
};

use self::{
    explain::{ChatConfig, ChatExplainer, Explainer},
    phenotype::Phenotype,
    result::{AnalysisResult, Assessment},
};

/// Command line arguments for `analyze` command.
#[derive(Parser, Debug)]
#[command(about = "Pharmacogenomic risk of a drug for an annotated VCF file", long_about = None)]
pub struct Args {
    /// Path to the annotated VCF file.
    #[clap(long)]
    pub path_vcf: PathBuf,
    /// The drug to assess, e.g., `CODEINE`.
    #[clap(long)]
    pub drug: Drug,
    /// Optional path to the risk model TSV file for advisory estimates.
    #[clap(long)]
    pub path_model: Option<PathBuf>,
    /// Optional path to write the JSON result to, stdout if omitted.
    #[clap(long)]
    pub path_output: Option<PathBuf>,
    /// API key for the explanation service; templated explanations without.
    #[clap(long, env = "GROQ_API_KEY", hide_env_values = true)]
    pub explain_api_key: Option<String>,
    /// Base URL of the OpenAI-compatible explanation service.
    #[clap(long, env = "PGXRISK_EXPLAIN_BASE_URL", default_value = explain::DEFAULT_BASE_URL)]
    pub explain_base_url: String,
    /// Chat model of the explanation service.
    #[clap(long, default_value = explain::DEFAULT_MODEL)]
    pub explain_model: String,
    /// Timeout for the explanation service in seconds.
    #[clap(long, default_value_t = 10)]
    pub explain_timeout_secs: u64,
}

/// Runtime configuration of the [`Analyzer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Upper bound for obtaining an explanation.
    pub explain_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            explain_timeout: Duration::from_secs(10),
        }
    }
}

/// Analyzer running the pipeline from variant file to result.
///
/// The analyzer keeps no per-analysis state and can be shared between
/// concurrent analyses.
#[derive(Default)]
pub struct Analyzer {
    /// The configuration.
    config: Config,
    /// Source of advisory estimates, if any.
    predictor: Option<Arc<dyn Predictor>>,
    /// Explanation generator, if any.
    explainer: Option<Arc<dyn Explainer>>,
}

impl Analyzer {
    /// Construct with the given configuration and no collaborators.
    pub fn new(config: Config) -> Self {
        Self {
            config,
            predictor: None,
            explainer: None,
        }
    }

    /// Use `predictor` for advisory estimates.
    pub fn with_predictor(self, predictor: Arc<dyn Predictor>) -> Self {
        Self {
            predictor: Some(predictor),
            ..self
        }
    }

    /// Use `explainer` for explanations.
    pub fn with_explainer(self, explainer: Arc<dyn Explainer>) -> Self {
        Self {
            explainer: Some(explainer),
            ..self
        }
    }

    /// Run the deterministic stages: parsing, diplotypes, phenotype, rules.
    ///
    /// # Arguments
    ///
    /// * `content` - Text of the variant file.
    /// * `drug` - The drug to assess.
    ///
    /// # Errors
    ///
    /// Returns a [`vcf::Error`] if the variant file is structurally unusable.
    pub fn assess(&self, content: &str, drug: Drug) -> Result<Assessment, vcf::Error> {
        let vcf::Parsed { records, warnings } = vcf::parse(content)?;
        tracing::info!(
            "parsed {} pharmacogene records ({} warnings)",
            records.len(),
            warnings.len()
        );

        let gene = drug.gene();
        let diplotypes = diplotype::build(&records);
        let diplotype = diplotype::diplotype_of(&diplotypes, gene);
        let phenotype = phenotype::determine_for(gene, &diplotype);
        let verdict = rules::assess_drug(drug, phenotype);
        tracing::info!(
            "{} {} -> {} -> {} / {}",
            gene,
            &diplotype,
            phenotype,
            verdict.risk_label,
            verdict.severity
        );

        Ok(Assessment {
            drug,
            gene,
            diplotype,
            phenotype,
            records,
            verdict,
            warnings,
        })
    }

    /// Run the full analysis.
    ///
    /// The advisory estimate and the explanation are obtained concurrently.
    /// Neither can fail the analysis.
    ///
    /// # Errors
    ///
    /// Returns a [`vcf::Error`] if the variant file is structurally unusable.
    pub async fn analyze(&self, content: &str, drug: Drug) -> Result<AnalysisResult, vcf::Error> {
        let assessment = self.assess(content, drug)?;
        let context = assessment.context();

        let (advisory, explanation) = tokio::join!(
            self.advise(drug, assessment.phenotype),
            explain::explain_or_fallback(
                self.explainer.as_deref(),
                &context,
                self.config.explain_timeout
            ),
        );
        if let Some(advisory) = &advisory {
            if advisory.label != assessment.verdict.risk_label.to_string() {
                tracing::info!(
                    "advisory estimate {:?} differs from rule verdict {}",
                    &advisory.label,
                    assessment.verdict.risk_label
                );
            }
        }

        Ok(result::assemble(
            assessment,
            advisory,
            explanation,
            chrono::Utc::now(),
        ))
    }

    /// Obtain the advisory estimate, if a predictor is available.
    async fn advise(&self, drug: Drug, phenotype: Phenotype) -> Option<Prediction> {
        let predictor = self.predictor.as_ref()?;
        match predictor.predict(drug, phenotype).await {
            Ok(prediction) => Some(prediction),
            Err(e) => {
                tracing::warn!("no advisory estimate for {} / {}: {}", drug, phenotype, e);
                None
            }
        }
    }
}

/// Construct the analyzer and its collaborators from `args`.
fn build_analyzer(args: &Args) -> Result<Analyzer, anyhow::Error> {
    let config = Config {
        explain_timeout: Duration::from_secs(args.explain_timeout_secs),
    };
    let mut analyzer = Analyzer::new(config.clone());

    if let Some(path_model) = &args.path_model {
        let predictor = TablePredictor::load(path_model)
            .map_err(|e| anyhow::anyhow!("failed to load risk model: {}", e))?;
        analyzer = analyzer.with_predictor(Arc::new(predictor));
    }

    match &args.explain_api_key {
        Some(api_key) if !api_key.is_empty() => {
            let explainer = ChatExplainer::new(ChatConfig {
                base_url: args.explain_base_url.clone(),
                api_key: api_key.clone(),
                model: args.explain_model.clone(),
                timeout: config.explain_timeout,
            })?;
            analyzer = analyzer.with_explainer(Arc::new(explainer));
        }
        _ => tracing::info!("no explanation API key, explanations will be templated"),
    }

    Ok(analyzer)
}

/// Main entry point for the `analyze` command.
///
/// # Arguments
///
/// * `common_args` - Commonly used command line arguments.
/// * `args` - Command line arguments specific to `analyze` command.
///
/// # Errors
///
/// If anything goes wrong, it returns a generic `anyhow::Error`.
pub async fn run(common_args: &crate::common::Args, args: &Args) -> Result<(), anyhow::Error> {
    tracing::info!("  running command `analyze`");
    tracing::info!("  common_args = {:?}", &common_args);
    tracing::info!("  args = {:?}", &args);

    let analyzer = build_analyzer(args)?;
    let content = std::fs::read_to_string(&args.path_vcf).map_err(|e| {
        anyhow::anyhow!("problem reading {}: {}", args.path_vcf.display(), e)
    })?;

    let result = analyzer
        .analyze(&content, args.drug)
        .await
        .map_err(|e| anyhow::anyhow!("invalid variant file: {}", e))?;
    if result.pharmacogenomic_profile.detected_variants.is_empty() {
        anyhow::bail!(
            "no supported pharmacogenomic variants found in {}; expected GENE annotations \
             for CYP2D6, CYP2C19, CYP2C9, SLCO1B1, TPMT, or DPYD",
            args.path_vcf.display()
        );
    }

    let json = serde_json::to_string_pretty(&result)?;
    match &args.path_output {
        Some(path) => std::fs::write(path, json + "\n")
            .map_err(|e| anyhow::anyhow!("problem writing {}: {}", path.display(), e))?,
        None => println!("{}", json),
    }

    Ok(())
}
