//! Natural-language explanations of a risk verdict.
//!
//! Explanations come from a chat-completions endpoint.  Any failure or
//! timeout is replaced by a fixed template so that an analysis never fails
//! because of the explanation.

use std::time::Duration;

use crate::common::{Drug, Gene};

use super::{phenotype::Phenotype, rules::RiskLabel};

/// Default OpenAI-compatible endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";
/// Default chat model.
pub const DEFAULT_MODEL: &str = "llama-3.1-8b-instant";

/// Dosing guidance attached to generated explanations.
const GENERATED_DOSING_GUIDANCE: &str =
    "Follow CPIC recommendations based on genotype and phenotype.";

/// What an explanation is about.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct Context {
    /// The drug.
    pub drug: Drug,
    /// The gene governing the drug.
    pub gene: Gene,
    /// The diplotype of `gene`.
    pub diplotype: String,
    /// The phenotype of `gene`.
    pub phenotype: Phenotype,
    /// The risk label from the clinical rules.
    pub risk_label: RiskLabel,
}

/// Explanation payload of an analysis result.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct Explanation {
    /// Clinical summary.
    pub summary: String,
    /// Biological mechanism.
    pub biological_mechanism: String,
    /// Impact on the patient.
    pub clinical_impact: String,
    /// Dosing guidance.
    pub dosing_guidance: String,
    /// Confidence in the generated text; absent for the fallback.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<String>,
}

impl Explanation {
    /// Templated explanation used when no generated one is available.
    pub fn fallback(context: &Context) -> Self {
        Self {
            summary: format!("{} may alter response to {}.", context.gene, context.drug),
            biological_mechanism: String::from("Genetic variation can change drug metabolism."),
            clinical_impact: String::from(
                "Treatment efficacy or safety may differ for this patient.",
            ),
            dosing_guidance: String::from("Use genotype-guided dosing and monitor closely."),
            confidence: None,
        }
    }

    /// Build from the generated text.
    ///
    /// Non-empty lines are taken in order as summary, mechanism, and impact;
    /// missing lines become empty strings.
    pub fn from_generated(text: &str) -> Self {
        let mut lines = text.lines().map(str::trim).filter(|line| !line.is_empty());
        let mut next = || lines.next().unwrap_or_default().to_string();
        Self {
            summary: next(),
            biological_mechanism: next(),
            clinical_impact: next(),
            dosing_guidance: GENERATED_DOSING_GUIDANCE.to_string(),
            confidence: Some(String::from("High")),
        }
    }
}

/// A generator of explanations.
#[async_trait::async_trait]
pub trait Explainer: Send + Sync {
    /// Explain the verdict described by `context`.
    ///
    /// # Errors
    ///
    /// If anything goes wrong, it returns a generic `anyhow::Error`.
    async fn explain(&self, context: &Context) -> Result<Explanation, anyhow::Error>;
}

/// Obtain an explanation, falling back to the template.
///
/// The explainer gets a single attempt bounded by `timeout`.  Without an
/// explainer, the template is used right away.
pub async fn explain_or_fallback(
    explainer: Option<&dyn Explainer>,
    context: &Context,
    timeout: Duration,
) -> Explanation {
    let Some(explainer) = explainer else {
        tracing::debug!("no explainer configured, using template");
        return Explanation::fallback(context);
    };

    match tokio::time::timeout(timeout, explainer.explain(context)).await {
        Ok(Ok(explanation)) => explanation,
        Ok(Err(e)) => {
            tracing::warn!("explanation failed, using template: {}", e);
            Explanation::fallback(context)
        }
        Err(_) => {
            tracing::warn!("explanation timed out after {:?}, using template", timeout);
            Explanation::fallback(context)
        }
    }
}

/// Configuration of [`ChatExplainer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatConfig {
    /// Base URL of the OpenAI-compatible API, without trailing `/`.
    pub base_url: String,
    /// API key sent as bearer token.
    pub api_key: String,
    /// Model name.
    pub model: String,
    /// Request timeout.
    pub timeout: Duration,
}

/// Explainer talking to an OpenAI-compatible chat-completions endpoint.
pub struct ChatExplainer {
    /// The configuration.
    config: ChatConfig,
    /// The HTTP client.
    client: reqwest::Client,
}

impl ChatExplainer {
    /// Construct with the given configuration.
    ///
    /// # Errors
    ///
    /// If the HTTP client cannot be built, it returns a generic
    /// `anyhow::Error`.
    pub fn new(config: ChatConfig) -> Result<Self, anyhow::Error> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build HTTP client: {}", e))?;
        Ok(Self { config, client })
    }

    /// The prompt for `context`.
    pub fn prompt(context: &Context) -> String {
        format!(
            "Explain the pharmacogenomic interaction briefly.\n\
             \n\
             Gene: {}\n\
             Drug: {}\n\
             Diplotype: {}\n\
             Phenotype: {}\n\
             Risk: {}\n\
             \n\
             Respond in EXACTLY 3 short lines:\n\
             1. Clinical summary (max 15 words)\n\
             2. Biological mechanism (max 12 words)\n\
             3. Patient-friendly note (max 12 words)\n\
             \n\
             Do NOT include numbering, paragraphs, or extra text.",
            context.gene, context.drug, context.diplotype, context.phenotype, context.risk_label
        )
    }
}

#[async_trait::async_trait]
impl Explainer for ChatExplainer {
    async fn explain(&self, context: &Context) -> Result<Explanation, anyhow::Error> {
        let url = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));
        let body = serde_json::json!({
            "model": &self.config.model,
            "messages": [{"role": "user", "content": Self::prompt(context)}],
            "temperature": 0.2,
        });
        tracing::debug!("requesting explanation from {}", &url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await?;
        let status = response.status();
        let json: serde_json::Value = response.json().await?;
        if !status.is_success() {
            let message = json["error"]["message"]
                .as_str()
                .unwrap_or("unknown API error");
            anyhow::bail!("API error [{}]: {}", status.as_u16(), message);
        }

        let content = json["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("response without message content"))?;
        Ok(Explanation::from_generated(content))
    }
}

#[cfg(test)]
pub mod test {
    use std::time::Duration;

    use crate::analyze::{phenotype::Phenotype, rules::RiskLabel};
    use crate::common::{Drug, Gene};

    use super::{explain_or_fallback, ChatConfig, ChatExplainer, Context, Explainer, Explanation};

    /// Explainer that always fails.
    pub struct FailingExplainer;

    #[async_trait::async_trait]
    impl Explainer for FailingExplainer {
        async fn explain(&self, _context: &Context) -> Result<Explanation, anyhow::Error> {
            anyhow::bail!("service unavailable")
        }
    }

    /// Explainer that answers with fixed text after a delay.
    pub struct FixedExplainer {
        /// Delay before answering.
        pub delay: Duration,
    }

    #[async_trait::async_trait]
    impl Explainer for FixedExplainer {
        async fn explain(&self, _context: &Context) -> Result<Explanation, anyhow::Error> {
            tokio::time::sleep(self.delay).await;
            Ok(Explanation::from_generated(
                "Reduced activation.\nLess morphine formed.\nAsk about alternatives.",
            ))
        }
    }

    #[rstest::fixture]
    pub fn context() -> Context {
        Context {
            drug: Drug::Codeine,
            gene: Gene::Cyp2d6,
            diplotype: String::from("*4/*4"),
            phenotype: Phenotype::Poor,
            risk_label: RiskLabel::Ineffective,
        }
    }

    #[rstest::rstest]
    fn fallback(context: Context) {
        let explanation = Explanation::fallback(&context);

        assert_eq!(explanation.summary, "CYP2D6 may alter response to CODEINE.");
        assert_eq!(explanation.confidence, None);
    }

    #[rstest::rstest]
    #[case("a\nb\nc", ["a", "b", "c"])]
    #[case("  a  \n\n b\n\nc\nd", ["a", "b", "c"])]
    #[case("only one line", ["only one line", "", ""])]
    #[case("", ["", "", ""])]
    fn from_generated(#[case] text: &str, #[case] expected: [&str; 3]) {
        let explanation = Explanation::from_generated(text);

        assert_eq!(
            [
                explanation.summary.as_str(),
                explanation.biological_mechanism.as_str(),
                explanation.clinical_impact.as_str(),
            ],
            expected
        );
        assert_eq!(explanation.confidence.as_deref(), Some("High"));
    }

    #[rstest::rstest]
    fn prompt_names_verdict(context: Context) {
        let prompt = ChatExplainer::prompt(&context);

        assert!(prompt.contains("Gene: CYP2D6\n"));
        assert!(prompt.contains("Drug: CODEINE\n"));
        assert!(prompt.contains("Risk: Ineffective\n"));
    }

    #[rstest::rstest]
    #[tokio::test]
    async fn no_explainer_uses_template(context: Context) {
        let explanation = explain_or_fallback(None, &context, Duration::from_secs(1)).await;

        assert_eq!(explanation, Explanation::fallback(&context));
    }

    #[rstest::rstest]
    #[tokio::test]
    async fn failure_uses_template(context: Context) {
        let explanation =
            explain_or_fallback(Some(&FailingExplainer), &context, Duration::from_secs(1)).await;

        assert_eq!(explanation, Explanation::fallback(&context));
    }

    #[rstest::rstest]
    #[tokio::test]
    async fn timeout_uses_template(context: Context) {
        let explainer = FixedExplainer {
            delay: Duration::from_secs(60),
        };

        let explanation =
            explain_or_fallback(Some(&explainer), &context, Duration::from_millis(50)).await;

        assert_eq!(explanation, Explanation::fallback(&context));
    }

    #[rstest::rstest]
    #[tokio::test]
    async fn generated_within_timeout(context: Context) {
        let explainer = FixedExplainer {
            delay: Duration::from_millis(1),
        };

        let explanation =
            explain_or_fallback(Some(&explainer), &context, Duration::from_secs(5)).await;

        assert_eq!(explanation.summary, "Reduced activation.");
        assert_eq!(explanation.clinical_impact, "Ask about alternatives.");
    }

    #[rstest::rstest]
    #[tokio::test]
    async fn unreachable_endpoint_uses_template(context: Context) -> Result<(), anyhow::Error> {
        let explainer = ChatExplainer::new(ChatConfig {
            base_url: String::from("http://127.0.0.1:9"),
            api_key: String::from("secret"),
            model: String::from(super::DEFAULT_MODEL),
            timeout: Duration::from_secs(2),
        })?;

        let explanation =
            explain_or_fallback(Some(&explainer), &context, Duration::from_secs(3)).await;

        assert_eq!(explanation, Explanation::fallback(&context));

        Ok(())
    }
}
