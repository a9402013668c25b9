//! The three-stage analysis pipeline.
//!
//! 1. **Market analysis** of the formatted corpus
//! 2. **Idea generation** from that analysis, a focus area and free-text context
//! 3. **Competitive analysis** of the first generated idea against the corpus
//!
//! Stages run strictly one after the other since each prompt embeds the text
//! of the previous answer. The first failing stage ends the run.

use crate::api::AskAsync;
use crate::error::{PipelineError, Stage};
use crate::models::{AnalysisResult, Corpus, FocusArea};
use crate::utils::truncate_for_log;
use std::time::Instant;
use tracing::{info, instrument, warn};

pub const MARKET_ANALYSIS_TEMPLATE: &str = r#"You are an expert startup and venture capital analyst. Analyze the following funding news articles and provide insights.

FUNDING NEWS ARTICLES:
{funding_news}

Please provide a comprehensive analysis including:

**1. TOP FUNDED SECTORS:**
- Which industries/sectors are getting the most funding
- Emerging trends in each sector

**2. FUNDING PATTERNS:**
- Common funding amounts and stages
- Geographic patterns
- Notable investors mentioned

**3. STARTUP TRENDS:**
- What types of startups are raising money
- Common business models
- Technology trends

**4. KEY INSIGHTS:**
- Market opportunities
- Investor preferences
- Risk factors to consider

**5. ACTIONABLE RECOMMENDATIONS:**
- Promising sectors for new startups
- Funding strategies
- Market gaps to explore

Format your response with clear headers and bullet points. Be specific and cite examples from the articles when possible."#;

pub const IDEA_GENERATION_TEMPLATE: &str = r#"You are a creative startup idea generator and business strategist. Based on the market analysis and trends, generate innovative startup ideas.

MARKET ANALYSIS:
{market_analysis}

FOCUS AREA: {focus_area}

ADDITIONAL CONTEXT: {additional_context}

Generate 5-7 innovative startup ideas that could attract funding based on current trends. For each idea provide:

**IDEA NAME:** [Creative name]
**SECTOR:** [Industry/Category]
**PROBLEM:** [What problem it solves]
**SOLUTION:** [How it works]
**TARGET MARKET:** [Who would use it]
**BUSINESS MODEL:** [How it makes money]
**FUNDING POTENTIAL:** [Why investors would be interested]
**COMPETITIVE ADVANTAGE:** [What makes it unique]
**MVP SUGGESTION:** [How to start small]

**ADDITIONAL CONSIDERATIONS:**
- Focus on ideas that align with current funding trends
- Consider emerging technologies (AI, blockchain, IoT, etc.)
- Think about underserved markets
- Consider B2B vs B2C opportunities
- Factor in scalability and market size

Be creative but realistic. Provide ideas that could realistically be executed by a small team initially."#;

pub const COMPETITIVE_ANALYSIS_TEMPLATE: &str = r#"You are a competitive intelligence analyst. Analyze the competitive landscape for a startup idea based on recent funding data.

STARTUP IDEA:
{startup_idea}

RECENT FUNDING DATA:
{funding_data}

Provide a competitive analysis including:

**1. DIRECT COMPETITORS:**
- Companies in the same space that recently raised funding
- Their funding amounts and stages
- Key differentiators

**2. INDIRECT COMPETITORS:**
- Adjacent companies that could pivot into this space
- Potential threats from big tech companies

**3. MARKET OPPORTUNITY:**
- Market size and growth potential
- Underserved segments
- Geographic opportunities

**4. COMPETITIVE POSITIONING:**
- How to differentiate from existing players
- Unique value propositions to consider
- Potential partnerships

**5. RISK ASSESSMENT:**
- Competition risks
- Market saturation concerns
- Barriers to entry

**6. STRATEGIC RECOMMENDATIONS:**
- Go-to-market strategy
- Timing considerations
- Funding strategy

Be specific and reference actual companies from the funding data when relevant."#;

const IDEA_NAME_MARKER: &str = "**IDEA NAME:**";
const SECTOR_MARKER: &str = "**SECTOR:**";

/// Stand-in idea when the generated ideas do not follow the requested layout.
pub const PLACEHOLDER_IDEA: &str = "AI-powered business solution";

/// Fill `{name}` placeholders of `template` in a single pass.
///
/// Substituted values are copied verbatim, so a generated answer that happens
/// to contain `{focus_area}` is not expanded again. Unknown placeholders are
/// left as they are.
pub fn render(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len() + values.iter().map(|(_, v)| v.len()).sum::<usize>());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let tail = &rest[open + 1..];
        let hit = tail.find('}').and_then(|close| {
            let name = &tail[..close];
            values
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| (*value, close))
        });
        match hit {
            Some((value, close)) => {
                out.push_str(value);
                rest = &tail[close + 1..];
            }
            None => {
                out.push('{');
                rest = tail;
            }
        }
    }
    out.push_str(rest);
    out
}

/// The first idea of a generated idea list.
///
/// Takes the text between the first `**IDEA NAME:**` and the following
/// `**SECTOR:**` (or the end of the text when there is no sector line). This
/// depends on the generator honouring the layout asked for in
/// [`IDEA_GENERATION_TEMPLATE`]; when it did not, or the slice is blank,
/// [`PLACEHOLDER_IDEA`] is returned so the next stage always has input.
pub fn first_idea(startup_ideas: &str) -> String {
    let Some((_, after)) = startup_ideas.split_once(IDEA_NAME_MARKER) else {
        return PLACEHOLDER_IDEA.to_string();
    };
    let slice = after
        .split_once(SECTOR_MARKER)
        .map_or(after, |(idea, _)| idea)
        .trim();
    if slice.is_empty() {
        PLACEHOLDER_IDEA.to_string()
    } else {
        slice.to_string()
    }
}

/// What the user wants ideas about.
#[derive(Debug, Clone, Default)]
pub struct IdeaRequest {
    pub focus_area: FocusArea,
    /// Passed to the prompt verbatim.
    pub additional_context: String,
}

/// Runs the three stages against one generator.
#[derive(Debug)]
pub struct AnalysisPipeline<G> {
    generator: G,
}

impl<G> AnalysisPipeline<G>
where
    G: AskAsync<Response = String>,
{
    pub fn new(generator: G) -> Self {
        Self { generator }
    }

    /// Run all three stages over `corpus`.
    ///
    /// The corpus is handed back inside the [`AnalysisResult`]. On failure the
    /// error names the stage; later stages are not attempted.
    #[instrument(level = "info", skip_all, fields(articles = corpus.len(), focus = %request.focus_area))]
    pub async fn run(
        &self,
        corpus: Corpus,
        request: &IdeaRequest,
    ) -> Result<AnalysisResult, PipelineError> {
        if corpus.is_empty() {
            warn!("Analysing an empty corpus");
        }
        let funding_news = corpus.format_for_analysis();

        let market_analysis = self
            .stage(
                Stage::MarketAnalysis,
                render(MARKET_ANALYSIS_TEMPLATE, &[("funding_news", &funding_news)]),
            )
            .await?;

        let focus_context = request.focus_area.prompt_context();
        let startup_ideas = self
            .stage(
                Stage::IdeaGeneration,
                render(
                    IDEA_GENERATION_TEMPLATE,
                    &[
                        ("market_analysis", &market_analysis),
                        ("focus_area", &focus_context),
                        ("additional_context", &request.additional_context),
                    ],
                ),
            )
            .await?;

        let idea = first_idea(&startup_ideas);
        if idea == PLACEHOLDER_IDEA {
            warn!("Generated ideas lack the IDEA NAME layout; using placeholder idea");
        } else {
            info!(idea = %truncate_for_log(&idea, 120), "Selected first idea");
        }
        let competitive_analysis = self.competitive_analysis(&idea, &funding_news).await?;

        Ok(AnalysisResult {
            market_analysis,
            startup_ideas,
            competitive_analysis,
            corpus,
        })
    }

    /// Competitive analysis of a user supplied idea against `corpus`.
    #[instrument(level = "info", skip_all, fields(articles = corpus.len()))]
    pub async fn analyze_idea(&self, idea: &str, corpus: &Corpus) -> Result<String, PipelineError> {
        self.competitive_analysis(idea, &corpus.format_for_analysis())
            .await
    }

    async fn competitive_analysis(
        &self,
        idea: &str,
        funding_news: &str,
    ) -> Result<String, PipelineError> {
        self.stage(
            Stage::CompetitiveAnalysis,
            render(
                COMPETITIVE_ANALYSIS_TEMPLATE,
                &[("startup_idea", idea), ("funding_data", funding_news)],
            ),
        )
        .await
    }

    async fn stage(&self, stage: Stage, prompt: String) -> Result<String, PipelineError> {
        info!(%stage, prompt_chars = prompt.len(), "Stage started");
        let t0 = Instant::now();
        match self.generator.ask(&prompt).await {
            Ok(text) => {
                info!(%stage, elapsed_ms = t0.elapsed().as_millis() as u64, "Stage completed");
                Ok(text)
            }
            Err(source) => {
                warn!(%stage, error = %source, "Stage failed");
                Err(PipelineError { stage, source })
            }
        }
    }
}
