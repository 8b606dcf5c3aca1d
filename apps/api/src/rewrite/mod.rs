//! Rewrite Service — resume optimization and cover letter generation.
//!
//! Both operations are stateless wrappers over one LLM call each. In
//! contrast with scoring, a backend failure here is FATAL and propagates to
//! the orchestrator: the rewrite is the primary deliverable, and silently
//! producing an empty document would be worse than aborting the run.

pub mod prompts;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::llm_client::LlmClient;
use crate::rewrite::prompts::{
    COVER_LETTER_PROMPT_TEMPLATE, COVER_LETTER_SYSTEM, LENGTH_DIRECTIVE_LONG,
    LENGTH_DIRECTIVE_SHORT, LENGTH_DIRECTIVE_STANDARD, OPTIMIZE_PROMPT_TEMPLATE, OPTIMIZE_SYSTEM,
};

/// Cover letter length preference. Selects one of three fixed style
/// directives substituted into the prompt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoverLetterLength {
    Short,
    #[default]
    Standard,
    Long,
}

impl CoverLetterLength {
    /// Parses a user-supplied preference string. Unrecognized values fall
    /// back to the standard directive.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "short" => CoverLetterLength::Short,
            "long" => CoverLetterLength::Long,
            _ => CoverLetterLength::Standard,
        }
    }

    pub fn directive(self) -> &'static str {
        match self {
            CoverLetterLength::Short => LENGTH_DIRECTIVE_SHORT,
            CoverLetterLength::Standard => LENGTH_DIRECTIVE_STANDARD,
            CoverLetterLength::Long => LENGTH_DIRECTIVE_LONG,
        }
    }
}

/// The rewrite seam. `LlmRewriter` is the production backend; tests plug in
/// stubs to exercise the pipeline's failure policy.
#[async_trait]
pub trait Rewriter: Send + Sync {
    /// Rewrites the resume against the JD. Employers and dates are preserved;
    /// JD terminology is mirrored verbatim for matching skills.
    async fn optimize_resume(&self, resume_text: &str, jd_text: &str)
        -> Result<String, AppError>;

    /// Generates a cover letter at the requested length.
    async fn generate_cover_letter(
        &self,
        resume_text: &str,
        jd_text: &str,
        length: CoverLetterLength,
    ) -> Result<String, AppError>;
}

/// Production rewriter: one LLM call per operation, no local error handling.
pub struct LlmRewriter(pub LlmClient);

#[async_trait]
impl Rewriter for LlmRewriter {
    async fn optimize_resume(
        &self,
        resume_text: &str,
        jd_text: &str,
    ) -> Result<String, AppError> {
        let prompt = build_optimize_prompt(resume_text, jd_text);
        self.0
            .call_text(&prompt, OPTIMIZE_SYSTEM)
            .await
            .map_err(|e| AppError::Llm(format!("resume optimization call failed: {e}")))
    }

    async fn generate_cover_letter(
        &self,
        resume_text: &str,
        jd_text: &str,
        length: CoverLetterLength,
    ) -> Result<String, AppError> {
        let prompt = build_cover_letter_prompt(resume_text, jd_text, length);
        self.0
            .call_text(&prompt, COVER_LETTER_SYSTEM)
            .await
            .map_err(|e| AppError::Llm(format!("cover letter call failed: {e}")))
    }
}

/// Fills the optimization prompt. No truncation: the full resume is passed.
pub fn build_optimize_prompt(resume_text: &str, jd_text: &str) -> String {
    OPTIMIZE_PROMPT_TEMPLATE
        .replace("{resume_text}", resume_text)
        .replace("{jd_text}", jd_text)
}

/// Fills the cover letter prompt with the length directive for `length`.
pub fn build_cover_letter_prompt(
    resume_text: &str,
    jd_text: &str,
    length: CoverLetterLength,
) -> String {
    COVER_LETTER_PROMPT_TEMPLATE
        .replace("{length_directive}", length.directive())
        .replace("{resume_text}", resume_text)
        .replace("{jd_text}", jd_text)
}
