// Prompt templates for the scoring service. Placeholders are filled with
// `.replace` before sending; keep slot names in sync with `build_score_prompt`.

/// System prompt for resume scoring — enforces JSON-only output.
pub const SCORE_SYSTEM: &str = "You are a strict ATS (Applicant Tracking System) algorithm. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Scoring prompt, v1. Replace `{resume_text}` and `{jd_text}` before sending.
/// Inputs are truncated by the caller; the backend context is finite and
/// score quality degrades on overlong input.
pub const SCORE_PROMPT_TEMPLATE: &str = r#"Act as a strict ATS (Applicant Tracking System).
Compare the Resume against the Job Description.

CRITERIA FOR SCORING:
1. Exact Keyword Matching (Do the skills in the JD appear in the Resume?)
2. Job Title Relevance
3. Measurable Results (Numbers/%)

TASK:
Return a JSON object with this EXACT schema (no extra fields):
{
  "match_score": 72,
  "missing_keywords": ["Kubernetes", "Go"],
  "tips": ["Add the missing keyword 'Kubernetes' to your skills section"]
}

- "match_score": an integer between 0 and 100.
- "missing_keywords": JD skills and keywords absent from the resume.
- "tips": an array of 3 strings indicating missing keywords or weak areas.

RESUME:
{resume_text}

JOB DESCRIPTION:
{jd_text}"#;
