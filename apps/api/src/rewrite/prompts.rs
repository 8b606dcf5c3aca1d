// Prompt templates for the rewrite service. Placeholders are filled with
// `.replace` before sending.

/// System prompt for resume optimization.
pub const OPTIMIZE_SYSTEM: &str = "You are an expert Resume Writer specializing in beating \
    ATS algorithms. You rewrite resumes truthfully: never invent employers, \
    titles, or dates.";

/// Resume optimization prompt, v1.
/// Replace `{resume_text}` and `{jd_text}` before sending. The full resume
/// is passed untruncated — completeness matters more for rewriting quality
/// than it does for scoring.
pub const OPTIMIZE_PROMPT_TEMPLATE: &str = r#"Rewrite the provided resume to maximize its match score against the Job Description.

INSTRUCTIONS:
1. **Keyword Mirroring**: Identify hard skills and keywords in the JD. Use the EXACT SAME PHRASING in the resume.
2. **Summary**: Rewrite the Professional Summary to be a 3-sentence pitch directly addressing the JD's top requirements.
3. **Experience**: Keep the candidate's actual companies and dates unchanged. Rewrite the bullet points to emphasize quantifiable results using keywords from the JD.
4. **Skills Section**: Create or update a dedicated "Technical Skills" or "Core Competencies" section. Fill it with matching skills from the JD that the candidate possesses.
5. **Honesty**: Do not invent jobs. If a skill is strictly missing, do not lie, but emphasize adjacent skills.

FORMAT:
Clean text format suitable for copy-pasting into Word. No markdown bolding (**), just plain text with bullet points (-).

RESUME:
{resume_text}

JOB DESCRIPTION:
{jd_text}"#;

/// System prompt for cover letter generation.
pub const COVER_LETTER_SYSTEM: &str = "You are an expert cover letter writer. \
    Tone: enthusiastic, professional, direct.";

/// Cover letter prompt, v1.
/// Replace `{resume_text}`, `{jd_text}`, and `{length_directive}`.
pub const COVER_LETTER_PROMPT_TEMPLATE: &str = r#"Write a compelling cover letter for this job.

GUIDELINES:
1. Hook: Start with why the candidate fits the specific role title in the JD.
2. Body: Highlight 3 key achievements from the resume that solve problems listed in the JD.
3. Call to Action: Request an interview.
4. Length: {length_directive}

RESUME:
{resume_text}

JOB DESCRIPTION:
{jd_text}"#;

/// Length style directives, one per `CoverLetterLength` variant.
pub const LENGTH_DIRECTIVE_SHORT: &str =
    "Keep it brief and punchy: around 200 words, three short paragraphs at most.";
pub const LENGTH_DIRECTIVE_STANDARD: &str =
    "Standard length: around 300 words, a conventional three-to-four paragraph letter.";
pub const LENGTH_DIRECTIVE_LONG: &str =
    "In-depth: at least 450 words, expanding each achievement into its own paragraph.";
