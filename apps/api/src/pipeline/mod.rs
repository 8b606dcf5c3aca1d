//! Pipeline Orchestrator — sequences one submission end to end.
//!
//! Stage order is fixed: decode → score original → optimize resume →
//! generate cover letter → re-score optimized → persist. Decode and the two
//! rewrite stages are fatal; scoring soft-fails to a degraded zero; a
//! persistence failure never erases the computed artifacts — the result is
//! returned with `logged = false`. No stage is retried here.

use bytes::Bytes;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::document::{DocumentDecoder, DocumentError, DocumentFormat};
use crate::errors::AppError;
use crate::models::transaction::Transaction;
use crate::rewrite::{CoverLetterLength, Rewriter};
use crate::scoring::{truncate_chars, ScoreResult, Scorer};
use crate::store::{encode_original, TransactionLog};

const JOB_TITLE_SNIPPET_MAX_CHARS: usize = 80;

/// One unit of work. Ephemeral: exists only for the duration of a run.
#[derive(Debug, Clone)]
pub struct Submission {
    pub file_bytes: Bytes,
    pub format: DocumentFormat,
    pub filename: String,
    pub jd_text: String,
    pub cover_letter_length: CoverLetterLength,
}

/// The result bundle returned to the caller — returned even when the
/// transaction could not be logged (`logged = false`, no id).
#[derive(Debug, Clone, Serialize)]
pub struct PipelineResult {
    pub original_score: ScoreResult,
    pub optimized_score: ScoreResult,
    pub resume_text: String,
    pub cover_letter_text: String,
    pub transaction_id: Option<Uuid>,
    pub logged: bool,
}

/// Terminal failure of a run, naming the stage that failed.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("document decode failed: {0}")]
    Decode(#[from] DocumentError),

    #[error("resume rewrite failed: {0}")]
    ResumeRewrite(#[source] AppError),

    #[error("cover letter generation failed: {0}")]
    CoverLetter(#[source] AppError),
}

impl From<PipelineError> for AppError {
    fn from(e: PipelineError) -> Self {
        match e {
            PipelineError::Decode(inner) => AppError::Decode(inner.to_string()),
            PipelineError::ResumeRewrite(inner) | PipelineError::CoverLetter(inner) => inner,
        }
    }
}

/// Runs the full optimization pipeline for one submission.
pub async fn run(
    decoder: &dyn DocumentDecoder,
    scorer: &dyn Scorer,
    rewriter: &dyn Rewriter,
    store: &dyn TransactionLog,
    submission: Submission,
) -> Result<PipelineResult, PipelineError> {
    let Submission {
        file_bytes,
        format,
        filename,
        jd_text,
        cover_letter_length,
    } = submission;

    // Stage 1: decode. No text, no run.
    info!(%filename, ?format, "pipeline started");
    let resume_text = decoder.decode(&file_bytes, format)?;

    // Stage 2: baseline score (soft).
    let original_score = scorer.score(&resume_text, &jd_text).await;
    if original_score.degraded {
        warn!("baseline scoring degraded, continuing with zero score");
    }
    info!("baseline score: {}/100", original_score.match_score);

    // Stage 3: rewrite (fatal).
    let optimized_resume = rewriter
        .optimize_resume(&resume_text, &jd_text)
        .await
        .map_err(PipelineError::ResumeRewrite)?;

    // Stage 4: cover letter (fatal).
    let cover_letter = rewriter
        .generate_cover_letter(&resume_text, &jd_text, cover_letter_length)
        .await
        .map_err(PipelineError::CoverLetter)?;

    // Stage 5: re-score the rewritten resume (soft).
    let optimized_score = scorer.score(&optimized_resume, &jd_text).await;
    info!("optimized score: {}/100", optimized_score.match_score);

    // Stage 6: persist. Failure is reported, not fatal — the artifacts
    // outrank the audit trail.
    let record = Transaction {
        created_at: None,
        job_title_snippet: job_title_snippet(&jd_text),
        jd_text,
        original_filename: filename,
        original_file_b64: encode_original(&file_bytes),
        original_resume_text: resume_text,
        original_score: original_score.match_score as i32,
        optimized_resume_text: optimized_resume.clone(),
        optimized_score: optimized_score.match_score as i32,
        cover_letter_text: cover_letter.clone(),
        tips: original_score.tips.clone(),
        missing_keywords: original_score.missing_keywords.clone(),
    };

    let (transaction_id, logged) = match store.save(record).await {
        Ok(id) => (Some(id), true),
        Err(e) => {
            warn!("transaction save failed, returning results unlogged: {e}");
            (None, false)
        }
    };

    Ok(PipelineResult {
        original_score,
        optimized_score,
        resume_text: optimized_resume,
        cover_letter_text: cover_letter,
        transaction_id,
        logged,
    })
}

/// First non-empty line of the JD, bounded, for the audit listing.
fn job_title_snippet(jd_text: &str) -> String {
    let line = jd_text
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or("");
    truncate_chars(line, JOB_TITLE_SNIPPET_MAX_CHARS).to_string()
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::store::StoreError;

    // ── test doubles ────────────────────────────────────────────────────

    struct StubDecoder {
        text: Option<&'static str>,
    }

    impl DocumentDecoder for StubDecoder {
        fn decode(&self, _bytes: &[u8], format: DocumentFormat) -> Result<String, DocumentError> {
            self.text
                .map(str::to_owned)
                .ok_or_else(|| DocumentError::Decode {
                    format,
                    reason: "unreadable".to_string(),
                })
        }
    }

    struct StubScorer {
        score: u32,
        degraded: bool,
        calls: AtomicU32,
    }

    impl StubScorer {
        fn new(score: u32) -> Self {
            Self {
                score,
                degraded: false,
                calls: AtomicU32::new(0),
            }
        }

        fn degraded() -> Self {
            Self {
                score: 0,
                degraded: true,
                calls: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl Scorer for StubScorer {
        async fn score(&self, _candidate_text: &str, _jd_text: &str) -> ScoreResult {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.degraded {
                ScoreResult::degraded("stubbed failure")
            } else {
                ScoreResult {
                    match_score: self.score,
                    tips: vec!["Add the missing keyword 'Kubernetes'".to_string()],
                    missing_keywords: vec!["Kubernetes".to_string()],
                    degraded: false,
                }
            }
        }
    }

    struct StubRewriter {
        fail_resume: bool,
        fail_cover: bool,
    }

    #[async_trait]
    impl Rewriter for StubRewriter {
        async fn optimize_resume(
            &self,
            _resume_text: &str,
            _jd_text: &str,
        ) -> Result<String, AppError> {
            if self.fail_resume {
                Err(AppError::Llm("backend down".to_string()))
            } else {
                Ok("OPTIMIZED RESUME with Kubernetes".to_string())
            }
        }

        async fn generate_cover_letter(
            &self,
            _resume_text: &str,
            _jd_text: &str,
            _length: CoverLetterLength,
        ) -> Result<String, AppError> {
            if self.fail_cover {
                Err(AppError::Llm("backend down".to_string()))
            } else {
                Ok("COVER LETTER".to_string())
            }
        }
    }

    struct RecordingStore {
        fail: bool,
        saved: Mutex<Vec<Transaction>>,
    }

    impl RecordingStore {
        fn new(fail: bool) -> Self {
            Self {
                fail,
                saved: Mutex::new(Vec::new()),
            }
        }

        fn save_count(&self) -> usize {
            self.saved.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl TransactionLog for RecordingStore {
        async fn save(&self, record: Transaction) -> Result<Uuid, StoreError> {
            if self.fail {
                return Err(StoreError::Unavailable("stubbed outage".to_string()));
            }
            self.saved.lock().unwrap().push(record);
            Ok(Uuid::new_v4())
        }

        async fn list_recent(&self, _limit: i64) -> Vec<crate::models::transaction::TransactionSummary> {
            Vec::new()
        }

        async fn get(
            &self,
            _id: Uuid,
        ) -> Result<Option<crate::models::transaction::TransactionRow>, StoreError> {
            Ok(None)
        }
    }

    fn submission() -> Submission {
        Submission {
            file_bytes: Bytes::from_static(b"%PDF-fake"),
            format: DocumentFormat::Pdf,
            filename: "resume.pdf".to_string(),
            jd_text: "Senior Platform Engineer\n\nWe need Kubernetes and Go.".to_string(),
            cover_letter_length: CoverLetterLength::Short,
        }
    }

    // ── tests ───────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_successful_run_returns_artifacts_and_logs() {
        let decoder = StubDecoder {
            text: Some("original resume text"),
        };
        let scorer = StubScorer::new(42);
        let rewriter = StubRewriter {
            fail_resume: false,
            fail_cover: false,
        };
        let store = RecordingStore::new(false);

        let result = run(&decoder, &scorer, &rewriter, &store, submission())
            .await
            .unwrap();

        assert_eq!(result.resume_text, "OPTIMIZED RESUME with Kubernetes");
        assert_eq!(result.cover_letter_text, "COVER LETTER");
        assert!(result.logged);
        assert!(result.transaction_id.is_some());
        // both score stages ran
        assert_eq!(scorer.calls.load(Ordering::SeqCst), 2);

        assert_eq!(store.save_count(), 1);
        let saved = store.saved.lock().unwrap();
        let record = &saved[0];
        assert_eq!(record.job_title_snippet, "Senior Platform Engineer");
        assert_eq!(record.original_resume_text, "original resume text");
        assert_eq!(record.optimized_resume_text, "OPTIMIZED RESUME with Kubernetes");
        assert_eq!(record.missing_keywords, vec!["Kubernetes"]);
        // the stored upload reconstructs byte-identically
        let decoded = crate::store::decode_original(&record.original_file_b64).unwrap();
        assert_eq!(decoded, b"%PDF-fake");
    }

    #[tokio::test]
    async fn test_decode_failure_aborts_before_any_model_call() {
        let decoder = StubDecoder { text: None };
        let scorer = StubScorer::new(42);
        let rewriter = StubRewriter {
            fail_resume: false,
            fail_cover: false,
        };
        let store = RecordingStore::new(false);

        let result = run(&decoder, &scorer, &rewriter, &store, submission()).await;

        assert!(matches!(result, Err(PipelineError::Decode(_))));
        assert_eq!(scorer.calls.load(Ordering::SeqCst), 0);
        assert_eq!(store.save_count(), 0);
    }

    #[tokio::test]
    async fn test_rewrite_failure_is_fatal_and_persists_nothing() {
        let decoder = StubDecoder {
            text: Some("resume"),
        };
        let scorer = StubScorer::new(42);
        let rewriter = StubRewriter {
            fail_resume: true,
            fail_cover: false,
        };
        let store = RecordingStore::new(false);

        let result = run(&decoder, &scorer, &rewriter, &store, submission()).await;

        assert!(matches!(result, Err(PipelineError::ResumeRewrite(_))));
        assert_eq!(store.save_count(), 0);
    }

    #[tokio::test]
    async fn test_cover_letter_failure_is_fatal_and_persists_nothing() {
        let decoder = StubDecoder {
            text: Some("resume"),
        };
        let scorer = StubScorer::new(42);
        let rewriter = StubRewriter {
            fail_resume: false,
            fail_cover: true,
        };
        let store = RecordingStore::new(false);

        let result = run(&decoder, &scorer, &rewriter, &store, submission()).await;

        assert!(matches!(result, Err(PipelineError::CoverLetter(_))));
        assert_eq!(store.save_count(), 0);
    }

    #[tokio::test]
    async fn test_save_failure_does_not_erase_computed_artifacts() {
        let decoder = StubDecoder {
            text: Some("resume"),
        };
        let scorer = StubScorer::new(42);
        let rewriter = StubRewriter {
            fail_resume: false,
            fail_cover: false,
        };
        let store = RecordingStore::new(true);

        let result = run(&decoder, &scorer, &rewriter, &store, submission())
            .await
            .unwrap();

        // byte-identical to what the rewriter produced
        assert_eq!(result.resume_text, "OPTIMIZED RESUME with Kubernetes");
        assert_eq!(result.cover_letter_text, "COVER LETTER");
        assert!(!result.logged);
        assert!(result.transaction_id.is_none());
    }

    #[tokio::test]
    async fn test_degraded_scoring_never_aborts_the_run() {
        let decoder = StubDecoder {
            text: Some("resume"),
        };
        let scorer = StubScorer::degraded();
        let rewriter = StubRewriter {
            fail_resume: false,
            fail_cover: false,
        };
        let store = RecordingStore::new(false);

        let result = run(&decoder, &scorer, &rewriter, &store, submission())
            .await
            .unwrap();

        assert_eq!(result.original_score.match_score, 0);
        assert!(result.original_score.degraded);
        assert!(result.logged);
        assert_eq!(store.save_count(), 1);
    }

    #[test]
    fn test_job_title_snippet_takes_first_nonempty_line_bounded() {
        assert_eq!(
            job_title_snippet("\n\n  Staff Engineer, Infra  \nrest of JD"),
            "Staff Engineer, Infra"
        );
        assert_eq!(job_title_snippet(""), "");

        let long = "t".repeat(200);
        assert_eq!(job_title_snippet(&long).chars().count(), 80);
    }
}
