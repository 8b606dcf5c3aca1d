use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A transaction record ready for insertion. The store assigns the id and
/// stamps `created_at` when absent. Every field is a copy: the submission it
/// came from is ephemeral and this record must outlive it.
#[derive(Debug, Clone)]
pub struct Transaction {
    pub created_at: Option<DateTime<Utc>>,
    pub job_title_snippet: String,
    pub jd_text: String,
    pub original_filename: String,
    /// The original upload, base64-encoded. Losslessly reconstructible.
    pub original_file_b64: String,
    pub original_resume_text: String,
    pub original_score: i32,
    pub optimized_resume_text: String,
    pub optimized_score: i32,
    pub cover_letter_text: String,
    pub tips: Vec<String>,
    pub missing_keywords: Vec<String>,
}

/// A persisted transaction, as read back from the store. Never mutated.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TransactionRow {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub job_title_snippet: String,
    pub jd_text: String,
    pub original_filename: String,
    /// Kept out of JSON responses; the download route reconstructs the file.
    #[serde(skip_serializing, default)]
    pub original_file_b64: String,
    pub original_resume_text: String,
    pub original_score: i32,
    pub optimized_resume_text: String,
    pub optimized_score: i32,
    pub cover_letter_text: String,
    pub tips: Vec<String>,
    pub missing_keywords: Vec<String>,
}

/// Listing projection for audit browsing: no large text payloads.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TransactionSummary {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub job_title_snippet: String,
    pub original_filename: String,
    pub original_score: i32,
    pub optimized_score: i32,
}
