//! examinator: flashcards and study sessions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use crate::db::{self, Database, get_optional_timestamp, get_timestamp};
use crate::error::{Error, OperationContext, Result};
use crate::migrate::Extension;
use crate::schema::now_default;

pub const EXTENSION: Extension = Extension {
    tool: "examinator",
    version: 4,
    description: "Examinator flashcards and study tracking with ecosystem links",
    schema: SCHEMA,
    depends_on: &["wherewasi", "uroboro"],
};

const SCHEMA: &str = concat!(
    r#"
CREATE TABLE IF NOT EXISTS flashcards (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    question TEXT NOT NULL,
    answer TEXT NOT NULL,
    category TEXT,
    difficulty INTEGER NOT NULL DEFAULT 1,
    source_capture_id INTEGER REFERENCES captures(id),
    context_session_id INTEGER REFERENCES context_sessions(id),
    project TEXT,
    created_at TEXT NOT NULL DEFAULT "#,
    now_default!(),
    r#",
    last_reviewed TEXT,
    next_review TEXT,
    ease_factor REAL NOT NULL DEFAULT 2.5,
    review_count INTEGER NOT NULL DEFAULT 0,
    correct_streak INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS study_sessions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    project TEXT,
    flashcards_reviewed INTEGER NOT NULL DEFAULT 0,
    correct_answers INTEGER NOT NULL DEFAULT 0,
    duration_minutes INTEGER,
    context_session_id INTEGER REFERENCES context_sessions(id),
    created_at TEXT NOT NULL DEFAULT "#,
    now_default!(),
    r#"
);

CREATE TABLE IF NOT EXISTS flashcard_reviews (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    flashcard_id INTEGER NOT NULL REFERENCES flashcards(id),
    study_session_id INTEGER REFERENCES study_sessions(id),
    response_quality INTEGER,
    response_time_ms INTEGER,
    was_correct BOOLEAN,
    created_at TEXT NOT NULL DEFAULT "#,
    now_default!(),
    r#"
);

CREATE INDEX IF NOT EXISTS idx_flashcards_project ON flashcards(project);
CREATE INDEX IF NOT EXISTS idx_flashcards_next_review ON flashcards(next_review);
CREATE INDEX IF NOT EXISTS idx_flashcards_source_capture ON flashcards(source_capture_id);
CREATE INDEX IF NOT EXISTS idx_flashcards_context_session ON flashcards(context_session_id);
CREATE INDEX IF NOT EXISTS idx_study_sessions_project ON study_sessions(project);
CREATE INDEX IF NOT EXISTS idx_flashcard_reviews_flashcard ON flashcard_reviews(flashcard_id);
CREATE INDEX IF NOT EXISTS idx_flashcard_reviews_session ON flashcard_reviews(study_session_id);
"#
);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Flashcard {
    pub id: i64,
    pub question: String,
    pub answer: String,
    pub category: Option<String>,
    pub difficulty: i32,
    pub source_capture_id: Option<i64>,
    pub context_session_id: Option<i64>,
    pub project: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_reviewed: Option<DateTime<Utc>>,
    pub next_review: Option<DateTime<Utc>>,
    pub ease_factor: f64,
    pub review_count: i32,
    pub correct_streak: i32,
}

#[derive(Debug, Clone, Default)]
pub struct NewFlashcard {
    pub question: String,
    pub answer: String,
    pub category: Option<String>,
    pub difficulty: Option<i32>,
    pub source_capture_id: Option<i64>,
    pub context_session_id: Option<i64>,
    pub project: Option<String>,
    /// First scheduled review; `None` means due immediately.
    pub next_review: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default)]
pub struct NewStudySession {
    pub project: Option<String>,
    pub flashcards_reviewed: i32,
    pub correct_answers: i32,
    pub duration_minutes: Option<i32>,
    pub context_session_id: Option<i64>,
}

impl Database {
    pub async fn add_flashcard(&self, card: NewFlashcard) -> Result<i64> {
        if card.question.trim().is_empty() || card.answer.trim().is_empty() {
            return Err(Error::Validation(
                "flashcard question and answer cannot be empty".to_string(),
            ))
            .op("failed to add flashcard");
        }
        let difficulty = card.difficulty.unwrap_or(1);
        if difficulty < 1 {
            return Err(Error::Validation(format!(
                "flashcard difficulty must be at least 1, got {difficulty}"
            )))
            .op("failed to add flashcard");
        }

        let stamp = db::format_timestamp(db::now());
        self.execute_returning_id(
            sqlx::query(
                r#"
                INSERT INTO flashcards
                    (question, answer, category, difficulty, source_capture_id, context_session_id, project, created_at, next_review)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&card.question)
            .bind(&card.answer)
            .bind(&card.category)
            .bind(difficulty)
            .bind(card.source_capture_id)
            .bind(card.context_session_id)
            .bind(&card.project)
            .bind(stamp)
            .bind(card.next_review.map(db::format_timestamp)),
        )
        .await
        .op("failed to add flashcard")
    }

    /// Cards never scheduled or scheduled at or before `now`, earliest first.
    pub async fn due_flashcards(&self, now: DateTime<Utc>, limit: i64) -> Result<Vec<Flashcard>> {
        let rows = self
            .fetch_all(
                sqlx::query(
                    r#"
                    SELECT * FROM flashcards
                    WHERE next_review IS NULL OR julianday(next_review) <= julianday(?)
                    ORDER BY julianday(next_review) ASC, id ASC
                    LIMIT ?
                    "#,
                )
                .bind(db::format_timestamp(now))
                .bind(limit.max(0)),
            )
            .await
            .op("failed to query due flashcards")?;

        rows.iter()
            .map(flashcard_from_row)
            .collect::<Result<Vec<_>>>()
            .op("failed to query due flashcards")
    }

    pub async fn record_study_session(&self, session: NewStudySession) -> Result<i64> {
        if session.flashcards_reviewed < 0
            || session.correct_answers < 0
            || session.correct_answers > session.flashcards_reviewed
        {
            return Err(Error::Validation(format!(
                "invalid study session counts: {} correct of {} reviewed",
                session.correct_answers, session.flashcards_reviewed
            )))
            .op("failed to record study session");
        }

        self.execute_returning_id(
            sqlx::query(
                r#"
                INSERT INTO study_sessions
                    (project, flashcards_reviewed, correct_answers, duration_minutes, context_session_id, created_at)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&session.project)
            .bind(session.flashcards_reviewed)
            .bind(session.correct_answers)
            .bind(session.duration_minutes)
            .bind(session.context_session_id)
            .bind(db::format_timestamp(db::now())),
        )
        .await
        .op("failed to record study session")
    }
}

fn flashcard_from_row(row: &SqliteRow) -> Result<Flashcard> {
    Ok(Flashcard {
        id: row.try_get("id")?,
        question: row.try_get("question")?,
        answer: row.try_get("answer")?,
        category: row.try_get("category")?,
        difficulty: row.try_get("difficulty")?,
        source_capture_id: row.try_get("source_capture_id")?,
        context_session_id: row.try_get("context_session_id")?,
        project: row.try_get("project")?,
        created_at: get_timestamp(row, "created_at")?,
        last_reviewed: get_optional_timestamp(row, "last_reviewed")?,
        next_review: get_optional_timestamp(row, "next_review")?,
        ease_factor: row.try_get("ease_factor")?,
        review_count: row.try_get("review_count")?,
        correct_streak: row.try_get("correct_streak")?,
    })
}
