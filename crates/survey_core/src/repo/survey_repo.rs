//! Survey and question repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Create and load survey aggregates.
//! - Append and list questions owned by a section.
//!
//! # Invariants
//! - Question listing is deterministic: `sort_order ASC, id ASC`.
//! - Question orders are not unique in storage; append order comes from the
//!   ordering policy in the service layer.

use crate::db::{probe_schema, DbError, SchemaGap};
use crate::model::question::{Question, QuestionId};
use crate::model::section::SectionId;
use crate::model::survey::{Survey, SurveyId};
use rusqlite::{params, Connection, Row, Transaction, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};

const SURVEY_COLUMNS: &[&str] = &["id", "title", "created_at", "updated_at"];
const QUESTION_COLUMNS: &[&str] = &[
    "id",
    "section_id",
    "title",
    "sort_order",
    "created_at",
    "updated_at",
];

pub type SurveyRepoResult<T> = Result<T, SurveyRepoError>;

#[derive(Debug)]
pub enum SurveyRepoError {
    Db(DbError),
    SurveyNotFound(SurveyId),
    QuestionNotFound(QuestionId),
    Schema(SchemaGap),
}

impl Display for SurveyRepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::SurveyNotFound(id) => write!(f, "survey not found: {id}"),
            Self::QuestionNotFound(id) => write!(f, "question not found: {id}"),
            Self::Schema(gap) => write!(f, "survey repository schema mismatch: {gap}"),
        }
    }
}

impl Error for SurveyRepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for SurveyRepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for SurveyRepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Repository interface for surveys and their questions.
pub trait SurveyRepository {
    fn create_survey(&self, title: &str) -> SurveyRepoResult<Survey>;
    fn get_survey(&self, id: SurveyId) -> SurveyRepoResult<Option<Survey>>;
    fn section_exists(&self, section_id: SectionId) -> SurveyRepoResult<bool>;
    fn list_questions(&self, section_id: SectionId) -> SurveyRepoResult<Vec<Question>>;
    fn create_question(
        &self,
        section_id: SectionId,
        title: &str,
        order: i64,
    ) -> SurveyRepoResult<Question>;
    /// Runs `work` atomically; see `SectionRepository::unit_of_work`.
    fn unit_of_work<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&Self) -> Result<T, E>,
        E: From<SurveyRepoError>;
}

/// SQLite-backed survey repository.
pub struct SqliteSurveyRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteSurveyRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> SurveyRepoResult<Self> {
        let required = [("surveys", SURVEY_COLUMNS), ("questions", QUESTION_COLUMNS)];
        if let Some(gap) = probe_schema(conn, &required)? {
            return Err(SurveyRepoError::Schema(gap));
        }
        Ok(Self { conn })
    }
}

impl SurveyRepository for SqliteSurveyRepository<'_> {
    fn create_survey(&self, title: &str) -> SurveyRepoResult<Survey> {
        self.conn
            .execute("INSERT INTO surveys (title) VALUES (?1);", [title])?;
        let id = self.conn.last_insert_rowid();
        self.get_survey(id)?.ok_or(SurveyRepoError::SurveyNotFound(id))
    }

    fn get_survey(&self, id: SurveyId) -> SurveyRepoResult<Option<Survey>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT id, title, created_at, updated_at
             FROM surveys
             WHERE id = ?1;",
        )?;
        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(Survey {
                id: row.get("id")?,
                title: row.get("title")?,
                created_at: row.get("created_at")?,
                updated_at: row.get("updated_at")?,
            }));
        }
        Ok(None)
    }

    fn section_exists(&self, section_id: SectionId) -> SurveyRepoResult<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM sections WHERE id = ?1);",
            [section_id],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }

    fn list_questions(&self, section_id: SectionId) -> SurveyRepoResult<Vec<Question>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT id, section_id, title, sort_order, created_at, updated_at
             FROM questions
             WHERE section_id = ?1
             ORDER BY sort_order ASC, id ASC;",
        )?;
        let mut rows = stmt.query([section_id])?;
        let mut questions = Vec::new();
        while let Some(row) = rows.next()? {
            questions.push(parse_question_row(row)?);
        }
        Ok(questions)
    }

    fn create_question(
        &self,
        section_id: SectionId,
        title: &str,
        order: i64,
    ) -> SurveyRepoResult<Question> {
        self.conn.execute(
            "INSERT INTO questions (section_id, title, sort_order) VALUES (?1, ?2, ?3);",
            params![section_id, title, order],
        )?;
        let id = self.conn.last_insert_rowid();
        let mut stmt = self.conn.prepare_cached(
            "SELECT id, section_id, title, sort_order, created_at, updated_at
             FROM questions
             WHERE id = ?1;",
        )?;
        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return parse_question_row(row);
        }
        Err(SurveyRepoError::QuestionNotFound(id))
    }

    fn unit_of_work<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&Self) -> Result<T, E>,
        E: From<SurveyRepoError>,
    {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)
            .map_err(SurveyRepoError::from)?;
        let value = work(self)?;
        tx.commit().map_err(SurveyRepoError::from)?;
        Ok(value)
    }
}

fn parse_question_row(row: &Row<'_>) -> SurveyRepoResult<Question> {
    Ok(Question {
        id: row.get("id")?,
        section_id: row.get("section_id")?,
        title: row.get("title")?,
        order: row.get("sort_order")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
