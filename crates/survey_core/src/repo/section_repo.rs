//! Section persistence gateway and SQLite implementation.
//!
//! # Responsibility
//! - Expose the narrow storage contract the sync orchestrator depends on.
//! - Keep SQL and transaction handling inside the repository boundary.
//!
//! # Invariants
//! - Listing is deterministic: screening before main, then `sort_order ASC,
//!   id ASC`.
//! - `(survey_id, phase, sort_order)` is unique in storage; a write that
//!   would break it fails with [`SectionRepoError::OrderTaken`].
//! - [`SectionRepository::unit_of_work`] is never nested.

use crate::db::{probe_schema, DbError, SchemaGap};
use crate::model::section::{NewSection, Phase, Section, SectionId};
use crate::model::survey::SurveyId;
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};

const SECTION_SELECT_SQL: &str = "SELECT
    id,
    survey_id,
    phase,
    title,
    sort_order,
    created_at,
    updated_at
FROM sections";

const SECTION_COLUMNS: &[&str] = &[
    "id",
    "survey_id",
    "phase",
    "title",
    "sort_order",
    "created_at",
    "updated_at",
];

pub type SectionRepoResult<T> = Result<T, SectionRepoError>;

/// Errors from section persistence operations.
#[derive(Debug)]
pub enum SectionRepoError {
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// Target section does not exist.
    SectionNotFound(SectionId),
    /// Another section already holds this order slot.
    OrderTaken {
        survey_id: SurveyId,
        phase: Phase,
        order: i64,
    },
    /// Connection is not migrated to the schema this repository expects.
    Schema(SchemaGap),
    /// Persisted row cannot be converted to a valid read model.
    InvalidData(String),
}

impl Display for SectionRepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::SectionNotFound(id) => write!(f, "section not found: {id}"),
            Self::OrderTaken {
                survey_id,
                phase,
                order,
            } => write!(
                f,
                "order {order} is already used in survey {survey_id} phase {phase}"
            ),
            Self::Schema(gap) => write!(f, "section repository schema mismatch: {gap}"),
            Self::InvalidData(message) => write!(f, "invalid section data: {message}"),
        }
    }
}

impl Error for SectionRepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for SectionRepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for SectionRepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Storage contract consumed by the section services.
///
/// Every method except [`unit_of_work`](Self::unit_of_work) is a single
/// storage step; callers that need several steps to be atomic run them
/// inside one unit of work.
pub trait SectionRepository {
    /// Whether `survey_id` references an existing survey.
    fn survey_exists(&self, survey_id: SurveyId) -> SectionRepoResult<bool>;
    /// All sections of one survey, screening first, then by order.
    fn list_sections(&self, survey_id: SurveyId) -> SectionRepoResult<Vec<Section>>;
    /// Loads one section by id.
    fn get_section(&self, id: SectionId) -> SectionRepoResult<Option<Section>>;
    /// Inserts sections and returns them with storage-assigned ids, in input order.
    fn create_sections(&self, sections: &[NewSection]) -> SectionRepoResult<Vec<Section>>;
    /// Deletes sections by id. Owned questions go with them.
    fn delete_sections(&self, ids: &[SectionId]) -> SectionRepoResult<()>;
    /// Changes the order of one section.
    fn update_section_order(&self, id: SectionId, order: i64) -> SectionRepoResult<()>;
    /// Direct edit of title and order outside reconciliation.
    fn update_section(&self, id: SectionId, title: &str, order: i64) -> SectionRepoResult<()>;
    /// Runs `work` atomically.
    ///
    /// Commits when `work` returns `Ok`; any `Err` (from storage or from the
    /// caller's own checks) discards every change made inside `work`.
    fn unit_of_work<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&Self) -> Result<T, E>,
        E: From<SectionRepoError>;
}

impl<R: SectionRepository> SectionRepository for &R {
    fn survey_exists(&self, survey_id: SurveyId) -> SectionRepoResult<bool> {
        (**self).survey_exists(survey_id)
    }

    fn list_sections(&self, survey_id: SurveyId) -> SectionRepoResult<Vec<Section>> {
        (**self).list_sections(survey_id)
    }

    fn get_section(&self, id: SectionId) -> SectionRepoResult<Option<Section>> {
        (**self).get_section(id)
    }

    fn create_sections(&self, sections: &[NewSection]) -> SectionRepoResult<Vec<Section>> {
        (**self).create_sections(sections)
    }

    fn delete_sections(&self, ids: &[SectionId]) -> SectionRepoResult<()> {
        (**self).delete_sections(ids)
    }

    fn update_section_order(&self, id: SectionId, order: i64) -> SectionRepoResult<()> {
        (**self).update_section_order(id, order)
    }

    fn update_section(&self, id: SectionId, title: &str, order: i64) -> SectionRepoResult<()> {
        (**self).update_section(id, title, order)
    }

    fn unit_of_work<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&Self) -> Result<T, E>,
        E: From<SectionRepoError>,
    {
        (**self).unit_of_work(|_| work(self))
    }
}

/// SQLite-backed section repository over a caller-owned connection.
pub struct SqliteSectionRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteSectionRepository<'conn> {
    /// Creates repository from migrated connection.
    pub fn try_new(conn: &'conn Connection) -> SectionRepoResult<Self> {
        if let Some(gap) = probe_schema(conn, &[("sections", SECTION_COLUMNS)])? {
            return Err(SectionRepoError::Schema(gap));
        }
        Ok(Self { conn })
    }
}

impl SectionRepository for SqliteSectionRepository<'_> {
    fn survey_exists(&self, survey_id: SurveyId) -> SectionRepoResult<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM surveys WHERE id = ?1);",
            [survey_id],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }

    fn list_sections(&self, survey_id: SurveyId) -> SectionRepoResult<Vec<Section>> {
        let mut stmt = self.conn.prepare_cached(&format!(
            "{SECTION_SELECT_SQL}
             WHERE survey_id = ?1
             ORDER BY CASE phase WHEN 'screening' THEN 0 ELSE 1 END ASC,
                      sort_order ASC,
                      id ASC;"
        ))?;
        let mut rows = stmt.query([survey_id])?;
        let mut sections = Vec::new();
        while let Some(row) = rows.next()? {
            sections.push(parse_section_row(row)?);
        }
        Ok(sections)
    }

    fn get_section(&self, id: SectionId) -> SectionRepoResult<Option<Section>> {
        let mut stmt = self
            .conn
            .prepare_cached(&format!("{SECTION_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_section_row(row)?));
        }
        Ok(None)
    }

    fn create_sections(&self, sections: &[NewSection]) -> SectionRepoResult<Vec<Section>> {
        let mut created = Vec::with_capacity(sections.len());
        for section in sections {
            self.conn
                .prepare_cached(
                    "INSERT INTO sections (survey_id, phase, title, sort_order)
                     VALUES (?1, ?2, ?3, ?4);",
                )?
                .execute(params![
                    section.survey_id,
                    section.phase.as_str(),
                    section.title.as_str(),
                    section.order,
                ])
                .map_err(|err| {
                    map_order_conflict(err, section.survey_id, section.phase, section.order)
                })?;

            let id = self.conn.last_insert_rowid();
            let stored = self
                .get_section(id)?
                .ok_or(SectionRepoError::SectionNotFound(id))?;
            created.push(stored);
        }
        Ok(created)
    }

    fn delete_sections(&self, ids: &[SectionId]) -> SectionRepoResult<()> {
        let mut stmt = self
            .conn
            .prepare_cached("DELETE FROM sections WHERE id = ?1;")?;
        for id in ids {
            if stmt.execute([id])? == 0 {
                return Err(SectionRepoError::SectionNotFound(*id));
            }
        }
        Ok(())
    }

    fn update_section_order(&self, id: SectionId, order: i64) -> SectionRepoResult<()> {
        let changed = self
            .conn
            .execute(
                "UPDATE sections
                 SET sort_order = ?2,
                     updated_at = (strftime('%s', 'now') * 1000)
                 WHERE id = ?1;",
                params![id, order],
            )
            .map_err(|err| self.order_conflict_for(err, id, order))?;
        if changed == 0 {
            return Err(SectionRepoError::SectionNotFound(id));
        }
        Ok(())
    }

    fn update_section(&self, id: SectionId, title: &str, order: i64) -> SectionRepoResult<()> {
        let changed = self
            .conn
            .execute(
                "UPDATE sections
                 SET title = ?2,
                     sort_order = ?3,
                     updated_at = (strftime('%s', 'now') * 1000)
                 WHERE id = ?1;",
                params![id, title, order],
            )
            .map_err(|err| self.order_conflict_for(err, id, order))?;
        if changed == 0 {
            return Err(SectionRepoError::SectionNotFound(id));
        }
        Ok(())
    }

    fn unit_of_work<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&Self) -> Result<T, E>,
        E: From<SectionRepoError>,
    {
        // IMMEDIATE takes the write lock before the first read, so a second
        // writer on the same database waits until this one commits.
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)
            .map_err(SectionRepoError::from)?;
        let value = work(self)?;
        tx.commit().map_err(SectionRepoError::from)?;
        Ok(value)
    }
}

impl SqliteSectionRepository<'_> {
    fn order_conflict_for(
        &self,
        err: rusqlite::Error,
        id: SectionId,
        order: i64,
    ) -> SectionRepoError {
        if !is_unique_violation(&err) {
            return err.into();
        }
        match self.scope_of(id) {
            Ok(Some((survey_id, phase))) => SectionRepoError::OrderTaken {
                survey_id,
                phase,
                order,
            },
            Ok(None) => SectionRepoError::SectionNotFound(id),
            Err(scope_err) => scope_err,
        }
    }

    fn scope_of(&self, id: SectionId) -> SectionRepoResult<Option<(SurveyId, Phase)>> {
        let scope: Option<(SurveyId, String)> = self
            .conn
            .query_row(
                "SELECT survey_id, phase FROM sections WHERE id = ?1;",
                [id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        scope
            .map(|(survey_id, phase)| Ok((survey_id, parse_phase(&phase)?)))
            .transpose()
    }
}

fn map_order_conflict(
    err: rusqlite::Error,
    survey_id: SurveyId,
    phase: Phase,
    order: i64,
) -> SectionRepoError {
    if is_unique_violation(&err) {
        SectionRepoError::OrderTaken {
            survey_id,
            phase,
            order,
        }
    } else {
        err.into()
    }
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

fn parse_section_row(row: &Row<'_>) -> SectionRepoResult<Section> {
    let phase_text: String = row.get("phase")?;
    let order: i64 = row.get("sort_order")?;
    if order < 1 {
        return Err(SectionRepoError::InvalidData(format!(
            "invalid sort_order `{order}` in sections.sort_order"
        )));
    }

    Ok(Section {
        id: row.get("id")?,
        survey_id: row.get("survey_id")?,
        phase: parse_phase(&phase_text)?,
        title: row.get("title")?,
        order,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn parse_phase(value: &str) -> SectionRepoResult<Phase> {
    Phase::parse(value).ok_or_else(|| {
        SectionRepoError::InvalidData(format!("invalid phase `{value}` in sections.phase"))
    })
}
