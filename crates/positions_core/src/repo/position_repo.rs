//! Position repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide point queries and mutations over the `positions` relation.
//! - Keep SQL details inside the repository boundary.
//!
//! # Invariants
//! - No business rules live here; every method is one statement.
//! - Listing order is insertion order (`rowid ASC`).
//! - Schema constraint failures are classified into semantic variants
//!   (`RootAlreadyExists`, `ParentNotFound`, `HasChildren`); anything else is
//!   surfaced as `Db`.

use crate::db::migrations::latest_version;
use crate::db::DbError;
use crate::model::position::{Position, PositionId};
use rusqlite::ffi::{ErrorCode, SQLITE_CONSTRAINT_FOREIGNKEY, SQLITE_CONSTRAINT_UNIQUE};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const POSITION_SELECT_SQL: &str = "SELECT
    id,
    name,
    description,
    parent_id
FROM positions";

const REQUIRED_COLUMNS: [&str; 4] = ["id", "name", "description", "parent_id"];

/// Result type used by position repository operations.
pub type PositionRepoResult<T> = Result<T, PositionRepoError>;

/// Errors from position repository operations.
#[derive(Debug)]
pub enum PositionRepoError {
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// Single-root index rejected a second NULL-parent row.
    RootAlreadyExists,
    /// Foreign key rejected a write pointing at a missing parent.
    ParentNotFound(Option<PositionId>),
    /// Foreign key rejected deleting a row that still has children.
    HasChildren(PositionId),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Required table is missing.
    MissingRequiredTable(&'static str),
    /// Required column is missing from expected table.
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
    /// Persisted data cannot be converted to a valid `Position`.
    InvalidData(String),
}

impl Display for PositionRepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::RootAlreadyExists => write!(f, "a root position already exists"),
            Self::ParentNotFound(Some(id)) => write!(f, "parent position not found: {id}"),
            Self::ParentNotFound(None) => write!(f, "parent position not found"),
            Self::HasChildren(id) => write!(f, "position {id} still has children"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "position repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "position repository requires table `{table}`")
            }
            Self::MissingRequiredColumn { table, column } => write!(
                f,
                "position repository requires column `{column}` in table `{table}`"
            ),
            Self::InvalidData(message) => write!(f, "invalid position data: {message}"),
        }
    }
}

impl Error for PositionRepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for PositionRepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for PositionRepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Data access contract for the positions relation.
///
/// Implementations perform exactly one store round trip per call.
pub trait PositionRepository {
    /// Loads one row by id.
    fn find_by_id(&self, id: PositionId) -> PositionRepoResult<Option<Position>>;
    /// Lists direct children of `parent_id` in insertion order.
    fn find_by_parent_id(&self, parent_id: PositionId) -> PositionRepoResult<Vec<Position>>;
    /// Lists every row whose parent is NULL.
    fn find_roots(&self) -> PositionRepoResult<Vec<Position>>;
    /// Inserts a new row and returns it with its generated id.
    fn insert(
        &self,
        name: &str,
        description: &str,
        parent_id: Option<PositionId>,
    ) -> PositionRepoResult<Position>;
    /// Overwrites all mutable columns. Missing ids are a silent no-op.
    fn update(
        &self,
        id: PositionId,
        name: &str,
        description: &str,
        parent_id: Option<PositionId>,
    ) -> PositionRepoResult<()>;
    /// Deletes one row. Missing ids are a silent no-op.
    fn delete(&self, id: PositionId) -> PositionRepoResult<()>;
}

/// SQLite-backed position repository borrowing an injected connection.
pub struct SqlitePositionRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqlitePositionRepository<'conn> {
    /// Creates repository from a migrated connection.
    ///
    /// # Errors
    /// Fails when the connection was not bootstrapped through `db::open_db*`.
    pub fn try_new(conn: &'conn Connection) -> PositionRepoResult<Self> {
        ensure_positions_connection_ready(conn)?;
        Ok(Self { conn })
    }

    fn query_positions(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> PositionRepoResult<Vec<Position>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(params)?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_position_row(row)?);
        }
        Ok(items)
    }
}

impl PositionRepository for SqlitePositionRepository<'_> {
    fn find_by_id(&self, id: PositionId) -> PositionRepoResult<Option<Position>> {
        let sql = format!("{POSITION_SELECT_SQL} WHERE id = ?1;");
        let row = self
            .conn
            .query_row(&sql, [id.to_string()], |row| Ok(parse_position_row(row)))
            .optional()?;
        row.transpose()
    }

    fn find_by_parent_id(&self, parent_id: PositionId) -> PositionRepoResult<Vec<Position>> {
        let sql = format!("{POSITION_SELECT_SQL} WHERE parent_id = ?1 ORDER BY rowid ASC;");
        self.query_positions(&sql, [parent_id.to_string()])
    }

    fn find_roots(&self) -> PositionRepoResult<Vec<Position>> {
        let sql = format!("{POSITION_SELECT_SQL} WHERE parent_id IS NULL ORDER BY rowid ASC;");
        self.query_positions(&sql, [])
    }

    fn insert(
        &self,
        name: &str,
        description: &str,
        parent_id: Option<PositionId>,
    ) -> PositionRepoResult<Position> {
        let id = Uuid::new_v4();
        self.conn
            .execute(
                "INSERT INTO positions (id, name, description, parent_id)
                 VALUES (?1, ?2, ?3, ?4);",
                params![
                    id.to_string(),
                    name,
                    description,
                    parent_id.map(|value| value.to_string()),
                ],
            )
            .map_err(|err| classify_write_error(err, parent_id))?;

        Ok(Position {
            id,
            name: name.to_string(),
            description: description.to_string(),
            parent_id,
        })
    }

    fn update(
        &self,
        id: PositionId,
        name: &str,
        description: &str,
        parent_id: Option<PositionId>,
    ) -> PositionRepoResult<()> {
        self.conn
            .execute(
                "UPDATE positions
                 SET name = ?2,
                     description = ?3,
                     parent_id = ?4
                 WHERE id = ?1;",
                params![
                    id.to_string(),
                    name,
                    description,
                    parent_id.map(|value| value.to_string()),
                ],
            )
            .map_err(|err| classify_write_error(err, parent_id))?;
        Ok(())
    }

    fn delete(&self, id: PositionId) -> PositionRepoResult<()> {
        self.conn
            .execute("DELETE FROM positions WHERE id = ?1;", [id.to_string()])
            .map_err(|err| match constraint_kind(&err) {
                Some(SQLITE_CONSTRAINT_FOREIGNKEY) => PositionRepoError::HasChildren(id),
                _ => err.into(),
            })?;
        Ok(())
    }
}

fn classify_write_error(err: rusqlite::Error, parent_id: Option<PositionId>) -> PositionRepoError {
    match constraint_kind(&err) {
        Some(SQLITE_CONSTRAINT_UNIQUE) if parent_id.is_none() => {
            PositionRepoError::RootAlreadyExists
        }
        Some(SQLITE_CONSTRAINT_FOREIGNKEY) => PositionRepoError::ParentNotFound(parent_id),
        _ => err.into(),
    }
}

/// Returns the extended result code of a constraint violation.
fn constraint_kind(err: &rusqlite::Error) -> Option<i32> {
    match err {
        rusqlite::Error::SqliteFailure(inner, _)
            if inner.code == ErrorCode::ConstraintViolation =>
        {
            Some(inner.extended_code)
        }
        _ => None,
    }
}

fn parse_position_row(row: &Row<'_>) -> PositionRepoResult<Position> {
    let id_text: String = row.get("id")?;
    let id = parse_uuid(&id_text, "positions.id")?;
    let parent_id = row
        .get::<_, Option<String>>("parent_id")?
        .map(|value| parse_uuid(&value, "positions.parent_id"))
        .transpose()?;

    Ok(Position {
        id,
        name: row.get("name")?,
        description: row.get("description")?,
        parent_id,
    })
}

fn parse_uuid(value: &str, column: &'static str) -> PositionRepoResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| PositionRepoError::InvalidData(format!("invalid uuid `{value}` in {column}")))
}

fn ensure_positions_connection_ready(conn: &Connection) -> PositionRepoResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(PositionRepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'positions'
        );",
        [],
        |row| row.get(0),
    )?;
    if exists != 1 {
        return Err(PositionRepoError::MissingRequiredTable("positions"));
    }

    let mut stmt = conn.prepare("PRAGMA table_info(positions);")?;
    let columns = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<Result<Vec<_>, _>>()?;
    for column in REQUIRED_COLUMNS {
        if !columns.iter().any(|current| current == column) {
            return Err(PositionRepoError::MissingRequiredColumn {
                table: "positions",
                column,
            });
        }
    }

    Ok(())
}
