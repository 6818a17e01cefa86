use positions_core::db::migrations::latest_version;
use positions_core::db::{open_db, open_db_in_memory, DbError};
use positions_core::{PositionRepository, SqlitePositionRepository};
use rusqlite::Connection;

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    assert_eq!(table_columns(&conn, "positions"), vec![
        "id".to_string(),
        "name".to_string(),
        "description".to_string(),
        "parent_id".to_string(),
    ]);
    let foreign_keys: i64 = conn
        .query_row("PRAGMA foreign_keys;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(foreign_keys, 1);
}

#[test]
fn reopening_file_database_keeps_rows() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("positions.db");

    let conn_first = open_db(&path).unwrap();
    let root_id = {
        let repo = SqlitePositionRepository::try_new(&conn_first).unwrap();
        repo.insert("CEO", "Chief", None).unwrap().id
    };
    drop(conn_first);

    let conn_second = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_second), latest_version());
    let repo = SqlitePositionRepository::try_new(&conn_second).unwrap();
    let root = repo.find_by_id(root_id).unwrap().unwrap();
    assert_eq!(root.name, "CEO");
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    match open_db(&path).unwrap_err() {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn schema_rejects_overlong_name_even_without_validation() {
    let conn = open_db_in_memory().unwrap();
    let err = conn
        .execute(
            "INSERT INTO positions (id, name, description, parent_id)
             VALUES ('00000000-0000-4000-8000-000000000001', ?1, 'desc', NULL);",
            ["x".repeat(256)],
        )
        .unwrap_err();
    assert!(err.to_string().contains("CHECK"));
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

fn table_columns(conn: &Connection, table: &str) -> Vec<String> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});")).unwrap();
    stmt.query_map([], |row| row.get::<_, String>(1))
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap()
}
