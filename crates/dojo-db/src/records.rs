use anyhow::Result;
use chrono::NaiveDate;
use rusqlite::{Connection, Row, params};

use dojo_types::record::RecordKind;

use crate::models::{RecordRow, format_date};
use crate::{Database, OptionalExt};

const RECORD_SELECT: &str = "SELECT id, user_id, kind, date, label, amount, created_at FROM progress_records";

const RECORD_ORDER: &str = "ORDER BY date DESC, created_at DESC, rowid DESC";

/// The dated part of a progress record.
pub struct RecordFields<'a> {
    pub date: NaiveDate,
    pub label: Option<&'a str>,
    pub amount: Option<i64>,
}

impl Database {
    pub fn insert_record(&self, id: &str, user_id: &str, kind: RecordKind, fields: &RecordFields<'_>) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO progress_records (id, user_id, kind, date, label, amount) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![id, user_id, kind.as_str(), format_date(fields.date), fields.label, fields.amount],
            )?;
            Ok(())
        })
    }

    pub fn get_record(&self, id: &str) -> Result<Option<RecordRow>> {
        self.with_conn(|conn| {
            let sql = format!("{RECORD_SELECT} WHERE id = ?1");
            conn.query_row(&sql, [id], record_from_row).optional()
        })
    }

    pub fn update_record(&self, id: &str, fields: &RecordFields<'_>) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE progress_records SET date = ?1, label = ?2, amount = ?3 WHERE id = ?4",
                params![format_date(fields.date), fields.label, fields.amount, id],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn delete_record(&self, id: &str) -> Result<bool> {
        self.with_conn(|conn| Ok(conn.execute("DELETE FROM progress_records WHERE id = ?1", [id])? > 0))
    }

    /// A profile's records, newest first; all kinds when `kind` is `None`.
    pub fn records_for_user(&self, user_id: &str, kind: Option<RecordKind>) -> Result<Vec<RecordRow>> {
        self.with_conn(|conn| match kind {
            Some(kind) => {
                let sql = format!("{RECORD_SELECT} WHERE user_id = ?1 AND kind = ?2 {RECORD_ORDER}");
                query_records(conn, &sql, params![user_id, kind.as_str()])
            }
            None => {
                let sql = format!("{RECORD_SELECT} WHERE user_id = ?1 {RECORD_ORDER}");
                query_records(conn, &sql, params![user_id])
            }
        })
    }

    /// Every record dated within `[start, end]`, across all profiles.
    pub fn records_between(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<RecordRow>> {
        self.with_conn(|conn| {
            let sql = format!("{RECORD_SELECT} WHERE date BETWEEN ?1 AND ?2 {RECORD_ORDER}");
            query_records(conn, &sql, params![format_date(start), format_date(end)])
        })
    }
}

fn query_records<P: rusqlite::Params>(conn: &Connection, sql: &str, params: P) -> Result<Vec<RecordRow>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, record_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<RecordRow> {
    Ok(RecordRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        kind: row.get(2)?,
        date: row.get(3)?,
        label: row.get(4)?,
        amount: row.get(5)?,
        created_at: row.get(6)?,
    })
}
