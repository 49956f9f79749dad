//! Listing operations for enriched job records.
//!
//! This module provides upsert and read operations for the `job_listings`
//! table. Rows are keyed by listing identity; writing an identity that is
//! already stored replaces every field except `created_at`.

use crate::error::{DatabaseError, Result};
use chrono::Utc;
use jobtrawl_core::{EnrichedRecord, Identity};
use sqlx::sqlite::SqliteRow;
use sqlx::{Pool, Row, Sqlite};

const SELECT_COLUMNS: &str = "SELECT identity, source_url, search_keyword, title, organization,
            responsibilities, qualifications, experience_notes, skills, salary, location
     FROM job_listings";

/// Insert a listing, or update it in place if its identity already exists.
///
/// The write is a single `INSERT ... ON CONFLICT` statement, so concurrent
/// upserts of the same identity converge on one row.
///
/// # Errors
/// Returns `DatabaseError` if a list field cannot be serialized or the write fails.
pub async fn upsert_listing(pool: &Pool<Sqlite>, record: &EnrichedRecord) -> Result<()> {
    let now = Utc::now().to_rfc3339();

    sqlx::query(
        "INSERT INTO job_listings (identity, source_url, search_keyword, title, organization,
                                   responsibilities, qualifications, experience_notes, skills,
                                   salary, location, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
         ON CONFLICT(identity) DO UPDATE SET
             source_url = excluded.source_url,
             search_keyword = excluded.search_keyword,
             title = excluded.title,
             organization = excluded.organization,
             responsibilities = excluded.responsibilities,
             qualifications = excluded.qualifications,
             experience_notes = excluded.experience_notes,
             skills = excluded.skills,
             salary = excluded.salary,
             location = excluded.location,
             updated_at = excluded.updated_at",
    )
    .bind(record.identity.as_str())
    .bind(&record.source_url)
    .bind(&record.search_keyword)
    .bind(&record.title)
    .bind(&record.organization)
    .bind(encode_list(&record.responsibilities)?)
    .bind(encode_list(&record.qualifications)?)
    .bind(encode_list(&record.experience_notes)?)
    .bind(encode_list(&record.skills)?)
    .bind(&record.salary)
    .bind(&record.location)
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await?;

    Ok(())
}

/// Get a listing by identity.
///
/// # Errors
/// Returns `DatabaseError` if the query fails or the row cannot be decoded.
pub async fn get_by_identity(
    pool: &Pool<Sqlite>,
    identity: &Identity,
) -> Result<Option<EnrichedRecord>> {
    let row = sqlx::query(&format!("{SELECT_COLUMNS} WHERE identity = ?"))
        .bind(identity.as_str())
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(row_to_record).transpose()
}

/// Get all listings discovered under a search keyword, oldest first.
///
/// # Errors
/// Returns `DatabaseError` if the query fails or a row cannot be decoded.
pub async fn get_by_keyword(pool: &Pool<Sqlite>, keyword: &str) -> Result<Vec<EnrichedRecord>> {
    let rows = sqlx::query(&format!(
        "{SELECT_COLUMNS} WHERE search_keyword = ? ORDER BY created_at, identity"
    ))
    .bind(keyword)
    .fetch_all(pool)
    .await?;

    rows.iter().map(row_to_record).collect()
}

/// Count the listings stored under a search keyword.
///
/// # Errors
/// Returns `DatabaseError` if the query fails.
pub async fn count_by_keyword(pool: &Pool<Sqlite>, keyword: &str) -> Result<u64> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM job_listings WHERE search_keyword = ?")
            .bind(keyword)
            .fetch_one(pool)
            .await?;

    u64::try_from(count).map_err(|e| DatabaseError::Decode(format!("negative count: {e}")))
}

/// List every stored identity in ascending order.
///
/// # Errors
/// Returns `DatabaseError` if the query fails or an identity is empty.
pub async fn list_identities(pool: &Pool<Sqlite>) -> Result<Vec<Identity>> {
    let ids: Vec<String> = sqlx::query_scalar("SELECT identity FROM job_listings ORDER BY identity")
        .fetch_all(pool)
        .await?;

    ids.into_iter()
        .map(|id| {
            Identity::new(id).ok_or_else(|| DatabaseError::Decode("empty identity".to_string()))
        })
        .collect()
}

/// Delete a listing. Returns whether a row was removed.
///
/// # Errors
/// Returns `DatabaseError` if the delete fails.
pub async fn delete_listing(pool: &Pool<Sqlite>, identity: &Identity) -> Result<bool> {
    let result = sqlx::query("DELETE FROM job_listings WHERE identity = ?")
        .bind(identity.as_str())
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

fn encode_list(values: &[String]) -> Result<String> {
    serde_json::to_string(values).map_err(|e| DatabaseError::Encode(e.to_string()))
}

fn decode_list(row: &SqliteRow, column: &str) -> Result<Vec<String>> {
    let raw: String = row.try_get(column)?;
    serde_json::from_str(&raw)
        .map_err(|e| DatabaseError::Decode(format!("column '{column}' is not a string list: {e}")))
}

fn row_to_record(row: &SqliteRow) -> Result<EnrichedRecord> {
    let identity: String = row.try_get("identity")?;
    let identity = Identity::new(identity)
        .ok_or_else(|| DatabaseError::Decode("empty identity".to_string()))?;

    Ok(EnrichedRecord {
        identity,
        source_url: row.try_get("source_url")?,
        search_keyword: row.try_get("search_keyword")?,
        title: row.try_get("title")?,
        organization: row.try_get("organization")?,
        responsibilities: decode_list(row, "responsibilities")?,
        qualifications: decode_list(row, "qualifications")?,
        experience_notes: decode_list(row, "experience_notes")?,
        skills: decode_list(row, "skills")?,
        salary: row.try_get("salary")?,
        location: row.try_get("location")?,
    })
}
