// Database queries: every SQL statement lives here.
//
// Keeps SQL contained in one place and gives the rest of the app clean
// Rust interfaces over `Connection`.

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::models::{Post, PostCounts};

// --- Posts ---

/// Insert a post, ignoring it if the permalink is already stored.
/// Returns true when a new row was written.
pub fn insert_post(conn: &Connection, post: &Post) -> Result<bool> {
    let media_json = serde_json::to_string(&post.media_urls)?;
    let changed = conn.execute(
        "INSERT OR IGNORE INTO posts
            (url, title, author, subreddit, media_urls, media_count, created_utc)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            post.url,
            post.title,
            post.author,
            post.subreddit,
            media_json,
            post.media_urls.len() as i64,
            post.created_utc,
        ],
    )?;
    Ok(changed > 0)
}

/// Every post that has at least one media reference, oldest first.
///
/// This is the screening corpus: posts without media can never satisfy
/// the weapon half of the gate, so they are filtered out here.
pub fn posts_with_media(conn: &Connection) -> Result<Vec<Post>> {
    let mut stmt = conn.prepare(
        "SELECT title, author, subreddit, url, media_urls, created_utc, ingested_at
         FROM posts
         WHERE media_count > 0
         ORDER BY id ASC",
    )?;

    let rows = stmt.query_map([], row_to_post)?;

    let mut posts = Vec::new();
    for row in rows {
        let post = row?;
        // media_count and media_urls are written together, but a hand-edited
        // row could still disagree; the JSON is authoritative.
        if post.has_media() {
            posts.push(post);
        }
    }
    Ok(posts)
}

/// Look up a single post by permalink.
pub fn get_post(conn: &Connection, url: &str) -> Result<Option<Post>> {
    let mut stmt = conn.prepare(
        "SELECT title, author, subreddit, url, media_urls, created_utc, ingested_at
         FROM posts WHERE url = ?1",
    )?;
    let post = stmt.query_row(params![url], row_to_post).optional()?;
    Ok(post)
}

pub fn count_posts(conn: &Connection) -> Result<PostCounts> {
    let counts = conn.query_row(
        "SELECT COUNT(*), COALESCE(SUM(CASE WHEN media_count > 0 THEN 1 ELSE 0 END), 0)
         FROM posts",
        [],
        |row| {
            Ok(PostCounts {
                total: row.get(0)?,
                with_media: row.get(1)?,
            })
        },
    )?;
    Ok(counts)
}

fn row_to_post(row: &Row<'_>) -> rusqlite::Result<Post> {
    let media_json: String = row.get(4)?;
    let media_urls: Vec<String> = serde_json::from_str(&media_json).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(Post {
        title: row.get(0)?,
        author: row.get(1)?,
        subreddit: row.get(2)?,
        url: row.get(3)?,
        media_urls,
        created_utc: row.get(5)?,
        ingested_at: row.get(6)?,
    })
}

// --- Ingest state ---

/// Get an ingest state value by key (e.g., "last_ingest_at").
pub fn get_state(conn: &Connection, key: &str) -> Result<Option<String>> {
    let mut stmt = conn.prepare("SELECT value FROM ingest_state WHERE key = ?1")?;
    let result = stmt.query_row(params![key], |row| row.get(0)).optional()?;
    Ok(result)
}

/// Set an ingest state value (upsert).
pub fn set_state(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO ingest_state (key, value, updated_at)
         VALUES (?1, ?2, datetime('now'))
         ON CONFLICT(key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
        params![key, value],
    )
    .with_context(|| format!("Failed to write ingest state {key}"))?;
    Ok(())
}
