// SqliteStore: rusqlite backend implementing the PostStore trait.
//
// The Connection is wrapped in tokio::sync::Mutex because Connection is !Sync.
// Trait methods lock the mutex, do synchronous rusqlite work, and return.

use anyhow::Result;
use async_trait::async_trait;
use rusqlite::Connection;
use tokio::sync::Mutex;

use super::models::{Post, PostCounts};
use super::traits::PostStore;

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Wrap an already-opened rusqlite Connection.
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }
}

#[async_trait]
impl PostStore for SqliteStore {
    async fn table_count(&self) -> Result<i64> {
        let conn = self.conn.lock().await;
        super::schema::table_count(&conn)
    }

    async fn insert_post(&self, post: &Post) -> Result<bool> {
        let conn = self.conn.lock().await;
        super::queries::insert_post(&conn, post)
    }

    async fn posts_with_media(&self) -> Result<Vec<Post>> {
        let conn = self.conn.lock().await;
        super::queries::posts_with_media(&conn)
    }

    async fn count_posts(&self) -> Result<PostCounts> {
        let conn = self.conn.lock().await;
        super::queries::count_posts(&conn)
    }

    async fn get_state(&self, key: &str) -> Result<Option<String>> {
        let conn = self.conn.lock().await;
        super::queries::get_state(&conn, key)
    }

    async fn set_state(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.conn.lock().await;
        super::queries::set_state(&conn, key, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schema::create_tables;

    fn test_store() -> SqliteStore {
        let conn = Connection::open_in_memory().unwrap();
        create_tables(&conn).unwrap();
        SqliteStore::new(conn)
    }

    fn post(url: &str, media: Vec<String>) -> Post {
        Post {
            title: "Look at my new blade".to_string(),
            author: None,
            subreddit: "knives".to_string(),
            url: url.to_string(),
            media_urls: media,
            created_utc: 1_700_000_000.0,
            ingested_at: String::new(),
        }
    }

    #[tokio::test]
    async fn test_trait_table_count() {
        let store = test_store();
        assert_eq!(store.table_count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_trait_insert_and_query() {
        let store = test_store();
        assert!(store
            .insert_post(&post("https://reddit.com/r/knives/1", vec!["https://i.redd.it/a.jpg".into()]))
            .await
            .unwrap());
        assert!(store
            .insert_post(&post("https://reddit.com/r/knives/2", vec![]))
            .await
            .unwrap());

        let screened = store.posts_with_media().await.unwrap();
        assert_eq!(screened.len(), 1);
        assert!(screened.iter().all(|p| p.has_media()));

        let counts = store.count_posts().await.unwrap();
        assert_eq!(counts.total, 2);
        assert_eq!(counts.with_media, 1);
    }

    #[tokio::test]
    async fn test_trait_state_roundtrip() {
        let store = test_store();
        assert_eq!(store.get_state("last_ingest_at").await.unwrap(), None);
        store.set_state("last_ingest_at", "2026-01-01T00:00:00Z").await.unwrap();
        assert_eq!(
            store.get_state("last_ingest_at").await.unwrap(),
            Some("2026-01-01T00:00:00Z".to_string())
        );
    }
}
