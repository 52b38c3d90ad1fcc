// PostStore trait: backend-agnostic async interface over persisted posts.
//
// Implementors: SqliteStore (wraps rusqlite). Methods are async so a
// native-async backend can slot in behind the same interface.

use anyhow::Result;
use async_trait::async_trait;

use super::models::{Post, PostCounts};

#[async_trait]
pub trait PostStore: Send + Sync {
    /// Count the number of user-created tables in the database.
    async fn table_count(&self) -> Result<i64>;

    /// Store a post. Returns false if the permalink was already present.
    async fn insert_post(&self, post: &Post) -> Result<bool>;

    /// All posts with a non-empty media list (the screening corpus).
    async fn posts_with_media(&self) -> Result<Vec<Post>>;

    async fn count_posts(&self) -> Result<PostCounts>;

    async fn get_state(&self, key: &str) -> Result<Option<String>>;

    async fn set_state(&self, key: &str, value: &str) -> Result<()>;
}
