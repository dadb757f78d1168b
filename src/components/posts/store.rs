use super::models::{Post, PostPage};
use crate::error::AppResult;
use async_trait::async_trait;
use tokio::sync::RwLock;

/// Largest page a caller may ask for
pub const MAX_PAGE_SIZE: usize = 50;

/// Page size when the caller does not pick one
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Storage for the post feed
#[async_trait]
pub trait PostStore: Send + Sync + 'static {
    /// Posts newest first, skipping `offset` and returning at most `limit`
    async fn latest(&self, offset: usize, limit: usize) -> AppResult<Vec<Post>>;

    /// Add or replace a post
    async fn insert(&self, post: &Post) -> AppResult<()>;
}

/// Read one page (1-based). Asks the store for one extra post to learn
/// whether another page exists.
pub async fn fetch_page(store: &dyn PostStore, page: usize, limit: usize) -> AppResult<PostPage> {
    let page = page.max(1);
    let limit = limit.clamp(1, MAX_PAGE_SIZE);
    let offset = (page - 1).saturating_mul(limit);

    let mut posts = store.latest(offset, limit + 1).await?;
    let has_more = posts.len() > limit;
    posts.truncate(limit);

    Ok(PostPage {
        posts,
        page,
        limit,
        has_more,
    })
}

/// In-memory implementation of the post store (fallback and tests)
#[derive(Debug, Default)]
pub struct InMemoryPostStore {
    posts: RwLock<Vec<Post>>,
}

impl InMemoryPostStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with the given posts
    pub fn with_posts(posts: Vec<Post>) -> Self {
        let mut posts = posts;
        sort_newest_first(&mut posts);
        Self {
            posts: RwLock::new(posts),
        }
    }
}

fn sort_newest_first(posts: &mut [Post]) {
    posts.sort_by(|a, b| b.published_at.cmp(&a.published_at));
}

#[async_trait]
impl PostStore for InMemoryPostStore {
    async fn latest(&self, offset: usize, limit: usize) -> AppResult<Vec<Post>> {
        let posts = self.posts.read().await;
        Ok(posts.iter().skip(offset).take(limit).cloned().collect())
    }

    async fn insert(&self, post: &Post) -> AppResult<()> {
        let mut posts = self.posts.write().await;
        posts.retain(|p| p.id != post.id);
        posts.push(post.clone());
        sort_newest_first(&mut posts);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn post(id: &str, minutes: i64) -> Post {
        Post {
            id: id.to_string(),
            text: format!("post {}", id),
            url: None,
            author: None,
            published_at: Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
                + Duration::minutes(minutes),
        }
    }

    fn ids(page: &PostPage) -> Vec<&str> {
        page.posts.iter().map(|p| p.id.as_str()).collect()
    }

    #[tokio::test]
    async fn test_pages_newest_first() {
        let store = InMemoryPostStore::with_posts(vec![
            post("a", 1),
            post("b", 2),
            post("c", 3),
            post("d", 4),
            post("e", 5),
        ]);

        let first = fetch_page(&store, 1, 2).await.unwrap();
        assert_eq!(ids(&first), vec!["e", "d"]);
        assert!(first.has_more);

        let last = fetch_page(&store, 3, 2).await.unwrap();
        assert_eq!(ids(&last), vec!["a"]);
        assert!(!last.has_more);

        let beyond = fetch_page(&store, 9, 2).await.unwrap();
        assert!(beyond.posts.is_empty());
        assert!(!beyond.has_more);
    }

    #[tokio::test]
    async fn test_exact_page_has_no_more() {
        let store = InMemoryPostStore::with_posts(vec![post("a", 1), post("b", 2)]);
        let page = fetch_page(&store, 1, 2).await.unwrap();
        assert_eq!(page.posts.len(), 2);
        assert!(!page.has_more);
    }

    #[tokio::test]
    async fn test_limit_is_clamped() {
        let store = InMemoryPostStore::new();
        assert_eq!(fetch_page(&store, 1, 500).await.unwrap().limit, MAX_PAGE_SIZE);
        assert_eq!(fetch_page(&store, 0, 0).await.unwrap().page, 1);
    }

    #[tokio::test]
    async fn test_insert_replaces_same_id() {
        let store = InMemoryPostStore::new();
        store.insert(&post("a", 1)).await.unwrap();
        store.insert(&post("b", 2)).await.unwrap();
        store.insert(&post("a", 3)).await.unwrap();

        let page = fetch_page(&store, 1, 10).await.unwrap();
        assert_eq!(ids(&page), vec!["a", "b"]);
    }
}
