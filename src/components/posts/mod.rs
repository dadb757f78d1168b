pub mod models;
mod redis_store;
mod store;

pub use models::{Post, PostPage};
pub use redis_store::RedisPostStore;
pub use store::{fetch_page, InMemoryPostStore, PostStore, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
