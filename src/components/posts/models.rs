use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A social-media post mirrored into the post store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    pub published_at: DateTime<Utc>,
}

/// One page of the post feed, newest first
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostPage {
    pub posts: Vec<Post>,
    pub page: usize,
    pub limit: usize,
    pub has_more: bool,
}
