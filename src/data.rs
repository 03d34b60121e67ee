use std::collections::HashMap;
use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use parking_lot::Mutex;
use serde_json::{json, Value};

use crate::content::{self, StoreError};
use crate::model::{Category, Channel, LoreSection, NewPost, Post};

pub trait DirectoryService: Send + Sync {
    fn list_directory(&self) -> Result<Vec<Category>, StoreError>;
    fn list_lore_sections(&self) -> Result<Vec<LoreSection>, StoreError>;
}

pub trait FeedService: Send + Sync {
    fn list_posts(&self, channel_id: &str) -> Result<Vec<Post>, StoreError>;
}

pub trait PostService: Send + Sync {
    fn create_post(&self, channel_id: &str, post: &NewPost) -> Result<Post, StoreError>;
}

pub trait StatusService: Send + Sync {
    fn health(&self) -> Result<Value, StoreError>;
}

/// The service handles a console session needs, usually all backed by one store.
#[derive(Clone)]
pub struct Services {
    pub directory: Arc<dyn DirectoryService>,
    pub feed: Arc<dyn FeedService>,
    pub posts: Arc<dyn PostService>,
    pub status: Arc<dyn StatusService>,
}

impl Services {
    pub fn from_store<S>(store: Arc<S>) -> Self
    where
        S: DirectoryService + FeedService + PostService + StatusService + 'static,
    {
        Self {
            directory: store.clone(),
            feed: store.clone(),
            posts: store.clone(),
            status: store,
        }
    }
}

impl DirectoryService for content::Client {
    fn list_directory(&self) -> Result<Vec<Category>, StoreError> {
        content::Client::list_directory(self)
    }

    fn list_lore_sections(&self) -> Result<Vec<LoreSection>, StoreError> {
        content::Client::list_lore_sections(self)
    }
}

impl FeedService for content::Client {
    fn list_posts(&self, channel_id: &str) -> Result<Vec<Post>, StoreError> {
        content::Client::list_posts(self, channel_id)
    }
}

impl PostService for content::Client {
    fn create_post(&self, channel_id: &str, post: &NewPost) -> Result<Post, StoreError> {
        content::Client::create_post(self, channel_id, post)
    }
}

impl StatusService for content::Client {
    fn health(&self) -> Result<Value, StoreError> {
        content::Client::health(self)
    }
}

const MAX_AUTHOR_CHARS: usize = 64;
const MAX_CONTENT_CHARS: usize = 5000;

/// In-process content store with the same rules as the content service:
/// unknown channels are a 404, ids and timestamps are assigned here, and
/// author/content are trimmed and length checked.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryState>,
}

#[derive(Default)]
struct MemoryState {
    categories: Vec<Category>,
    lore: Vec<LoreSection>,
    posts: HashMap<String, Vec<Post>>,
}

impl MemoryStore {
    pub fn new(categories: Vec<Category>) -> Self {
        Self {
            inner: Mutex::new(MemoryState {
                categories,
                lore: Vec::new(),
                posts: HashMap::new(),
            }),
        }
    }

    /// The House Liber Arce directory with one starter post per channel.
    pub fn seeded() -> Self {
        let categories = vec![
            category(
                "DM Pit of Doom",
                &["mission-planning", "roleplay-summary", "world-repository"],
            ),
            category("Lorewriter Hellscape", &["npcs", "lore-proposals"]),
            category(
                "Player Discoveries",
                &["world-lore", "learned-lore", "artifacts", "character-goals"],
            ),
        ];
        let store = Self::new(categories);
        {
            let mut state = store.inner.lock();
            state.lore = ["world-lore", "learned-lore", "artifacts"]
                .iter()
                .map(|id| LoreSection {
                    id: (*id).to_string(),
                    name: (*id).to_string(),
                })
                .collect();
        }
        let seeds: [(&str, &str, &str, &[&str]); 8] = [
            (
                "mission-planning",
                "Head DM",
                "Mission seed: **Dockside exchange**. Objective: extract intel without alerting the syndicate.",
                &["mission", "dockside"],
            ),
            (
                "roleplay-summary",
                "DM",
                "Session recap: Players gained access to the office, discovered a hidden ledger, and escaped before patrol rotation.",
                &["recap"],
            ),
            (
                "world-lore",
                "Lorewriter",
                "World note: **Territory boundaries** are enforced by faction patrols and bribed city officials.",
                &["canon", "territory"],
            ),
            (
                "learned-lore",
                "DM",
                "Learned: The rival crew uses a **coded whistle** pattern to signal safe entry.",
                &["learned"],
            ),
            (
                "artifacts",
                "Lorewriter",
                "Artifact: **Black-ink contract**. Binds the signer to a task until fulfilled.",
                &["artifact"],
            ),
            (
                "character-goals",
                "DM",
                "Goal template: (1) Short-term objective, (2) Conflict driver, (3) Risk you accept, (4) Reward you want.",
                &["template"],
            ),
            (
                "npcs",
                "Lorewriter",
                "NPC: **Dockmaster Vance**, takes bribes, fears syndicate retaliation, keeps meticulous shipping notes.",
                &["npc"],
            ),
            (
                "lore-proposals",
                "Lorewriter",
                "Proposal: Add a **neutral broker** faction that trades information for favors and protection.",
                &["proposal"],
            ),
        ];
        for (channel, author, content, tags) in seeds {
            let post = NewPost::normalized(author, content, tags);
            let seeded = store.create_post(channel, &post);
            debug_assert!(seeded.is_ok(), "seed post for {channel} rejected: {seeded:?}");
        }
        store
    }

    pub fn set_lore_sections(&self, lore: Vec<LoreSection>) {
        self.inner.lock().lore = lore;
    }

    pub fn post_count(&self, channel_id: &str) -> usize {
        self.inner
            .lock()
            .posts
            .get(channel_id)
            .map(Vec::len)
            .unwrap_or(0)
    }
}

fn category(name: &str, ids: &[&str]) -> Category {
    Category {
        category: name.to_string(),
        channels: ids
            .iter()
            .map(|id| Channel {
                id: (*id).to_string(),
                name: (*id).to_string(),
            })
            .collect(),
    }
}

impl MemoryState {
    fn channel_exists(&self, channel_id: &str) -> bool {
        self.categories
            .iter()
            .any(|cat| cat.channels.iter().any(|ch| ch.id == channel_id))
    }
}

fn not_found() -> StoreError {
    StoreError::Rejected {
        status: 404,
        detail: "Section not found".to_string(),
    }
}

fn unprocessable(detail: &str) -> StoreError {
    StoreError::Rejected {
        status: 422,
        detail: detail.to_string(),
    }
}

impl DirectoryService for MemoryStore {
    fn list_directory(&self) -> Result<Vec<Category>, StoreError> {
        Ok(self.inner.lock().categories.clone())
    }

    fn list_lore_sections(&self) -> Result<Vec<LoreSection>, StoreError> {
        Ok(self.inner.lock().lore.clone())
    }
}

impl FeedService for MemoryStore {
    fn list_posts(&self, channel_id: &str) -> Result<Vec<Post>, StoreError> {
        let state = self.inner.lock();
        if !state.channel_exists(channel_id) {
            return Err(not_found());
        }
        Ok(state.posts.get(channel_id).cloned().unwrap_or_default())
    }
}

impl PostService for MemoryStore {
    fn create_post(&self, channel_id: &str, post: &NewPost) -> Result<Post, StoreError> {
        let mut state = self.inner.lock();
        if !state.channel_exists(channel_id) {
            return Err(not_found());
        }
        let author = post.author.trim();
        let content = post.content.trim();
        if author.is_empty() || author.chars().count() > MAX_AUTHOR_CHARS {
            return Err(unprocessable("author must be 1-64 characters"));
        }
        if content.is_empty() || content.chars().count() > MAX_CONTENT_CHARS {
            return Err(unprocessable("content must be 1-5000 characters"));
        }

        let feed = state.posts.entry(channel_id.to_string()).or_default();
        let created = Post {
            id: format!("p{}", feed.len() + 1),
            author: author.to_string(),
            created_at: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, false),
            content: content.to_string(),
            tags: post.tags.clone(),
        };
        feed.push(created.clone());
        Ok(created)
    }
}

impl StatusService for MemoryStore {
    fn health(&self) -> Result<Value, StoreError> {
        Ok(json!({ "status": "ok" }))
    }
}
