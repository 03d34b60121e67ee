use tracing::debug;

use crate::content::StoreError;
use crate::data::FeedService;
use crate::model::Post;

pub const EMPTY_PLACEHOLDER: &str = "No posts yet. Create the first entry below.";

/// Feed snapshot. Posts are kept in store order; display order is derived on
/// every read through [`Feed::view`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FeedState {
    #[default]
    Idle,
    Loading,
    Loaded(Vec<Post>),
    Failed(StoreError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedView<'a> {
    Idle,
    Loading,
    Empty,
    Failed(String),
    Posts(Vec<&'a Post>),
}

/// Issued for each fetch; only the latest ticket for the active channel commits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedTicket {
    pub channel_id: String,
    request_id: u64,
}

#[derive(Debug, Default)]
pub struct Feed {
    channel_id: Option<String>,
    state: FeedState,
    next_request_id: u64,
    pending: Option<u64>,
}

impl Feed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn channel_id(&self) -> Option<&str> {
        self.channel_id.as_deref()
    }

    pub fn state(&self) -> &FeedState {
        &self.state
    }

    pub fn is_loading(&self) -> bool {
        self.pending.is_some()
    }

    /// Makes `channel_id` the active channel and starts a fresh fetch for it.
    /// Any response still in flight for an earlier ticket is discarded.
    pub fn select(&mut self, channel_id: &str) -> FeedTicket {
        self.channel_id = Some(channel_id.to_string());
        self.issue(channel_id)
    }

    /// Full reload of the active channel.
    pub fn reload(&mut self) -> Option<FeedTicket> {
        let channel_id = self.channel_id.clone()?;
        Some(self.issue(&channel_id))
    }

    fn issue(&mut self, channel_id: &str) -> FeedTicket {
        self.next_request_id = self.next_request_id.wrapping_add(1);
        let request_id = self.next_request_id;
        self.pending = Some(request_id);
        self.state = FeedState::Loading;
        FeedTicket {
            channel_id: channel_id.to_string(),
            request_id,
        }
    }

    /// Stores a fetch result if it belongs to the latest request for the active
    /// channel. Returns whether the state changed.
    pub fn commit(&mut self, ticket: &FeedTicket, result: Result<Vec<Post>, StoreError>) -> bool {
        if self.channel_id.as_deref() != Some(ticket.channel_id.as_str())
            || self.pending != Some(ticket.request_id)
        {
            debug!(
                channel = %ticket.channel_id,
                request_id = ticket.request_id,
                "dropping stale feed response"
            );
            return false;
        }
        self.pending = None;
        self.state = match result {
            Ok(posts) => FeedState::Loaded(posts),
            Err(err) => FeedState::Failed(err),
        };
        true
    }

    /// Fetches and commits synchronously.
    pub fn load(&mut self, service: &dyn FeedService, channel_id: &str) -> &FeedState {
        let ticket = self.select(channel_id);
        let result = service.list_posts(&ticket.channel_id);
        self.commit(&ticket, result);
        &self.state
    }

    pub fn view(&self) -> FeedView<'_> {
        match &self.state {
            FeedState::Idle => FeedView::Idle,
            FeedState::Loading => FeedView::Loading,
            FeedState::Failed(err) => FeedView::Failed(err.to_string()),
            FeedState::Loaded(posts) if posts.is_empty() => FeedView::Empty,
            FeedState::Loaded(posts) => FeedView::Posts(newest_first(posts)),
        }
    }
}

/// Display order: the reverse of store order.
pub fn newest_first(posts: &[Post]) -> Vec<&Post> {
    posts.iter().rev().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::MemoryStore;

    fn post(id: &str) -> Post {
        Post {
            id: id.into(),
            author: "DM".into(),
            created_at: String::new(),
            content: format!("body {id}"),
            tags: vec![],
        }
    }

    #[test]
    fn view_reverses_store_order() {
        let mut feed = Feed::new();
        let ticket = feed.select("npcs");
        assert!(feed.commit(&ticket, Ok(vec![post("p1"), post("p2"), post("p3")])));
        let FeedView::Posts(posts) = feed.view() else {
            panic!("expected posts");
        };
        let ids: Vec<&str> = posts.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["p3", "p2", "p1"]);
        // Stored snapshot keeps store order.
        assert_eq!(feed.state(), &FeedState::Loaded(vec![post("p1"), post("p2"), post("p3")]));
    }

    #[test]
    fn empty_feed_is_not_an_error() {
        let mut feed = Feed::new();
        let ticket = feed.select("world-repository");
        feed.commit(&ticket, Ok(vec![]));
        assert_eq!(feed.view(), FeedView::Empty);

        let ticket = feed.reload().unwrap();
        feed.commit(
            &ticket,
            Err(StoreError::Rejected {
                status: 404,
                detail: "Section not found".into(),
            }),
        );
        assert!(matches!(feed.view(), FeedView::Failed(msg) if msg.contains("404")));
    }

    #[test]
    fn stale_channel_response_is_dropped() {
        let mut feed = Feed::new();
        let first = feed.select("npcs");
        let second = feed.select("artifacts");
        assert!(!feed.commit(&first, Ok(vec![post("npc")])));
        assert_eq!(feed.view(), FeedView::Loading);
        assert!(feed.commit(&second, Ok(vec![post("artifact")])));
        assert_eq!(feed.channel_id(), Some("artifacts"));
    }

    #[test]
    fn older_request_for_same_channel_is_dropped() {
        let mut feed = Feed::new();
        let before_write = feed.select("npcs");
        let after_write = feed.reload().unwrap();
        assert!(feed.commit(&after_write, Ok(vec![post("p1"), post("p2")])));
        assert!(!feed.commit(&before_write, Ok(vec![post("p1")])));
        assert!(matches!(feed.view(), FeedView::Posts(p) if p.len() == 2));
    }

    #[test]
    fn reload_without_channel_does_nothing() {
        let mut feed = Feed::new();
        assert!(feed.reload().is_none());
        assert_eq!(feed.view(), FeedView::Idle);
    }

    #[test]
    fn load_reads_from_service() {
        let store = MemoryStore::seeded();
        let mut feed = Feed::new();
        assert!(matches!(feed.load(&store, "world-lore"), FeedState::Loaded(p) if p.len() == 1));
        assert!(!feed.is_loading());
        assert!(matches!(feed.load(&store, "unknown"), FeedState::Failed(_)));
    }
}
