use tracing::{debug, info};

use crate::composer::{Composer, ComposerOptions, SubmitError, Submission};
use crate::content::StoreError;
use crate::data::{DirectoryService, FeedService, PostService};
use crate::directory::{BadgePolicy, DirectoryState, Sidebar};
use crate::feed::{Feed, FeedTicket};
use crate::model::{Category, Post, PostDraft};

#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    pub initial_channel: Option<String>,
    pub draft: PostDraft,
    pub composer: ComposerOptions,
    pub badges: BadgePolicy,
}

/// Ticket for one directory fetch; only the most recent one commits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectoryTicket(u64);

/// One console's view state: directory snapshot, the active channel's feed
/// and the composer. Directory and feed are fetched independently and a
/// failure in one never blocks the other.
#[derive(Debug)]
pub struct Session {
    directory: DirectoryState,
    directory_request: u64,
    directory_pending: bool,
    feed: Feed,
    composer: Composer,
    badges: BadgePolicy,
    initial_channel: Option<String>,
}

impl Session {
    pub fn new(options: SessionOptions) -> Self {
        Self {
            directory: DirectoryState::Loading,
            directory_request: 0,
            directory_pending: false,
            feed: Feed::new(),
            composer: Composer::new(options.draft, options.composer),
            badges: options.badges,
            initial_channel: options.initial_channel,
        }
    }

    pub fn directory(&self) -> &DirectoryState {
        &self.directory
    }

    pub fn feed(&self) -> &Feed {
        &self.feed
    }

    pub fn composer(&self) -> &Composer {
        &self.composer
    }

    pub fn composer_mut(&mut self) -> &mut Composer {
        &mut self.composer
    }

    pub fn badges(&self) -> &BadgePolicy {
        &self.badges
    }

    pub fn active_channel(&self) -> Option<&str> {
        self.feed.channel_id()
    }

    pub fn sidebar(&self) -> Sidebar {
        self.directory.sidebar(self.active_channel(), &self.badges)
    }

    pub fn is_loading(&self) -> bool {
        self.directory_pending || self.feed.is_loading() || self.composer.in_flight() > 0
    }

    pub fn begin_directory_load(&mut self) -> DirectoryTicket {
        self.directory_request = self.directory_request.wrapping_add(1);
        self.directory_pending = true;
        DirectoryTicket(self.directory_request)
    }

    pub fn apply_directory(&mut self, ticket: DirectoryTicket, result: Result<Vec<Category>, StoreError>) -> bool {
        if ticket.0 != self.directory_request {
            debug!(request_id = ticket.0, "dropping stale directory response");
            return false;
        }
        self.directory_pending = false;
        self.directory = DirectoryState::from_result(result);
        true
    }

    /// Opens the configured initial channel, if any and none is active yet.
    pub fn open_initial_channel(&mut self) -> Option<FeedTicket> {
        if self.feed.channel_id().is_some() {
            return None;
        }
        let channel_id = self.initial_channel.clone()?;
        Some(self.open_channel(&channel_id))
    }

    pub fn open_channel(&mut self, channel_id: &str) -> FeedTicket {
        info!(channel = %channel_id, "opening channel");
        self.feed.select(channel_id)
    }

    pub fn reload_feed(&mut self) -> Option<FeedTicket> {
        self.feed.reload()
    }

    pub fn apply_feed(&mut self, ticket: &FeedTicket, result: Result<Vec<Post>, StoreError>) -> bool {
        let committed = self.feed.commit(ticket, result);
        if committed {
            self.composer.acknowledge_refresh();
        }
        committed
    }

    pub fn begin_submit(&mut self) -> Result<Submission, SubmitError> {
        let channel_id = self.feed.channel_id().map(str::to_string);
        self.composer.begin_submit(channel_id.as_deref())
    }

    /// Applies a create result. A successful write into the active channel
    /// invalidates the feed; the returned ticket must be fetched before the
    /// feed is current again.
    pub fn apply_submit(&mut self, submission: &Submission, result: Result<Post, StoreError>) -> Option<FeedTicket> {
        let reload = self.composer.finish_submit(submission, result)?;
        if self.feed.channel_id() == Some(reload.as_str()) {
            debug!(channel = %reload, "feed reload requested after post");
            self.feed.reload()
        } else {
            self.composer.acknowledge_refresh();
            None
        }
    }

    pub fn load_directory(&mut self, service: &dyn DirectoryService) {
        let ticket = self.begin_directory_load();
        let result = service.list_directory();
        self.apply_directory(ticket, result);
    }

    pub fn load_feed(&mut self, service: &dyn FeedService, ticket: FeedTicket) {
        let result = service.list_posts(&ticket.channel_id);
        self.apply_feed(&ticket, result);
    }

    /// Blocking submit: create, then reload the feed before returning.
    pub fn submit(&mut self, posts: &dyn PostService, feed: &dyn FeedService) -> Result<Post, SubmitError> {
        let submission = self.begin_submit()?;
        let result = posts.create_post(&submission.channel_id, &submission.body);
        let outcome = result.clone().map_err(SubmitError::from);
        if let Some(ticket) = self.apply_submit(&submission, result) {
            self.load_feed(feed, ticket);
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::MemoryStore;
    use crate::feed::FeedView;

    struct Offline;

    impl DirectoryService for Offline {
        fn list_directory(&self) -> Result<Vec<Category>, StoreError> {
            Err(StoreError::Unreachable {
                base_url: "http://localhost:8000".into(),
                reason: "connection failed".into(),
            })
        }

        fn list_lore_sections(&self) -> Result<Vec<crate::model::LoreSection>, StoreError> {
            Ok(vec![])
        }
    }

    fn session(channel: &str) -> Session {
        Session::new(SessionOptions {
            initial_channel: Some(channel.into()),
            draft: PostDraft::new("GM", "", ""),
            ..SessionOptions::default()
        })
    }

    #[test]
    fn directory_failure_does_not_block_feed() {
        let store = MemoryStore::seeded();
        let mut session = session("world-lore");
        session.load_directory(&Offline);
        let ticket = session.open_initial_channel().unwrap();
        session.load_feed(&store, ticket);

        assert!(matches!(session.sidebar(), Sidebar::Error { .. }));
        assert!(matches!(session.feed().view(), FeedView::Posts(p) if p.len() == 1));
    }

    #[test]
    fn submit_reloads_feed_with_new_post_first() {
        let store = MemoryStore::seeded();
        let mut session = session("npcs");
        session.load_directory(&store);
        let ticket = session.open_initial_channel().unwrap();
        session.load_feed(&store, ticket);

        let draft = session.composer_mut();
        draft.focus(crate::composer::ComposerField::Content);
        for ch in "The vault opens.".chars() {
            draft.insert_char(ch);
        }
        draft.focus(crate::composer::ComposerField::Tags);
        for ch in "canon,npc".chars() {
            draft.insert_char(ch);
        }

        let created = session.submit(&store, &store).unwrap();
        assert_eq!(created.tags, vec!["canon", "npc"]);
        let FeedView::Posts(posts) = session.feed().view() else {
            panic!("expected posts");
        };
        assert_eq!(posts[0].id, created.id);
        assert_eq!(posts[0].author, "GM");
        assert_eq!(posts.len(), 2);
        assert!(!session.is_loading());
    }

    #[test]
    fn post_into_other_channel_leaves_active_feed_alone() {
        let store = MemoryStore::seeded();
        let mut session = session("npcs");
        let ticket = session.open_initial_channel().unwrap();
        session.load_feed(&store, ticket);
        session.composer_mut().focus(crate::composer::ComposerField::Content);
        session.composer_mut().insert_char('x');
        let submission = session.begin_submit().unwrap();

        let ticket = session.open_channel("artifacts");
        session.load_feed(&store, ticket);
        let created = store
            .create_post(&submission.channel_id, &submission.body)
            .unwrap();
        assert!(session.apply_submit(&submission, Ok(created)).is_none());
        assert_eq!(session.active_channel(), Some("artifacts"));
        assert_eq!(session.composer().status().map(|s| s.message()), Some("Posted."));
    }

    #[test]
    fn stale_directory_response_is_dropped() {
        let mut session = session("npcs");
        let first = session.begin_directory_load();
        let second = session.begin_directory_load();
        assert!(!session.apply_directory(first, Ok(vec![])));
        assert!(session.apply_directory(second, MemoryStore::seeded().list_directory()));
        assert_eq!(session.directory().categories().len(), 3);
    }
}
