//! Directory snapshot and the sidebar view derived from it.
//!
//! Badges are cosmetic labels for the sidebar. Nothing in the console gates
//! access on them.

use crate::content::StoreError;
use crate::data::DirectoryService;
use crate::model::{Category, Channel};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Badge {
    Public,
    Staff,
    Head,
}

impl Badge {
    pub fn label(self) -> &'static str {
        match self {
            Badge::Public => "public",
            Badge::Staff => "staff",
            Badge::Head => "head",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BadgePolicy {
    pub public: Vec<String>,
    pub head_channels: Vec<String>,
    pub head_categories: Vec<String>,
}

impl Default for BadgePolicy {
    fn default() -> Self {
        Self {
            public: vec!["world-lore".into(), "character-goals".into()],
            head_channels: vec!["final-review".into()],
            head_categories: Vec::new(),
        }
    }
}

impl BadgePolicy {
    /// Public allow-set first; everything else is staff unless the channel or
    /// its category is marked as head tier.
    pub fn classify(&self, category: &str, channel: &Channel) -> Badge {
        if self.public.iter().any(|id| id == &channel.id) {
            return Badge::Public;
        }
        let head = self.head_channels.iter().any(|id| id == &channel.id)
            || self
                .head_categories
                .iter()
                .any(|name| name.eq_ignore_ascii_case(category));
        if head {
            Badge::Head
        } else {
            Badge::Staff
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelEntry {
    pub channel: Channel,
    pub is_active: bool,
    pub badge: Badge,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelGroup {
    pub title: String,
    pub entries: Vec<ChannelEntry>,
}

/// Marks the active channel and classifies every channel of the snapshot,
/// keeping store order for groups and channels.
pub fn select(categories: &[Category], active: Option<&str>, policy: &BadgePolicy) -> Vec<ChannelGroup> {
    categories
        .iter()
        .map(|cat| ChannelGroup {
            title: cat.category.clone(),
            entries: cat
                .channels
                .iter()
                .map(|ch| ChannelEntry {
                    channel: ch.clone(),
                    is_active: active == Some(ch.id.as_str()),
                    badge: policy.classify(&cat.category, ch),
                })
                .collect(),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DirectoryState {
    #[default]
    Loading,
    Loaded(Vec<Category>),
    Failed(StoreError),
}

impl DirectoryState {
    pub fn from_result(result: Result<Vec<Category>, StoreError>) -> Self {
        match result {
            Ok(categories) => DirectoryState::Loaded(categories),
            Err(err) => DirectoryState::Failed(err),
        }
    }

    pub fn categories(&self) -> &[Category] {
        match self {
            DirectoryState::Loaded(categories) => categories,
            _ => &[],
        }
    }

    pub fn find_channel(&self, channel_id: &str) -> Option<(&Category, &Channel)> {
        self.categories().iter().find_map(|cat| {
            cat.channels
                .iter()
                .find(|ch| ch.id == channel_id)
                .map(|ch| (cat, ch))
        })
    }

    /// Channel ids in sidebar order.
    pub fn channel_ids(&self) -> Vec<&str> {
        self.categories()
            .iter()
            .flat_map(|cat| cat.channels.iter().map(|ch| ch.id.as_str()))
            .collect()
    }

    pub fn sidebar(&self, active: Option<&str>, policy: &BadgePolicy) -> Sidebar {
        match self {
            DirectoryState::Loading => Sidebar::Loading,
            DirectoryState::Loaded(categories) => Sidebar::Groups(select(categories, active, policy)),
            DirectoryState::Failed(err) => Sidebar::Error {
                title: if err.is_unreachable() {
                    CONNECTION_ERROR_GROUP
                } else {
                    BACKEND_ERROR_GROUP
                },
                message: err.to_string(),
            },
        }
    }
}

pub const CONNECTION_ERROR_GROUP: &str = "Connection Error";
pub const BACKEND_ERROR_GROUP: &str = "Backend Error";

/// What the directory pane draws. A failed load is a single synthetic group,
/// never an empty list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sidebar {
    Loading,
    Groups(Vec<ChannelGroup>),
    Error { title: &'static str, message: String },
}

pub fn load(service: &dyn DirectoryService) -> DirectoryState {
    DirectoryState::from_result(service.list_directory())
}
