use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// A sidebar group as returned by `GET /sections`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub category: String,
    #[serde(default)]
    pub channels: Vec<Channel>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub id: String,
    pub name: String,
}

/// Entry of the read-only `GET /lore/sections` listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoreSection {
    pub id: String,
    pub name: String,
}

/// A feed entry. `id` and `created_at` always come from the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub author: String,
    #[serde(default)]
    pub created_at: String,
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Post {
    /// Store timestamp rendered in local time; the raw value when it is not RFC 3339.
    pub fn display_timestamp(&self) -> String {
        if self.created_at.trim().is_empty() {
            return String::new();
        }
        match DateTime::parse_from_rfc3339(self.created_at.trim()) {
            Ok(parsed) => parsed
                .with_timezone(&Local)
                .format("%Y-%m-%d %H:%M")
                .to_string(),
            Err(_) => self.created_at.clone(),
        }
    }
}

/// Composer input before submission. Tags stay a single comma-separated field
/// until the draft is turned into a [`NewPost`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostDraft {
    pub author: String,
    pub content: String,
    pub raw_tags: String,
}

/// Wire body of `POST /sections/{id}/posts`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPost {
    pub author: String,
    pub content: String,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Author and content are required.")]
    MissingAuthor,
    #[error("Author and content are required.")]
    MissingContent,
}

impl PostDraft {
    pub fn new<A: Into<String>, C: Into<String>, T: Into<String>>(
        author: A,
        content: C,
        raw_tags: T,
    ) -> Self {
        Self {
            author: author.into(),
            content: content.into(),
            raw_tags: raw_tags.into(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.author.trim().is_empty() {
            return Err(ValidationError::MissingAuthor);
        }
        if self.content.trim().is_empty() {
            return Err(ValidationError::MissingContent);
        }
        Ok(())
    }

    /// Validates and produces the request body: trimmed author and content,
    /// tags split on commas.
    pub fn to_new_post(&self) -> Result<NewPost, ValidationError> {
        self.validate()?;
        Ok(NewPost {
            author: self.author.trim().to_string(),
            content: self.content.trim().to_string(),
            tags: split_tags(&self.raw_tags),
        })
    }
}

impl NewPost {
    /// Normalizes a body built outside of a draft the same way a draft would be.
    pub fn normalized<A: AsRef<str>, C: AsRef<str>, T: AsRef<str>>(
        author: A,
        content: C,
        tags: &[T],
    ) -> Self {
        Self {
            author: author.as_ref().trim().to_string(),
            content: content.as_ref().trim().to_string(),
            tags: tags
                .iter()
                .map(|tag| tag.as_ref().trim())
                .filter(|tag| !tag.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }
}

/// Splits comma-separated tag input. Segments are trimmed, empty ones dropped;
/// order and duplicates are kept.
pub fn split_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_tags_trims_and_drops_empty_segments() {
        assert_eq!(split_tags(" a, b ,,c "), vec!["a", "b", "c"]);
        assert_eq!(split_tags("canon, canon"), vec!["canon", "canon"]);
        assert!(split_tags(" , ,").is_empty());
        assert!(split_tags("").is_empty());
    }

    #[test]
    fn validate_requires_author_and_content() {
        assert_eq!(
            PostDraft::new("", "x", "").validate(),
            Err(ValidationError::MissingAuthor)
        );
        assert_eq!(
            PostDraft::new("x", "   ", "").validate(),
            Err(ValidationError::MissingContent)
        );
        assert!(PostDraft::new(" x ", " y ", "").validate().is_ok());
    }

    #[test]
    fn new_post_from_draft_is_trimmed() {
        let draft = PostDraft::new("  GM ", "\nThe vault opens.\n", "canon, npc,");
        let body = draft.to_new_post().unwrap();
        assert_eq!(body.author, "GM");
        assert_eq!(body.content, "The vault opens.");
        assert_eq!(body.tags, vec!["canon", "npc"]);
    }

    #[test]
    fn content_keeps_inner_newlines() {
        let draft = PostDraft::new("GM", "line one\nline two", "");
        assert_eq!(draft.to_new_post().unwrap().content, "line one\nline two");
    }

    #[test]
    fn normalized_body_drops_blank_tags() {
        let body = NewPost::normalized(" GM ", "x", &[" canon ", "", "npc"]);
        assert_eq!(body.tags, vec!["canon", "npc"]);
        assert_eq!(body.author, "GM");
    }

    #[test]
    fn post_deserializes_without_tags() {
        let post: Post = serde_json::from_str(
            r#"{"id":"p1","author":"DM","created_at":"2025-01-02T03:04:05+00:00","content":"hi"}"#,
        )
        .unwrap();
        assert!(post.tags.is_empty());
        assert!(!post.display_timestamp().is_empty());
    }

    #[test]
    fn unparseable_timestamp_is_shown_raw() {
        let post = Post {
            id: "p1".into(),
            author: "DM".into(),
            created_at: "yesterday".into(),
            content: "x".into(),
            tags: vec![],
        };
        assert_eq!(post.display_timestamp(), "yesterday");
    }
}
