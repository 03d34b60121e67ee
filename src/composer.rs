use tracing::{debug, info};

use crate::content::StoreError;
use crate::data::PostService;
use crate::model::{split_tags, NewPost, Post, PostDraft, ValidationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ComposerField {
    #[default]
    Author,
    Tags,
    Content,
    Submit,
}

impl ComposerField {
    pub fn title(self) -> &'static str {
        match self {
            ComposerField::Author => "Author",
            ComposerField::Tags => "Tags (comma-separated)",
            ComposerField::Content => "Content",
            ComposerField::Submit => "Post",
        }
    }

    fn next(self) -> Self {
        match self {
            ComposerField::Author => ComposerField::Tags,
            ComposerField::Tags => ComposerField::Content,
            ComposerField::Content => ComposerField::Submit,
            ComposerField::Submit => ComposerField::Author,
        }
    }

    fn previous(self) -> Self {
        match self {
            ComposerField::Author => ComposerField::Submit,
            ComposerField::Tags => ComposerField::Author,
            ComposerField::Content => ComposerField::Tags,
            ComposerField::Submit => ComposerField::Content,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComposerOptions {
    /// Clear the tags field too after a successful post.
    pub clear_tags_on_post: bool,
    /// Refuse a second submit while one is still pending.
    pub guard_in_flight: bool,
}

impl Default for ComposerOptions {
    fn default() -> Self {
        Self {
            clear_tags_on_post: false,
            guard_in_flight: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComposerStatus {
    Pending(String),
    Posted(String),
    Error(String),
}

impl ComposerStatus {
    pub fn message(&self) -> &str {
        match self {
            ComposerStatus::Pending(msg) | ComposerStatus::Posted(msg) | ComposerStatus::Error(msg) => msg,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubmitError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    #[error("A post is already being submitted.")]
    InFlight,
    #[error("No channel selected.")]
    NoChannel,
    #[error("{}", failure_message(.0))]
    Store(#[from] StoreError),
}

/// The failure line shown under the composer.
pub fn failure_message(err: &StoreError) -> String {
    match err {
        StoreError::Rejected { status, detail } => format!("Failed to post. Status: {status} ({detail})"),
        StoreError::Unreachable { .. } => format!("Failed to post. {err}"),
    }
}

/// A validated create request, ready to be sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub channel_id: String,
    pub body: NewPost,
}

#[derive(Debug, Default)]
pub struct Composer {
    draft: PostDraft,
    active: ComposerField,
    status: Option<ComposerStatus>,
    in_flight: usize,
    options: ComposerOptions,
}

impl Composer {
    pub fn new(draft: PostDraft, options: ComposerOptions) -> Self {
        Self {
            draft,
            active: ComposerField::default(),
            status: None,
            in_flight: 0,
            options,
        }
    }

    pub fn draft(&self) -> &PostDraft {
        &self.draft
    }

    pub fn active(&self) -> ComposerField {
        self.active
    }

    pub fn status(&self) -> Option<&ComposerStatus> {
        self.status.as_ref()
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    pub fn focus(&mut self, field: ComposerField) {
        self.active = field;
    }

    pub fn next(&mut self) {
        self.active = self.active.next();
    }

    pub fn previous(&mut self) {
        self.active = self.active.previous();
    }

    fn active_value_mut(&mut self) -> Option<&mut String> {
        match self.active {
            ComposerField::Author => Some(&mut self.draft.author),
            ComposerField::Tags => Some(&mut self.draft.raw_tags),
            ComposerField::Content => Some(&mut self.draft.content),
            ComposerField::Submit => None,
        }
    }

    pub fn insert_char(&mut self, ch: char) {
        if let Some(value) = self.active_value_mut() {
            value.push(ch);
        }
    }

    /// Newlines are only meaningful in the content field.
    pub fn insert_newline(&mut self) {
        if self.active == ComposerField::Content {
            self.draft.content.push('\n');
        }
    }

    pub fn backspace(&mut self) {
        if let Some(value) = self.active_value_mut() {
            value.pop();
        }
    }

    pub fn clear_active(&mut self) {
        if let Some(value) = self.active_value_mut() {
            value.clear();
        }
    }

    /// Validates locally and marks the request as in flight. Nothing is sent on error.
    pub fn begin_submit(&mut self, channel_id: Option<&str>) -> Result<Submission, SubmitError> {
        let result = self.prepare(channel_id);
        match &result {
            Ok(submission) => {
                self.in_flight += 1;
                self.status = Some(ComposerStatus::Pending("Posting…".to_string()));
                debug!(channel = %submission.channel_id, "post submission started");
            }
            Err(err) => self.status = Some(ComposerStatus::Error(err.to_string())),
        }
        result
    }

    fn prepare(&self, channel_id: Option<&str>) -> Result<Submission, SubmitError> {
        let body = self.draft.to_new_post()?;
        let channel_id = channel_id.ok_or(SubmitError::NoChannel)?;
        if self.options.guard_in_flight && self.in_flight > 0 {
            return Err(SubmitError::InFlight);
        }
        Ok(Submission {
            channel_id: channel_id.to_string(),
            body,
        })
    }

    /// Applies the create result. On success the content field (and, when
    /// configured, the tags field) is cleared and the channel whose feed must
    /// be reloaded is returned. On failure every field is left as typed.
    pub fn finish_submit(&mut self, submission: &Submission, result: Result<Post, StoreError>) -> Option<String> {
        self.in_flight = self.in_flight.saturating_sub(1);
        match result {
            Ok(post) => {
                info!(channel = %submission.channel_id, post = %post.id, "post created");
                self.take_submitted(&submission.body);
                self.status = Some(ComposerStatus::Posted("Posted. Refreshing…".to_string()));
                Some(submission.channel_id.clone())
            }
            Err(err) => {
                self.status = Some(ComposerStatus::Error(failure_message(&err)));
                None
            }
        }
    }

    /// Removes the posted text from the draft. Anything typed after the
    /// submit is kept.
    fn take_submitted(&mut self, body: &NewPost) {
        match self.draft.content.trim_start().strip_prefix(body.content.as_str()) {
            Some(rest) => self.draft.content = rest.trim_start().to_string(),
            None => debug!("draft content changed while posting; leaving it as typed"),
        }
        if self.options.clear_tags_on_post && split_tags(&self.draft.raw_tags) == body.tags {
            self.draft.raw_tags.clear();
        }
    }

    /// Marks the refresh after a post as done.
    pub fn acknowledge_refresh(&mut self) {
        if matches!(self.status, Some(ComposerStatus::Posted(_))) {
            self.status = Some(ComposerStatus::Posted("Posted.".to_string()));
        }
    }

    /// Validate, create and apply in one blocking call.
    pub fn submit(&mut self, channel_id: &str, service: &dyn PostService) -> Result<Post, SubmitError> {
        let submission = self.begin_submit(Some(channel_id))?;
        let result = service.create_post(&submission.channel_id, &submission.body);
        let outcome = result.clone().map_err(SubmitError::from);
        self.finish_submit(&submission, result);
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::data::MemoryStore;

    #[derive(Default)]
    struct CountingService {
        calls: AtomicUsize,
        fail_with: Option<StoreError>,
    }

    impl PostService for CountingService {
        fn create_post(&self, _channel_id: &str, post: &NewPost) -> Result<Post, StoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(err) = &self.fail_with {
                return Err(err.clone());
            }
            Ok(Post {
                id: "p9".into(),
                author: post.author.clone(),
                created_at: "2025-01-01T00:00:00+00:00".into(),
                content: post.content.clone(),
                tags: post.tags.clone(),
            })
        }
    }

    fn composer(author: &str, content: &str, tags: &str) -> Composer {
        Composer::new(PostDraft::new(author, content, tags), ComposerOptions::default())
    }

    #[test]
    fn invalid_draft_never_reaches_the_service() {
        let service = CountingService::default();
        let mut composer = composer("  ", "The vault opens.", "");
        let err = composer.submit("npcs", &service).unwrap_err();
        assert!(matches!(err, SubmitError::Invalid(ValidationError::MissingAuthor)));
        assert_eq!(service.calls.load(Ordering::SeqCst), 0);
        assert_eq!(
            composer.status().map(ComposerStatus::message),
            Some("Author and content are required.")
        );
    }

    #[test]
    fn success_clears_content_and_requests_reload() {
        let mut composer = composer("GM", "The vault opens.", "canon, npc");
        let submission = composer.begin_submit(Some("npcs")).unwrap();
        assert_eq!(submission.body.tags, vec!["canon", "npc"]);
        let created = CountingService::default()
            .create_post(&submission.channel_id, &submission.body)
            .unwrap();
        let reload = composer.finish_submit(&submission, Ok(created));
        assert_eq!(reload.as_deref(), Some("npcs"));
        assert_eq!(composer.draft().content, "");
        assert_eq!(composer.draft().author, "GM");
        assert_eq!(composer.draft().raw_tags, "canon, npc");
        assert_eq!(composer.in_flight(), 0);
    }

    #[test]
    fn text_typed_while_posting_survives() {
        let mut composer = composer("GM", "first note", "");
        composer.focus(ComposerField::Content);
        let submission = composer.begin_submit(Some("npcs")).unwrap();
        for ch in " and a second thought".chars() {
            composer.insert_char(ch);
        }
        let created = CountingService::default()
            .create_post(&submission.channel_id, &submission.body)
            .unwrap();
        composer.finish_submit(&submission, Ok(created));
        assert_eq!(composer.draft().content, "and a second thought");
    }

    #[test]
    fn rewritten_draft_is_left_alone_after_post() {
        let mut composer = composer("GM", "first note", "");
        composer.focus(ComposerField::Content);
        let submission = composer.begin_submit(Some("npcs")).unwrap();
        composer.clear_active();
        for ch in "another idea".chars() {
            composer.insert_char(ch);
        }
        let created = CountingService::default()
            .create_post(&submission.channel_id, &submission.body)
            .unwrap();
        composer.finish_submit(&submission, Ok(created));
        assert_eq!(composer.draft().content, "another idea");
    }

    #[test]
    fn clear_tags_variant_resets_tags() {
        let mut composer = Composer::new(
            PostDraft::new("GM", "x", "canon"),
            ComposerOptions {
                clear_tags_on_post: true,
                ..ComposerOptions::default()
            },
        );
        composer.submit("npcs", &MemoryStore::seeded()).unwrap();
        assert_eq!(composer.draft().raw_tags, "");
    }

    #[test]
    fn failure_keeps_every_field() {
        let service = CountingService {
            fail_with: Some(StoreError::Rejected {
                status: 500,
                detail: "Internal Server Error".into(),
            }),
            ..Default::default()
        };
        let mut composer = composer("GM", "The vault opens.", "canon");
        let err = composer.submit("npcs", &service).unwrap_err();
        assert!(err.to_string().contains("Status: 500"));
        assert_eq!(composer.draft(), &PostDraft::new("GM", "The vault opens.", "canon"));
        assert!(matches!(composer.status(), Some(ComposerStatus::Error(msg)) if msg.contains("500")));

        // Resubmitting works without retyping.
        assert!(composer.submit("npcs", &MemoryStore::seeded()).is_ok());
    }

    #[test]
    fn unreachable_failure_is_distinct_from_rejected() {
        let unreachable = failure_message(&StoreError::Unreachable {
            base_url: "http://localhost:8000".into(),
            reason: "connection failed".into(),
        });
        let rejected = failure_message(&StoreError::Rejected {
            status: 404,
            detail: "Section not found".into(),
        });
        assert!(unreachable.contains("Could not connect"));
        assert!(rejected.contains("Status: 404"));
    }

    #[test]
    fn guard_blocks_double_submit_until_finished() {
        let mut composer = composer("GM", "x", "");
        let first = composer.begin_submit(Some("npcs")).unwrap();
        assert_eq!(composer.begin_submit(Some("npcs")), Err(SubmitError::InFlight));
        composer.finish_submit(
            &first,
            Err(StoreError::Rejected {
                status: 500,
                detail: "boom".into(),
            }),
        );
        assert!(composer.begin_submit(Some("npcs")).is_ok());
    }

    #[test]
    fn unguarded_composer_allows_concurrent_submits() {
        let mut composer = Composer::new(
            PostDraft::new("GM", "x", ""),
            ComposerOptions {
                guard_in_flight: false,
                ..ComposerOptions::default()
            },
        );
        composer.begin_submit(Some("npcs")).unwrap();
        composer.begin_submit(Some("npcs")).unwrap();
        assert_eq!(composer.in_flight(), 2);
    }

    #[test]
    fn editing_targets_the_active_field() {
        let mut composer = composer("", "", "");
        composer.insert_char('G');
        composer.next();
        composer.insert_char('a');
        composer.insert_newline();
        composer.next();
        composer.insert_char('x');
        composer.insert_newline();
        composer.insert_char('y');
        composer.next();
        composer.insert_char('z');
        assert_eq!(composer.draft(), &PostDraft::new("G", "x\ny", "a"));
        composer.previous();
        composer.backspace();
        assert_eq!(composer.draft().content, "x\n");
        composer.clear_active();
        assert_eq!(composer.draft().content, "");
        assert_eq!(composer.active(), ComposerField::Content);
    }

    #[test]
    fn missing_channel_is_reported() {
        let mut composer = composer("GM", "x", "");
        assert_eq!(composer.begin_submit(None), Err(SubmitError::NoChannel));
        assert_eq!(composer.in_flight(), 0);
    }
}
