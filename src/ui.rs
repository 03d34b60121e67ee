use std::io::{self, Stdout};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Result;
use crossbeam_channel::{unbounded, Receiver, Sender};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Padding, Paragraph, Wrap};
use ratatui::{Frame, Terminal};
use textwrap::{wrap, Options as WrapOptions};
use tracing::warn;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::composer::{ComposerField, ComposerStatus, Submission};
use crate::content::StoreError;
use crate::data::Services;
use crate::directory::{Badge, Sidebar};
use crate::feed::{FeedTicket, FeedView, EMPTY_PLACEHOLDER};
use crate::markdown;
use crate::model::{Category, Post};
use crate::session::{DirectoryTicket, Session, SessionOptions};

const COLOR_BG: Color = Color::Rgb(30, 30, 46);
const COLOR_PANEL_BG: Color = Color::Rgb(24, 24, 36);
const COLOR_PANEL_FOCUSED_BG: Color = Color::Rgb(49, 50, 68);
const COLOR_PANEL_SELECTED_BG: Color = Color::Rgb(69, 71, 90);
const COLOR_BORDER_IDLE: Color = Color::Rgb(49, 50, 68);
const COLOR_BORDER_FOCUSED: Color = Color::Rgb(137, 180, 250);
const COLOR_TEXT_PRIMARY: Color = Color::Rgb(205, 214, 244);
const COLOR_TEXT_SECONDARY: Color = Color::Rgb(166, 173, 200);
const COLOR_ACCENT: Color = Color::Rgb(137, 180, 250);
const COLOR_SUCCESS: Color = Color::Rgb(166, 227, 161);
const COLOR_ERROR: Color = Color::Rgb(243, 139, 168);
const COLOR_BADGE_PUBLIC: Color = Color::Rgb(166, 227, 161);
const COLOR_BADGE_STAFF: Color = Color::Rgb(203, 166, 247);
const COLOR_BADGE_HEAD: Color = Color::Rgb(250, 179, 135);

const SPINNER_FRAMES: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];
const DIRECTORY_WIDTH: u16 = 32;
const TOOLS_WIDTH: u16 = 34;
const COMPOSER_HEIGHT: u16 = 12;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Pane {
    Directory,
    Feed,
    Composer,
}

impl Pane {
    fn title(self) -> &'static str {
        match self {
            Pane::Directory => "Channels",
            Pane::Feed => "Feed",
            Pane::Composer => "New Post",
        }
    }

    fn next(self) -> Self {
        match self {
            Pane::Directory => Pane::Feed,
            Pane::Feed => Pane::Composer,
            Pane::Composer => Pane::Composer,
        }
    }

    fn previous(self) -> Self {
        match self {
            Pane::Directory => Pane::Directory,
            Pane::Feed => Pane::Directory,
            Pane::Composer => Pane::Feed,
        }
    }
}

enum AsyncResponse {
    Directory {
        ticket: DirectoryTicket,
        result: Result<Vec<Category>, StoreError>,
    },
    Feed {
        ticket: FeedTicket,
        result: Result<Vec<Post>, StoreError>,
    },
    Created {
        submission: Submission,
        result: Result<Post, StoreError>,
    },
}

struct Spinner {
    index: usize,
    last_tick: Instant,
}

impl Spinner {
    fn new() -> Self {
        Self {
            index: 0,
            last_tick: Instant::now(),
        }
    }

    fn frame(&self) -> &'static str {
        SPINNER_FRAMES[self.index % SPINNER_FRAMES.len()]
    }

    fn advance(&mut self) -> bool {
        if self.last_tick.elapsed() >= Duration::from_millis(80) {
            self.index = (self.index + 1) % SPINNER_FRAMES.len();
            self.last_tick = Instant::now();
            return true;
        }
        false
    }

    fn reset(&mut self) {
        self.index = 0;
        self.last_tick = Instant::now();
    }
}

pub struct Options {
    pub status_message: String,
    pub services: Services,
    pub session: SessionOptions,
    pub source_label: String,
}

pub struct Model {
    session: Session,
    services: Services,
    status_message: String,
    source_label: String,
    focused_pane: Pane,
    nav_index: usize,
    feed_scroll: u16,
    feed_max_scroll: u16,
    markdown: markdown::Renderer,
    spinner: Spinner,
    needs_redraw: bool,
    response_tx: Sender<AsyncResponse>,
    response_rx: Receiver<AsyncResponse>,
}

impl Model {
    pub fn new(opts: Options) -> Self {
        let (response_tx, response_rx) = unbounded();
        let initial_status = opts.status_message.clone();
        let mut model = Self {
            session: Session::new(opts.session),
            services: opts.services,
            status_message: opts.status_message,
            source_label: opts.source_label,
            focused_pane: Pane::Directory,
            nav_index: 0,
            feed_scroll: 0,
            feed_max_scroll: 0,
            markdown: markdown::Renderer::new(Style::default().fg(COLOR_TEXT_PRIMARY)),
            spinner: Spinner::new(),
            needs_redraw: true,
            response_tx,
            response_rx,
        };

        model.reload_directory();
        if let Some(ticket) = model.session.open_initial_channel() {
            model.focused_pane = Pane::Feed;
            model.fetch_feed(ticket);
        }
        model.status_message = initial_status;
        model
    }

    pub fn run(&mut self) -> Result<()> {
        let mut stdout = io::stdout();
        enable_raw_mode()?;
        stdout.execute(EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        terminal.clear()?;

        let result = self.event_loop(&mut terminal);

        disable_raw_mode()?;
        terminal.backend_mut().execute(LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        result
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        let mut last_tick = Instant::now();
        let tick_rate = Duration::from_millis(120);

        loop {
            if self.poll_async() {
                self.mark_dirty();
            }

            if self.needs_redraw {
                terminal.draw(|frame| self.draw(frame))?;
                self.needs_redraw = false;
            }

            let timeout = tick_rate
                .checked_sub(last_tick.elapsed())
                .unwrap_or_else(|| Duration::from_millis(16));

            if event::poll(timeout)? {
                match event::read()? {
                    Event::Key(key) if key.kind == KeyEventKind::Press => match self.handle_key(key) {
                        Ok(true) => break,
                        Ok(false) => {}
                        Err(err) => {
                            self.status_message = format!("Error: {}", err);
                            self.mark_dirty();
                        }
                    },
                    Event::Resize(_, _) => self.mark_dirty(),
                    _ => {}
                }
            }

            if last_tick.elapsed() >= tick_rate {
                last_tick = Instant::now();
                if self.session.is_loading() {
                    if self.spinner.advance() {
                        self.mark_dirty();
                    }
                } else {
                    self.spinner.reset();
                }
            }
        }

        Ok(())
    }

    fn mark_dirty(&mut self) {
        self.needs_redraw = true;
    }

    fn poll_async(&mut self) -> bool {
        let mut changed = false;
        while let Ok(message) = self.response_rx.try_recv() {
            self.handle_async_response(message);
            changed = true;
        }
        changed
    }

    fn handle_async_response(&mut self, message: AsyncResponse) {
        match message {
            AsyncResponse::Directory { ticket, result } => {
                if !self.session.apply_directory(ticket, result) {
                    return;
                }
                self.sync_nav_to_active();
                self.status_message = match self.session.sidebar() {
                    Sidebar::Error { message, .. } => format!("Channel directory unavailable: {message}"),
                    _ => format!("Channels loaded from {}.", self.source_label),
                };
            }
            AsyncResponse::Feed { ticket, result } => {
                if !self.session.apply_feed(&ticket, result) {
                    return;
                }
                self.status_message = match self.session.feed().view() {
                    FeedView::Failed(message) => format!("Could not load #{}: {message}", ticket.channel_id),
                    FeedView::Empty => format!("#{} has no posts yet.", ticket.channel_id),
                    FeedView::Posts(posts) => format!("#{}: {} posts", ticket.channel_id, posts.len()),
                    FeedView::Idle | FeedView::Loading => self.status_message.clone(),
                };
            }
            AsyncResponse::Created { submission, result } => {
                if let Some(ticket) = self.session.apply_submit(&submission, result) {
                    self.feed_scroll = 0;
                    self.fetch_feed(ticket);
                }
                if let Some(status) = self.session.composer().status() {
                    self.status_message = status.message().to_string();
                }
            }
        }
    }

    fn reload_directory(&mut self) {
        let ticket = self.session.begin_directory_load();
        let tx = self.response_tx.clone();
        let service = self.services.directory.clone();
        thread::spawn(move || {
            let result = service.list_directory();
            let _ = tx.send(AsyncResponse::Directory { ticket, result });
        });
        self.status_message = "Loading channels…".to_string();
    }

    fn fetch_feed(&mut self, ticket: FeedTicket) {
        let tx = self.response_tx.clone();
        let service = self.services.feed.clone();
        self.status_message = format!("Loading #{}…", ticket.channel_id);
        thread::spawn(move || {
            let result = service.list_posts(&ticket.channel_id);
            let _ = tx.send(AsyncResponse::Feed { ticket, result });
        });
    }

    fn open_channel(&mut self, channel_id: &str) {
        self.feed_scroll = 0;
        let ticket = self.session.open_channel(channel_id);
        self.fetch_feed(ticket);
    }

    fn reload_feed(&mut self) {
        match self.session.reload_feed() {
            Some(ticket) => self.fetch_feed(ticket),
            None => self.status_message = "Select a channel first.".to_string(),
        }
    }

    fn submit_post(&mut self) {
        match self.session.begin_submit() {
            Ok(submission) => {
                let tx = self.response_tx.clone();
                let service = self.services.posts.clone();
                self.status_message = format!("Posting to #{}…", submission.channel_id);
                thread::spawn(move || {
                    let result = service.create_post(&submission.channel_id, &submission.body);
                    let _ = tx.send(AsyncResponse::Created { submission, result });
                });
            }
            Err(err) => {
                warn!(error = %err, "post not submitted");
                self.status_message = err.to_string();
            }
        }
    }

    fn sync_nav_to_active(&mut self) {
        let ids = self.session.directory().channel_ids();
        self.nav_index = self
            .session
            .active_channel()
            .and_then(|active| ids.iter().position(|id| *id == active))
            .unwrap_or_else(|| self.nav_index.min(ids.len().saturating_sub(1)));
    }

    fn handle_key(&mut self, key: KeyEvent) -> Result<bool> {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        if ctrl && matches!(key.code, KeyCode::Char('c')) {
            return Ok(true);
        }
        if self.focused_pane == Pane::Composer {
            self.handle_composer_key(key.code, ctrl);
            self.mark_dirty();
            return Ok(false);
        }

        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => return Ok(true),
            KeyCode::Tab | KeyCode::Char('l') | KeyCode::Right => {
                self.focused_pane = self.focused_pane.next();
            }
            KeyCode::BackTab | KeyCode::Char('h') | KeyCode::Left => {
                self.focused_pane = self.focused_pane.previous();
            }
            KeyCode::Char('c') | KeyCode::Char('n') => self.focused_pane = Pane::Composer,
            KeyCode::Char('r') => self.reload_feed(),
            KeyCode::Char('R') => self.reload_directory(),
            KeyCode::Char('j') | KeyCode::Down => self.navigate(1),
            KeyCode::Char('k') | KeyCode::Up => self.navigate(-1),
            KeyCode::Char('g') | KeyCode::Home => self.navigate_to_start(),
            KeyCode::Enter => {
                if self.focused_pane == Pane::Directory {
                    self.open_nav_selection();
                }
            }
            _ => {}
        }
        self.mark_dirty();
        Ok(false)
    }

    fn handle_composer_key(&mut self, code: KeyCode, ctrl: bool) {
        if ctrl {
            match code {
                KeyCode::Char('s') => self.submit_post(),
                KeyCode::Char('u') => self.session.composer_mut().clear_active(),
                _ => {}
            }
            return;
        }
        match code {
            KeyCode::Esc => self.focused_pane = Pane::Feed,
            KeyCode::Tab | KeyCode::Down => self.session.composer_mut().next(),
            KeyCode::BackTab | KeyCode::Up => self.session.composer_mut().previous(),
            KeyCode::Backspace => self.session.composer_mut().backspace(),
            KeyCode::Enter => match self.session.composer().active() {
                ComposerField::Submit => self.submit_post(),
                ComposerField::Content => self.session.composer_mut().insert_newline(),
                _ => self.session.composer_mut().next(),
            },
            KeyCode::Char(ch) => self.session.composer_mut().insert_char(ch),
            _ => {}
        }
    }

    fn navigate(&mut self, delta: i32) {
        match self.focused_pane {
            Pane::Directory => {
                let len = self.session.directory().channel_ids().len();
                if len == 0 {
                    return;
                }
                let next = (self.nav_index as i64 + delta as i64).clamp(0, len as i64 - 1);
                self.nav_index = next as usize;
            }
            Pane::Feed => {
                self.feed_scroll = if delta < 0 {
                    self.feed_scroll.saturating_sub(delta.unsigned_abs() as u16)
                } else {
                    self.feed_scroll
                        .saturating_add(delta as u16)
                        .min(self.feed_max_scroll)
                };
            }
            Pane::Composer => {}
        }
    }

    fn navigate_to_start(&mut self) {
        match self.focused_pane {
            Pane::Directory => self.nav_index = 0,
            Pane::Feed => self.feed_scroll = 0,
            Pane::Composer => {}
        }
    }

    fn open_nav_selection(&mut self) {
        let target = self
            .session
            .directory()
            .channel_ids()
            .get(self.nav_index)
            .map(|id| id.to_string());
        if let Some(channel_id) = target {
            self.open_channel(&channel_id);
            self.focused_pane = Pane::Feed;
        }
    }

    fn draw(&mut self, frame: &mut Frame<'_>) {
        let full = frame.size();
        frame.render_widget(Block::default().style(Style::default().bg(COLOR_BG)), full);

        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Min(0),
                Constraint::Length(1),
            ])
            .split(full);

        let status_text = if self.session.is_loading() {
            format!("{} {}", self.spinner.frame(), self.status_message)
        } else {
            self.status_message.clone()
        };
        let status_line = Paragraph::new(format!(" House Liber Arce · Staff Console │ {status_text}")).style(
            Style::default()
                .fg(COLOR_TEXT_PRIMARY)
                .bg(COLOR_PANEL_FOCUSED_BG)
                .add_modifier(Modifier::BOLD),
        );
        frame.render_widget(status_line, layout[0]);

        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Length(DIRECTORY_WIDTH),
                Constraint::Min(20),
                Constraint::Length(TOOLS_WIDTH),
            ])
            .split(layout[1]);

        let main = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(3), Constraint::Length(COMPOSER_HEIGHT)])
            .split(columns[1]);

        self.draw_directory(frame, columns[0]);
        self.draw_feed(frame, main[0]);
        self.draw_composer(frame, main[1]);
        self.draw_tools(frame, columns[2]);

        let footer = Paragraph::new(self.footer_text())
            .style(
                Style::default()
                    .fg(COLOR_TEXT_SECONDARY)
                    .bg(COLOR_PANEL_BG)
                    .add_modifier(Modifier::ITALIC),
            )
            .alignment(Alignment::Center);
        frame.render_widget(footer, layout[2]);
    }

    fn footer_text(&self) -> &'static str {
        match self.focused_pane {
            Pane::Directory => "j/k move · Enter open · l/Tab next pane · c compose · R reload channels · q quit",
            Pane::Feed => "j/k scroll · g top · r reload feed · h back · c compose · q quit",
            Pane::Composer => "Tab next field · Enter on Post submits · Ctrl-S submit · Ctrl-U clear field · Esc leave",
        }
    }

    fn pane_block(&self, pane: Pane, title: String) -> Block<'static> {
        let focused = self.focused_pane == pane;
        let border_style = if focused {
            Style::default().fg(COLOR_BORDER_FOCUSED)
        } else {
            Style::default().fg(COLOR_BORDER_IDLE)
        };
        let title_style = if focused {
            Style::default().fg(COLOR_ACCENT).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(COLOR_TEXT_SECONDARY)
        };
        Block::default()
            .title(Span::styled(title, title_style))
            .borders(Borders::ALL)
            .border_style(border_style)
            .style(Style::default().bg(COLOR_PANEL_BG))
            .padding(Padding::horizontal(1))
    }

    fn draw_directory(&self, frame: &mut Frame<'_>, area: Rect) {
        let block = self.pane_block(Pane::Directory, Pane::Directory.title().to_string());
        let inner = block.inner(area);
        frame.render_widget(block, area);

        match self.session.sidebar() {
            Sidebar::Loading => {
                let text = Paragraph::new("Loading channels…")
                    .style(Style::default().fg(COLOR_TEXT_SECONDARY));
                frame.render_widget(text, inner);
            }
            Sidebar::Error { title, message } => {
                let lines = vec![
                    Line::from(Span::styled(
                        title.to_uppercase(),
                        Style::default().fg(COLOR_ERROR).add_modifier(Modifier::BOLD),
                    )),
                    Line::from(Span::styled(message, Style::default().fg(COLOR_TEXT_PRIMARY))),
                    Line::default(),
                    Line::from(Span::styled(
                        "Press R to retry.",
                        Style::default().fg(COLOR_TEXT_SECONDARY).add_modifier(Modifier::ITALIC),
                    )),
                ];
                frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: true }), inner);
            }
            Sidebar::Groups(groups) => {
                let width = inner.width as usize;
                let focused = self.focused_pane == Pane::Directory;
                let mut items: Vec<ListItem<'static>> = Vec::new();
                let mut cursor_row = None;
                let mut channel_index = 0usize;

                for (group_index, group) in groups.iter().enumerate() {
                    if group_index > 0 {
                        items.push(ListItem::new(Line::default()));
                    }
                    items.push(ListItem::new(Line::from(Span::styled(
                        group.title.to_uppercase(),
                        Style::default()
                            .fg(COLOR_TEXT_SECONDARY)
                            .add_modifier(Modifier::BOLD),
                    ))));
                    for entry in &group.entries {
                        if channel_index == self.nav_index {
                            cursor_row = Some(items.len());
                        }
                        items.push(ListItem::new(channel_line(
                            &entry.channel.name,
                            entry.badge,
                            entry.is_active,
                            width,
                        )));
                        channel_index += 1;
                    }
                }

                let highlight = if focused {
                    Style::default().bg(COLOR_PANEL_SELECTED_BG)
                } else {
                    Style::default()
                };
                let list = List::new(items).highlight_style(highlight);
                let mut state = ListState::default().with_selected(cursor_row);
                frame.render_stateful_widget(list, inner, &mut state);
            }
        }
    }

    fn draw_feed(&mut self, frame: &mut Frame<'_>, area: Rect) {
        let title = match self.session.active_channel() {
            Some(channel_id) => {
                let category = self
                    .session
                    .directory()
                    .find_channel(channel_id)
                    .map(|(cat, _)| format!(" · {}", cat.category))
                    .unwrap_or_default();
                format!("# {channel_id}{category}")
            }
            None => Pane::Feed.title().to_string(),
        };
        let block = self.pane_block(Pane::Feed, title);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let lines = match self.session.feed().view() {
            FeedView::Idle => system_message(
                "Getting started",
                "Select a channel on the left to view and post entries.",
                COLOR_TEXT_SECONDARY,
            ),
            FeedView::Loading => system_message("System", "Loading posts…", COLOR_TEXT_SECONDARY),
            FeedView::Empty => system_message("System", EMPTY_PLACEHOLDER, COLOR_TEXT_SECONDARY),
            FeedView::Failed(message) => system_message("Error", &message, COLOR_ERROR),
            FeedView::Posts(posts) => {
                let mut lines = Vec::new();
                for post in posts {
                    lines.extend(self.post_lines(post));
                    lines.push(Line::default());
                }
                lines
            }
        };
        // Wrap up front so the scroll limit counts screen rows.
        let width = inner.width as usize;
        let rows: Vec<Line<'static>> = lines
            .into_iter()
            .flat_map(|line| wrap_spans(line, width))
            .collect();
        let max_scroll = rows.len().saturating_sub(inner.height as usize);
        self.feed_max_scroll = max_scroll.min(u16::MAX as usize) as u16;
        self.feed_scroll = self.feed_scroll.min(self.feed_max_scroll);
        let paragraph = Paragraph::new(Text::from(rows)).scroll((self.feed_scroll, 0));
        frame.render_widget(paragraph, inner);
    }

    fn post_lines(&self, post: &Post) -> Vec<Line<'static>> {
        let mut lines = vec![Line::from(vec![
            Span::styled(
                post.author.clone(),
                Style::default().fg(COLOR_ACCENT).add_modifier(Modifier::BOLD),
            ),
            Span::raw("  "),
            Span::styled(post.display_timestamp(), Style::default().fg(COLOR_TEXT_SECONDARY)),
        ])];
        lines.extend(self.markdown.render(&post.content));
        if !post.tags.is_empty() {
            let mut spans = Vec::with_capacity(post.tags.len() * 2);
            for (idx, tag) in post.tags.iter().enumerate() {
                if idx > 0 {
                    spans.push(Span::raw(" "));
                }
                spans.push(Span::styled(
                    format!("[{tag}]"),
                    Style::default().fg(COLOR_BADGE_STAFF).bg(COLOR_PANEL_FOCUSED_BG),
                ));
            }
            lines.push(Line::from(spans));
        }
        lines
    }

    fn draw_composer(&self, frame: &mut Frame<'_>, area: Rect) {
        let title = match self.session.active_channel() {
            Some(channel_id) => format!("New Post → #{channel_id}"),
            None => Pane::Composer.title().to_string(),
        };
        let block = self.pane_block(Pane::Composer, title);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let composer = self.session.composer();
        let focused = self.focused_pane == Pane::Composer;
        let draft = composer.draft();
        let field_style = |field: ComposerField| {
            if focused && composer.active() == field {
                Style::default().fg(COLOR_TEXT_PRIMARY).bg(COLOR_PANEL_SELECTED_BG)
            } else {
                Style::default().fg(COLOR_TEXT_PRIMARY)
            }
        };
        let cursor = |field: ComposerField| {
            if focused && composer.active() == field {
                "▏"
            } else {
                ""
            }
        };
        let label = |field: ComposerField| {
            Span::styled(
                format!("{}: ", field.title()),
                Style::default().fg(COLOR_TEXT_SECONDARY),
            )
        };

        let mut lines = vec![
            Line::from(vec![
                label(ComposerField::Author),
                Span::styled(
                    format!("{}{}", draft.author, cursor(ComposerField::Author)),
                    field_style(ComposerField::Author),
                ),
            ]),
            Line::from(vec![
                label(ComposerField::Tags),
                Span::styled(
                    format!("{}{}", draft.raw_tags, cursor(ComposerField::Tags)),
                    field_style(ComposerField::Tags),
                ),
            ]),
            Line::from(label(ComposerField::Content)),
        ];

        let content = format!("{}{}", draft.content, cursor(ComposerField::Content));
        for text in content.split('\n') {
            lines.extend(wrap_indented(
                text,
                inner.width as usize,
                field_style(ComposerField::Content),
            ));
        }

        let mut footer = vec![Span::styled(
            "[ Post ]",
            field_style(ComposerField::Submit).add_modifier(Modifier::BOLD),
        )];
        if let Some(status) = composer.status() {
            let color = match status {
                ComposerStatus::Pending(_) => COLOR_TEXT_SECONDARY,
                ComposerStatus::Posted(_) => COLOR_SUCCESS,
                ComposerStatus::Error(_) => COLOR_ERROR,
            };
            footer.push(Span::raw("  "));
            footer.push(Span::styled(status.message().to_string(), Style::default().fg(color)));
        }

        // Keep the end of a long draft and the action row visible.
        let body_height = inner.height.saturating_sub(1) as usize;
        let overflow = lines.len().saturating_sub(body_height);
        let body: Vec<Line<'static>> = lines.into_iter().skip(overflow).collect();

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(1)])
            .split(inner);
        frame.render_widget(Paragraph::new(body), chunks[0]);
        frame.render_widget(Paragraph::new(Line::from(footer)), chunks[1]);
    }

    fn draw_tools(&self, frame: &mut Frame<'_>, area: Rect) {
        let block = Block::default()
            .title(Span::styled(
                "AI Tools (UI only)",
                Style::default().fg(COLOR_TEXT_SECONDARY),
            ))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(COLOR_BORDER_IDLE))
            .style(Style::default().bg(COLOR_PANEL_BG))
            .padding(Padding::horizontal(1));
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let heading = |text: &'static str| {
            Line::from(Span::styled(
                text,
                Style::default().fg(COLOR_TEXT_PRIMARY).add_modifier(Modifier::BOLD),
            ))
        };
        let item = |text: &'static str, tag: &'static str| {
            Line::from(vec![
                Span::styled(format!("• {text} "), Style::default().fg(COLOR_TEXT_SECONDARY)),
                Span::styled(format!("[{tag}]"), Style::default().fg(COLOR_BADGE_HEAD)),
            ])
        };
        let lines = vec![
            heading("Ask the AI (role-aware)"),
            Line::from(Span::styled(
                "Summarize this channel and extract learned lore…",
                Style::default().fg(COLOR_TEXT_SECONDARY).add_modifier(Modifier::ITALIC),
            )),
            Line::default(),
            heading("Approval Queue"),
            item("NPC Proposal", "review"),
            item("Lore Proposal", "review"),
            item("Learned Lore Extract", "draft"),
            Line::default(),
            heading("Quick Actions"),
            item("Create mission template", "open"),
            item("Generate scenario hooks", "open"),
            item("Export summary", "open"),
        ];
        frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: true }), inner);
    }
}

fn badge_color(badge: Badge) -> Color {
    match badge {
        Badge::Public => COLOR_BADGE_PUBLIC,
        Badge::Staff => COLOR_BADGE_STAFF,
        Badge::Head => COLOR_BADGE_HEAD,
    }
}

/// `# name` on the left, the badge flush right.
fn channel_line(name: &str, badge: Badge, active: bool, width: usize) -> Line<'static> {
    let marker = if active { "▌" } else { " " };
    let label = format!("{marker}# {name}");
    let badge_text = badge.label();
    let gap = width
        .saturating_sub(label.width() + badge_text.width())
        .max(1);
    let name_style = if active {
        Style::default().fg(COLOR_ACCENT).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(COLOR_TEXT_PRIMARY)
    };
    Line::from(vec![
        Span::styled(label, name_style),
        Span::raw(" ".repeat(gap)),
        Span::styled(badge_text, Style::default().fg(badge_color(badge))),
    ])
}

/// Word-wraps a styled line to `width` columns. Words wider than a row are
/// broken by character.
fn wrap_spans(line: Line<'static>, width: usize) -> Vec<Line<'static>> {
    let width = width.max(1);
    if line.width() <= width {
        return vec![line];
    }
    let mut rows = Vec::new();
    let mut current: Vec<Span<'static>> = Vec::new();
    let mut used = 0usize;
    for span in line.spans {
        let style = span.style;
        for piece in span.content.split_inclusive(' ') {
            let visible = piece.trim_end_matches(' ').width();
            if used > 0 && used + visible > width {
                rows.push(Line::from(std::mem::take(&mut current)));
                used = 0;
            }
            if visible <= width {
                current.push(Span::styled(piece.to_string(), style));
                used += piece.width();
                continue;
            }
            let mut chunk = String::new();
            for ch in piece.chars() {
                let ch_width = ch.width().unwrap_or(0);
                if used + ch_width > width && used > 0 {
                    current.push(Span::styled(std::mem::take(&mut chunk), style));
                    rows.push(Line::from(std::mem::take(&mut current)));
                    used = 0;
                }
                chunk.push(ch);
                used += ch_width;
            }
            if !chunk.is_empty() {
                current.push(Span::styled(chunk, style));
            }
        }
    }
    if !current.is_empty() {
        rows.push(Line::from(current));
    }
    rows
}

fn wrap_indented(text: &str, width: usize, style: Style) -> Vec<Line<'static>> {
    if text.is_empty() {
        return vec![Line::from(Span::styled("  ", style))];
    }
    let options = WrapOptions::new(width.max(4))
        .initial_indent("  ")
        .subsequent_indent("  ");
    wrap(text, options)
        .into_iter()
        .map(|cow| Line::from(Span::styled(cow.into_owned(), style)))
        .collect()
}

fn system_message(meta: &str, text: &str, color: Color) -> Vec<Line<'static>> {
    vec![
        Line::from(vec![
            Span::styled(
                meta.to_string(),
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            ),
            Span::styled("  —", Style::default().fg(COLOR_TEXT_SECONDARY)),
        ]),
        Line::from(Span::styled(text.to_string(), Style::default().fg(COLOR_TEXT_PRIMARY))),
    ]
}
