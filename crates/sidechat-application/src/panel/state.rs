//! Panel view state and its transitions.
//!
//! [`PanelState`] never talks to the mediator directly: user actions return
//! the [`PanelIntent`]s they produce and mediator output is fed back through
//! [`PanelState::apply_event`]. Time is passed in so transitions stay
//! deterministic.

use chrono::{DateTime, TimeDelta, Utc};

use sidechat_core::file::AttachedFileRef;
use sidechat_core::protocol::{PanelEvent, PanelIntent};
use sidechat_core::session::{Message, MessageRole};

use super::composer::{active_trigger, remove_trigger};

/// How long an error banner stays up.
pub const ERROR_BANNER_TTL_SECS: i64 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopupKey {
    Up,
    Down,
    Enter,
    Escape,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PopupState {
    pub open: bool,
    pub selected: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorBanner {
    pub message: String,
    pub raised_at: DateTime<Utc>,
}

/// Everything the panel renders.
#[derive(Debug, Clone, Default)]
pub struct PanelState {
    pub messages: Vec<Message>,
    pub draft: String,
    /// Cursor position in the draft, in chars.
    pub cursor: usize,
    pub staged: Vec<AttachedFileRef>,
    pub search_results: Vec<AttachedFileRef>,
    pub popup: PopupState,
    pub typing: bool,
    pub error: Option<ErrorBanner>,
    pub initialized: bool,
    next_id: u64,
}

impl PanelState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handshake sent once the panel is ready to receive events.
    pub fn ready(&self) -> PanelIntent {
        PanelIntent::Ready
    }

    /// Replaces the draft and checks for an `@` trigger before the cursor.
    pub fn update_draft(&mut self, text: impl Into<String>, cursor: usize) -> Vec<PanelIntent> {
        self.draft = text.into();
        self.cursor = cursor.min(self.draft.chars().count());

        let Some(trigger) = active_trigger(&self.draft, self.cursor) else {
            return Vec::new();
        };

        if trigger.query.is_empty() {
            self.popup.open = true;
        }
        self.search(&trigger.query)
    }

    /// Search typed into the popup's own search box.
    pub fn search(&mut self, query: &str) -> Vec<PanelIntent> {
        let query = query.trim();
        if query.is_empty() {
            self.search_results.clear();
            self.popup.selected = 0;
            return Vec::new();
        }

        vec![PanelIntent::SearchFiles {
            query: query.to_string(),
        }]
    }

    pub fn open_popup(&mut self) {
        self.popup.open = true;
    }

    pub fn close_popup(&mut self) {
        self.popup.open = false;
    }

    /// Stages the result at `index` and closes the popup.
    ///
    /// Returns `false` if there is no such result.
    pub fn select_result(&mut self, index: usize) -> bool {
        let Some(file) = self.search_results.get(index).cloned() else {
            return false;
        };

        if !self.staged.iter().any(|staged| staged.path == file.path) {
            self.staged.push(file);
        }

        if let Some(trigger) = active_trigger(&self.draft, self.cursor) {
            let (draft, cursor) = remove_trigger(&self.draft, &trigger);
            self.draft = draft;
            self.cursor = cursor;
        }

        self.popup = PopupState::default();
        true
    }

    pub fn detach(&mut self, path: &str) {
        self.staged.retain(|file| file.path != path);
    }

    /// Popup keyboard navigation. Ignored while the popup is closed.
    pub fn key(&mut self, key: PopupKey) {
        if !self.popup.open {
            return;
        }

        let len = self.search_results.len();
        match key {
            PopupKey::Down if len > 0 => {
                self.popup.selected = (self.popup.selected + 1) % len;
            }
            PopupKey::Up if len > 0 => {
                self.popup.selected = (self.popup.selected + len - 1) % len;
            }
            PopupKey::Enter => {
                self.select_result(self.popup.selected);
            }
            PopupKey::Escape => self.close_popup(),
            PopupKey::Up | PopupKey::Down => {}
        }
    }

    /// Submits the draft with the staged attachments.
    ///
    /// Blank drafts and submits while a reply is pending produce nothing.
    pub fn submit(&mut self, now: DateTime<Utc>) -> Vec<PanelIntent> {
        let message = self.draft.trim().to_string();
        if message.is_empty() || self.typing {
            return Vec::new();
        }

        let staged = std::mem::take(&mut self.staged);
        let attached_files = staged.iter().map(|file| file.path.clone()).collect();

        let id = self.next_message_id();
        self.messages.push(Message {
            id,
            content: message.clone(),
            sender: MessageRole::User,
            timestamp: now,
            attached_files: (!staged.is_empty()).then_some(staged),
        });

        self.draft.clear();
        self.cursor = 0;
        self.error = None;

        vec![PanelIntent::SendMessage {
            message,
            attached_files,
        }]
    }

    /// Folds one mediator event into the state.
    pub fn apply_event(&mut self, event: PanelEvent, now: DateTime<Utc>) {
        match event {
            PanelEvent::TypingStart => self.typing = true,
            PanelEvent::TypingEnd => self.typing = false,
            PanelEvent::AiResponse { message, timestamp } => {
                let timestamp = DateTime::parse_from_rfc3339(&timestamp)
                    .map(|ts| ts.with_timezone(&Utc))
                    .unwrap_or(now);
                let id = self.next_message_id();
                self.messages.push(Message {
                    id,
                    content: message,
                    sender: MessageRole::Assistant,
                    timestamp,
                    attached_files: None,
                });
                self.typing = false;
            }
            PanelEvent::FilesFound { files } => {
                self.search_results = files;
                self.popup.selected = 0;
            }
            PanelEvent::Error { message } => {
                self.error = Some(ErrorBanner {
                    message,
                    raised_at: now,
                });
                self.typing = false;
            }
            PanelEvent::FileContent { file_path, .. } => {
                tracing::debug!("[Panel] Content received for {}", file_path);
            }
            PanelEvent::Initialized => {
                self.initialized = true;
                tracing::debug!("[Panel] Mediator initialized");
            }
        }
    }

    /// Drops the error banner once it has been up for the TTL.
    ///
    /// Returns whether a banner was dismissed.
    pub fn dismiss_expired_error(&mut self, now: DateTime<Utc>) -> bool {
        let expired = self.error.as_ref().is_some_and(|banner| {
            now - banner.raised_at >= TimeDelta::seconds(ERROR_BANNER_TTL_SECS)
        });
        if expired {
            self.error = None;
        }
        expired
    }

    /// The result the popup currently highlights.
    pub fn selected_result(&self) -> Option<&AttachedFileRef> {
        self.search_results.get(self.popup.selected)
    }

    fn next_message_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sidechat_core::file::FileKind;

    fn file(path: &str) -> AttachedFileRef {
        AttachedFileRef {
            name: path.rsplit('/').next().unwrap().to_string(),
            path: path.to_string(),
            relative_path: path.trim_start_matches("/ws/").to_string(),
            kind: FileKind::File,
        }
    }

    fn found(paths: &[&str]) -> PanelEvent {
        PanelEvent::FilesFound {
            files: paths.iter().map(|p| file(p)).collect(),
        }
    }

    fn typed(state: &mut PanelState, text: &str) -> Vec<PanelIntent> {
        state.update_draft(text, text.chars().count())
    }

    #[test]
    fn test_trigger_emits_search() {
        let mut state = PanelState::new();
        let intents = typed(&mut state, "explain @util");
        assert_eq!(
            intents,
            vec![PanelIntent::SearchFiles {
                query: "util".into()
            }]
        );
    }

    #[test]
    fn test_bare_at_opens_popup_and_clears_results() {
        let mut state = PanelState::new();
        state.apply_event(found(&["/ws/a.ts"]), Utc::now());

        let intents = typed(&mut state, "look @");
        assert!(intents.is_empty());
        assert!(state.popup.open);
        assert!(state.search_results.is_empty());
    }

    #[test]
    fn test_no_trigger_no_intent() {
        let mut state = PanelState::new();
        assert!(typed(&mut state, "hello world").is_empty());
        assert!(typed(&mut state, "mail me@ home").is_empty());
        assert!(!state.popup.open);
    }

    #[test]
    fn test_popup_search_trims() {
        let mut state = PanelState::new();
        assert_eq!(
            state.search("  foo "),
            vec![PanelIntent::SearchFiles { query: "foo".into() }]
        );
        assert!(state.search("   ").is_empty());
    }

    #[test]
    fn test_select_stages_once_and_strips_trigger() {
        let mut state = PanelState::new();
        typed(&mut state, "explain @");
        typed(&mut state, "explain @uti");
        state.apply_event(found(&["/ws/src/util.ts"]), Utc::now());

        assert!(state.select_result(0));
        assert_eq!(state.staged.len(), 1);
        assert_eq!(state.draft, "explain ");
        assert!(!state.popup.open);

        // same file again stays single
        typed(&mut state, "explain @util");
        state.apply_event(found(&["/ws/src/util.ts"]), Utc::now());
        state.select_result(0);
        assert_eq!(state.staged.len(), 1);

        assert!(!state.select_result(5));
    }

    #[test]
    fn test_keyboard_navigation_wraps() {
        let mut state = PanelState::new();
        typed(&mut state, "@");
        state.apply_event(found(&["/ws/a.ts", "/ws/b.ts", "/ws/c.ts"]), Utc::now());

        state.key(PopupKey::Up);
        assert_eq!(state.popup.selected, 2);
        state.key(PopupKey::Down);
        assert_eq!(state.popup.selected, 0);
        state.key(PopupKey::Down);
        assert_eq!(state.selected_result().unwrap().path, "/ws/b.ts");

        state.key(PopupKey::Enter);
        assert_eq!(state.staged[0].path, "/ws/b.ts");
        assert!(!state.popup.open);
    }

    #[test]
    fn test_escape_closes_without_selection() {
        let mut state = PanelState::new();
        typed(&mut state, "@");
        state.apply_event(found(&["/ws/a.ts"]), Utc::now());

        state.key(PopupKey::Escape);
        assert!(!state.popup.open);
        assert!(state.staged.is_empty());

        // closed popup ignores keys
        state.key(PopupKey::Enter);
        assert!(state.staged.is_empty());
    }

    #[test]
    fn test_navigation_on_empty_results_is_noop() {
        let mut state = PanelState::new();
        state.open_popup();
        state.key(PopupKey::Down);
        state.key(PopupKey::Up);
        assert_eq!(state.popup.selected, 0);
    }

    #[test]
    fn test_submit_sends_paths_and_clears() {
        let mut state = PanelState::new();
        state.apply_event(found(&["/ws/src/util.ts"]), Utc::now());
        state.select_result(0);
        state.apply_event(PanelEvent::error("old"), Utc::now());
        typed(&mut state, "  explain this  ");

        let now = Utc::now();
        let intents = state.submit(now);
        assert_eq!(
            intents,
            vec![PanelIntent::SendMessage {
                message: "explain this".into(),
                attached_files: vec!["/ws/src/util.ts".into()],
            }]
        );

        let sent = state.messages.last().unwrap();
        assert_eq!(sent.sender, MessageRole::User);
        assert_eq!(sent.timestamp, now);
        assert_eq!(sent.attached_files.as_ref().unwrap().len(), 1);

        assert!(state.staged.is_empty());
        assert!(state.draft.is_empty());
        assert!(state.error.is_none());
    }

    #[test]
    fn test_submit_blank_or_while_typing_does_nothing() {
        let mut state = PanelState::new();
        typed(&mut state, "   ");
        assert!(state.submit(Utc::now()).is_empty());

        typed(&mut state, "hello");
        state.apply_event(PanelEvent::TypingStart, Utc::now());
        assert!(state.submit(Utc::now()).is_empty());
        assert_eq!(state.draft, "hello");
        assert!(state.messages.is_empty());
    }

    #[test]
    fn test_submit_without_attachments_has_none() {
        let mut state = PanelState::new();
        typed(&mut state, "hi");
        state.submit(Utc::now());
        assert!(state.messages[0].attached_files.is_none());
    }

    #[test]
    fn test_ai_response_appends_and_stops_typing() {
        let mut state = PanelState::new();
        typed(&mut state, "hi");
        state.submit(Utc::now());
        state.apply_event(PanelEvent::TypingStart, Utc::now());

        state.apply_event(
            PanelEvent::AiResponse {
                message: "hello".into(),
                timestamp: "2026-01-02T03:04:05Z".into(),
            },
            Utc::now(),
        );

        assert!(!state.typing);
        let reply = state.messages.last().unwrap();
        assert_eq!(reply.sender, MessageRole::Assistant);
        assert_eq!(reply.timestamp.to_rfc3339(), "2026-01-02T03:04:05+00:00");
        assert!(reply.id > state.messages[0].id);
    }

    #[test]
    fn test_bad_timestamp_falls_back_to_now() {
        let mut state = PanelState::new();
        let now = Utc::now();
        state.apply_event(
            PanelEvent::AiResponse {
                message: "x".into(),
                timestamp: "yesterday".into(),
            },
            now,
        );
        assert_eq!(state.messages[0].timestamp, now);
    }

    #[test]
    fn test_error_banner_expires() {
        let mut state = PanelState::new();
        let raised = Utc::now();
        state.apply_event(PanelEvent::TypingStart, raised);
        state.apply_event(PanelEvent::error("boom"), raised);
        assert!(!state.typing);

        assert!(!state.dismiss_expired_error(raised + TimeDelta::seconds(4)));
        assert!(state.error.is_some());
        assert!(state.dismiss_expired_error(raised + TimeDelta::seconds(5)));
        assert!(state.error.is_none());
    }

    #[test]
    fn test_detach_and_initialized() {
        let mut state = PanelState::new();
        state.apply_event(found(&["/ws/a.ts", "/ws/b.ts"]), Utc::now());
        state.select_result(0);
        state.select_result(1);
        state.detach("/ws/a.ts");
        assert_eq!(state.staged.len(), 1);
        assert_eq!(state.staged[0].path, "/ws/b.ts");

        state.apply_event(PanelEvent::Initialized, Utc::now());
        assert!(state.initialized);
    }
}
