//! Chat mediator: turns panel intents into resolver/session/API work and
//! reports the results back as panel events.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinSet;

use sidechat_core::ChatError;
use sidechat_core::chat::{ChatClient, ChatRequest};
use sidechat_core::config::{ChatConfig, ChatSettings};
use sidechat_core::file::{FileContextResolver, FileType, ResolvedFile};
use sidechat_core::protocol::{PanelEvent, PanelIntent};
use sidechat_core::session::{ConversationSession, ConversationTurn};
use sidechat_interaction::OpenAIChatClient;

/// Where the mediator delivers events for the panel.
pub type EventSender = mpsc::UnboundedSender<PanelEvent>;

/// Lifecycle of the (single) outstanding send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    Idle,
    Sending,
}

/// Terminal result of a send intent. The mediator is back to `Idle` once
/// this is returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    Completed,
    Failed(ChatError),
    /// Another send was still pending; nothing was attempted.
    Rejected,
}

/// Bridges panel intents to the file resolver, the conversation session and
/// the chat API.
///
/// Cloning is cheap and every clone shares the same session and in-flight
/// flag, so a clone can be moved into a spawned send task.
#[derive(Clone)]
pub struct ChatMediator {
    session: Arc<Mutex<ConversationSession>>,
    resolver: Arc<dyn FileContextResolver>,
    client: Option<Arc<dyn ChatClient>>,
    chat_config: ChatConfig,
    in_flight: Arc<AtomicBool>,
    events: EventSender,
}

/// Marks a send as in flight; dropping it returns the mediator to `Idle`.
struct SendGuard {
    in_flight: Arc<AtomicBool>,
}

impl Drop for SendGuard {
    fn drop(&mut self) {
        self.in_flight.store(false, Ordering::Release);
    }
}

impl ChatMediator {
    /// `client` is `None` when no credential is configured.
    pub fn new(
        chat_config: ChatConfig,
        resolver: Arc<dyn FileContextResolver>,
        client: Option<Arc<dyn ChatClient>>,
        events: EventSender,
    ) -> Self {
        Self {
            session: Arc::new(Mutex::new(ConversationSession::new())),
            resolver,
            client,
            chat_config,
            in_flight: Arc::new(AtomicBool::new(false)),
            events,
        }
    }

    /// Reads settings once and builds the OpenAI client from them.
    pub fn from_settings(
        settings: &ChatSettings,
        resolver: Arc<dyn FileContextResolver>,
        events: EventSender,
    ) -> Self {
        let client = OpenAIChatClient::from_settings(settings)
            .map(|client| Arc::new(client) as Arc<dyn ChatClient>);
        if client.is_none() {
            tracing::warn!("[Mediator] No API credential configured; sends will fail");
        }
        Self::new(settings.chat.clone(), resolver, client, events)
    }

    pub fn state(&self) -> RequestState {
        if self.in_flight.load(Ordering::Acquire) {
            RequestState::Sending
        } else {
            RequestState::Idle
        }
    }

    /// Snapshot of the current history.
    pub async fn history(&self) -> Vec<ConversationTurn> {
        self.session.lock().await.history().to_vec()
    }

    /// Clears conversation history.
    pub async fn reset_history(&self) {
        self.session.lock().await.reset();
        tracing::info!("[Mediator] History cleared");
    }

    /// Processes intents until the channel closes, then waits for pending sends.
    ///
    /// Sends run on their own task so searches and content fetches are
    /// answered while a reply is pending.
    pub async fn run(self, mut intents: mpsc::Receiver<PanelIntent>) {
        let mut sends = JoinSet::new();

        while let Some(intent) = intents.recv().await {
            tracing::debug!("[Mediator] intent {}", intent.kind());

            match intent {
                PanelIntent::SendMessage {
                    message,
                    attached_files,
                } => match self.try_begin_send() {
                    Some(guard) => {
                        let mediator = self.clone();
                        sends.spawn(async move {
                            mediator.send_guarded(guard, message, attached_files).await
                        });
                    }
                    None => self.reject_busy(),
                },
                other => self.handle_intent(other).await,
            }

            while sends.try_join_next().is_some() {}
        }

        while sends.join_next().await.is_some() {}
        tracing::info!("[Mediator] Intent channel closed");
    }

    /// Handles one intent to completion on the current task.
    pub async fn handle_intent(&self, intent: PanelIntent) {
        match intent {
            PanelIntent::SendMessage {
                message,
                attached_files,
            } => {
                self.on_send(message, attached_files).await;
            }
            PanelIntent::SearchFiles { query } => self.on_search(&query).await,
            PanelIntent::GetFileContent { file_path } => self.on_fetch_content(file_path).await,
            PanelIntent::Ready => self.on_ready(),
        }
    }

    /// Sends a chat turn. Rejected if another send is still pending.
    pub async fn on_send(&self, message: String, attached_paths: Vec<String>) -> SendOutcome {
        match self.try_begin_send() {
            Some(guard) => self.send_guarded(guard, message, attached_paths).await,
            None => {
                self.reject_busy();
                SendOutcome::Rejected
            }
        }
    }

    pub async fn on_search(&self, query: &str) {
        let files = self.resolver.search(query).await;
        self.emit(PanelEvent::FilesFound { files });
    }

    pub async fn on_fetch_content(&self, file_path: String) {
        let (content, file_type) = match self.resolver.resolve(&file_path).await {
            Some(resolved) => (resolved.content, resolved.file_type),
            None => (String::new(), FileType::Text),
        };
        self.emit(PanelEvent::FileContent {
            file_path,
            content,
            file_type,
        });
    }

    pub fn on_ready(&self) {
        self.emit(PanelEvent::Initialized);
    }

    fn try_begin_send(&self) -> Option<SendGuard> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| SendGuard {
                in_flight: Arc::clone(&self.in_flight),
            })
    }

    fn reject_busy(&self) {
        tracing::warn!("[Mediator] Send rejected: a request is already in flight");
        self.emit(PanelEvent::error(ChatError::Busy.user_message()));
    }

    /// The mediator is `Idle` again by the time the terminal events are emitted.
    async fn send_guarded(
        &self,
        guard: SendGuard,
        message: String,
        attached_paths: Vec<String>,
    ) -> SendOutcome {
        self.emit(PanelEvent::TypingStart);

        let Some(client) = self.client.as_ref() else {
            drop(guard);
            return self.fail(ChatError::Configuration);
        };

        let files = self.resolve_attachments(&attached_paths).await;
        let request = {
            let session = self.session.lock().await;
            let payload = session.compose(&message, &files);
            ChatRequest::from_payload(&payload, &self.chat_config)
        };

        tracing::info!(
            "[Mediator] Sending message ({} chars, {} of {} attachments resolved)",
            message.len(),
            files.len(),
            attached_paths.len()
        );

        let result = client.complete(&request).await;
        if let Ok(reply) = &result {
            self.session.lock().await.record(&message, reply);
        }
        drop(guard);

        match result {
            Ok(reply) => {
                self.emit(PanelEvent::TypingEnd);
                self.emit(PanelEvent::AiResponse {
                    message: reply,
                    timestamp: chrono::Utc::now().to_rfc3339(),
                });
                SendOutcome::Completed
            }
            Err(err) => self.fail(err),
        }
    }

    fn fail(&self, err: ChatError) -> SendOutcome {
        tracing::warn!("[Mediator] Send failed: {:?}", err);
        self.emit(PanelEvent::TypingEnd);
        self.emit(PanelEvent::error(err.user_message()));
        SendOutcome::Failed(err)
    }

    /// Sequential; a file that fails to resolve is left out.
    async fn resolve_attachments(&self, paths: &[String]) -> Vec<ResolvedFile> {
        let mut files = Vec::with_capacity(paths.len());
        for path in paths {
            match self.resolver.resolve(path).await {
                Some(content) => files.push(ResolvedFile::new(path.clone(), content)),
                None => tracing::warn!("[Mediator] Skipping unresolvable attachment {}", path),
            }
        }
        files
    }

    fn emit(&self, event: PanelEvent) {
        if self.events.send(event).is_err() {
            tracing::debug!("[Mediator] Panel is gone; dropping event");
        }
    }
}
