//! Values exchanged between the room view and its host.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::room_db::{Persona, RoomDetails, StoredMessage};

/// Content shown for a message that arrived without any.
pub const EMPTY_CONTENT: &str = "EMPTY";
/// Number of skeleton rows shown while the first fetch is in flight.
pub const LOADING_PLACEHOLDER_COUNT: usize = 3;
/// Poll period for a freshly opened room that has fewer than two messages.
pub const INITIAL_REFETCH_INTERVAL: Duration = Duration::from_millis(1000);
pub const NOTIFICATION_DURATION: Duration = Duration::from_millis(2000);
pub const FETCH_ERROR_TITLE: &str = "Oh no! An error occurred while fetching the messages for this room. \
                                     Please refresh the page, or try again later.";

/// A message as received from `/api/chat/messages/get`. Every field may be
/// missing on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomMessage {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub persona: Option<Persona>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub is_aborted: Option<bool>,
}

impl RoomMessage {
    pub fn new(id: impl Into<String>, persona: Persona, content: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            persona: Some(persona),
            content: Some(content.into()),
            is_aborted: None,
        }
    }

    pub fn is_user(&self) -> bool {
        self.persona == Some(Persona::User)
    }
}

impl From<StoredMessage> for RoomMessage {
    fn from(message: StoredMessage) -> Self {
        Self {
            id: Some(message.id),
            persona: Some(message.persona),
            content: Some(message.content),
            is_aborted: Some(message.is_aborted),
        }
    }
}

/// Request to regenerate an assistant turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvokeParams {
    /// Content of the user message being replayed.
    pub message: String,
    pub previous_messages: Vec<RoomMessage>,
    pub has_documents: bool,
    pub system_message_id: Option<String>,
    pub system_message_index: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollBehavior {
    /// Settled messages glide into view.
    Smooth,
    /// Streaming output jumps.
    Instant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationVariant {
    Default,
    Destructive,
}

/// A transient, dismissible notice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub variant: NotificationVariant,
    pub title: String,
    pub description: String,
    pub duration: Duration,
}

impl Notification {
    pub fn fetch_failed(description: impl Into<String>) -> Self {
        Self {
            variant: NotificationVariant::Destructive,
            title: FETCH_ERROR_TITLE.to_string(),
            description: description.into(),
            duration: NOTIFICATION_DURATION,
        }
    }
}

/// Inputs to the view. Every state change goes through one of these.
#[derive(Debug, Clone, PartialEq)]
pub enum RoomAction {
    /// The selected room changed. `initial` marks a room opened by a new chat session.
    SelectRoom { room_id: String, initial: bool },
    /// A (re)fetch of the message list started.
    MessagesRequested,
    MessagesLoaded(Vec<RoomMessage>),
    MessagesFailed(String),
    DocumentsLoaded(Vec<String>),
    DetailsLoaded(RoomDetails),
    /// Current value of the streamed assistant buffer.
    StreamUpdated(String),
    StreamDrained,
    /// Regenerate the assistant message at `index`.
    ReInvoke { index: usize },
    /// The regeneration finished or was abandoned.
    InvocationSettled,
    DismissNotification,
}

/// Side effects the host is asked to perform.
#[derive(Debug, Clone, PartialEq)]
pub enum RoomEffect {
    /// Abort in-flight requests of the previously selected room.
    CancelFetches,
    FetchMessages { room_id: String },
    FetchDocuments { room_id: String },
    /// Load the room's details (truncation points).
    FetchDetails { room_id: String },
    Invoke(InvokeParams),
    ScrollIntoView(ScrollBehavior),
    Notify(Notification),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewState {
    Idle,
    Loading,
    Empty,
    Populated,
    Streaming,
    PopulatedWithPendingReInvoke,
}

/// One message ready to draw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMessage {
    pub key: Option<String>,
    pub role: Persona,
    pub content: String,
    /// Position in the message list; pass back in `RoomAction::ReInvoke`.
    pub index: usize,
    pub is_last: bool,
    pub is_aborted: bool,
    pub is_truncated: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderItem {
    Message(RenderedMessage),
    /// The assistant output currently streaming in.
    Streaming { content: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomRender {
    Nothing,
    LoadingPlaceholders(usize),
    /// Room exists but has no messages yet.
    EmptyRoom,
    Messages(Vec<RenderItem>),
}
