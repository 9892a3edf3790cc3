//! Client-side room reconciliation.
//!
//! `RoomView` owns everything the message pane shows for one room: the
//! fetched messages and documents, the streamed assistant buffer and the
//! pending regeneration. The host feeds it `RoomAction`s and executes the
//! `RoomEffect`s it returns; rendering is a pure function of the state.

pub mod reinvoke;
pub mod render;
pub mod types;

pub use reinvoke::build_invocation;
pub use render::render_messages;
pub use types::*;

use std::time::Duration;
use tracing::{debug, warn};

use crate::room_db::RoomDetails;

#[derive(Debug, Default)]
pub struct RoomView {
    room_id: Option<String>,
    initial: bool,
    /// `None` until the first fetch for the room resolves.
    messages: Option<Vec<RoomMessage>>,
    documents: Vec<String>,
    details: Option<RoomDetails>,
    streamed: String,
    pending: Option<InvokeParams>,
    fetching: bool,
    notification: Option<Notification>,
}

impl RoomView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dispatch(&mut self, action: RoomAction) -> Vec<RoomEffect> {
        match action {
            RoomAction::SelectRoom { room_id, initial } => self.select_room(room_id, initial),
            RoomAction::MessagesRequested => {
                if self.room_id.is_some() {
                    self.fetching = true;
                }
                Vec::new()
            }
            RoomAction::MessagesLoaded(messages) => {
                self.fetching = false;
                let changed = self.messages.as_ref() != Some(&messages);
                self.messages = Some(messages);
                if changed {
                    vec![RoomEffect::ScrollIntoView(ScrollBehavior::Smooth)]
                } else {
                    Vec::new()
                }
            }
            RoomAction::MessagesFailed(description) => {
                self.fetching = false;
                warn!("Fetching messages failed: {}", description);
                let notification = Notification::fetch_failed(description);
                self.notification = Some(notification.clone());
                vec![RoomEffect::Notify(notification)]
            }
            RoomAction::DocumentsLoaded(documents) => {
                self.documents = documents;
                Vec::new()
            }
            RoomAction::DetailsLoaded(details) => {
                self.details = Some(details);
                Vec::new()
            }
            RoomAction::StreamUpdated(content) => {
                if content == self.streamed {
                    return Vec::new();
                }
                self.streamed = content;
                if self.streamed.is_empty() {
                    Vec::new()
                } else {
                    vec![RoomEffect::ScrollIntoView(ScrollBehavior::Instant)]
                }
            }
            RoomAction::StreamDrained => {
                self.streamed.clear();
                Vec::new()
            }
            RoomAction::ReInvoke { index } => self.re_invoke(index),
            RoomAction::InvocationSettled => {
                self.pending = None;
                Vec::new()
            }
            RoomAction::DismissNotification => {
                self.notification = None;
                Vec::new()
            }
        }
    }

    fn select_room(&mut self, room_id: String, initial: bool) -> Vec<RoomEffect> {
        if self.room_id.as_deref() == Some(room_id.as_str()) {
            if self.initial == initial {
                return Vec::new();
            }
            // The session flag is part of the message query, so a change refetches.
            self.initial = initial;
            self.fetching = true;
            return vec![RoomEffect::FetchMessages { room_id }];
        }

        let had_room = self.room_id.is_some();
        *self = Self::default();

        let mut effects = Vec::new();
        if had_room {
            effects.push(RoomEffect::CancelFetches);
        }
        if room_id.is_empty() {
            return effects;
        }

        debug!("Selected room {}", room_id);
        self.room_id = Some(room_id.clone());
        self.initial = initial;
        self.fetching = true;
        effects.push(RoomEffect::FetchMessages { room_id: room_id.clone() });
        effects.push(RoomEffect::FetchDocuments { room_id: room_id.clone() });
        effects.push(RoomEffect::FetchDetails { room_id });
        effects
    }

    fn re_invoke(&mut self, index: usize) -> Vec<RoomEffect> {
        let messages = match self.messages.as_deref() {
            Some(messages) if !messages.is_empty() => messages,
            _ => return Vec::new(),
        };
        match build_invocation(messages, index, self.details.as_ref(), !self.documents.is_empty()) {
            Some(params) => {
                debug!("Regenerating message {}", index);
                self.pending = Some(params.clone());
                vec![RoomEffect::Invoke(params)]
            }
            None => Vec::new(),
        }
    }

    pub fn state(&self) -> ViewState {
        if self.room_id.is_none() {
            return ViewState::Idle;
        }
        if self.pending.is_some() {
            return ViewState::PopulatedWithPendingReInvoke;
        }
        if !self.streamed.is_empty() {
            return ViewState::Streaming;
        }
        match self.messages.as_deref() {
            Some(messages) if !messages.is_empty() => ViewState::Populated,
            _ if self.fetching => ViewState::Loading,
            _ => ViewState::Empty,
        }
    }

    pub fn render(&self) -> RoomRender {
        if self.room_id.is_none() {
            return RoomRender::Nothing;
        }
        match self.messages.as_deref() {
            Some(messages) if !messages.is_empty() => RoomRender::Messages(render_messages(
                messages,
                &self.streamed,
                self.pending.as_ref().map(|p| p.system_message_index),
                self.details.as_ref(),
            )),
            _ if self.fetching => RoomRender::LoadingPlaceholders(LOADING_PLACEHOLDER_COUNT),
            _ => RoomRender::EmptyRoom,
        }
    }

    /// How often the host should refetch the message list, if at all.
    pub fn refetch_interval(&self) -> Option<Duration> {
        match &self.messages {
            Some(messages) if self.initial && messages.len() < 2 => Some(INITIAL_REFETCH_INTERVAL),
            _ => None,
        }
    }

    pub fn room_id(&self) -> Option<&str> {
        self.room_id.as_deref()
    }

    pub fn messages(&self) -> &[RoomMessage] {
        self.messages.as_deref().unwrap_or_default()
    }

    pub fn documents(&self) -> &[String] {
        &self.documents
    }

    pub fn pending_invocation(&self) -> Option<&InvokeParams> {
        self.pending.as_ref()
    }

    pub fn notification(&self) -> Option<&Notification> {
        self.notification.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::room_db::Persona;

    fn conversation() -> Vec<RoomMessage> {
        vec![
            RoomMessage::new("m0", Persona::User, "hi"),
            RoomMessage::new("m1", Persona::System, "hello"),
            RoomMessage::new("m2", Persona::User, "bye"),
            RoomMessage::new("m3", Persona::System, "later"),
        ]
    }

    fn open(room_id: &str) -> RoomView {
        let mut view = RoomView::new();
        view.dispatch(RoomAction::SelectRoom { room_id: room_id.into(), initial: false });
        view
    }

    fn populated() -> RoomView {
        let mut view = open("room-1");
        view.dispatch(RoomAction::MessagesLoaded(conversation()));
        view
    }

    #[test]
    fn test_select_room_fetches_room_data() {
        let mut view = RoomView::new();
        assert_eq!(view.state(), ViewState::Idle);
        assert_eq!(view.render(), RoomRender::Nothing);

        let effects = view.dispatch(RoomAction::SelectRoom { room_id: "r".into(), initial: false });
        assert_eq!(
            effects,
            vec![
                RoomEffect::FetchMessages { room_id: "r".into() },
                RoomEffect::FetchDocuments { room_id: "r".into() },
                RoomEffect::FetchDetails { room_id: "r".into() },
            ]
        );
        assert_eq!(view.state(), ViewState::Loading);
        assert_eq!(view.render(), RoomRender::LoadingPlaceholders(3));
    }

    #[test]
    fn test_empty_room_id_stays_idle() {
        let mut view = RoomView::new();
        assert!(view.dispatch(RoomAction::SelectRoom { room_id: String::new(), initial: false }).is_empty());
        assert_eq!(view.state(), ViewState::Idle);
    }

    #[test]
    fn test_loaded_messages_populate_and_scroll() {
        let mut view = open("r");
        let effects = view.dispatch(RoomAction::MessagesLoaded(conversation()));
        assert_eq!(effects, vec![RoomEffect::ScrollIntoView(ScrollBehavior::Smooth)]);
        assert_eq!(view.state(), ViewState::Populated);

        // An identical refetch does not scroll again.
        view.dispatch(RoomAction::MessagesRequested);
        assert!(view.dispatch(RoomAction::MessagesLoaded(conversation())).is_empty());
    }

    #[test]
    fn test_empty_result_shows_placeholder() {
        let mut view = open("r");
        view.dispatch(RoomAction::MessagesLoaded(Vec::new()));
        assert_eq!(view.state(), ViewState::Empty);
        assert_eq!(view.render(), RoomRender::EmptyRoom);

        view.dispatch(RoomAction::MessagesRequested);
        assert_eq!(view.render(), RoomRender::LoadingPlaceholders(LOADING_PLACEHOLDER_COUNT));
    }

    #[test]
    fn test_fetch_error_notifies_and_keeps_messages() {
        let mut view = populated();
        view.dispatch(RoomAction::MessagesRequested);
        let effects = view.dispatch(RoomAction::MessagesFailed("network down".into()));

        match effects.as_slice() {
            [RoomEffect::Notify(n)] => {
                assert_eq!(n.variant, NotificationVariant::Destructive);
                assert_eq!(n.description, "network down");
                assert_eq!(n.duration, Duration::from_millis(2000));
            }
            other => panic!("unexpected effects {:?}", other),
        }
        assert_eq!(view.messages().len(), 4);
        assert_eq!(view.state(), ViewState::Populated);

        view.dispatch(RoomAction::DismissNotification);
        assert!(view.notification().is_none());
    }

    #[test]
    fn test_stream_round_trip() {
        let mut view = populated();
        let effects = view.dispatch(RoomAction::StreamUpdated("par".into()));
        assert_eq!(effects, vec![RoomEffect::ScrollIntoView(ScrollBehavior::Instant)]);
        assert_eq!(view.state(), ViewState::Streaming);

        match view.render() {
            RoomRender::Messages(items) => {
                assert_eq!(items.len(), 5);
                assert_eq!(items[4], RenderItem::Streaming { content: "par".into() });
            }
            other => panic!("unexpected render {:?}", other),
        }

        view.dispatch(RoomAction::StreamDrained);
        assert_eq!(view.state(), ViewState::Populated);
    }

    #[test]
    fn test_reinvoke_emits_invocation_and_pends() {
        let mut view = populated();
        view.dispatch(RoomAction::DocumentsLoaded(vec!["Guide".into()]));

        let effects = view.dispatch(RoomAction::ReInvoke { index: 3 });
        let expected = InvokeParams {
            message: "bye".into(),
            previous_messages: conversation()[0..2].to_vec(),
            has_documents: true,
            system_message_id: Some("m3".into()),
            system_message_index: 3,
        };
        assert_eq!(effects, vec![RoomEffect::Invoke(expected.clone())]);
        assert_eq!(view.pending_invocation(), Some(&expected));

        view.dispatch(RoomAction::StreamUpdated("new answer".into()));
        assert_eq!(view.state(), ViewState::PopulatedWithPendingReInvoke);

        view.dispatch(RoomAction::StreamDrained);
        view.dispatch(RoomAction::InvocationSettled);
        assert_eq!(view.state(), ViewState::Populated);
    }

    #[test]
    fn test_reinvoke_uses_truncation_details() {
        let mut view = populated();
        view.dispatch(RoomAction::DetailsLoaded(RoomDetails { truncate_indexes: vec![1] }));
        match view.dispatch(RoomAction::ReInvoke { index: 3 }).as_slice() {
            [RoomEffect::Invoke(params)] => {
                assert_eq!(params.previous_messages, conversation()[1..2].to_vec());
                assert!(!params.has_documents);
            }
            other => panic!("unexpected effects {:?}", other),
        }
    }

    #[test]
    fn test_reinvoke_without_messages_is_noop() {
        let mut view = open("r");
        assert!(view.dispatch(RoomAction::ReInvoke { index: 0 }).is_empty());
        view.dispatch(RoomAction::MessagesLoaded(Vec::new()));
        assert!(view.dispatch(RoomAction::ReInvoke { index: 0 }).is_empty());
        assert!(view.pending_invocation().is_none());
    }

    #[test]
    fn test_initial_session_polls_until_two_messages() {
        let mut view = RoomView::new();
        view.dispatch(RoomAction::SelectRoom { room_id: "r".into(), initial: true });
        assert_eq!(view.refetch_interval(), None);

        view.dispatch(RoomAction::MessagesLoaded(conversation()[..1].to_vec()));
        assert_eq!(view.refetch_interval(), Some(Duration::from_millis(1000)));

        view.dispatch(RoomAction::MessagesLoaded(conversation()[..2].to_vec()));
        assert_eq!(view.refetch_interval(), None);

        let mut view = open("r");
        view.dispatch(RoomAction::MessagesLoaded(Vec::new()));
        assert_eq!(view.refetch_interval(), None);
    }

    #[test]
    fn test_room_change_resets_state() {
        let mut view = populated();
        view.dispatch(RoomAction::DocumentsLoaded(vec!["Doc".into()]));
        view.dispatch(RoomAction::DetailsLoaded(RoomDetails { truncate_indexes: vec![1] }));
        view.dispatch(RoomAction::StreamUpdated("x".into()));
        view.dispatch(RoomAction::ReInvoke { index: 1 });

        let effects = view.dispatch(RoomAction::SelectRoom { room_id: "room-2".into(), initial: false });
        assert_eq!(
            effects,
            vec![
                RoomEffect::CancelFetches,
                RoomEffect::FetchMessages { room_id: "room-2".into() },
                RoomEffect::FetchDocuments { room_id: "room-2".into() },
                RoomEffect::FetchDetails { room_id: "room-2".into() },
            ]
        );
        assert_eq!(view.room_id(), Some("room-2"));
        assert!(view.messages().is_empty());
        assert!(view.documents().is_empty());
        assert!(view.pending_invocation().is_none());
        assert_eq!(view.state(), ViewState::Loading);

        // Truncation points of the old room no longer apply.
        view.dispatch(RoomAction::MessagesLoaded(conversation()));
        match view.dispatch(RoomAction::ReInvoke { index: 3 }).as_slice() {
            [RoomEffect::Invoke(params)] => assert_eq!(params.previous_messages, conversation()[0..2].to_vec()),
            other => panic!("unexpected effects {:?}", other),
        }
    }

    #[test]
    fn test_session_flag_change_refetches_messages() {
        let mut view = populated();
        let effects = view.dispatch(RoomAction::SelectRoom { room_id: "room-1".into(), initial: true });
        assert_eq!(effects, vec![RoomEffect::FetchMessages { room_id: "room-1".into() }]);
        assert_eq!(view.messages().len(), 4);

        view.dispatch(RoomAction::MessagesLoaded(conversation()[..1].to_vec()));
        assert_eq!(view.refetch_interval(), Some(INITIAL_REFETCH_INTERVAL));
    }

    #[test]
    fn test_first_fetch_failure_shows_empty_room() {
        let mut view = open("r");
        view.dispatch(RoomAction::MessagesFailed("offline".into()));
        assert_eq!(view.state(), ViewState::Empty);
        assert_eq!(view.render(), RoomRender::EmptyRoom);

        view.dispatch(RoomAction::MessagesRequested);
        assert_eq!(view.state(), ViewState::Loading);
        assert_eq!(view.render(), RoomRender::LoadingPlaceholders(LOADING_PLACEHOLDER_COUNT));
    }

    #[test]
    fn test_past_end_reinvoke_streams_after_last_message() {
        let mut view = open("r");
        view.dispatch(RoomAction::MessagesLoaded(conversation()[..2].to_vec()));
        match view.dispatch(RoomAction::ReInvoke { index: usize::MAX }).as_slice() {
            [RoomEffect::Invoke(params)] => assert_eq!(params.system_message_index, 2),
            other => panic!("unexpected effects {:?}", other),
        }

        view.dispatch(RoomAction::StreamUpdated("x".into()));
        match view.render() {
            RoomRender::Messages(items) => {
                assert_eq!(items.len(), 3);
                assert_eq!(items[2], RenderItem::Streaming { content: "x".into() });
            }
            other => panic!("unexpected render {:?}", other),
        }
    }

    #[test]
    fn test_reselecting_same_room_keeps_state() {
        let mut view = populated();
        assert!(view
            .dispatch(RoomAction::SelectRoom { room_id: "room-1".into(), initial: false })
            .is_empty());
        assert_eq!(view.messages().len(), 4);
    }
}
