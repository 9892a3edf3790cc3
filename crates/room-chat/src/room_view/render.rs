use crate::room_db::{Persona, RoomDetails};
use crate::room_view::types::{RenderItem, RenderedMessage, RoomMessage, EMPTY_CONTENT};

/// Order the visible messages around the streaming overlay.
///
/// Messages before the pending target come first, then the streamed buffer.
/// While streaming with a pending target, the messages after the target are
/// re-appended with their original indices. The target itself stays hidden
/// until the regeneration settles.
pub fn render_messages(
    messages: &[RoomMessage],
    streamed: &str,
    pending_index: Option<usize>,
    details: Option<&RoomDetails>,
) -> Vec<RenderItem> {
    let streaming = !streamed.is_empty();
    let cut = pending_index.map_or(messages.len(), |i| i.min(messages.len()));

    let mut items: Vec<RenderItem> = messages[..cut]
        .iter()
        .enumerate()
        .map(|(index, message)| {
            let is_last = !streaming && index + 1 == messages.len();
            RenderItem::Message(rendered(message, index, is_last, details))
        })
        .collect();

    if streaming {
        items.push(RenderItem::Streaming {
            content: streamed.to_string(),
        });
        if let Some(target) = pending_index {
            items.extend(
                messages
                    .iter()
                    .enumerate()
                    .skip(target.saturating_add(1))
                    .map(|(index, message)| RenderItem::Message(rendered(message, index, false, details))),
            );
        }
    }
    items
}

fn rendered(message: &RoomMessage, index: usize, is_last: bool, details: Option<&RoomDetails>) -> RenderedMessage {
    RenderedMessage {
        key: message.id.clone(),
        role: message.persona.unwrap_or(Persona::User),
        content: message.content.clone().unwrap_or_else(|| EMPTY_CONTENT.to_string()),
        index,
        is_last,
        is_aborted: message.is_aborted.unwrap_or(false),
        is_truncated: details.is_some_and(|d| d.is_truncated_at(index + 1)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn messages() -> Vec<RoomMessage> {
        vec![
            RoomMessage::new("m0", Persona::User, "hi"),
            RoomMessage::new("m1", Persona::System, "hello"),
            RoomMessage::new("m2", Persona::User, "bye"),
            RoomMessage::new("m3", Persona::System, "later"),
        ]
    }

    fn indices(items: &[RenderItem]) -> Vec<Option<usize>> {
        items
            .iter()
            .map(|item| match item {
                RenderItem::Message(m) => Some(m.index),
                RenderItem::Streaming { .. } => None,
            })
            .collect()
    }

    #[test]
    fn test_plain_list_marks_final_message_last() {
        let items = render_messages(&messages(), "", None, None);
        assert_eq!(indices(&items), vec![Some(0), Some(1), Some(2), Some(3)]);
        let last: Vec<bool> = items
            .iter()
            .map(|i| matches!(i, RenderItem::Message(m) if m.is_last))
            .collect();
        assert_eq!(last, vec![false, false, false, true]);
    }

    #[test]
    fn test_stream_without_pending_target_renders_last() {
        let items = render_messages(&messages(), "typing", None, None);
        assert_eq!(indices(&items), vec![Some(0), Some(1), Some(2), Some(3), None]);
        assert_eq!(items[4], RenderItem::Streaming { content: "typing".into() });
        assert!(items.iter().all(|i| !matches!(i, RenderItem::Message(m) if m.is_last)));
    }

    #[test]
    fn test_stream_replaces_pending_target_in_place() {
        let items = render_messages(&messages(), "again", Some(1), None);
        assert_eq!(indices(&items), vec![Some(0), None, Some(2), Some(3)]);
    }

    #[test]
    fn test_pending_target_hidden_before_stream_starts() {
        let items = render_messages(&messages(), "", Some(1), None);
        assert_eq!(indices(&items), vec![Some(0)]);
    }

    #[test]
    fn test_pending_target_past_end_while_streaming() {
        let items = render_messages(&messages(), "again", Some(usize::MAX), None);
        assert_eq!(indices(&items), vec![Some(0), Some(1), Some(2), Some(3), None]);

        let items = render_messages(&messages(), "again", Some(4), None);
        assert_eq!(indices(&items), vec![Some(0), Some(1), Some(2), Some(3), None]);
    }

    #[test]
    fn test_defaults_for_missing_fields() {
        let items = render_messages(&[RoomMessage::default()], "", None, None);
        match &items[0] {
            RenderItem::Message(m) => {
                assert_eq!(m.role, Persona::User);
                assert_eq!(m.content, EMPTY_CONTENT);
                assert_eq!(m.key, None);
                assert!(!m.is_aborted);
                assert!(m.is_last);
            }
            other => panic!("unexpected item {:?}", other),
        }
    }

    #[test]
    fn test_truncation_marker_uses_one_based_position() {
        let details = RoomDetails { truncate_indexes: vec![2] };
        let items = render_messages(&messages(), "", None, Some(&details));
        let truncated: Vec<bool> = items
            .iter()
            .map(|i| matches!(i, RenderItem::Message(m) if m.is_truncated))
            .collect();
        assert_eq!(truncated, vec![false, true, false, false]);
    }
}
