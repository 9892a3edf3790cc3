use crate::room_db::RoomDetails;
use crate::room_view::types::{InvokeParams, RoomMessage};

/// Build the request that regenerates the assistant message at `index`.
///
/// Replays the nearest user message before `index` with the context between
/// the last truncation point and that user message. Returns `None` when the
/// list is empty or no user message precedes `index`. An index past the end
/// is clamped to the list length.
pub fn build_invocation(
    messages: &[RoomMessage],
    index: usize,
    details: Option<&RoomDetails>,
    has_documents: bool,
) -> Option<InvokeParams> {
    if messages.is_empty() {
        return None;
    }

    let scan_end = index.min(messages.len());
    let user_index = (0..scan_end).rev().find(|&i| messages[i].is_user())?;
    let user_message = &messages[user_index];

    let truncated_at = details.map(RoomDetails::truncation_point).unwrap_or(0);
    let previous_messages = if user_index > 0 && truncated_at < user_index {
        messages[truncated_at..user_index].to_vec()
    } else {
        Vec::new()
    };

    Some(InvokeParams {
        message: user_message.content.clone().unwrap_or_default(),
        previous_messages,
        has_documents,
        system_message_id: messages.get(index).and_then(|m| m.id.clone()),
        system_message_index: scan_end,
    })
}
