pub mod api;
pub mod config;
pub mod metrics;
pub mod retrieval;
pub mod room_db;
pub mod room_view;
pub mod server;
pub mod shared_state;
pub mod telemetry;

// Public API exports
pub use config::Config;
pub use room_db::{Persona, RoomDatabase, RoomDetails};
pub use room_view::{RoomAction, RoomEffect, RoomRender, RoomView, ViewState};
pub use server::{build_router, run_server};
pub use shared_state::AppState;

// API exports
pub use api::{
    documents_api::{get_documents, DocumentsGetResponse},
    messages_api::{abort_message, get_messages, MessagesGetResponse},
    room_api::{get_room, truncate_room},
    ApiError,
};
pub use retrieval::{fetch_document_titles, DocumentQueryError, DocumentSource, MetadataFilter};
