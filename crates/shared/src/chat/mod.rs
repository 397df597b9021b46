pub mod cache;
pub mod category;
pub mod conversation;
pub mod guard;
pub mod snapshot;

pub use cache::{Clock, SnapshotCache, SystemClock};
pub use category::{CategoryMatch, classify, detect_category_mismatch};
pub use conversation::{HISTORY_WINDOW, PriorTurn, assemble_conversation, prior_turns_from_history};
pub use guard::{AcceptedChatInput, InputRejection, check_chat_input, sanitize_history_entry};
pub use snapshot::{
    PORTFOLIO_SECTIONS, SectionDescriptor, Snapshot, SnapshotBuilder, SnapshotError,
};
