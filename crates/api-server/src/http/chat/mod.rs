use serde::Deserialize;

mod history;
mod purge;
mod send;

pub(super) use history::list_chat;
pub(super) use purge::purge_chat;
pub(super) use send::send_chat;

/// Upper bound on turns returned by `GET /chat`.
const MAX_LISTED_TURNS: i64 = 100;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct SessionQuery {
    #[serde(default)]
    session_id: Option<String>,
}

impl SessionQuery {
    fn trimmed_session_id(&self) -> Option<&str> {
        self.session_id
            .as_deref()
            .map(str::trim)
            .filter(|session_id| !session_id.is_empty())
    }
}
