//! The authorized user's chat list.
//!
//! One `getChats` for the identifiers, then one `getChat` per identifier, all
//! in flight at once. A failed detail fetch drops that chat; a failed list
//! fetch fails the whole thing.

use std::fmt;

use futures::future::join_all;
use serde_json::Value;

use crate::errors::InvocationError;
use crate::functions::{type_tag, GetChat, GetChats, Response};
use crate::invoker::Invoker;
use crate::session::SessionContext;

// ─── ChatKind ────────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChatKind {
    Private { user_id: i64 },
    Secret { user_id: i64 },
    BasicGroup,
    Supergroup { is_channel: bool },
    /// Unrecognized or missing `type`, by tag.
    Unknown(Option<String>),
}

impl ChatKind {
    /// Read the `type` object of a chat.
    pub fn from_value(ty: Option<&Value>) -> Self {
        let Some(ty) = ty else { return Self::Unknown(None) };
        let user_id = ty.get("user_id").and_then(chat_id);
        match (type_tag(ty), user_id) {
            (Some("chatTypeSecret"), Some(user_id))    => Self::Secret { user_id },
            (Some("chatTypePrivate") | None, Some(user_id)) => Self::Private { user_id },
            (Some("chatTypeBasicGroup"), _)            => Self::BasicGroup,
            (Some("chatTypeSupergroup"), _)            => Self::Supergroup {
                is_channel: ty.get("is_channel").and_then(Value::as_bool).unwrap_or(false),
            },
            (tag, _)                                   => Self::Unknown(tag.map(str::to_string)),
        }
    }

    /// The other user, for one-on-one chats.
    pub fn private_user(&self) -> Option<i64> {
        match self {
            Self::Private { user_id } | Self::Secret { user_id } => Some(*user_id),
            _ => None,
        }
    }
}

// ─── ChatSummary ──────────────────────────────────────────────────────────────

/// What the chat list shows for one chat.
#[derive(Clone, Debug, PartialEq)]
pub struct ChatSummary {
    pub id:    i64,
    /// The chat's own title; `None` when missing or blank.
    pub title: Option<String>,
    pub kind:  ChatKind,
}

impl ChatSummary {
    /// Build from a `getChat` payload. `requested_id` stands in for a missing `id`.
    pub fn from_detail(requested_id: i64, detail: &Value) -> Self {
        Self {
            id:    detail.get("id").and_then(chat_id).unwrap_or(requested_id),
            title: detail
                .get("title")
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string),
            kind:  ChatKind::from_value(detail.get("type")),
        }
    }

    /// The title, or a synthesized one.
    pub fn display_title(&self) -> String {
        if let Some(title) = &self.title {
            return title.clone();
        }
        match self.kind.private_user() {
            Some(user_id) => format!("private chat with user {user_id}"),
            None          => format!("chat {}", self.id),
        }
    }
}

impl fmt::Display for ChatSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (id: {})", self.display_title(), self.id)
    }
}

/// Chat ids arrive as numbers, or as strings when they exceed 2^53.
fn chat_id(v: &Value) -> Option<i64> {
    v.as_i64().or_else(|| v.as_str().and_then(|s| s.parse().ok()))
}

// ─── ChatCatalog ──────────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug)]
pub struct ChatCatalog {
    limit: i32,
}

impl ChatCatalog {
    pub fn new(limit: i32) -> Self {
        Self { limit }
    }

    /// Fetch the chat list. Requires an authorized session.
    pub async fn fetch(&self, context: &SessionContext) -> Result<Vec<ChatSummary>, InvocationError> {
        if !context.is_authorized() {
            return Err(InvocationError::Unauthorized);
        }
        let invoker = context.invoker()?;

        let ids = self.list(invoker).await?;
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        tracing::debug!("[layer-tdweb] fetching {} chat details", ids.len());

        let details = join_all(ids.iter().map(|&id| detail(invoker, id))).await;
        Ok(details.into_iter().flatten().collect())
    }

    async fn list(&self, invoker: &Invoker) -> Result<Vec<i64>, InvocationError> {
        let payload = match invoker.call(&GetChats::first_page(self.limit)).await? {
            Response::Payload(v) => v,
            Response::Error(e)   => return Err(e.into()),
            Response::Empty      => return Ok(Vec::new()),
        };
        let ids: Vec<i64> = payload
            .get("chat_ids")
            .and_then(Value::as_array)
            .map(|ids| ids.iter().filter_map(chat_id).collect())
            .unwrap_or_default();
        Ok(ids)
    }
}

async fn detail(invoker: &Invoker, id: i64) -> Option<ChatSummary> {
    match invoker.call(&GetChat { chat_id: id }).await {
        Ok(Response::Payload(v)) => Some(ChatSummary::from_detail(id, &v)),
        Ok(Response::Error(e))   => {
            tracing::debug!("[layer-tdweb] getChat {id} failed: {e}");
            None
        }
        Ok(Response::Empty) => {
            tracing::debug!("[layer-tdweb] getChat {id} returned nothing");
            None
        }
        Err(e) => {
            tracing::debug!("[layer-tdweb] getChat {id} failed: {e}");
            None
        }
    }
}
