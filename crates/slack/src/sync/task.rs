//! Units of scheduled work
//!
//! Executing a task performs exactly one API call, emits zero or more
//! records, may advance a bookmark, and returns the follow-up tasks it
//! discovered. Tasks are immutable: each pagination step is a new task.

use anyhow::{Context, Result};
use log::info;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use super::SyncContext;
use crate::api::responses::{
    ConversationHistory, ConversationMembers, ConversationsList, EmojiList, FilesList, TeamInfo,
    UserGroupUsers, UserGroupsList, UsersList, next_cursor,
};
use crate::models::{
    FILES_KEY, Record, epoch_seconds, flag, history_key, message_id, record_id,
};

/// Conversation types requested from `conversations.list`
pub const CHANNEL_TYPES: &str = "public_channel,private_channel,mpim,im";

/// Files are synced in fixed windows of this many seconds (7 days)
pub const FILES_WINDOW_SECS: f64 = 7.0 * 24.0 * 60.0 * 60.0;

/// One schedulable API call plus its side effects
#[derive(Debug, Clone, PartialEq)]
pub enum Task {
    /// A page of conversations (`conversations.list`)
    ListChannels { cursor: Option<String> },

    /// A page of one channel's member ids, carrying the ids gathered so far
    MembersOfChannel {
        channel_id: String,
        channel: Record,
        members: Vec<Value>,
        cursor: Option<String>,
    },

    /// A page of one channel's messages newer than `oldest`
    ///
    /// `oldest` is fixed when the first page is scheduled and carried
    /// unchanged through every continuation.
    ChannelHistory {
        channel_id: String,
        oldest: f64,
        cursor: Option<String>,
    },

    /// One page of files created within `[ts_from, ts_to]`
    ListFiles {
        ts_from: f64,
        ts_to: f64,
        page: u32,
        /// Latest creation time seen on earlier pages of this window
        max_created: Option<f64>,
    },

    TeamInfo,

    ListEmoji,

    ListUserGroups,

    MembersOfUserGroup { group_id: String, group: Record },

    ListUsers { cursor: Option<String> },
}

impl Task {
    pub fn list_channels() -> Self {
        Task::ListChannels { cursor: None }
    }

    pub fn list_users() -> Self {
        Task::ListUsers { cursor: None }
    }

    /// First history page for a channel, starting at its bookmark
    pub fn channel_history(ctx: &SyncContext<'_>, channel_id: impl Into<String>) -> Self {
        let channel_id = channel_id.into();
        let oldest = ctx.bookmarks().get(&history_key(&channel_id));
        Task::ChannelHistory {
            channel_id,
            oldest,
            cursor: None,
        }
    }

    /// First page of the file window starting at `ts_from`
    ///
    /// The window ends 7 days later or at the sync epoch, whichever is first.
    pub fn files_window(ts_from: f64, sync_epoch: f64) -> Self {
        Task::ListFiles {
            ts_from,
            ts_to: sync_epoch.min(ts_from + FILES_WINDOW_SECS),
            page: 1,
            max_created: None,
        }
    }

    /// Slack Web API method this task calls
    pub fn method(&self) -> &'static str {
        match self {
            Task::ListChannels { .. } => "conversations.list",
            Task::MembersOfChannel { .. } => "conversations.members",
            Task::ChannelHistory { .. } => "conversations.history",
            Task::ListFiles { .. } => "files.list",
            Task::TeamInfo => "team.info",
            Task::ListEmoji => "emoji.list",
            Task::ListUserGroups => "usergroups.list",
            Task::MembersOfUserGroup { .. } => "usergroups.users.list",
            Task::ListUsers { .. } => "users.list",
        }
    }

    /// Query parameters for this task's call (the token is added by the client)
    pub fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        match self {
            Task::ListChannels { cursor } => {
                params.push(("types", CHANNEL_TYPES.to_string()));
                push_cursor(&mut params, cursor);
            }
            Task::MembersOfChannel {
                channel_id, cursor, ..
            } => {
                params.push(("channel", channel_id.clone()));
                push_cursor(&mut params, cursor);
            }
            Task::ChannelHistory {
                channel_id,
                oldest,
                cursor,
            } => {
                params.push(("channel", channel_id.clone()));
                // `oldest` is exclusive upstream; ask from a second earlier
                params.push(("oldest", (oldest - 1.0).to_string()));
                push_cursor(&mut params, cursor);
            }
            Task::ListFiles {
                ts_from,
                ts_to,
                page,
                ..
            } => {
                params.push(("page", page.to_string()));
                params.push(("ts_from", ts_from.to_string()));
                params.push(("ts_to", ts_to.to_string()));
            }
            Task::MembersOfUserGroup { group_id, .. } => {
                params.push(("usergroup", group_id.clone()));
            }
            Task::ListUsers { cursor } => {
                params.push(("include_locale", "true".to_string()));
                push_cursor(&mut params, cursor);
            }
            Task::TeamInfo | Task::ListEmoji | Task::ListUserGroups => {}
        }
        params
    }

    /// Perform the call and process the response
    ///
    /// Returns follow-up tasks in the order they were discovered.
    pub fn execute(&self, ctx: &mut SyncContext<'_>) -> Result<Vec<Task>> {
        let method = self.method();
        let body = ctx.api().call(method, &self.params())?;

        match self {
            Task::ListChannels { .. } => list_channels(ctx, decode(method, body)?),
            Task::MembersOfChannel {
                channel_id,
                channel,
                members,
                ..
            } => members_of_channel(ctx, channel_id, channel, members, decode(method, body)?),
            Task::ChannelHistory {
                channel_id, oldest, ..
            } => channel_history(ctx, channel_id, *oldest, decode(method, body)?),
            Task::ListFiles {
                ts_from,
                ts_to,
                page,
                max_created,
            } => list_files(
                ctx,
                (*ts_from, *ts_to),
                *page,
                *max_created,
                decode(method, body)?,
            ),
            Task::TeamInfo => team_info(ctx, decode(method, body)?),
            Task::ListEmoji => list_emoji(ctx, decode(method, body)?),
            Task::ListUserGroups => list_user_groups(decode(method, body)?),
            Task::MembersOfUserGroup { group, .. } => {
                members_of_user_group(ctx, group, decode(method, body)?)
            }
            Task::ListUsers { .. } => list_users(ctx, decode(method, body)?),
        }
    }
}

fn push_cursor(params: &mut Vec<(&'static str, String)>, cursor: &Option<String>) {
    if let Some(cursor) = cursor {
        params.push(("cursor", cursor.clone()));
    }
}

fn decode<T: DeserializeOwned>(method: &str, body: Value) -> Result<T> {
    serde_json::from_value(body).with_context(|| format!("Unexpected {} response", method))
}

fn list_channels(ctx: &mut SyncContext<'_>, page: ConversationsList) -> Result<Vec<Task>> {
    info!("Got {} channels", page.channels.len());
    let mut follow_ups = Vec::new();

    for channel in page.channels {
        let channel_id = record_id(&channel, "channel")?.to_string();
        if flag(&channel, "is_im") {
            ctx.emit_record("im", channel)?;
            follow_ups.push(Task::channel_history(ctx, channel_id));
        } else {
            // Emitted as a conversation once its members are known
            follow_ups.push(Task::MembersOfChannel {
                channel_id,
                channel,
                members: Vec::new(),
                cursor: None,
            });
        }
    }

    if let Some(cursor) = next_cursor(&page.response_metadata) {
        follow_ups.push(Task::ListChannels {
            cursor: Some(cursor),
        });
    }
    Ok(follow_ups)
}

fn members_of_channel(
    ctx: &mut SyncContext<'_>,
    channel_id: &str,
    channel: &Record,
    members_so_far: &[Value],
    page: ConversationMembers,
) -> Result<Vec<Task>> {
    let mut members = members_so_far.to_vec();
    members.extend(page.members);

    if let Some(cursor) = next_cursor(&page.response_metadata) {
        return Ok(vec![Task::MembersOfChannel {
            channel_id: channel_id.to_string(),
            channel: channel.clone(),
            members,
            cursor: Some(cursor),
        }]);
    }

    let mut conversation = channel.clone();
    conversation.insert("members".to_string(), Value::Array(members));
    ctx.emit_record("conversation", conversation)?;
    Ok(vec![Task::channel_history(ctx, channel_id)])
}

fn channel_history(
    ctx: &mut SyncContext<'_>,
    channel_id: &str,
    oldest: f64,
    page: ConversationHistory,
) -> Result<Vec<Task>> {
    info!("Got {} messages", page.messages.len());
    let bookmark_key = history_key(channel_id);

    // Newest first upstream; walk oldest first so the bookmark never passes
    // a message that has not been emitted yet
    for mut message in page.messages.into_iter().rev() {
        let ts = epoch_seconds(&message, "ts")
            .with_context(|| format!("Bad message in channel {}", channel_id))?;
        if ts < oldest {
            continue;
        }

        message.insert("id".to_string(), json!(message_id(channel_id, ts)));
        message.insert("channelId".to_string(), json!(channel_id));
        message.insert("ts".to_string(), json!(ts));
        ctx.emit_record("message", message)?;
        ctx.update_bookmark(&bookmark_key, ts)?;
    }

    Ok(next_cursor(&page.response_metadata)
        .map(|cursor| Task::ChannelHistory {
            channel_id: channel_id.to_string(),
            oldest,
            cursor: Some(cursor),
        })
        .into_iter()
        .collect())
}

fn list_files(
    ctx: &mut SyncContext<'_>,
    (ts_from, ts_to): (f64, f64),
    page_number: u32,
    max_created: Option<f64>,
    page: FilesList,
) -> Result<Vec<Task>> {
    info!("Got {} files", page.files.len());
    let mut max_created = max_created;

    for file in page.files {
        let created = epoch_seconds(&file, "created").context("Bad file record")?;
        max_created = Some(max_created.map_or(created, |max| max.max(created)));
        ctx.emit_record("file", file)?;
    }

    // Mid-window: the window is not complete, leave the bookmark alone
    if page.paging.page < page.paging.pages {
        return Ok(vec![Task::ListFiles {
            ts_from,
            ts_to,
            page: page_number + 1,
            max_created,
        }]);
    }

    let mut follow_ups = Vec::new();
    if ts_to < ctx.sync_epoch() {
        follow_ups.push(Task::files_window(ts_to, ctx.sync_epoch()));
    }
    if let Some(max) = max_created {
        ctx.update_bookmark(FILES_KEY, max)?;
    }
    Ok(follow_ups)
}

fn team_info(ctx: &mut SyncContext<'_>, response: TeamInfo) -> Result<Vec<Task>> {
    ctx.emit_record("team", response.team)?;
    Ok(Vec::new())
}

fn list_emoji(ctx: &mut SyncContext<'_>, response: EmojiList) -> Result<Vec<Task>> {
    info!("Got {} emoji", response.emoji.len());
    for (name, url) in response.emoji {
        let mut record = Record::new();
        record.insert("id".to_string(), Value::String(name.clone()));
        record.insert("name".to_string(), Value::String(name));
        record.insert("url".to_string(), url);
        ctx.emit_record("emoji", record)?;
    }
    Ok(Vec::new())
}

fn list_user_groups(response: UserGroupsList) -> Result<Vec<Task>> {
    info!("Got {} usergroups", response.usergroups.len());
    response
        .usergroups
        .into_iter()
        .map(|group| -> Result<Task> {
            let group_id = record_id(&group, "usergroup")?.to_string();
            Ok(Task::MembersOfUserGroup { group_id, group })
        })
        .collect()
}

fn members_of_user_group(
    ctx: &mut SyncContext<'_>,
    group: &Record,
    response: UserGroupUsers,
) -> Result<Vec<Task>> {
    let mut usergroup = group.clone();
    usergroup.insert("users".to_string(), Value::Array(response.users));
    ctx.emit_record("usergroup", usergroup)?;
    Ok(Vec::new())
}

fn list_users(ctx: &mut SyncContext<'_>, page: UsersList) -> Result<Vec<Task>> {
    info!("Got {} users", page.members.len());
    for user in page.members {
        ctx.emit_record("user", user)?;
    }

    Ok(next_cursor(&page.response_metadata)
        .map(|cursor| Task::ListUsers {
            cursor: Some(cursor),
        })
        .into_iter()
        .collect())
}
