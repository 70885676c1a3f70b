//! Slack Web API integration
//!
//! This module provides:
//! - Blocking HTTP client with rate-limit handling
//! - The `SlackApi` seam that tasks issue requests through
//! - Typed envelopes for the paginated responses the tasks consume

mod client;

pub use client::{SlackApi, SlackClient, SlackError};

/// Slack API response types
///
/// Only the envelope fields are typed; the entities themselves stay as
/// JSON objects and are emitted unchanged.
pub mod responses {
    use serde::Deserialize;
    use serde_json::Value;
    use std::collections::BTreeMap;

    use crate::models::Record;

    /// Pagination envelope shared by cursor-paginated methods
    #[derive(Debug, Default, Deserialize)]
    pub struct ResponseMetadata {
        #[serde(default)]
        pub next_cursor: Option<String>,
    }

    /// Extract the continuation cursor; Slack sends `""` on the last page
    pub fn next_cursor(metadata: &Option<ResponseMetadata>) -> Option<String> {
        metadata
            .as_ref()
            .and_then(|m| m.next_cursor.as_deref())
            .filter(|c| !c.is_empty())
            .map(str::to_string)
    }

    /// Response from `conversations.list`
    #[derive(Debug, Deserialize)]
    pub struct ConversationsList {
        pub channels: Vec<Record>,
        #[serde(default)]
        pub response_metadata: Option<ResponseMetadata>,
    }

    /// Response from `conversations.members`
    #[derive(Debug, Deserialize)]
    pub struct ConversationMembers {
        pub members: Vec<Value>,
        #[serde(default)]
        pub response_metadata: Option<ResponseMetadata>,
    }

    /// Response from `conversations.history`, newest message first
    #[derive(Debug, Deserialize)]
    pub struct ConversationHistory {
        pub messages: Vec<Record>,
        #[serde(default)]
        pub response_metadata: Option<ResponseMetadata>,
    }

    /// Response from `files.list` (page-number pagination)
    #[derive(Debug, Deserialize)]
    pub struct FilesList {
        pub files: Vec<Record>,
        pub paging: Paging,
    }

    #[derive(Debug, Deserialize)]
    pub struct Paging {
        pub page: u32,
        pub pages: u32,
    }

    /// Response from `team.info`
    #[derive(Debug, Deserialize)]
    pub struct TeamInfo {
        pub team: Record,
    }

    /// Response from `emoji.list`: name -> image url or `alias:<name>`
    #[derive(Debug, Deserialize)]
    pub struct EmojiList {
        pub emoji: BTreeMap<String, Value>,
    }

    /// Response from `usergroups.list`
    #[derive(Debug, Deserialize)]
    pub struct UserGroupsList {
        pub usergroups: Vec<Record>,
    }

    /// Response from `usergroups.users.list`
    #[derive(Debug, Deserialize)]
    pub struct UserGroupUsers {
        pub users: Vec<Value>,
    }

    /// Response from `users.list`
    #[derive(Debug, Deserialize)]
    pub struct UsersList {
        pub members: Vec<Record>,
        #[serde(default)]
        pub response_metadata: Option<ResponseMetadata>,
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use serde_json::json;

        #[test]
        fn test_next_cursor_present() {
            let page: UsersList = serde_json::from_value(json!({
                "members": [],
                "response_metadata": {"next_cursor": "dXNlcjpVMDYxTkZUVDI="}
            }))
            .unwrap();
            assert_eq!(
                next_cursor(&page.response_metadata).as_deref(),
                Some("dXNlcjpVMDYxTkZUVDI=")
            );
        }

        #[test]
        fn test_next_cursor_empty_string_is_last_page() {
            let page: UsersList = serde_json::from_value(json!({
                "members": [],
                "response_metadata": {"next_cursor": ""}
            }))
            .unwrap();
            assert_eq!(next_cursor(&page.response_metadata), None);
        }

        #[test]
        fn test_next_cursor_missing_envelope() {
            let page: ConversationsList =
                serde_json::from_value(json!({"channels": []})).unwrap();
            assert_eq!(next_cursor(&page.response_metadata), None);
        }
    }
}
