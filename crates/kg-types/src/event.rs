use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Named topic an action event is published to.
///
/// Only mutations have a topic; reads never produce events.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Topic {
    Follow,
    Unfollow,
    Like,
    Unlike,
    Post,
}

impl Topic {
    pub const ALL: [Topic; 5] = [
        Topic::Follow,
        Topic::Unfollow,
        Topic::Like,
        Topic::Unlike,
        Topic::Post,
    ];

    /// Wire name of the topic.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Follow => "follow",
            Self::Unfollow => "unfollow",
            Self::Like => "like",
            Self::Unlike => "unlike",
            Self::Post => "post",
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Topic {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| TypeError::UnknownTopic(s.to_string()))
    }
}

/// An ephemeral `{topic, payload}` message emitted after a successful write.
///
/// Not persisted by kirkagram; ownership passes to the notifier immediately.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Event {
    pub topic: Topic,
    pub payload: Vec<u8>,
}

impl Event {
    pub fn new(topic: Topic, payload: Vec<u8>) -> Self {
        Self { topic, payload }
    }

    /// Build an event whose payload is the JSON encoding of `value`.
    pub fn json<T: Serialize>(topic: Topic, value: &T) -> Result<Self, TypeError> {
        let payload =
            serde_json::to_vec(value).map_err(|e| TypeError::Serialization(e.to_string()))?;
        Ok(Self { topic, payload })
    }

    /// Decode the JSON payload into `T`.
    pub fn decode<T: for<'de> Deserialize<'de>>(&self) -> Result<T, TypeError> {
        serde_json::from_slice(&self.payload).map_err(|e| TypeError::Serialization(e.to_string()))
    }
}
