//! Wire types for Discord's HTTP interactions endpoint.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use twilight_model::channel::message::embed::Embed;

pub const PING: u8 = 1;
pub const APPLICATION_COMMAND: u8 = 2;
pub const MESSAGE_COMPONENT: u8 = 3;

pub const RESPONSE_PONG: u8 = 1;
pub const RESPONSE_CHANNEL_MESSAGE: u8 = 4;
pub const RESPONSE_DEFERRED_CHANNEL_MESSAGE: u8 = 5;
pub const RESPONSE_DEFERRED_UPDATE_MESSAGE: u8 = 6;
pub const RESPONSE_UPDATE_MESSAGE: u8 = 7;

pub const FLAG_EPHEMERAL: u32 = 64;

/// Option types with nested options rather than a value.
pub const OPTION_SUB_COMMAND: u8 = 1;
pub const OPTION_SUB_COMMAND_GROUP: u8 = 2;

#[derive(Debug, Deserialize)]
pub struct Interaction {
    #[serde(rename = "type")]
    pub kind: u8,
    pub data: Option<InteractionData>,
    pub member: Option<Member>,
    pub guild_id: Option<String>,
    pub channel_id: Option<String>,
    pub message: Option<InteractionMessage>,
    pub token: String,
    #[allow(dead_code)]
    pub id: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InteractionData {
    #[serde(default)]
    pub name: String,
    pub options: Option<Vec<CommandOption>>,
    #[serde(default)]
    pub resolved: Resolved,
    /// Set on component interactions
    pub custom_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommandOption {
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: u8,
    #[serde(default)]
    pub value: serde_json::Value,
    #[serde(default)]
    pub options: Vec<CommandOption>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Resolved {
    #[serde(default)]
    pub users: HashMap<String, User>,
    #[serde(default)]
    pub members: HashMap<String, PartialMember>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Member {
    pub user: User,
    #[serde(default)]
    pub roles: Vec<String>,
    pub permissions: Option<String>,
}

/// Member data attached to resolved options; carries no `user`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PartialMember {
    #[serde(default)]
    pub roles: Vec<String>,
    pub joined_at: Option<String>,
    pub nick: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub username: String,
    pub global_name: Option<String>,
    pub avatar: Option<String>,
    #[serde(default)]
    pub bot: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InteractionMessage {
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct InteractionResponse {
    #[serde(rename = "type")]
    pub kind: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<ResponseData>,
}

impl InteractionResponse {
    pub fn pong() -> Self {
        Self {
            kind: RESPONSE_PONG,
            data: None,
        }
    }
}

/// Message body shared by interaction responses and follow-up webhooks.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResponseData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub embeds: Vec<Embed>,
    /// `Some(vec![])` clears the components of an updated message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub components: Option<Vec<serde_json::Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flags: Option<u32>,
}

impl ResponseData {
    pub fn content(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Default::default()
        }
    }

    pub fn embed(embed: Embed) -> Self {
        Self {
            embeds: vec![embed],
            ..Default::default()
        }
    }

    pub fn ephemeral(mut self) -> Self {
        self.flags = Some(FLAG_EPHEMERAL);
        self
    }

    pub fn with_components(mut self, components: Vec<serde_json::Value>) -> Self {
        self.components = Some(components);
        self
    }

    pub fn is_ephemeral(&self) -> bool {
        self.flags.is_some_and(|flags| flags & FLAG_EPHEMERAL != 0)
    }
}

/// What a handler wants sent back for an interaction.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Message(ResponseData),
    /// Work continues in the background and answers with a follow-up.
    Deferred { ephemeral: bool },
    /// Replace the message a component belongs to.
    Update(ResponseData),
    /// Component click handled with no visible change.
    Acknowledge,
}

impl Reply {
    pub fn into_response(self) -> InteractionResponse {
        match self {
            Reply::Message(data) => InteractionResponse {
                kind: RESPONSE_CHANNEL_MESSAGE,
                data: Some(data),
            },
            Reply::Deferred { ephemeral } => InteractionResponse {
                kind: RESPONSE_DEFERRED_CHANNEL_MESSAGE,
                data: ephemeral.then(|| ResponseData::default().ephemeral()),
            },
            Reply::Update(data) => InteractionResponse {
                kind: RESPONSE_UPDATE_MESSAGE,
                data: Some(data),
            },
            Reply::Acknowledge => InteractionResponse {
                kind: RESPONSE_DEFERRED_UPDATE_MESSAGE,
                data: None,
            },
        }
    }
}
