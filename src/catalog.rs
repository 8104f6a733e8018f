use std::collections::BTreeMap;
use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Entry of the global slash-command catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSpec {
    pub description: String,
    #[serde(default)]
    pub params: Vec<String>,
}

impl CommandSpec {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            params: Vec::new(),
        }
    }
}

pub type CommandCatalog = IndexMap<String, CommandSpec>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmoteUrl {
    #[serde(default)]
    pub size: String,
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Emote {
    pub code: String,
    #[serde(default)]
    pub urls: Vec<EmoteUrl>,
}

pub type EmoteCatalog = IndexMap<String, Vec<Emote>>;

pub const GLOBAL_EMOTE_SCOPE: &str = "global";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserData {
    #[serde(default)]
    pub broadcaster_type: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Permission tier shared by every bot platform, `Everyone` (0) to
/// `Broadcaster` (6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum AccessLevel {
    Everyone = 0,
    Subscriber = 1,
    Regular = 2,
    Vip = 3,
    Moderator = 4,
    SuperModerator = 5,
    Broadcaster = 6,
}

impl AccessLevel {
    pub fn from_numeric(value: u64) -> Option<Self> {
        match value {
            100 => Some(Self::Everyone),
            250 => Some(Self::Subscriber),
            300 => Some(Self::Regular),
            400 => Some(Self::Vip),
            500 => Some(Self::Moderator),
            1000 => Some(Self::SuperModerator),
            1500 => Some(Self::Broadcaster),
            _ => None,
        }
    }

    pub fn from_name(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "everyone" => Some(Self::Everyone),
            "moderator" => Some(Self::Moderator),
            "owner" => Some(Self::Broadcaster),
            _ => None,
        }
    }

    #[cfg(test)]
    pub fn rank(self) -> u8 {
        self as u8
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Everyone => "Everyone",
            Self::Subscriber => "Subscriber",
            Self::Regular => "Regular",
            Self::Vip => "Vip",
            Self::Moderator => "Moderator",
            Self::SuperModerator => "Super Moderator",
            Self::Broadcaster => "Broadcaster",
        }
    }

    pub fn color(self) -> &'static str {
        match self {
            Self::Everyone => "#777777",
            Self::Subscriber => "#54de31",
            Self::Regular => "#317cde",
            Self::Vip => "#de3163",
            Self::Moderator => "#deb031",
            Self::SuperModerator => "#de5431",
            Self::Broadcaster => "#de3131",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    StreamElements,
    Nightbot,
    Moobot,
    TtvU,
}

impl Platform {
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "streamelements" => Some(Self::StreamElements),
            "nightbot" => Some(Self::Nightbot),
            "moobot" => Some(Self::Moobot),
            "ttvu" => Some(Self::TtvU),
            _ => None,
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            Self::StreamElements => "streamelements",
            Self::Nightbot => "nightbot",
            Self::Moobot => "moobot",
            Self::TtvU => "ttvu",
        }
    }

    pub fn color(self) -> &'static str {
        match self {
            Self::StreamElements => "#679fce",
            Self::Nightbot => "#b25eda",
            Self::Moobot => "#54bc75",
            Self::TtvU => "#ff69b4",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cooldown {
    Split { user: u64, global: u64 },
    Seconds(u64),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamElementsCommand {
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(default)]
    pub access_level: Option<u64>,
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default)]
    pub command_id: Option<String>,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub reply: Option<String>,
    #[serde(default)]
    pub cost: Option<u64>,
    #[serde(default)]
    pub cooldown: Option<Cooldown>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NightbotCommand {
    #[serde(default)]
    pub user_level: Option<String>,
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoobotCommand {
    #[serde(default)]
    pub identifier: Option<String>,
    #[serde(default)]
    pub response: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TtvUCommand {
    #[serde(rename = "Command", default)]
    pub command: Option<String>,
    #[serde(rename = "Permissions", default)]
    pub permissions: Option<String>,
    #[serde(rename = "Description", default)]
    pub description: Option<String>,
}

/// A bot command in the raw shape of the platform that owns it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PlatformCommand {
    StreamElements(StreamElementsCommand),
    Nightbot(NightbotCommand),
    Moobot(MoobotCommand),
    TtvU(TtvUCommand),
}

impl PlatformCommand {
    pub fn from_value(platform: Platform, value: Value) -> Result<Self, serde_json::Error> {
        Ok(match platform {
            Platform::StreamElements => Self::StreamElements(serde_json::from_value(value)?),
            Platform::Nightbot => Self::Nightbot(serde_json::from_value(value)?),
            Platform::Moobot => Self::Moobot(serde_json::from_value(value)?),
            Platform::TtvU => Self::TtvU(serde_json::from_value(value)?),
        })
    }

    pub fn platform(&self) -> Platform {
        match self {
            Self::StreamElements(_) => Platform::StreamElements,
            Self::Nightbot(_) => Platform::Nightbot,
            Self::Moobot(_) => Platform::Moobot,
            Self::TtvU(_) => Platform::TtvU,
        }
    }

    /// Maps the platform shape to the shared record. Entries that are
    /// disabled, lack an identifier, or carry an access value with no known
    /// tier yield `None`.
    pub fn normalize(&self) -> Option<NormalizedCommand> {
        let platform = self.platform();
        match self {
            Self::StreamElements(raw) => {
                if raw.enabled == Some(false) {
                    return None;
                }
                let level = raw.access_level.and_then(AccessLevel::from_numeric)?;
                let id = non_empty(raw.command.as_deref())
                    .or_else(|| non_empty(raw.command_id.as_deref()))?;
                Some(NormalizedCommand {
                    command_id: format!("!{id}"),
                    aliases: raw.aliases.clone(),
                    level,
                    description: non_empty(raw.description.as_deref())
                        .or_else(|| non_empty(raw.reply.as_deref()))
                        .unwrap_or_default()
                        .to_string(),
                    platform,
                    cost: raw.cost.unwrap_or(0),
                    cooldown: raw.cooldown.clone(),
                })
            }
            Self::Nightbot(raw) => {
                let level = raw.user_level.as_deref().and_then(AccessLevel::from_name)?;
                let id = non_empty(raw.command.as_deref())
                    .or_else(|| non_empty(raw.name.as_deref()))?;
                Some(NormalizedCommand {
                    command_id: id.to_string(),
                    aliases: Vec::new(),
                    level,
                    description: raw.message.clone().unwrap_or_default(),
                    platform,
                    cost: 0,
                    cooldown: None,
                })
            }
            Self::Moobot(raw) => {
                let id = non_empty(raw.identifier.as_deref())?;
                Some(NormalizedCommand {
                    command_id: id.to_string(),
                    aliases: Vec::new(),
                    level: AccessLevel::Everyone,
                    description: raw.response.clone().unwrap_or_default(),
                    platform,
                    cost: 0,
                    cooldown: None,
                })
            }
            Self::TtvU(raw) => {
                let id = non_empty(raw.command.as_deref())?;
                let level = non_empty(raw.permissions.as_deref()).and_then(AccessLevel::from_name)?;
                Some(NormalizedCommand {
                    command_id: id.to_string(),
                    aliases: Vec::new(),
                    level,
                    description: raw.description.clone().unwrap_or_default(),
                    platform,
                    cost: 0,
                    cooldown: None,
                })
            }
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// Platform-independent view of a bot command, used for suggestions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizedCommand {
    pub command_id: String,
    pub aliases: Vec<String>,
    pub level: AccessLevel,
    pub description: String,
    pub platform: Platform,
    pub cost: u64,
    pub cooldown: Option<Cooldown>,
}

impl NormalizedCommand {
    pub fn color(&self) -> &'static str {
        self.platform.color()
    }
}

/// Bot commands of one channel, grouped by platform.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ChannelCommands(IndexMap<Platform, Vec<PlatformCommand>>);

impl ChannelCommands {
    pub fn insert(&mut self, platform: Platform, commands: Vec<PlatformCommand>) {
        self.0.insert(platform, commands);
    }

    #[cfg(test)]
    pub fn platforms(&self) -> impl Iterator<Item = (&Platform, &Vec<PlatformCommand>)> {
        self.0.iter()
    }

    pub fn normalized(&self) -> Vec<NormalizedCommand> {
        self.0
            .values()
            .flatten()
            .filter_map(PlatformCommand::normalize)
            .collect()
    }
}

impl<'de> Deserialize<'de> for ChannelCommands {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = IndexMap::<String, Vec<Value>>::deserialize(deserializer)?;
        let mut out = ChannelCommands::default();
        for (key, entries) in raw {
            let Some(platform) = Platform::from_key(&key) else {
                tracing::debug!(platform = %key, "ignoring commands of unknown platform");
                continue;
            };
            let commands = entries
                .into_iter()
                .filter_map(|entry| match PlatformCommand::from_value(platform, entry) {
                    Ok(command) => Some(command),
                    Err(err) => {
                        tracing::debug!(%platform, %err, "dropping unreadable bot command");
                        None
                    }
                })
                .collect();
            out.insert(platform, commands);
        }
        Ok(out)
    }
}

pub type ChannelCommandCatalog = IndexMap<String, ChannelCommands>;
