use serde::{Deserialize, Serialize};

pub const MAX_NAME_LENGTH: usize = 20;
pub const DEFAULT_NAME: &str = "Anonymous";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterInit {
    pub id: u32,
    #[serde(rename = "type", default)]
    pub sprite: u8,
    pub name: String,
}

/// Cold-path messages exchanged as JSON text frames, tagged by `"type"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum AdminMessage {
    JoinGame {
        #[serde(default)]
        name: Option<String>,
    },
    GameState {
        characters: Vec<CharacterInit>,
        #[serde(rename = "playerId")]
        player_id: u32,
    },
    GameStateDone,
    AddChar {
        character: CharacterInit,
    },
    DeleteChar {
        character: CharacterInit,
    },
}

impl AdminMessage {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }
}

pub fn sanitize_name(candidate: Option<&str>) -> String {
    match candidate.map(str::trim) {
        Some(name) if !name.is_empty() => name.chars().take(MAX_NAME_LENGTH).collect(),
        _ => DEFAULT_NAME.to_string(),
    }
}
