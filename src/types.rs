use serde::{Deserialize, Serialize};
use std::fmt;

// ============ Request Context ============

/// The two family roles a Wowli account can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Daughter,
    Mother,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Daughter => "daughter",
            Role::Mother => "mother",
        }
    }

    pub fn from_str(s: &str) -> Option<Role> {
        match s.to_lowercase().as_str() {
            "daughter" => Some(Role::Daughter),
            "mother" => Some(Role::Mother),
            _ => None,
        }
    }

    /// How the persona refers to this role in prompts.
    pub fn label(&self) -> &'static str {
        match self {
            Role::Daughter => "女儿",
            Role::Mother => "妈妈",
        }
    }
}

/// Who is asking, built by the caller for every request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserContext {
    pub user_id: String,
    pub role: Role,
    pub family_id: String,
}

impl UserContext {
    pub fn new(user_id: impl Into<String>, role: Role, family_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            role,
            family_id: family_id.into(),
        }
    }
}

/// Photo attached to a message. Only `data` reaches a live model; on the
/// wire it travels as a base64 string under `base64`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Photo {
    #[serde(
        rename = "base64",
        default,
        with = "base64_bytes",
        skip_serializing_if = "Option::is_none"
    )]
    pub data: Option<Vec<u8>>,
    pub media_type: Option<String>,
    pub path: Option<String>,
    pub description: Option<String>,
}

impl Photo {
    pub fn from_bytes(data: Vec<u8>, media_type: impl Into<String>) -> Self {
        Self {
            data: Some(data),
            media_type: Some(media_type.into()),
            ..Default::default()
        }
    }

    pub fn has_image(&self) -> bool {
        self.data.as_ref().is_some_and(|d| !d.is_empty())
    }
}

mod base64_bytes {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(data: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error> {
        match data {
            Some(bytes) => serializer.serialize_str(&STANDARD.encode(bytes)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            Some(encoded) => STANDARD.decode(encoded.trim()).map(Some).map_err(de::Error::custom),
            None => Ok(None),
        }
    }
}

// ============ Result Contract ============

/// Which path produced a suggestion, and whether it was canned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mode {
    #[serde(rename = "pipeline")]
    Pipeline,
    #[serde(rename = "pipeline-mock")]
    PipelineMock,
    #[serde(rename = "agent")]
    Agent,
    #[serde(rename = "agent-mock")]
    AgentMock,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Pipeline => "pipeline",
            Mode::PipelineMock => "pipeline-mock",
            Mode::Agent => "agent",
            Mode::AgentMock => "agent-mock",
        }
    }

    pub fn from_str(s: &str) -> Option<Mode> {
        match s {
            "pipeline" => Some(Mode::Pipeline),
            "pipeline-mock" => Some(Mode::PipelineMock),
            "agent" => Some(Mode::Agent),
            "agent-mock" => Some(Mode::AgentMock),
            _ => None,
        }
    }

    pub fn is_agent(&self) -> bool {
        matches!(self, Mode::Agent | Mode::AgentMock)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the agent did to reach its answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reasoning {
    pub iterations: u32,
    pub used_tools: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emotion_detected: Option<String>,
}

/// The subsystem's output: one suggestion plus how it was produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiResult {
    pub suggestion: String,
    pub mode: Mode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<Reasoning>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokens: Option<u32>,
    /// Wall-clock milliseconds, stamped by the orchestrator.
    pub duration: u64,
}

impl AiResult {
    pub(crate) fn new(suggestion: impl Into<String>, mode: Mode) -> Self {
        Self {
            suggestion: suggestion.into(),
            mode,
            reasoning: None,
            tokens: None,
            duration: 0,
        }
    }

    pub(crate) fn with_reasoning(mut self, reasoning: Reasoning) -> Self {
        self.reasoning = Some(reasoning);
        self
    }

    pub(crate) fn with_tokens(mut self, tokens: Option<u32>) -> Self {
        self.tokens = tokens;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_wire_shape() {
        let result = AiResult::new("好温馨呀", Mode::AgentMock).with_reasoning(Reasoning {
            iterations: 2,
            used_tools: vec!["analyze_emotion".to_string()],
            emotion_detected: None,
        });

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["mode"], "agent-mock");
        assert_eq!(json["reasoning"]["iterations"], 2);
        assert_eq!(json["reasoning"]["usedTools"][0], "analyze_emotion");
        assert!(json.get("tokens").is_none());
        assert!(json["reasoning"].get("emotionDetected").is_none());
    }

    #[test]
    fn test_mode_round_trip_names() {
        for mode in [Mode::Pipeline, Mode::PipelineMock, Mode::Agent, Mode::AgentMock] {
            assert_eq!(Mode::from_str(mode.as_str()), Some(mode));
        }
        assert!(Mode::AgentMock.is_agent());
        assert!(!Mode::PipelineMock.is_agent());
    }

    #[test]
    fn test_photo_bytes_travel_as_base64() {
        let photo = Photo::from_bytes(vec![0xff, 0xd8, 0xff], "image/jpeg");

        let json = serde_json::to_value(&photo).unwrap();
        assert_eq!(json["base64"], "/9j/");
        assert_eq!(json["mediaType"], "image/jpeg");

        let back: Photo = serde_json::from_value(json).unwrap();
        assert!(back.has_image());
        assert_eq!(back.data.as_deref(), Some(&[0xff, 0xd8, 0xff][..]));
    }

    #[test]
    fn test_photo_without_image() {
        let photo: Photo = serde_json::from_str(r#"{"path":"uploads/a.jpg"}"#).unwrap();
        assert!(!photo.has_image());
        assert!(serde_json::to_value(&Photo::default()).unwrap().get("base64").is_none());

        assert!(serde_json::from_str::<Photo>(r#"{"base64":"not base64!"}"#).is_err());
    }

    #[test]
    fn test_user_context_from_json() {
        let ctx: UserContext = serde_json::from_str(
            r#"{"userId":"u1","role":"mother","familyId":"f1"}"#,
        )
        .unwrap();
        assert_eq!(ctx.role, Role::Mother);
        assert_eq!(ctx.role.label(), "妈妈");
        assert_eq!(Role::from_str("Daughter"), Some(Role::Daughter));
    }
}
