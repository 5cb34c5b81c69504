//! Typed JSON envelopes exchanged between peers.
//!
//! Wire shape: `{"type": "...", ...fields, "timestamp": <ms since epoch>}`.
//! Audio bytes travel as a base64 string in the `audio` field.

use crate::error::{Result, VoxbridgeError};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Envelope `type` values this build understands.
pub const KNOWN_TYPES: &[&str] = &["audio", "transcript", "translation"];

/// Envelope body, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Payload {
    /// PCM16 LE mono samples
    Audio {
        #[serde(with = "base64_bytes")]
        audio: Vec<u8>,
    },
    Transcript {
        text: String,
        language: String,
    },
    Translation {
        original: String,
        translated: String,
        #[serde(rename = "sourceLang")]
        source_lang: String,
        #[serde(rename = "targetLang")]
        target_lang: String,
    },
}

impl Payload {
    pub fn type_name(&self) -> &'static str {
        match self {
            Payload::Audio { .. } => "audio",
            Payload::Transcript { .. } => "transcript",
            Payload::Translation { .. } => "translation",
        }
    }
}

/// One self-contained message. No chunking: callers split long audio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageEnvelope {
    #[serde(flatten)]
    pub payload: Payload,
    pub timestamp: u64,
}

impl MessageEnvelope {
    pub fn new(payload: Payload) -> Self {
        Self {
            payload,
            timestamp: now_millis(),
        }
    }

    pub fn audio(bytes: Vec<u8>) -> Self {
        Self::new(Payload::Audio { audio: bytes })
    }

    pub fn transcript(text: impl Into<String>, language: impl Into<String>) -> Self {
        Self::new(Payload::Transcript {
            text: text.into(),
            language: language.into(),
        })
    }

    pub fn translation(
        original: impl Into<String>,
        translated: impl Into<String>,
        source_lang: impl Into<String>,
        target_lang: impl Into<String>,
    ) -> Self {
        Self::new(Payload::Translation {
            original: original.into(),
            translated: translated.into(),
            source_lang: source_lang.into(),
            target_lang: target_lang.into(),
        })
    }

    pub fn with_timestamp(mut self, timestamp: u64) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn type_name(&self) -> &'static str {
        self.payload.type_name()
    }

    pub fn to_json(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(s: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }

    /// Encode to wire bytes.
    pub fn encode(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| {
            VoxbridgeError::Other(format!(
                "Failed to encode {} envelope: {}",
                self.type_name(),
                e
            ))
        })
    }

    /// Decode wire bytes.
    ///
    /// Returns `Ok(None)` for a well-formed object whose `type` this build
    /// does not know, and [`VoxbridgeError::Decode`] for anything malformed.
    pub fn decode(raw: &[u8]) -> Result<Option<Self>> {
        let value: serde_json::Value =
            serde_json::from_slice(raw).map_err(|e| VoxbridgeError::Decode {
                message: e.to_string(),
            })?;

        let kind = value
            .get("type")
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| VoxbridgeError::Decode {
                message: "missing string field `type`".to_string(),
            })?;

        if !KNOWN_TYPES.contains(&kind) {
            return Ok(None);
        }

        serde_json::from_value(value)
            .map(Some)
            .map_err(|e| VoxbridgeError::Decode {
                message: e.to_string(),
            })
    }
}

/// Milliseconds since the Unix epoch. A clock before 1970 reads as 0.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

mod base64_bytes {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn audio_bytes_travel_as_base64() {
        let envelope = MessageEnvelope::audio(vec![0x00, 0xFF, 0x10]).with_timestamp(42);
        let json = envelope.to_json().expect("should serialize");

        assert!(json.contains("\"type\":\"audio\""), "got {json}");
        assert!(json.contains("\"audio\":\"AP8Q\""), "got {json}");
        assert!(json.contains("\"timestamp\":42"), "got {json}");

        let decoded = MessageEnvelope::decode(json.as_bytes())
            .expect("should decode")
            .expect("known type");
        assert_eq!(decoded, envelope);
    }

    #[test]
    fn translation_uses_camel_case_language_fields() {
        let envelope = MessageEnvelope::translation("hello", "hola", "en", "es").with_timestamp(7);
        let json = envelope.to_json().expect("should serialize");

        assert!(json.contains("\"sourceLang\":\"en\""), "got {json}");
        assert!(json.contains("\"targetLang\":\"es\""), "got {json}");
        assert_eq!(MessageEnvelope::from_json(&json).expect("parse"), envelope);
    }

    #[test]
    fn transcript_parses_from_wire_text() {
        let raw = br#"{"type":"transcript","text":"hi there","language":"en","timestamp":1700000000000}"#;
        let envelope = MessageEnvelope::decode(raw).expect("decode").expect("known");

        assert_eq!(envelope.timestamp, 1_700_000_000_000);
        assert_eq!(
            envelope.payload,
            Payload::Transcript {
                text: "hi there".to_string(),
                language: "en".to_string()
            }
        );
    }

    #[test]
    fn unknown_type_is_not_an_error() {
        let raw = br#"{"type":"presence","status":"away","timestamp":1}"#;
        assert!(MessageEnvelope::decode(raw).expect("decode").is_none());
    }

    #[test]
    fn malformed_bytes_are_decode_errors() {
        for raw in [
            &b"not json"[..],
            br#"{"text":"no type"}"#,
            br#"{"type":"audio","audio":"***","timestamp":1}"#,
            br#"{"type":"transcript","timestamp":1}"#,
            br#"[1,2,3]"#,
        ] {
            let err = MessageEnvelope::decode(raw).expect_err("should fail");
            assert!(matches!(err, VoxbridgeError::Decode { .. }), "got {err:?}");
        }
    }

    #[test]
    fn new_envelopes_are_timestamped() {
        let before = now_millis();
        let envelope = MessageEnvelope::transcript("x", "en");
        assert!(envelope.timestamp >= before);
        assert_eq!(envelope.type_name(), "transcript");
    }
}
