//! Google Gemini `contents` with parts arrays.

use ijson::IValue;
use serde::{Deserialize, Serialize};

use super::ensure_content;
use crate::{ContentPart, Error, Message, Role};

/// Google content (message) format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoogleContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>, // "user", "model"
    #[serde(default)]
    pub parts: Vec<GooglePart>,
}

/// Part of a Google content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GooglePart {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: GoogleBlob,
    },
    /// Anything else the model returns (function calls, thoughts, ...).
    Other(IValue),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoogleBlob {
    #[serde(rename = "mimeType")]
    pub mime_type: String,
    pub data: String,
}

/// Messages plus the separate system instruction.
#[derive(Debug, Clone, PartialEq)]
pub struct GooglePayload {
    pub contents: Vec<GoogleContent>,
    pub system_instruction: Option<GoogleContent>,
}

pub fn build(
    system: Option<&str>,
    history: &[Message],
    turn: &Message,
) -> Result<GooglePayload, Error> {
    ensure_content(turn)?;

    let contents = history
        .iter()
        .chain(std::iter::once(turn))
        .map(convert_message)
        .collect::<Result<Vec<_>, Error>>()?;

    let system_instruction = system.filter(|s| !s.is_empty()).map(|system| GoogleContent {
        role: None,
        parts: vec![GooglePart::Text {
            text: system.to_string(),
        }],
    });

    Ok(GooglePayload {
        contents,
        system_instruction,
    })
}

fn convert_message(message: &Message) -> Result<GoogleContent, Error> {
    let role = match message.role {
        Role::Assistant => "model",
        Role::User | Role::System => "user",
    };

    let parts = message
        .parts
        .iter()
        .map(|part| match part {
            ContentPart::Text { text } => Ok(GooglePart::Text { text: text.clone() }),
            ContentPart::Attachment { attachment } => Ok(GooglePart::InlineData {
                inline_data: GoogleBlob {
                    mime_type: attachment.mime_type()?.essence_str().to_string(),
                    data: attachment.data().to_string(),
                },
            }),
        })
        .collect::<Result<Vec<_>, Error>>()?;

    Ok(GoogleContent {
        role: Some(role.to_string()),
        parts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Attachment;
    use serde_json::json;

    #[test]
    fn test_assistant_renders_as_model() {
        let history = vec![Message::user("Hi"), Message::assistant("Hello!")];
        let payload = build(Some("Be brief"), &history, &Message::user("Again")).unwrap();

        assert_eq!(payload.contents.len(), 3);
        assert_eq!(payload.contents[1].role.as_deref(), Some("model"));
        assert_eq!(
            serde_json::to_value(&payload.system_instruction).unwrap(),
            json!({"parts": [{"text": "Be brief"}]})
        );
    }

    #[test]
    fn test_inline_data_part() {
        let turn = Message::user("Read this")
            .with_attachment(Attachment::from_encoded("invoice.pdf", "JVBERi0="));
        let payload = build(None, &[], &turn).unwrap();

        assert_eq!(
            serde_json::to_value(&payload.contents[0]).unwrap(),
            json!({"role": "user", "parts": [
                {"text": "Read this"},
                {"inlineData": {"mimeType": "application/pdf", "data": "JVBERi0="}}
            ]})
        );
        assert!(payload.system_instruction.is_none());
    }

    #[test]
    fn test_unknown_parts_are_preserved() {
        let content: GoogleContent = serde_json::from_value(json!({
            "role": "model",
            "parts": [{"text": "ok"}, {"functionCall": {"name": "f", "args": {}}}]
        }))
        .unwrap();

        assert!(matches!(content.parts[0], GooglePart::Text { .. }));
        assert!(matches!(content.parts[1], GooglePart::Other(_)));
    }
}
