use super::attachment::Attachment;

/// The caller's side of one turn: optional text and an optional attachment.
#[derive(Debug, Clone, Default)]
pub struct UserInput {
    pub text: Option<String>,
    pub attachment: Option<Attachment>,
}

impl UserInput {
    /// Create input carrying only text.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            attachment: None,
        }
    }

    /// Create input carrying only an attachment.
    pub fn attachment(attachment: Attachment) -> Self {
        Self {
            text: None,
            attachment: Some(attachment),
        }
    }

    /// Attach a file to this input.
    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachment = Some(attachment);
        self
    }
}

impl From<&str> for UserInput {
    fn from(s: &str) -> Self {
        UserInput::text(s)
    }
}

impl From<String> for UserInput {
    fn from(s: String) -> Self {
        UserInput::text(s)
    }
}

impl From<Attachment> for UserInput {
    fn from(attachment: Attachment) -> Self {
        UserInput::attachment(attachment)
    }
}
