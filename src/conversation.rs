//! Multi-turn conversations over one provider.

use std::sync::Arc;

use crate::payload::ContentDelivery;
use crate::provider::Provider;
use crate::{
    Error, GenerationRequest, GenerationResponse, Message, TextStream, UserInput,
    DEFAULT_TEMPERATURE,
};

/// Stateful chat with one adapter and fixed generation settings.
///
/// History only changes when [`send`](Conversation::send) succeeds.
pub struct Conversation {
    provider: Arc<dyn Provider>,
    model: String,
    system_prompt: Option<String>,
    temperature: f32,
    delivery: Option<ContentDelivery>,
    json_output: bool,
    history: Vec<Message>,
}

impl Conversation {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            system_prompt: None,
            temperature: DEFAULT_TEMPERATURE,
            delivery: None,
            json_output: false,
            history: Vec::new(),
        }
    }

    pub fn system(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn delivery(mut self, delivery: ContentDelivery) -> Self {
        self.delivery = Some(delivery);
        self
    }

    pub fn json_output(mut self, json_output: bool) -> Self {
        self.json_output = json_output;
        self
    }

    /// Continue from a saved history.
    pub fn with_history(mut self, history: Vec<Message>) -> Self {
        self.history = history;
        self
    }

    pub fn provider(&self) -> &Arc<dyn Provider> {
        &self.provider
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn history(&self) -> &[Message] {
        &self.history
    }

    pub fn clear(&mut self) {
        self.history.clear();
    }

    fn request(&self, input: UserInput) -> GenerationRequest {
        GenerationRequest {
            model: self.model.clone(),
            system_prompt: self.system_prompt.clone(),
            text: input.text,
            attachment: input.attachment,
            history: self.history.clone(),
            temperature: self.temperature,
            delivery: self.delivery,
            json_output: self.json_output,
            max_tokens: None,
        }
    }

    /// Send one turn and record it.
    pub async fn send(
        &mut self,
        input: impl Into<UserInput>,
    ) -> Result<GenerationResponse, Error> {
        let request = self.request(input.into());
        let response = self.provider.generate(&request).await?;
        self.history = response.history.clone();
        Ok(response)
    }

    /// Stream one turn. The history is left unchanged.
    pub async fn stream(&self, input: impl Into<UserInput>) -> Result<TextStream, Error> {
        let request = self.request(input.into());
        self.provider.stream(&request).await
    }
}
