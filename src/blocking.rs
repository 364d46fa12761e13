//! Synchronous wrappers over [`Manager`] and [`Conversation`].
//!
//! Each wrapper drives a current-thread tokio runtime. Do not use them from
//! inside an async context.

use std::collections::BTreeMap;
use std::sync::Arc;

use futures_util::StreamExt;
use tokio::runtime::{Builder, Runtime};

use crate::payload::ContentDelivery;
use crate::provider::Provider;
use crate::{
    Conversation, Error, GenerationRequest, GenerationResponse, Manager, Message, ModelInfo,
    Settings, TextStream, UserInput,
};

fn runtime() -> Result<Arc<Runtime>, Error> {
    Ok(Arc::new(
        Builder::new_current_thread().enable_all().build()?,
    ))
}

/// Blocking version of [`Manager`].
pub struct BlockingManager {
    inner: Manager,
    runtime: Arc<Runtime>,
}

impl BlockingManager {
    pub fn new(settings: Settings) -> Result<Self, Error> {
        Self::from_manager(Manager::new(settings))
    }

    pub fn from_env() -> Result<Self, Error> {
        Self::from_manager(Manager::from_env()?)
    }

    pub fn from_manager(manager: Manager) -> Result<Self, Error> {
        Ok(Self {
            inner: manager,
            runtime: runtime()?,
        })
    }

    /// The wrapped async manager, e.g. for registering factories.
    pub fn manager(&self) -> &Manager {
        &self.inner
    }

    pub fn provider(&self, name: &str) -> Result<Arc<dyn Provider>, Error> {
        self.runtime.block_on(self.inner.provider(name))
    }

    pub fn generate(
        &self,
        provider: &str,
        request: &GenerationRequest,
    ) -> Result<GenerationResponse, Error> {
        self.runtime.block_on(self.inner.generate(provider, request))
    }

    pub fn stream(&self, provider: &str, request: &GenerationRequest) -> Result<BlockingStream, Error> {
        let stream = self.runtime.block_on(self.inner.stream(provider, request))?;
        Ok(BlockingStream::new(stream, self.runtime.clone()))
    }

    pub fn list_models(&self) -> BTreeMap<String, Vec<String>> {
        self.runtime.block_on(self.inner.list_models())
    }

    pub fn model_info(&self, provider: &str, model: &str) -> Result<ModelInfo, Error> {
        self.runtime.block_on(self.inner.model_info(provider, model))
    }

    pub fn conversation(
        &self,
        provider: &str,
        model: impl Into<String>,
    ) -> Result<BlockingConversation, Error> {
        let conversation = self
            .runtime
            .block_on(self.inner.conversation(provider, model))?;
        Ok(BlockingConversation {
            inner: conversation,
            runtime: self.runtime.clone(),
        })
    }
}

/// Blocking version of [`Conversation`].
pub struct BlockingConversation {
    inner: Conversation,
    runtime: Arc<Runtime>,
}

impl BlockingConversation {
    pub fn new(conversation: Conversation) -> Result<Self, Error> {
        Ok(Self {
            inner: conversation,
            runtime: runtime()?,
        })
    }

    pub fn system(mut self, prompt: impl Into<String>) -> Self {
        self.inner = self.inner.system(prompt);
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.inner = self.inner.temperature(temperature);
        self
    }

    pub fn delivery(mut self, delivery: ContentDelivery) -> Self {
        self.inner = self.inner.delivery(delivery);
        self
    }

    pub fn json_output(mut self, json_output: bool) -> Self {
        self.inner = self.inner.json_output(json_output);
        self
    }

    pub fn send(&mut self, input: impl Into<UserInput>) -> Result<GenerationResponse, Error> {
        self.runtime.block_on(self.inner.send(input))
    }

    pub fn stream(&self, input: impl Into<UserInput>) -> Result<BlockingStream, Error> {
        let stream = self.runtime.block_on(self.inner.stream(input))?;
        Ok(BlockingStream::new(stream, self.runtime.clone()))
    }

    pub fn history(&self) -> &[Message] {
        self.inner.history()
    }

    pub fn clear(&mut self) {
        self.inner.clear();
    }

    pub fn into_inner(self) -> Conversation {
        self.inner
    }
}

/// Iterator over streamed text chunks.
pub struct BlockingStream {
    stream: TextStream,
    runtime: Arc<Runtime>,
}

impl BlockingStream {
    fn new(stream: TextStream, runtime: Arc<Runtime>) -> Self {
        Self { stream, runtime }
    }
}

impl Iterator for BlockingStream {
    type Item = Result<String, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        self.runtime.block_on(self.stream.next())
    }
}
