//! Provider registry and dispatch.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::str::FromStr;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::extract::{DocumentExtractor, HttpExtractor};
use crate::provider::Provider;
use crate::providers::{AnthropicProvider, GoogleProvider, OllamaProvider, OpenAICompatProvider};
use crate::{Conversation, Error, GenerationRequest, GenerationResponse, ModelInfo, Settings, TextStream};

/// Builds a provider from settings.
#[async_trait::async_trait]
pub trait ProviderFactory: Send + Sync + 'static {
    async fn create(&self, settings: &Settings) -> Result<Arc<dyn Provider>, Error>;
}

/// Supported LLM providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    Google,
    Anthropic,
    OpenAI,
    OpenRouter,
    Ollama,
    Cerebras,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 6] = [
        ProviderKind::Google,
        ProviderKind::Anthropic,
        ProviderKind::OpenAI,
        ProviderKind::OpenRouter,
        ProviderKind::Ollama,
        ProviderKind::Cerebras,
    ];

    /// Registry key.
    pub fn key(&self) -> &'static str {
        match self {
            ProviderKind::Google => "google",
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::OpenAI => "openai",
            ProviderKind::OpenRouter => "openrouter",
            ProviderKind::Ollama => "ollama",
            ProviderKind::Cerebras => "cerebras",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for ProviderKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProviderKind::ALL
            .into_iter()
            .find(|kind| kind.key().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::UnknownProvider(s.to_string()))
    }
}

fn extractor(settings: &Settings) -> Result<Option<Arc<dyn DocumentExtractor>>, Error> {
    match &settings.extractor_url {
        Some(url) => Ok(Some(Arc::new(HttpExtractor::new(url)?))),
        None => Ok(None),
    }
}

#[async_trait::async_trait]
impl ProviderFactory for ProviderKind {
    async fn create(&self, settings: &Settings) -> Result<Arc<dyn Provider>, Error> {
        let extractor = extractor(settings)?;
        let timeout = settings.request_timeout;

        let provider: Arc<dyn Provider> = match self {
            ProviderKind::OpenAI => {
                let key = Settings::require(&settings.openai_api_key, "OPENAI_API_KEY")?;
                let provider = OpenAICompatProvider::openai(key)?;
                let provider = match &settings.openai_base_url {
                    Some(url) => provider.with_base_url(url),
                    None => provider,
                };
                Arc::new(provider.with_timeout(timeout)?.with_extractor(extractor))
            }
            ProviderKind::OpenRouter => {
                let key = Settings::require(&settings.openrouter_api_key, "OPENROUTER_API_KEY")?;
                Arc::new(
                    OpenAICompatProvider::openrouter(key)?
                        .with_timeout(timeout)?
                        .with_extractor(extractor),
                )
            }
            ProviderKind::Cerebras => {
                let key = Settings::require(&settings.cerebras_api_key, "CEREBRAS_API_KEY")?;
                Arc::new(
                    OpenAICompatProvider::cerebras(key)?
                        .with_timeout(timeout)?
                        .with_extractor(extractor),
                )
            }
            ProviderKind::Anthropic => {
                let key = Settings::require(&settings.anthropic_api_key, "ANTHROPIC_API_KEY")?;
                Arc::new(
                    AnthropicProvider::new(key)?
                        .with_timeout(timeout)?
                        .with_extractor(extractor),
                )
            }
            ProviderKind::Google => {
                let provider = if let Some(key) = &settings.gemini_api_key {
                    GoogleProvider::gemini(key)?
                } else {
                    let project_id =
                        Settings::require(&settings.google_cloud_project, "GOOGLE_CLOUD_PROJECT")
                            .map_err(|_| {
                                Error::config(
                                    "GEMINI_API_KEY or GOOGLE_CLOUD_PROJECT is required for Google",
                                )
                            })?;
                    let location = settings.google_cloud_region.as_str();
                    match &settings.vertex_access_token {
                        Some(token) => GoogleProvider::vertex(project_id, location, token)?,
                        None => GoogleProvider::vertex_with_adc(project_id, location).await?,
                    }
                };
                Arc::new(provider.with_timeout(timeout)?.with_extractor(extractor))
            }
            ProviderKind::Ollama => Arc::new(
                OllamaProvider::new(&settings.ollama_base_url)?
                    .with_timeout(timeout)?
                    .with_extractor(extractor),
            ),
        };

        Ok(provider)
    }
}

type CreateFuture = Pin<Box<dyn Future<Output = Result<Arc<dyn Provider>, Error>> + Send>>;
type BoxedCreate = dyn Fn(&Settings) -> CreateFuture + Send + Sync;

/// Adapts a closure into a [`ProviderFactory`].
pub struct FnFactory {
    create: Box<BoxedCreate>,
}

impl FnFactory {
    pub fn new<F, Fut>(create: F) -> Self
    where
        F: Fn(Settings) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Arc<dyn Provider>, Error>> + Send + 'static,
    {
        Self {
            create: Box::new(move |settings: &Settings| -> CreateFuture {
                Box::pin(create(settings.clone()))
            }),
        }
    }
}

#[async_trait::async_trait]
impl ProviderFactory for FnFactory {
    async fn create(&self, settings: &Settings) -> Result<Arc<dyn Provider>, Error> {
        (self.create)(settings).await
    }
}

/// Registry mapping provider keys to factories, with lazily built adapters.
pub struct Manager {
    settings: Arc<Settings>,
    factories: RwLock<BTreeMap<String, Arc<dyn ProviderFactory>>>,
    cache: RwLock<HashMap<String, Arc<dyn Provider>>>,
}

impl Manager {
    /// Create a manager with every built-in provider registered.
    pub fn new(settings: Settings) -> Self {
        let factories = ProviderKind::ALL
            .into_iter()
            .map(|kind| {
                (
                    kind.key().to_string(),
                    Arc::new(kind) as Arc<dyn ProviderFactory>,
                )
            })
            .collect();

        Self {
            settings: Arc::new(settings),
            factories: RwLock::new(factories),
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Create a manager with no providers registered.
    pub fn empty(settings: Settings) -> Self {
        Self {
            settings: Arc::new(settings),
            factories: RwLock::new(BTreeMap::new()),
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Settings from `.env` and the environment.
    pub fn from_env() -> Result<Self, Error> {
        Ok(Self::new(Settings::from_dotenv()?))
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Add or replace the factory for `name`.
    pub async fn register(&self, name: impl Into<String>, factory: Arc<dyn ProviderFactory>) {
        let name = name.into();
        let mut factories = self.factories.write().await;
        self.cache.write().await.remove(&name);
        factories.insert(name, factory);
    }

    /// Register a closure as the factory for `name`.
    pub async fn register_fn<F, Fut>(&self, name: impl Into<String>, create: F)
    where
        F: Fn(Settings) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Arc<dyn Provider>, Error>> + Send + 'static,
    {
        self.register(name, Arc::new(FnFactory::new(create))).await;
    }

    /// Registered provider keys, sorted.
    pub async fn providers(&self) -> Vec<String> {
        self.factories.read().await.keys().cloned().collect()
    }

    /// Resolve `name` to an adapter, constructing it on first use.
    pub async fn provider(&self, name: &str) -> Result<Arc<dyn Provider>, Error> {
        if let Some(provider) = self.cache.read().await.get(name) {
            return Ok(provider.clone());
        }

        let factory = self
            .factories
            .read()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| Error::UnknownProvider(name.to_string()))?;

        debug!(provider = name, "Constructing provider");
        let provider = factory.create(&self.settings).await?;

        // Same lock order as `register`: factories, then cache.
        let factories = self.factories.read().await;
        let current = factories
            .get(name)
            .is_some_and(|registered| Arc::ptr_eq(registered, &factory));
        if !current {
            return Ok(provider);
        }
        let mut cache = self.cache.write().await;
        Ok(cache
            .entry(name.to_string())
            .or_insert(provider)
            .clone())
    }

    pub async fn generate(
        &self,
        provider: &str,
        request: &GenerationRequest,
    ) -> Result<GenerationResponse, Error> {
        self.provider(provider).await?.generate(request).await
    }

    pub async fn stream(
        &self,
        provider: &str,
        request: &GenerationRequest,
    ) -> Result<TextStream, Error> {
        self.provider(provider).await?.stream(request).await
    }

    /// Models per registered provider. A provider that cannot be built or
    /// listed maps to an empty list.
    pub async fn list_models(&self) -> BTreeMap<String, Vec<String>> {
        let mut all = BTreeMap::new();
        for name in self.providers().await {
            let models = match self.provider(&name).await {
                Ok(provider) => provider.list_models().await,
                Err(e) => Err(e),
            };
            let models = models.unwrap_or_else(|e| {
                warn!(provider = %name, error = %e, "Could not list models");
                Vec::new()
            });
            all.insert(name, models);
        }
        all
    }

    pub async fn model_info(&self, provider: &str, model: &str) -> Result<ModelInfo, Error> {
        self.provider(provider).await?.model_info(model).await
    }

    /// Open a conversation on `provider` with `model`.
    pub async fn conversation(
        &self,
        provider: &str,
        model: impl Into<String>,
    ) -> Result<Conversation, Error> {
        Ok(Conversation::new(self.provider(provider).await?, model))
    }
}
