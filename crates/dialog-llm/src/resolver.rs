//! Backend resolver
//!
//! Turns a `provider:model_id` reference into a ready [`ModelBackend`] using
//! the provider settings in [`Config`].

use std::collections::BTreeMap;
use std::sync::Arc;

use dialog_core::{Config, ProviderConfig};

use crate::backend::ModelBackend;
use crate::error::{ConfigurationError, Result};
use crate::model_ref::ModelRef;
use crate::providers;

/// Providers registered by [`BackendResolver::new`] even when unconfigured
pub const BUILTIN_PROVIDERS: &[&str] = &["openai", "groq", "ollama"];

/// Builds a backend for one provider
pub trait BackendFactory: Send + Sync {
    fn create(
        &self,
        provider: &str,
        model_id: &str,
        settings: &ProviderConfig,
    ) -> Result<Arc<dyn ModelBackend>>;
}

impl<F> BackendFactory for F
where
    F: Fn(&str, &str, &ProviderConfig) -> Result<Arc<dyn ModelBackend>> + Send + Sync,
{
    fn create(
        &self,
        provider: &str,
        model_id: &str,
        settings: &ProviderConfig,
    ) -> Result<Arc<dyn ModelBackend>> {
        self(provider, model_id, settings)
    }
}

/// Chooses a model when none is configured, e.g. by prompting the user
pub trait ModelSelector: Send + Sync {
    fn select_model(&self, available: &[String]) -> Option<String>;
}

pub struct BackendResolver {
    config: Config,
    factories: BTreeMap<String, Arc<dyn BackendFactory>>,
    selector: Option<Arc<dyn ModelSelector>>,
}

impl BackendResolver {
    /// Resolver with the OpenAI-compatible factory registered for the
    /// built-in providers and every provider named in `config`.
    pub fn new(config: Config) -> Self {
        let mut resolver = Self::empty(config);
        let names: Vec<String> = BUILTIN_PROVIDERS
            .iter()
            .map(|name| name.to_string())
            .chain(resolver.config.providers.keys().cloned())
            .collect();
        for name in names {
            resolver.register(name, Arc::new(providers::create_openai_compatible));
        }
        resolver
    }

    pub fn empty(config: Config) -> Self {
        Self {
            config,
            factories: BTreeMap::new(),
            selector: None,
        }
    }

    pub fn register(&mut self, provider: impl Into<String>, factory: Arc<dyn BackendFactory>) {
        self.factories.insert(provider.into(), factory);
    }

    pub fn with_factory(mut self, provider: impl Into<String>, factory: Arc<dyn BackendFactory>) -> Self {
        self.register(provider, factory);
        self
    }

    pub fn with_selector(mut self, selector: Arc<dyn ModelSelector>) -> Self {
        self.selector = Some(selector);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn providers(&self) -> Vec<String> {
        self.factories.keys().cloned().collect()
    }

    /// One entry per registered provider: `provider:model` when the config
    /// names a default model, else the bare provider.
    pub fn available_models(&self) -> Vec<String> {
        self.factories
            .keys()
            .map(|provider| {
                match self
                    .config
                    .provider(provider)
                    .and_then(|settings| settings.model.as_deref())
                    .filter(|model| !model.is_empty())
                {
                    Some(model) => format!("{provider}:{model}"),
                    None => provider.clone(),
                }
            })
            .collect()
    }

    /// `requested`, else the configured model, else the selector's choice.
    pub fn resolve_model_ref(&self, requested: Option<&str>) -> Result<ModelRef> {
        let name = requested
            .filter(|name| !name.trim().is_empty())
            .map(str::to_string)
            .or_else(|| self.config.model.clone().filter(|name| !name.trim().is_empty()))
            .or_else(|| {
                self.selector
                    .as_ref()
                    .and_then(|selector| selector.select_model(&self.available_models()))
            })
            .ok_or(ConfigurationError::NoModelConfigured)?;
        name.parse()
    }

    pub fn initialize(&self, model: &ModelRef) -> Result<Arc<dyn ModelBackend>> {
        let factory = self.factories.get(&model.provider).ok_or_else(|| {
            ConfigurationError::UnknownProvider {
                provider: model.provider.clone(),
                available: self.providers().join(", "),
            }
        })?;

        let settings = self
            .config
            .provider(&model.provider)
            .cloned()
            .unwrap_or_default();
        let model_id = model
            .model_id
            .clone()
            .or_else(|| settings.model.clone())
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ConfigurationError::MissingSettings {
                provider: model.provider.clone(),
                reason: "no model id given".to_string(),
            })?;

        let backend = factory.create(&model.provider, &model_id, &settings)?;
        log::info!("Initialized {}:{} backend", model.provider, model_id);
        Ok(backend)
    }

    pub fn resolve(&self, requested: Option<&str>) -> Result<Arc<dyn ModelBackend>> {
        let model = self.resolve_model_ref(requested)?;
        self.initialize(&model)
    }
}
