use std::fmt;
use std::str::FromStr;

use crate::error::ConfigurationError;

/// `provider:model_id`, or a bare `provider` whose model id comes from config
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModelRef {
    pub provider: String,
    pub model_id: Option<String>,
}

impl ModelRef {
    pub fn new(provider: impl Into<String>, model_id: Option<String>) -> Self {
        Self {
            provider: provider.into(),
            model_id,
        }
    }
}

impl FromStr for ModelRef {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (provider, model_id) = match s.split_once(':') {
            Some((provider, model_id)) => (provider.trim(), Some(model_id.trim())),
            None => (s, None),
        };
        if provider.is_empty() || model_id.is_some_and(str::is_empty) {
            return Err(ConfigurationError::InvalidModelRef(s.to_string()));
        }
        Ok(ModelRef::new(provider, model_id.map(str::to_string)))
    }
}

impl fmt::Display for ModelRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.model_id {
            Some(model_id) => write!(f, "{}:{}", self.provider, model_id),
            None => f.write_str(&self.provider),
        }
    }
}
