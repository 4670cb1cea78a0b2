//! Category → retriever bindings.
//!
//! A registry is built once and read-only afterwards. It is total over its
//! category set: [`RegistryBuilder::build`] refuses to produce a registry with
//! an unbound category, so [`RetrieverRegistry::resolve`] cannot fail.

use crate::classify::{Category, Language, Topic};
use crate::config::{RetrieverSpec, RouterConfig};
use crate::error::ConfigError;
use crate::retrievers::WikipediaRetriever;
use crate::RetrieverHandle;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

#[derive(Clone)]
struct Binding {
    description: String,
    handles: Vec<RetrieverHandle>,
}

/// Result of a lookup: the category actually served plus its handles.
#[derive(Clone)]
pub struct Resolved<C: Category> {
    /// Differs from the requested category when the allow-list redirected it.
    pub category: C,
    pub redirected: bool,
    pub description: String,
    pub handles: Vec<RetrieverHandle>,
}

impl<C: Category> Resolved<C> {
    pub fn source_names(&self) -> Vec<&'static str> {
        self.handles.iter().map(|h| h.name()).collect()
    }
}

/// One row of [`RetrieverRegistry::bindings`], for display.
#[derive(Debug, Clone, Serialize)]
pub struct BindingInfo {
    pub category: String,
    pub description: String,
    pub sources: Vec<String>,
    pub allowed: bool,
}

pub struct RetrieverRegistry<C: Category> {
    bindings: HashMap<C, Binding>,
    allowed: Option<Vec<C>>,
    fallback: C,
}

impl<C: Category> RetrieverRegistry<C> {
    pub fn builder(fallback: C) -> RegistryBuilder<C> {
        RegistryBuilder {
            bindings: HashMap::new(),
            allowed: None,
            fallback,
        }
    }

    pub fn fallback(&self) -> C {
        self.fallback
    }

    pub fn is_allowed(&self, category: C) -> bool {
        self.allowed
            .as_ref()
            .map_or(true, |allowed| allowed.contains(&category))
    }

    /// Handles for `category`, or for the fallback when `category` is outside
    /// the allow-list.
    pub fn resolve(&self, category: C) -> Resolved<C> {
        let effective = if self.is_allowed(category) {
            category
        } else {
            debug!(
                requested = %category,
                fallback = %self.fallback,
                "Category not allowed, using fallback"
            );
            self.fallback
        };

        // build() guarantees every category has a binding.
        let binding = self
            .bindings
            .get(&effective)
            .or_else(|| self.bindings.get(&self.fallback))
            .cloned()
            .unwrap_or_else(|| Binding {
                description: String::new(),
                handles: Vec::new(),
            });

        Resolved {
            category: effective,
            redirected: effective != category,
            description: binding.description,
            handles: binding.handles,
        }
    }

    /// Every binding in category declaration order.
    pub fn bindings(&self) -> Vec<BindingInfo> {
        C::all()
            .iter()
            .filter_map(|c| {
                self.bindings.get(c).map(|b| BindingInfo {
                    category: c.as_str().to_string(),
                    description: b.description.clone(),
                    sources: b.handles.iter().map(|h| h.name().to_string()).collect(),
                    allowed: self.is_allowed(*c),
                })
            })
            .collect()
    }
}

pub struct RegistryBuilder<C: Category> {
    bindings: HashMap<C, Binding>,
    allowed: Option<Vec<C>>,
    fallback: C,
}

impl<C: Category> RegistryBuilder<C> {
    /// Bind `category` to `handles`. Rebinding replaces the earlier entry.
    pub fn bind(
        mut self,
        category: C,
        description: impl Into<String>,
        handles: Vec<RetrieverHandle>,
    ) -> Self {
        self.bindings.insert(
            category,
            Binding {
                description: description.into(),
                handles,
            },
        );
        self
    }

    /// Restrict resolution to `allowed`; anything else resolves to the fallback.
    pub fn allow(mut self, allowed: Vec<C>) -> Self {
        self.allowed = Some(allowed);
        self
    }

    pub fn build(self) -> Result<RetrieverRegistry<C>, ConfigError> {
        if let Some(missing) = C::all().iter().find(|c| !self.bindings.contains_key(*c)) {
            return Err(ConfigError::MissingBinding(missing.as_str().to_string()));
        }
        if let Some(empty) = C::all()
            .iter()
            .find(|c| self.bindings.get(*c).map_or(false, |b| b.handles.is_empty()))
        {
            return Err(ConfigError::Invalid(format!(
                "category '{}' is bound to no retriever",
                empty
            )));
        }
        if let Some(allowed) = &self.allowed {
            if !allowed.contains(&self.fallback) {
                return Err(ConfigError::Invalid(format!(
                    "fallback category '{}' is not in the allow-list",
                    self.fallback
                )));
            }
        }
        Ok(RetrieverRegistry {
            bindings: self.bindings,
            allowed: self.allowed,
            fallback: self.fallback,
        })
    }
}

fn build_handle(spec: &RetrieverSpec, timeout_ms: u64) -> Result<RetrieverHandle, ConfigError> {
    spec.build(timeout_ms)
        .map_err(|e| ConfigError::Invalid(format!("cannot build retriever: {}", e)))
}

/// Topic registry: one backend per topic, as configured.
pub fn topic_registry(config: &RouterConfig) -> Result<RetrieverRegistry<Topic>, ConfigError> {
    let mut builder = RetrieverRegistry::builder(config.default_topic);
    for topic in Topic::all() {
        let spec = config
            .topics
            .get(topic)
            .ok_or_else(|| ConfigError::MissingBinding(topic.as_str().to_string()))?;
        let handle = build_handle(spec, config.timeout_ms)?;
        let description = handle.description().to_string();
        builder = builder.bind(*topic, description, vec![handle]);
    }
    builder.build()
}

/// Language registry: one Wikipedia edition per language, restricted to the
/// supported allow-list with the default language as fallback.
pub fn language_registry(
    config: &RouterConfig,
) -> Result<RetrieverRegistry<Language>, ConfigError> {
    let mut builder = RetrieverRegistry::builder(config.default_language)
        .allow(config.supported_languages.clone());
    for language in Language::all() {
        let retriever =
            WikipediaRetriever::new(language.as_str(), config.wikipedia_top_k, config.timeout_ms)
                .map_err(|e| ConfigError::Invalid(format!("cannot build retriever: {}", e)))?;
        let description = format!("Wikipedia {} ({})", language.as_str(), language.name());
        builder = builder.bind(*language, description, vec![Arc::new(retriever)]);
    }
    builder.build()
}
