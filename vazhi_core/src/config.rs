//! Router configuration.
//!
//! Everything here has a default, so an empty or missing file yields the
//! stock setup: arXiv for academic queries, Wikipedia for general ones and
//! Tavily news for current events. Stored as YAML at
//! `~/.config/vazhi/config.yaml`.

use crate::aggregate::DEFAULT_TIMEOUT_MS;
use crate::classify::{Category, Language, Topic};
use crate::error::{ConfigError, RetrievalError};
use crate::format::DEFAULT_MAX_CHARS_PER_RECORD;
use crate::retrievers::{
    ArxivRetriever, ArxivSort, SearchDepth, TavilyOptions, TavilyRetriever, TavilyTopic,
    WikipediaRetriever,
};
use crate::RetrieverHandle;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const DEFAULT_WIKIPEDIA_TOP_K: usize = 3;
pub const DEFAULT_ARXIV_MAX_RESULTS: usize = 3;
pub const DEFAULT_TAVILY_K: usize = 5;
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";

/// Backend parameters for one binding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RetrieverSpec {
    Arxiv {
        #[serde(default = "default_arxiv_max_results")]
        max_results: usize,
        #[serde(default)]
        sort_by: ArxivSort,
    },
    Wikipedia {
        #[serde(default = "default_wikipedia_top_k")]
        top_k: usize,
        #[serde(default = "default_lang")]
        lang: String,
    },
    Tavily {
        #[serde(default = "default_tavily_k")]
        k: usize,
        #[serde(default)]
        topic: TavilyTopic,
        #[serde(default)]
        depth: SearchDepth,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        include_domains: Vec<String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        exclude_domains: Vec<String>,
    },
}

impl RetrieverSpec {
    pub fn arxiv(max_results: usize) -> Self {
        RetrieverSpec::Arxiv {
            max_results,
            sort_by: ArxivSort::default(),
        }
    }

    pub fn wikipedia(lang: impl Into<String>, top_k: usize) -> Self {
        RetrieverSpec::Wikipedia {
            top_k,
            lang: lang.into(),
        }
    }

    pub fn tavily_news(k: usize) -> Self {
        RetrieverSpec::Tavily {
            k,
            topic: TavilyTopic::News,
            depth: SearchDepth::default(),
            include_domains: Vec::new(),
            exclude_domains: Vec::new(),
        }
    }

    fn result_count(&self) -> usize {
        match self {
            RetrieverSpec::Arxiv { max_results, .. } => *max_results,
            RetrieverSpec::Wikipedia { top_k, .. } => *top_k,
            RetrieverSpec::Tavily { k, .. } => *k,
        }
    }

    /// Instantiate the backend.
    pub fn build(&self, timeout_ms: u64) -> Result<RetrieverHandle, RetrievalError> {
        let handle: RetrieverHandle = match self {
            RetrieverSpec::Arxiv {
                max_results,
                sort_by,
            } => Arc::new(ArxivRetriever::new(*max_results, *sort_by, timeout_ms)?),
            RetrieverSpec::Wikipedia { top_k, lang } => {
                Arc::new(WikipediaRetriever::new(lang.clone(), *top_k, timeout_ms)?)
            }
            RetrieverSpec::Tavily {
                k,
                topic,
                depth,
                include_domains,
                exclude_domains,
            } => Arc::new(TavilyRetriever::new(
                TavilyOptions {
                    k: *k,
                    topic: *topic,
                    depth: *depth,
                    include_domains: include_domains.clone(),
                    exclude_domains: exclude_domains.clone(),
                },
                timeout_ms,
            )?),
        };
        Ok(handle)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub model: String,
    pub temperature: f32,
    /// Overridden by `OPENAI_BASE_URL` when set.
    pub api_base: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.0,
            api_base: DEFAULT_API_BASE.to_string(),
            max_tokens: None,
        }
    }
}

/// Sources for the news digest: recent coverage plus encyclopedic background.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DigestConfig {
    pub news: RetrieverSpec,
    pub background: RetrieverSpec,
}

impl Default for DigestConfig {
    fn default() -> Self {
        Self {
            news: RetrieverSpec::tavily_news(DEFAULT_TAVILY_K),
            background: RetrieverSpec::wikipedia("en", DEFAULT_WIKIPEDIA_TOP_K),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Budget for every external call (retrieval, classification, generation), in ms
    pub timeout_ms: u64,

    /// Per-record character budget in the formatted context
    pub max_chars_per_record: usize,

    /// Extra attempts per source for transient failures
    pub retrieval_retries: u32,

    pub default_topic: Topic,

    pub default_language: Language,

    /// Languages routed to their own Wikipedia edition; anything else falls
    /// back to `default_language`
    pub supported_languages: Vec<Language>,

    /// One binding per topic
    pub topics: BTreeMap<Topic, RetrieverSpec>,

    /// Results per language edition for language routing
    pub wikipedia_top_k: usize,

    /// Papers fetched by the paper summarizer
    pub paper_count: usize,

    pub digest: DigestConfig,

    pub generator: GeneratorConfig,
}

impl Default for RouterConfig {
    fn default() -> Self {
        let mut topics = BTreeMap::new();
        topics.insert(
            Topic::Academic,
            RetrieverSpec::arxiv(DEFAULT_ARXIV_MAX_RESULTS),
        );
        topics.insert(
            Topic::General,
            RetrieverSpec::wikipedia("en", DEFAULT_WIKIPEDIA_TOP_K),
        );
        topics.insert(
            Topic::CurrentEvents,
            RetrieverSpec::tavily_news(DEFAULT_TAVILY_K),
        );

        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
            max_chars_per_record: DEFAULT_MAX_CHARS_PER_RECORD,
            retrieval_retries: 0,
            default_topic: Topic::General,
            default_language: Language::En,
            supported_languages: Language::all().to_vec(),
            topics,
            wikipedia_top_k: DEFAULT_WIKIPEDIA_TOP_K,
            paper_count: DEFAULT_ARXIV_MAX_RESULTS,
            digest: DigestConfig::default(),
            generator: GeneratorConfig::default(),
        }
    }
}

impl RouterConfig {
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let config: RouterConfig = if content.trim().is_empty() {
            RouterConfig::default()
        } else {
            serde_yaml::from_str(content)?
        };
        config.validate()?;
        Ok(config)
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_ms == 0 {
            return Err(ConfigError::Invalid("timeout_ms must be greater than 0".into()));
        }
        if self.max_chars_per_record == 0 {
            return Err(ConfigError::Invalid(
                "max_chars_per_record must be greater than 0".into(),
            ));
        }
        if self.wikipedia_top_k == 0 || self.paper_count == 0 {
            return Err(ConfigError::Invalid(
                "wikipedia_top_k and paper_count must be greater than 0".into(),
            ));
        }
        if self.supported_languages.is_empty() {
            return Err(ConfigError::Invalid("supported_languages is empty".into()));
        }
        if !self.supported_languages.contains(&self.default_language) {
            return Err(ConfigError::Invalid(format!(
                "default_language '{}' is not in supported_languages",
                self.default_language
            )));
        }
        if let Some(topic) = Topic::all().iter().find(|t| !self.topics.contains_key(*t)) {
            return Err(ConfigError::MissingBinding(topic.as_str().to_string()));
        }
        let specs = self
            .topics
            .iter()
            .map(|(topic, spec)| (topic.as_str(), spec))
            .chain([
                ("digest.news", &self.digest.news),
                ("digest.background", &self.digest.background),
            ]);
        for (name, spec) in specs {
            if spec.result_count() == 0 {
                return Err(ConfigError::Invalid(format!(
                    "result count for '{}' must be greater than 0",
                    name
                )));
            }
        }
        if !(0.0..=2.0).contains(&self.generator.temperature) {
            return Err(ConfigError::Invalid(
                "generator.temperature must be between 0 and 2".into(),
            ));
        }
        Ok(())
    }
}

fn default_arxiv_max_results() -> usize {
    DEFAULT_ARXIV_MAX_RESULTS
}

fn default_wikipedia_top_k() -> usize {
    DEFAULT_WIKIPEDIA_TOP_K
}

fn default_tavily_k() -> usize {
    DEFAULT_TAVILY_K
}

fn default_lang() -> String {
    "en".to_string()
}

/// Storage for the router configuration.
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    /// Store at `~/.config/vazhi/config.yaml` (or the platform equivalent).
    pub fn new_default() -> Self {
        let base = dirs::config_dir()
            .or_else(|| dirs::home_dir().map(|p| p.join(".config")))
            .unwrap_or_else(|| PathBuf::from("."));
        Self {
            path: base.join("vazhi").join("config.yaml"),
        }
    }

    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Load the config; a missing file yields the defaults.
    pub fn load(&self) -> Result<RouterConfig, ConfigError> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => RouterConfig::from_yaml(&content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(RouterConfig::default()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn save(&self, config: &RouterConfig) -> Result<(), ConfigError> {
        config.validate()?;
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, config.to_yaml()?)?;
        Ok(())
    }
}
