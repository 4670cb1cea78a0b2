use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use vazhi_core::classify::{
    Category, DetectError, FixedClassifier, Language, LanguageClassifier, LanguageDetector,
    LlmTopicClassifier, Topic,
};
use vazhi_core::pipeline::{AnswerPipeline, NO_CONTEXT_ANSWER};
use vazhi_core::{
    Aggregator, ContextFormatter, FallbackReason, GenerationError, Generator, PipelineError,
    RetrievalError, Retriever, RetrieverHandle, RetrieverRegistry, SourceRecord, SourceStatus,
};

// ---------------------------------------------------------------------------
// Fakes
// ---------------------------------------------------------------------------

struct StaticRetriever {
    name: &'static str,
    texts: Vec<String>,
    calls: AtomicUsize,
}

impl StaticRetriever {
    fn new(name: &'static str, texts: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            name,
            texts: texts.iter().map(|t| t.to_string()).collect(),
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl Retriever for StaticRetriever {
    fn name(&self) -> &'static str {
        self.name
    }
    fn description(&self) -> &str {
        self.name
    }
    fn max_results(&self) -> usize {
        10
    }
    async fn fetch(&self, _query: &str) -> Result<Vec<SourceRecord>, RetrievalError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .texts
            .iter()
            .enumerate()
            .map(|(i, t)| SourceRecord::labeled(self.name, format!("{} {}", self.name, i + 1), t))
            .collect())
    }
}

struct FailingRetriever;

#[async_trait]
impl Retriever for FailingRetriever {
    fn name(&self) -> &'static str {
        "failing"
    }
    fn description(&self) -> &str {
        "always down"
    }
    fn max_results(&self) -> usize {
        10
    }
    async fn fetch(&self, _query: &str) -> Result<Vec<SourceRecord>, RetrievalError> {
        Err(RetrievalError::RateLimited)
    }
}

struct SlowRetriever;

#[async_trait]
impl Retriever for SlowRetriever {
    fn name(&self) -> &'static str {
        "slow"
    }
    fn description(&self) -> &str {
        "never in time"
    }
    fn max_results(&self) -> usize {
        10
    }
    async fn fetch(&self, _query: &str) -> Result<Vec<SourceRecord>, RetrievalError> {
        tokio::time::sleep(Duration::from_secs(10)).await;
        Ok(vec![SourceRecord::labeled("slow", "late", "late")])
    }
}

/// Returns canned replies in order and records every prompt it sees.
struct ScriptedGenerator {
    replies: Mutex<Vec<Result<String, GenerationError>>>,
    prompts: Mutex<Vec<String>>,
    delay: Option<Duration>,
}

impl ScriptedGenerator {
    fn new(replies: Vec<Result<String, GenerationError>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into_iter().rev().collect()),
            prompts: Mutex::new(Vec::new()),
            delay: None,
        })
    }

    fn slow(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(vec![Ok("too late".into())]),
            prompts: Mutex::new(Vec::new()),
            delay: Some(delay),
        })
    }

    fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl Generator for ScriptedGenerator {
    fn name(&self) -> &str {
        "scripted"
    }
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.replies
            .lock()
            .unwrap()
            .pop()
            .unwrap_or(Err(GenerationError::EmptyResponse))
    }
}

struct FixedCode(&'static str);

#[async_trait]
impl LanguageDetector for FixedCode {
    async fn detect(&self, _text: &str) -> Result<String, DetectError> {
        Ok(self.0.to_string())
    }
}

fn handle<R: Retriever + 'static>(retriever: Arc<R>) -> RetrieverHandle {
    retriever
}

fn topic_registry(news: RetrieverHandle) -> RetrieverRegistry<Topic> {
    RetrieverRegistry::builder(Topic::General)
        .bind(
            Topic::Academic,
            "arXiv (academic papers)",
            vec![handle(StaticRetriever::new("arxiv", &["paper"]))],
        )
        .bind(
            Topic::General,
            "Wikipedia (general knowledge)",
            vec![handle(StaticRetriever::new("wikipedia", &["article"]))],
        )
        .bind(Topic::CurrentEvents, "Tavily (current news/web)", vec![news])
        .build()
        .unwrap()
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_news_query_with_no_results_skips_generation() {
    let news = StaticRetriever::new("tavily", &[]);
    // The classifier and the answer step share one scripted backend.
    let generator = ScriptedGenerator::new(vec![Ok("current_events".into())]);
    let classifier = LlmTopicClassifier::new(generator.clone(), Topic::General, 1_000);

    let pipeline = AnswerPipeline::new(
        Arc::new(classifier),
        Arc::new(topic_registry(news.clone())),
        generator.clone(),
    );

    let result = pipeline
        .answer("Latest developments in AI regulation")
        .await
        .unwrap();

    assert_eq!(result.category, Topic::CurrentEvents);
    assert_eq!(result.answer, NO_CONTEXT_ANSWER);
    assert!(!result.grounded);
    assert!(result.context.is_empty());
    assert_eq!(result.trace.sources.len(), 1);
    assert_eq!(result.trace.sources[0].source, "tavily");
    assert_eq!(result.trace.sources[0].status, SourceStatus::Empty);
    assert_eq!(news.calls.load(Ordering::SeqCst), 1);
    // Only the classification call reached the backend.
    assert_eq!(generator.calls(), 1);
}

/// English and Spanish allowed, English as the fallback edition.
fn language_setup(
    code: &'static str,
) -> (
    AnswerPipeline<Language>,
    Arc<StaticRetriever>,
    Arc<ScriptedGenerator>,
) {
    let en = StaticRetriever::new("wikipedia-en", &["English article"]);
    let mut builder =
        RetrieverRegistry::builder(Language::En).allow(vec![Language::En, Language::Es]);
    for language in Language::all() {
        let handle: RetrieverHandle = if *language == Language::En {
            en.clone()
        } else {
            StaticRetriever::new("wikipedia-other", &["other article"])
        };
        builder = builder.bind(*language, format!("Wikipedia {}", language), vec![handle]);
    }

    let classifier = LanguageClassifier::new(
        Arc::new(FixedCode(code)),
        vec![Language::En, Language::Es],
        Language::En,
        1_000,
    );
    let generator = ScriptedGenerator::new(vec![Ok("An answer.".into())]);
    let pipeline = AnswerPipeline::new(
        Arc::new(classifier),
        Arc::new(builder.build().unwrap()),
        generator.clone(),
    );
    (pipeline, en, generator)
}

#[tokio::test]
async fn test_unsupported_language_falls_back_to_default() {
    let (pipeline, en, generator) = language_setup("xx");

    let result = pipeline.answer("zzz qqq").await.unwrap();

    assert_eq!(result.category, Language::En);
    assert_eq!(result.trace.fallback, Some(FallbackReason::Unsupported));
    assert_eq!(result.trace.raw_label.as_deref(), Some("xx"));
    assert_eq!(en.calls.load(Ordering::SeqCst), 1);
    assert!(generator
        .last_prompt()
        .unwrap()
        .contains("Always answer in the target language: English."));

    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["category"], "en");
}

#[tokio::test]
async fn test_unsupported_known_language_still_sets_answer_language() {
    let (pipeline, en, generator) = language_setup("zh-cn");

    let result = pipeline.answer("北京是中国的首都吗").await.unwrap();

    // Retrieval falls back to the English edition...
    assert_eq!(result.category, Language::En);
    assert_eq!(result.trace.fallback, Some(FallbackReason::Unsupported));
    assert_eq!(result.trace.raw_label.as_deref(), Some("zh-cn"));
    assert_eq!(en.calls.load(Ordering::SeqCst), 1);
    // ...but the answer is requested in the asker's language.
    let prompt = generator.last_prompt().unwrap();
    assert!(prompt.contains("Always answer in the target language: Chinese (Simplified)."));
    assert!(!prompt.contains("target language: English"));
}

#[tokio::test]
async fn test_partial_failure_keeps_surviving_records() {
    let good = StaticRetriever::new("good", &["one", "two", "three"]);
    let registry = RetrieverRegistry::builder(Topic::General)
        .bind(
            Topic::Academic,
            "papers",
            vec![handle(StaticRetriever::new("arxiv", &["paper"]))],
        )
        .bind(
            Topic::General,
            "encyclopedia",
            vec![handle(StaticRetriever::new("wikipedia", &["article"]))],
        )
        .bind(
            Topic::CurrentEvents,
            "news + slow",
            vec![handle(good.clone()), handle(Arc::new(SlowRetriever))],
        )
        .build()
        .unwrap();

    let generator = ScriptedGenerator::new(vec![Ok("grounded answer".into())]);
    let pipeline = AnswerPipeline::new(
        Arc::new(FixedClassifier::new(Topic::CurrentEvents)),
        Arc::new(registry),
        generator.clone(),
    )
    .with_aggregator(Aggregator::new(100));

    let result = pipeline.answer("q").await.unwrap();

    assert!(result.grounded);
    assert_eq!(result.answer, "grounded answer");
    assert_eq!(result.context.record_count, 3);
    assert_eq!(
        result.context.text,
        "[good 1]\none\n\n[good 2]\ntwo\n\n[good 3]\nthree"
    );
    match &result.trace.sources[1].status {
        SourceStatus::Failed { is_timeout, .. } => assert!(*is_timeout),
        other => panic!("expected a timeout, got {:?}", other),
    }
    assert_eq!(generator.calls(), 1);
}

#[tokio::test]
async fn test_total_failure_short_circuits() {
    let generator = ScriptedGenerator::new(vec![]);
    let pipeline = AnswerPipeline::new(
        Arc::new(FixedClassifier::new(Topic::CurrentEvents)),
        Arc::new(topic_registry(Arc::new(FailingRetriever))),
        generator.clone(),
    );

    let result = pipeline.answer("q").await.unwrap();
    assert!(!result.grounded);
    assert!(result.trace.sources[0].is_failure());
    assert_eq!(generator.calls(), 0);
}

#[tokio::test]
async fn test_classifier_backend_failure_routes_to_default() {
    let generator = ScriptedGenerator::new(vec![
        Err(GenerationError::Timeout(5)),
        Ok("encyclopedic answer".into()),
    ]);
    let classifier = LlmTopicClassifier::new(generator.clone(), Topic::General, 1_000);
    let pipeline = AnswerPipeline::new(
        Arc::new(classifier),
        Arc::new(topic_registry(StaticRetriever::new("tavily", &["news"]))),
        generator.clone(),
    );

    let result = pipeline.answer("History of the Eiffel Tower").await.unwrap();
    assert_eq!(result.category, Topic::General);
    assert_eq!(result.trace.fallback, Some(FallbackReason::BackendUnavailable));
    assert_eq!(result.answer, "encyclopedic answer");
}

#[tokio::test]
async fn test_generation_failure_is_surfaced() {
    let generator = ScriptedGenerator::new(vec![Err(GenerationError::Status {
        status: 500,
        body: "boom".into(),
    })]);
    let pipeline = AnswerPipeline::new(
        Arc::new(FixedClassifier::new(Topic::Academic)),
        Arc::new(topic_registry(StaticRetriever::new("tavily", &[]))),
        generator,
    );

    let err = pipeline.answer("q").await.unwrap_err();
    assert!(matches!(
        err,
        PipelineError::GenerationFailed(GenerationError::Status { status: 500, .. })
    ));
}

#[tokio::test]
async fn test_generation_timeout_is_surfaced() {
    let pipeline = AnswerPipeline::new(
        Arc::new(FixedClassifier::new(Topic::Academic)),
        Arc::new(topic_registry(StaticRetriever::new("tavily", &[]))),
        ScriptedGenerator::slow(Duration::from_secs(5)),
    )
    .with_timeout(50);

    let err = pipeline.answer("q").await.unwrap_err();
    assert!(matches!(
        err,
        PipelineError::GenerationFailed(GenerationError::Timeout(50))
    ));
}

#[tokio::test]
async fn test_context_respects_record_budget() {
    let long = "x".repeat(50);
    let registry = RetrieverRegistry::builder(Topic::General)
        .bind(
            Topic::Academic,
            "papers",
            vec![handle(StaticRetriever::new("arxiv", &[long.as_str()]))],
        )
        .bind(
            Topic::General,
            "encyclopedia",
            vec![handle(StaticRetriever::new("wikipedia", &["short"]))],
        )
        .bind(
            Topic::CurrentEvents,
            "news",
            vec![handle(StaticRetriever::new("tavily", &["news"]))],
        )
        .build()
        .unwrap();
    let pipeline = AnswerPipeline::new(
        Arc::new(FixedClassifier::new(Topic::Academic)),
        Arc::new(registry),
        ScriptedGenerator::new(vec![]),
    )
    .with_formatter(ContextFormatter::new(10));

    let retrieval = pipeline.retrieve("q").await;
    assert_eq!(retrieval.context.text, "[arxiv 1]\nxxxxxxxxxx [...]");
    assert_eq!(retrieval.context.truncated_count, 1);
}
