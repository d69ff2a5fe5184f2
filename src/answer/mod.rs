pub mod prompts;

use std::sync::Arc;

use thiserror::Error;
use tracing::{error, info};

use crate::extract::ContentExtractor;
use crate::llm::{ChatCompletion, ChatOptions, CompletionError};

#[derive(Debug, Error)]
pub enum AskError {
    #[error("completion failed: {0}")]
    Completion(#[from] CompletionError),
}

/// Answers questions strictly from the article on one fixed source page.
pub struct Answerer {
    extractor: Arc<ContentExtractor>,
    llm: Arc<dyn ChatCompletion>,
    source_url: String,
    options: ChatOptions,
}

impl Answerer {
    pub fn new(
        extractor: Arc<ContentExtractor>,
        llm: Arc<dyn ChatCompletion>,
        source_url: impl Into<String>,
    ) -> Self {
        Self {
            extractor,
            llm,
            source_url: source_url.into(),
            options: ChatOptions::default(),
        }
    }

    pub fn source_url(&self) -> &str {
        &self.source_url
    }

    /// One fetch, then one completion call. Extraction failures become
    /// empty context; the refusal for that case is left to the model.
    pub async fn try_ask(&self, question: &str) -> Result<String, AskError> {
        let context = self.extractor.extract(&self.source_url).await;
        info!(
            question_len = question.len(),
            context_len = context.len(),
            "answering question"
        );

        let messages = prompts::build_messages(&context, question);
        let answer = self.llm.complete(&messages, &self.options).await?;
        if answer.trim() == prompts::REFUSAL {
            info!(context_len = context.len(), "model declined: context insufficient");
        }
        Ok(answer)
    }

    /// Like [`Answerer::try_ask`] but a failed completion yields an empty answer.
    pub async fn ask(&self, question: &str) -> String {
        match self.try_ask(question).await {
            Ok(answer) => answer,
            Err(AskError::Completion(e)) => {
                error!(kind = e.kind(), error = %e, "completion call failed");
                String::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use axum::{
        response::Html,
        routing::{get, post},
        Json, Router,
    };

    use crate::llm::{LlmClient, Message};
    use prompts::REFUSAL;

    const ARTICLE_PAGE: &str = r#"<html><body>
        <article id="post-11"><h1>2011 Final</h1><p>CTX-MARKER India won at Wankhede.</p></article>
    </body></html>"#;

    const BARE_PAGE: &str = "<html><body><p>no posts</p></body></html>";

    enum Behavior {
        /// Refuses whenever the context section is empty.
        Grounded,
        /// Returns the user turn verbatim.
        Echo,
        Fail,
    }

    struct StubLlm {
        behavior: Behavior,
        fetches: Arc<AtomicUsize>,
        calls: Mutex<Vec<(usize, Vec<Message>, ChatOptions)>>,
    }

    impl StubLlm {
        fn new(behavior: Behavior, fetches: Arc<AtomicUsize>) -> Arc<Self> {
            Arc::new(Self {
                behavior,
                fetches,
                calls: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl ChatCompletion for StubLlm {
        async fn complete(
            &self,
            messages: &[Message],
            options: &ChatOptions,
        ) -> Result<String, CompletionError> {
            self.calls.lock().unwrap().push((
                self.fetches.load(Ordering::SeqCst),
                messages.to_vec(),
                options.clone(),
            ));
            let user = &messages[1].content;
            match self.behavior {
                Behavior::Grounded if user.starts_with("context: \n") => Ok(REFUSAL.to_string()),
                Behavior::Grounded => Ok("grounded".to_string()),
                Behavior::Echo => Ok(format!("ECHO[{}]", user)),
                Behavior::Fail => Err(CompletionError::RateLimited),
            }
        }
    }

    async fn serve(page: &'static str, fetches: Arc<AtomicUsize>) -> String {
        let router = Router::new().route(
            "/article",
            get(move || {
                let fetches = fetches.clone();
                async move {
                    fetches.fetch_add(1, Ordering::SeqCst);
                    Html(page)
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}/article", addr)
    }

    async fn answerer(
        page: &'static str,
        behavior: Behavior,
    ) -> (Answerer, Arc<StubLlm>, Arc<AtomicUsize>) {
        let fetches = Arc::new(AtomicUsize::new(0));
        let url = serve(page, fetches.clone()).await;
        let llm = StubLlm::new(behavior, fetches.clone());
        let extractor = Arc::new(ContentExtractor::new(Duration::from_secs(2)).unwrap());
        (Answerer::new(extractor, llm.clone(), url), llm, fetches)
    }

    #[tokio::test]
    async fn fetches_once_then_completes_once() {
        let (answerer, llm, fetches) = answerer(ARTICLE_PAGE, Behavior::Grounded).await;
        answerer.ask("who won in 2011?").await;

        assert_eq!(fetches.load(Ordering::SeqCst), 1);
        let calls = llm.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        // the page had already been fetched when the model was called
        assert_eq!(calls[0].0, 1);
        assert_eq!(
            calls[0].2,
            ChatOptions {
                temperature: 1.0,
                max_tokens: 1000,
            }
        );
    }

    #[tokio::test]
    async fn each_question_refetches_the_page() {
        let (answerer, _llm, fetches) = answerer(ARTICLE_PAGE, Behavior::Grounded).await;
        answerer.ask("first").await;
        answerer.ask("second").await;
        assert_eq!(fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn missing_article_gets_model_refusal() {
        let (answerer, llm, _) = answerer(BARE_PAGE, Behavior::Grounded).await;
        assert_eq!(answerer.ask("unrelated question").await, REFUSAL);
        assert_eq!(llm.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn answer_is_derived_from_context_and_question() {
        let (answerer, llm, _) = answerer(ARTICLE_PAGE, Behavior::Echo).await;
        let answer = answerer.ask("Q-MARKER where was the final?").await;

        assert!(answer.contains("CTX-MARKER"), "{answer}");
        assert!(answer.contains("# 2011 Final"));
        assert!(answer.contains("question: Q-MARKER where was the final?"));

        let calls = llm.calls.lock().unwrap();
        assert_eq!(calls[0].1[0].content, prompts::SYSTEM_PROMPT);
    }

    #[tokio::test]
    async fn failed_completion_returns_empty_answer() {
        let (answerer, llm, _) = answerer(ARTICLE_PAGE, Behavior::Fail).await;
        assert_eq!(answerer.ask("who won?").await, "");
        assert_eq!(llm.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn try_ask_distinguishes_failure_from_refusal() {
        let (failing, _, _) = answerer(ARTICLE_PAGE, Behavior::Fail).await;
        assert!(matches!(
            failing.try_ask("who won?").await,
            Err(AskError::Completion(CompletionError::RateLimited))
        ));

        let (refusing, _, _) = answerer(BARE_PAGE, Behavior::Grounded).await;
        assert_eq!(refusing.try_ask("who won?").await.unwrap(), REFUSAL);
    }

    #[tokio::test]
    async fn completion_timeout_returns_empty_answer() {
        let fetches = Arc::new(AtomicUsize::new(0));
        let source = serve(ARTICLE_PAGE, fetches.clone()).await;

        let router = Router::new().route(
            "/chat/completions",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(3)).await;
                Json(serde_json::json!({
                    "choices": [{ "message": { "role": "assistant", "content": "too late" } }]
                }))
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let llm_base = format!("http://{}", listener.local_addr().unwrap());
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        let llm =
            LlmClient::new(llm_base, "test-model", "secret", Duration::from_millis(200)).unwrap();
        let extractor = Arc::new(ContentExtractor::new(Duration::from_secs(2)).unwrap());
        let answerer = Answerer::new(extractor, Arc::new(llm), source);

        assert!(matches!(
            answerer.try_ask("who won?").await,
            Err(AskError::Completion(CompletionError::Timeout))
        ));
        assert_eq!(answerer.ask("who won?").await, "");
        assert_eq!(fetches.load(Ordering::SeqCst), 2);
    }
}
