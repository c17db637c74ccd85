//! Article enhancement: search for related articles, scrape them as style
//! exemplars, rewrite the original with an LLM, and persist the result with
//! citations.

pub mod citations;
pub mod llm;
pub mod orchestrator;
pub mod search;

pub use llm::{CompletionModel, GeminiModel};
pub use orchestrator::{EnhancementOrchestrator, ReferenceLoader, ENHANCE_STEPS};
pub use search::{SearchProvider, SearchResult, SerpApiSearch};
