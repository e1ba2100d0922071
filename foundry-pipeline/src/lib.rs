//! Foundry Pipeline - Customer Story Ingest
//!
//! Turns a customer-story URL into one persisted project-log entry:
//! fetch the page, extract a case study and an architecture description
//! through deployed agents or direct completion, embed, then upsert.

mod extract;
mod fetch;
mod pipeline;
mod strategy;

pub use extract::{
    architecture_message, case_study_message, parse_architecture, parse_case_study, Architecture,
    CaseStudy, ARCHITECTURE_INSTRUCTIONS, CASE_STUDY_INSTRUCTIONS, UNTITLED,
};
pub use fetch::{
    extract_visible_text, parse_source_url, ContentFetcher, HttpContentFetcher, MockContentFetcher,
    MAX_BODY_BYTES,
};
pub use pipeline::{IngestPipeline, IngestReport};
pub use strategy::{AgentNames, InferenceStrategy, StrategyKind};
