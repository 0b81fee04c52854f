//! booru-prompter - Turn booru tag sets into image-generation prompts
//!
//! Classifies raw tag payloads from Derpibooru, E621 and Danbooru into six
//! canonical slots, runs them through a filterable transformation pipeline
//! and renders model-specific prompt strings from token templates. Fetched
//! batches and user filters persist as named collections.

pub mod cli;
pub mod config;
pub mod context;
pub mod data;
pub mod error;
pub mod fetch;
pub mod filter;
pub mod pipeline;
pub mod sources;
pub mod store;

pub use context::{PrompterContext, RenderRequest};
pub use error::{PromptError, Result};
