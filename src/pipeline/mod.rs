//! Tag transformation and rendering: classified tags flow through
//! [`tags::TagPipeline`], are rendered by [`template::render`], and
//! [`pool::PromptPool`] decides which raw items get rendered at all.

pub mod pool;
pub mod tags;
pub mod template;
