mod indexing;
mod search_pipeline;
mod support;
