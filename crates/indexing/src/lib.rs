//! URL classification, crawl dispatch, chunking, enrichment, and embedding —
//! the ingestion half of the engine (spec.md §2).

pub mod chunk;
pub mod classify;
pub mod codeblock;
pub mod contextual;
pub mod dispatch;
pub mod embed;
pub mod fetch;
pub mod metadata;
pub mod sitemap;
