//! Query-time and graph-time engine: hybrid retrieval, reranking, the
//! code-graph extractor, the hallucination validator, and the GraphRAG
//! entity extractor (spec.md §2).

pub mod codegraph;
pub mod graphrag;
pub mod hallucination;
pub mod rerank;
pub mod retriever;
