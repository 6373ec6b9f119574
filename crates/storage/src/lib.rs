//! Persistence layer: the Postgres+pgvector vector/full-text store and the
//! Neo4j property-graph store (spec.md §3, §6).

pub mod graph_store;
pub mod vector_store;

pub use graph_store::GraphStore;
pub use vector_store::PgVectorStore;
