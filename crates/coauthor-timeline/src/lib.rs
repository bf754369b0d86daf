//! Coauthor Timeline
//!
//! Builds a longitudinal dataset of academic coauthorship relationships from
//! OpenAlex. For every target researcher the engine walks their publication
//! years in order and classifies each coauthor per year as a new
//! collaboration, a new collaboration through a mutual connection, or an
//! existing collaboration, tracking cumulative counts across the career.
//!
//! # Features
//!
//! - **Pure core**: the timeline engine performs no I/O; lookups are injected
//! - **Incremental**: records already stored are never recomputed or rewritten
//! - **Concurrent batches**: targets run independently and never abort the batch
//! - **Polite client**: retrying, cached, rate-limited OpenAlex access
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use coauthor_timeline::{
//!     career::CareerResolver, config::Config, corpus::Corpus, engine::TimelineEngine,
//!     pipeline::Pipeline, store::{AuthorTable, InMemoryRelationshipStore},
//! };
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let corpus = Arc::new(Corpus::load("data/publications.jsonl".as_ref()).await?);
//!     let index = Arc::new(corpus.index());
//!
//!     let pipeline = Pipeline::new(
//!         corpus.clone(),
//!         TimelineEngine::new(index.clone(), index),
//!         CareerResolver::new(corpus, &config),
//!         Arc::new(InMemoryRelationshipStore::new()),
//!         Arc::new(AuthorTable::new()),
//!         &config,
//!     );
//!     let summary = pipeline.run_batch(&[]).await;
//!     println!("{} records", summary.records_written());
//!     Ok(())
//! }
//! ```

pub mod career;
pub mod client;
pub mod config;
pub mod corpus;
pub mod dates;
pub mod engine;
pub mod error;
pub mod features;
pub mod formatters;
pub mod harvest;
pub mod models;
pub mod pipeline;
pub mod sources;
pub mod store;

pub use client::OpenAlexClient;
pub use config::Config;
pub use engine::{Target, TimelineEngine};
pub use error::{ClientError, StoreError, TimelineError};
