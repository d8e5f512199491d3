//! # Repolens
//!
//! An LLM-driven codebase analyzer.
//!
//! Repolens clones a repository, reads the relevant source files, packs them
//! into token-budgeted chunks, submits each chunk (plus a one-shot project
//! overview) to an LLM provider, scores per-file complexity locally, and
//! merges everything into one structured JSON report with a plain-text
//! summary.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────┐   ┌───────────┐   ┌────────────┐
//! │  Repo    │──▶│  Scan    │──▶│  Chunker  │──▶│  Pipeline   │
//! │ clone/pull│   │ walk+read│   │ budget    │   │ LLM+metrics │
//! └──────────┘   └──────────┘   └───────────┘   └─────┬──────┘
//!                                                     ▼
//!                                               ┌────────────┐
//!                                               │ Aggregator │
//!                                               │ JSON + txt │
//!                                               └────────────┘
//! ```
//!
//! Chunk boundaries are deterministic (files are path-sorted before
//! packing), per-chunk results stay index-aligned with their chunks, and a
//! malformed model response degrades that one chunk to a raw partial instead
//! of failing the run.
//!
//! ## Quick Start
//!
//! ```bash
//! repolens scan                 # preview which files would be analyzed
//! repolens chunks               # preview the chunk plan (no network)
//! repolens analyze              # full run: clone, chunk, analyze, report
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing and validation |
//! | [`models`] | Core data types |
//! | [`repo`] | Git clone/pull and repository metadata |
//! | [`scan`] | File discovery and reading |
//! | [`cost`] | Token cost estimation |
//! | [`chunker`] | Token-budget chunking and the overview artifact |
//! | [`llm`] | LLM provider abstraction (GitHub Models, OpenAI, Anthropic) |
//! | [`metrics`] | Complexity scoring and signature extraction |
//! | [`analyze`] | Pipeline orchestration |
//! | [`report`] | Aggregation, caps, and report output |
//! | [`progress`] | stderr progress reporting |

pub mod analyze;
pub mod chunker;
pub mod config;
pub mod cost;
pub mod llm;
pub mod metrics;
pub mod models;
pub mod progress;
pub mod repo;
pub mod report;
pub mod scan;
