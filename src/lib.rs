//! # rods-harness
//!
//! A PDF table extraction and retrieval toolkit for ELD Hours-of-Service
//! compliance reports.
//!
//! rods-harness walks the per-page tables of a CCMTA/ELD report PDF,
//! groups them into a nested date → title → row-group document, indexes
//! report text into a local SQLite chunk store with optional embeddings,
//! and exposes extraction, lookup, retrieval, and LLM validation as tools
//! over an MCP-compatible HTTP server.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌───────────────┐   ┌─────────────────┐
//! │   PDF    │──▶│ Page reader    │──▶│ Table grouper    │──▶ <base>_tables.json
//! │  report  │   │ text + tables │   │ date/title keys │
//! └──────────┘   └──────┬────────┘   └─────────────────┘
//!                       │
//!                       ▼
//!                ┌─────────────┐   ┌──────────┐   ┌──────────┐
//!                │ Chunk+Embed │──▶│  SQLite   │──▶│ Retrieve  │──▶ LLM validate
//!                │             │   │ FTS5+Vec │   │          │
//!                └─────────────┘   └──────────┘   └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! rods extract report.pdf            # write report_tables.json
//! rods lookup report_tables.json header
//! rods init                          # create database
//! rods index report.pdf              # chunk + embed page text
//! rods search "data diagnostics"     # retrieve chunks
//! rods validate "Certification of RODS"
//! rods serve mcp                     # start HTTP server
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`pdf`] | PDF page reading and table detection |
//! | [`tables`] | Table grouping by log date and title |
//! | [`extract`] | Extraction command and JSON persistence |
//! | [`lookup`] | Table lookup across log dates |
//! | [`chunk`] | Page text chunking |
//! | [`index`] | Chunk indexing pipeline |
//! | [`embedding`] | OpenAI embeddings client and vector utilities |
//! | [`search`] | Keyword, semantic, and hybrid chunk retrieval |
//! | [`llm`] | Chat-completion client |
//! | [`validate`] | Report segment validation |
//! | [`server`] | MCP HTTP server |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod chunk;
pub mod config;
pub mod db;
pub mod embedding;
pub mod extract;
pub mod index;
pub mod llm;
pub mod lookup;
pub mod migrate;
pub mod models;
pub mod pdf;
pub mod search;
pub mod server;
pub mod tables;
pub mod validate;
