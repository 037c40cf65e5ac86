//! # doc-churn
//!
//! Track how much the words of remote documents change over time.
//!
//! Each registered URL is periodically fetched, reduced to a canonical word
//! sequence and compared against the previous version. Every update cycle
//! appends one [`models::ChangeRecord`] holding the document's current word
//! count and the number of words that changed, building a churn time series.
//!
//! ## Pipeline
//!
//! ```text
//! ┌─────────┐   ┌──────────┐   ┌─────────┐   ┌───────────┐   ┌──────┐   ┌───────┐
//! │  fetch  │──▶│ detect + │──▶│normalize│──▶│ decompress│──▶│ diff │──▶│ store │
//! │ (bytes) │   │ extract  │   │ (words) │   │   prior   │   │      │   │commit │
//! └────┬────┘   └──────────┘   └─────────┘   └───────────┘   └──────┘   └───────┘
//!      │  fingerprint unchanged                                            ▲
//!      └───────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! churn init                                  # create database
//! churn add https://example.com/terms.pdf     # register and take a first reading
//! churn update --all                          # one cycle for every document
//! churn history <id>                          # print the time series
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`detect`] | Content-type detection from raw bytes |
//! | [`extract`] | Text extraction (plain text, PDF) |
//! | [`normalize`] | Canonical word sequence |
//! | [`fingerprint`] | SHA-512 content and URL hashing |
//! | [`snapshot`] | Compressed normalized text |
//! | [`diff`] | Word-level change counting |
//! | [`fetch`] | Fetching raw bytes over HTTP or from disk |
//! | [`store`] | Storage abstraction, in-memory and SQLite backends |
//! | [`tracker`] | The update cycle |
//! | [`registry`] | Registering URLs |
//! | [`history`] | Listing documents and their records |
//! | [`compare`] | Offline comparison of local files |
//! | [`config`] | TOML configuration parsing |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod compare;
pub mod config;
pub mod db;
pub mod detect;
pub mod diff;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod fingerprint;
pub mod history;
pub mod migrate;
pub mod models;
pub mod normalize;
pub mod registry;
pub mod snapshot;
pub mod store;
pub mod tracker;
