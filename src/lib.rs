//! pargrep: a parallel recursive regular-expression line searcher.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                       cli / main                           │
//! │             argv + env -> Config, exit code                │
//! └────────────────────────────┬────────────────────────────---┘
//!                              │
//! ┌────────────────────────────▼────────────────────────────---┐
//! │                          driver                             │
//! │      routes a single path argument to serial or parallel     │
//! └───────────┬──────────────────────────────────┬────────────-─┘
//!             │                                  │
//! ┌───────────▼──────────┐            ┌──────────▼────────────-─┐
//! │     walk (serial)     │            │   parallel coordinator  │
//! │ ignore::Walk + skip()  │            │  N workers, striped     │
//! │                        │            │  output buckets         │
//! └───────────┬────────────┘            └──────────┬────────────-┘
//!             │                                    │
//!             └─────────────────┬──────────────────┘
//!                               │
//!                    ┌──────────▼────────────┐
//!                    │        scanner         │
//!                    │  buffered refill loop  │
//!                    └──────────┬────────────-┘
//!                               │
//!                    ┌──────────▼────────────┐
//!                    │        matcher         │
//!                    │ keyword -> DFA -> regex │
//!                    └──────────┬────────────-┘
//!                               │
//!                    ┌──────────▼────────────┐
//!                    │        printer         │
//!                    └────────────────────────┘
//! ```

pub mod cli;
pub mod colorcap;
pub mod config;
pub mod dialect;
pub mod driver;
pub mod error;
pub mod exclude;
pub mod locale;
pub mod matcher;
pub mod parallel;
pub mod pattern;
pub mod printer;
pub mod scanner;
pub mod walk;

pub use config::Config;
pub use error::{GrepError, Result};
