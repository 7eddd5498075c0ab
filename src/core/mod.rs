//! Core quote resolution abstractions

pub mod columns;
pub mod config;
pub mod log;
pub mod quote;
pub mod raw;
pub mod resolver;
pub mod source;

// Re-export main types for cleaner imports
pub use quote::{QuoteRequest, QuoteRow, QuoteTable, SymbolVariant};
pub use resolver::{QuoteResolver, Resolution, ResolverSettings, TickerOutcome};
pub use source::{FetchError, QuoteSource};
