pub mod fmp;
pub mod records;
pub mod registry;
pub mod stooq;
pub mod util;
pub mod yahoo_finance;

pub use registry::ProviderRegistry;
