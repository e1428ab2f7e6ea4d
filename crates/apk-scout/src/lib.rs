//! apk-scout: search an APK catalog through its translation mirror and
//! resolve the final download links of every match.

pub mod client;
pub mod config;
pub mod extract;
pub mod fetcher;
pub mod listing;
pub mod normalize;
pub mod resolve;
pub mod search;
pub mod types;

pub use config::{FetchPolicy, ScoutConfig, SearchConfig, SiteConfig};
pub use extract::extract_download_links;
pub use fetcher::{Fetcher, Page};
pub use normalize::Normalizer;
pub use resolve::Resolver;
pub use search::Scout;
pub use types::*;
