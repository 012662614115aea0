pub mod error;
pub mod types;

pub use error::Error;
pub use types::{FeedEntry, FeedMeta};
pub type Result<T> = std::result::Result<T, Error>;
