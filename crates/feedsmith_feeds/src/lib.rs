pub mod cli;
pub mod dates;
pub mod feed;
pub mod fetch;
pub mod generators;
pub mod jsonld;
pub mod logging;
pub mod manager;

pub use generators::Generator;
pub use manager::{GeneratorManager, RunReport};

pub mod prelude {
    pub use super::generators::Generator;
    pub use feedsmith_core::{Error, FeedEntry, FeedMeta, Result};
}
