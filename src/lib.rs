pub mod align;
pub mod changes;
pub mod channel;
pub mod cli;
pub mod config;
pub mod engine;
pub mod model;
pub mod policy;
pub mod property;
pub mod resolver;
pub mod transitive;
pub mod version;

mod api;

pub use api::{ChannelAligner, ChannelAlignerBuilder};
