pub mod article;
pub mod cache;
pub mod config;
pub mod error;
pub mod io;
pub mod paths;
pub mod pipeline;
pub mod schedule;
pub mod sitemap;
pub mod source;

pub use error::{NewsmapError, Result};
