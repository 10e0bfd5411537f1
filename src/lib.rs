pub mod builder;
pub mod cli;
pub mod config;
pub mod db;
pub mod embed;
pub mod error;
pub mod index;
pub mod searcher;
pub mod utils;

pub use config::Opts;
pub use searcher::{RankedResult, SearchResponse, Searcher};
