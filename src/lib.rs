pub mod analyzers;
pub mod annotate;
pub mod combine;
pub mod error;
pub mod fetch;
pub mod model;
pub mod output;
pub mod parser;
pub mod pipeline;
pub mod runlog;
pub mod series;
pub mod services;
pub mod sites;
