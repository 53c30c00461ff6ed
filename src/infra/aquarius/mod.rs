pub mod client;

pub use client::AquariusClient;
