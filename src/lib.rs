// Service layer
pub mod config;
pub mod error;
pub mod metrics;
pub mod telemetry;

// Render and export pipeline
pub mod exporter;
pub mod library;
pub mod pipeline;
pub mod renderer;

// HTTP surface
pub mod api;
pub mod server;

// Editing client
pub mod client;
pub mod editor;
pub mod notify;
pub mod preview;
pub mod workbench;
