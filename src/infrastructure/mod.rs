// Infrastructure layer - External dependencies and adapters
pub mod config;
pub mod frappe_client;
pub mod svg_renderer;
