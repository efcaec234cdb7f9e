// Application layer - Use cases and collaborator traits
pub mod chart_container;
pub mod chart_renderer;
pub mod dataset_builder;
pub mod field_store;
pub mod rasterizer;
pub mod record_view;
pub mod sensor_source;
pub mod snapshot_service;
