// Domain layer - Sensor data, statistics and chart models
pub mod chart;
pub mod sensor;
pub mod statistics;
pub mod graphic;
