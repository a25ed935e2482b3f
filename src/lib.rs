pub mod configuration;
pub mod delivery_client;
pub mod dispatcher;
pub mod domain;
pub mod extraction;
pub mod routes;
pub mod startup;
pub mod telemetry;
