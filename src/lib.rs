pub mod config;
pub mod form;
pub mod http_client;
pub mod logging;
pub mod model;
pub mod persist;
pub mod prediction_api;
pub mod provider;
pub mod render_html;
pub mod report;
pub mod state;
