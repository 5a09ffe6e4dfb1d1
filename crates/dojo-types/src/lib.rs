pub mod api;
pub mod models;
pub mod rank;
pub mod record;
pub mod stats;
