pub mod model;
pub mod registry;
pub mod registry_sqlx;
