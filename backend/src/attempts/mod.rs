pub mod model;
pub mod recorder;
pub mod recorder_sqlx;
