pub mod deploy;
pub mod schema;
