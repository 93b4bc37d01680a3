pub mod config;
pub mod extract;
pub mod job;
pub mod rule;
pub mod schema;
pub mod session;
pub mod site;
pub mod text;
pub mod writer;
