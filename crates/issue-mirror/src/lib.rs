pub mod github;
pub mod projects;
pub mod resolver;
pub mod sync;
pub mod transport;
