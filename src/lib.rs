pub mod dom;
pub mod modifier;
pub mod paths;
pub mod processor;
pub mod registry;
pub mod schema;
pub mod settings;
pub mod watcher;
