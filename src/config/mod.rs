pub mod env;
pub mod profile;
pub mod settings;
