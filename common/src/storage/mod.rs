pub mod blob;
pub mod catalog;
pub mod db;
pub mod signing;
pub mod store;
pub mod types;
