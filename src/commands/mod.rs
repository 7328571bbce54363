pub mod cleanup;
pub mod config;
pub mod extend;
pub mod generate;
pub mod status;
pub mod table;
