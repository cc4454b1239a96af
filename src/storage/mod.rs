pub mod db;
pub mod guild_config;
pub mod notes;
pub mod warnings;
