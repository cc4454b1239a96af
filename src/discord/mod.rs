pub mod client;
pub mod commands;
pub mod confirm;
pub mod context;
pub mod embeds;
pub mod gateway;
pub mod interaction;
pub mod paginate;
pub mod verify;
