mod autoformat;
mod blocks;
mod commands;
mod config;
mod core;
mod error;
mod inline;
mod location;
mod mention;
mod menu;
mod node;
mod normalize;
mod ops;
mod session;
mod transforms;
mod trigger;
pub mod value;

pub use crate::autoformat::*;
pub use crate::commands::*;
pub use crate::config::*;
pub use crate::core::*;
pub use crate::error::*;
pub use crate::location::*;
pub use crate::mention::*;
pub use crate::menu::*;
pub use crate::node::*;
pub use crate::normalize::*;
pub use crate::ops::*;
pub use crate::session::*;
pub use crate::transforms::*;
pub use crate::trigger::*;
pub use crate::value::{MemoryStore, ValueStore, default_value, from_json, to_json};
