pub mod cli;
pub mod command;
pub mod compile;
pub mod container;
pub mod image;
pub mod overlay;
pub mod pipeline;
pub mod source;
pub mod store;
pub mod target;
