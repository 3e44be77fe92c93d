pub mod configs;
pub mod format;
pub mod item;
pub mod shell;
