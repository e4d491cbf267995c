pub mod block;
pub mod caret;
pub mod config;
pub mod editor;
pub mod input;
pub mod messages;
pub mod shell;
pub mod suggestion;
