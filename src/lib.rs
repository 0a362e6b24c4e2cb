pub mod app;
pub mod backend;
pub mod categories;
pub mod input;
pub mod logging;
pub mod matcher;
pub mod matching;
pub mod navigation;
pub mod scheduler;
pub mod selection;
pub mod settings;
pub mod theme;
pub mod types;
pub mod ui;
