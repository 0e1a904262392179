//! Application shell composing notebook, navigation, capture and extraction.

pub mod app_shell;
