//! Flutter bridge for ScanNote core.

pub mod api;
