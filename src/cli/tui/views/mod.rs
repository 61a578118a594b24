//! Dashboard views

pub mod gantt;
