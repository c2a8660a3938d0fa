//! Source composition for `TreeConfig`.

pub mod merge_policy;
pub mod service;
