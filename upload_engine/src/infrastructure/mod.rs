//! Infrastructure layer: `RequestAdapter` implementations (C6) and
//! `ProgressStore` implementations (C5).

pub mod adapters;
pub mod repositories;
