//! Request Adapter implementations (C6): same-process (`local_adapter`,
//! used by tests and single-binary demos) and real HTTP (`reqwest_adapter`).

pub mod local_adapter;
pub mod reqwest_adapter;

pub use local_adapter::LocalAdapter;
pub use reqwest_adapter::ReqwestAdapter;
