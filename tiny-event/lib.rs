//! Event plumbing shared by the editor core and its hosts.

pub mod debounce;

pub use debounce::Debounce;
