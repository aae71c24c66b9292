pub mod signature;

pub use signature::{compute_tag, verify_tag};
