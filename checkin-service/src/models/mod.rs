pub mod token;

pub use token::{ScanDirection, SignedToken, TokenPayload};
