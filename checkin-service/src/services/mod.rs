pub mod clock;
pub mod scans;
pub mod token;

pub use clock::{Clock, SystemClock};
pub use scans::ScanRegistry;
pub use token::{IssuedToken, TokenError, TokenService};
