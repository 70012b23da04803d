mod ensure;
mod link;
mod wait;

pub use ensure::{EnsureError, ensure};
pub use link::ensure_link;
pub use wait::{PollOptions, WaitError, wait_until_available};
