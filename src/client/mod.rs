// Gateway module for the advice service client - follows the Train Station Pattern
// All external access must go through this gateway

// Private submodules - not directly accessible from outside
mod http;
mod image;
mod traits;
mod types;

// Public re-exports - the ONLY way to access client functionality
pub use http::HttpAdviceClient;
pub use image::{ImageRef, ImageRegistry};
pub use traits::AdviceService;
pub use types::{ContinuityToken, TurnReply, UserProfile, Verification};

#[cfg(test)]
pub use traits::MockAdviceService;
