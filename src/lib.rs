pub mod app;
pub mod avatar;
pub mod cli;
pub mod client;
pub mod constants;
pub mod identity;
pub mod notice;
pub mod runtime;
pub mod session;
pub mod utils;

pub use app::{load_config, Config};
pub use client::{AdviceService, HttpAdviceClient};
pub use session::SessionOrchestrator;
pub use utils::{GenieError, SubmitError};
