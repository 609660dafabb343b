pub mod drafting;
pub mod error;
pub mod ids;
pub mod lenient;
pub mod seed;
pub mod state;
pub mod types;

pub use error::StateError;
pub use seed::seed_state;
pub use state::{default_title, NewDocument, NewTask};
pub use types::*;
