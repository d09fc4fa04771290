pub mod prompt;
pub mod render;
pub mod session;
pub mod store;

pub use render::MessageRenderer;
pub use session::{ChatSession, Presenter, SendOutcome};
pub use store::{Message, Role};
