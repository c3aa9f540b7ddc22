pub mod messages;
pub mod supervisor;
pub mod traits;
pub mod translate;

pub use messages::{ActorError, TurnReply};
pub use supervisor::SupervisorHandle;
pub use traits::{LanguageDetector, Translator};
