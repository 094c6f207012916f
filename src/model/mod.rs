pub mod category;
pub mod config;
pub mod envelope;

pub use category::Category;
pub use config::{AnswerMode, Config, DockerCredentials, HandlerConfig};
pub use envelope::{Answer, DebugInfo, Envelope, ErrorKind};
