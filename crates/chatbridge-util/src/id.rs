use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prefix {
    /// Locally minted session id used when the backend cannot create one.
    LocalSession,
    Completion,
}

impl Prefix {
    fn as_str(&self) -> &'static str {
        match self {
            Prefix::LocalSession => "session",
            Prefix::Completion => "chatcmpl",
        }
    }
}

pub fn create(prefix: Prefix) -> String {
    format!("{}-{}", prefix.as_str(), Uuid::new_v4())
}

pub fn completion_id() -> String {
    create(Prefix::Completion)
}

pub fn local_session_id() -> String {
    create(Prefix::LocalSession)
}

pub fn is_local_session(id: &str) -> bool {
    id.starts_with("session-")
}
