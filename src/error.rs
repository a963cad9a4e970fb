use thiserror::Error;

pub type Result<T> = std::result::Result<T, GlactError>;

#[derive(Error, Debug)]
pub enum GlactError {
    /// Fatal: repository discovery failed (bad token, missing projects
    /// directory). Aborts the run.
    #[error("Discovery error: {0}")]
    Discovery(String),
    /// Per-repository collection failure. Logged and skipped, never fatal.
    #[error("Collection error in '{repo}': {reason}")]
    Collection { repo: String, reason: String },
    /// Transient network failure, retried with backoff before escalating.
    #[error("Transient network error: {0}")]
    TransientNetwork(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Git error: {0}")]
    Git(#[from] Box<gix::open::Error>),
    #[error("Git repository error: {0}")]
    GitRepo(String),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Invalid date: {0}")]
    InvalidDate(String),
    #[error("Object find error: {0}")]
    ObjectFind(#[from] Box<gix::object::find::existing::Error>),
    #[error("Commit error: {0}")]
    Commit(#[from] Box<gix::object::commit::Error>),
    #[error("Reference find error: {0}")]
    RefFind(#[from] Box<gix::reference::find::existing::Error>),
    #[error("Head peel error: {0}")]
    HeadPeel(#[from] Box<gix::head::peel::to_commit::Error>),
    #[error("Object find with conversion error: {0}")]
    ObjectFindConv(#[from] Box<gix::object::find::existing::with_conversion::Error>),
    #[error("Diff tree to tree error: {0}")]
    DiffTreeToTree(#[from] Box<gix::repository::diff_tree_to_tree::Error>),
    #[error("Git discover error: {0}")]
    GitDiscover(#[from] Box<gix::discover::Error>),
    #[error("Object decode error: {0}")]
    ObjectDecode(#[from] Box<gix::objs::decode::Error>),
}

// Manual From implementations for unboxed to boxed conversions
impl From<gix::open::Error> for GlactError {
    fn from(err: gix::open::Error) -> Self {
        GlactError::Git(Box::new(err))
    }
}

impl From<gix::object::find::existing::Error> for GlactError {
    fn from(err: gix::object::find::existing::Error) -> Self {
        GlactError::ObjectFind(Box::new(err))
    }
}

impl From<gix::object::commit::Error> for GlactError {
    fn from(err: gix::object::commit::Error) -> Self {
        GlactError::Commit(Box::new(err))
    }
}

impl From<gix::reference::find::existing::Error> for GlactError {
    fn from(err: gix::reference::find::existing::Error) -> Self {
        GlactError::RefFind(Box::new(err))
    }
}

impl From<gix::head::peel::to_commit::Error> for GlactError {
    fn from(err: gix::head::peel::to_commit::Error) -> Self {
        GlactError::HeadPeel(Box::new(err))
    }
}

impl From<gix::object::find::existing::with_conversion::Error> for GlactError {
    fn from(err: gix::object::find::existing::with_conversion::Error) -> Self {
        GlactError::ObjectFindConv(Box::new(err))
    }
}

impl From<gix::repository::diff_tree_to_tree::Error> for GlactError {
    fn from(err: gix::repository::diff_tree_to_tree::Error) -> Self {
        GlactError::DiffTreeToTree(Box::new(err))
    }
}

impl From<gix::discover::Error> for GlactError {
    fn from(err: gix::discover::Error) -> Self {
        GlactError::GitDiscover(Box::new(err))
    }
}

impl From<gix::objs::decode::Error> for GlactError {
    fn from(err: gix::objs::decode::Error) -> Self {
        GlactError::ObjectDecode(Box::new(err))
    }
}
