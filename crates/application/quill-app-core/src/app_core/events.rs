use quill_core::{Post, PostId, RequestSeq, User};

/// Completions of asynchronous work, delivered through the store's channel.
/// Tracked results carry the sequence of the tracker they were started under.
#[derive(Debug)]
pub enum DomainEvent {
    PostLoaded {
        request: RequestSeq,
        id: PostId,
        result: anyhow::Result<Post>,
    },
    PostSummariesLoaded {
        request: RequestSeq,
        result: anyhow::Result<Vec<Post>>,
    },
    LoggedIn {
        request: RequestSeq,
        result: anyhow::Result<()>,
    },
    LoggedOut {
        result: anyhow::Result<()>,
    },
    MeLoaded {
        result: anyhow::Result<User>,
    },
    PostSaved {
        request: RequestSeq,
        created: bool,
        result: anyhow::Result<Post>,
    },
}
