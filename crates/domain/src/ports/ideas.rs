use crate::ideas::Idea;
use crate::ports::BoxFuture;
use crate::DomainResult;

pub trait IdeaRepository: Send + Sync {
    fn create(&self, idea: &Idea) -> BoxFuture<'_, DomainResult<Idea>>;

    fn get(&self, idea_id: &str) -> BoxFuture<'_, DomainResult<Option<Idea>>>;

    /// Published, publicly visible ideas in a deterministic order
    /// (`created_at_ms`, then `idea_id`).
    fn list_published_public(&self) -> BoxFuture<'_, DomainResult<Vec<Idea>>>;
}
