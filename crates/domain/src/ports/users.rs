use crate::ports::BoxFuture;
use crate::users::User;
use crate::DomainResult;

pub trait UserDirectory: Send + Sync {
    /// Creates or replaces the user's profile. An existing row keeps its
    /// original `created_at_ms`.
    fn upsert(&self, user: &User) -> BoxFuture<'_, DomainResult<User>>;

    fn get(&self, user_id: &str) -> BoxFuture<'_, DomainResult<Option<User>>>;

    /// Users claiming at least one of the given skills. Names are compared
    /// case-insensitively on trimmed values; results come back in a
    /// deterministic order (`created_at_ms`, then `user_id`).
    fn list_with_any_skill(&self, skills: &[String]) -> BoxFuture<'_, DomainResult<Vec<User>>>;
}
