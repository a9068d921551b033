use serde::{Deserialize, Serialize};

/// The authenticated caller as resolved by the api layer. Services receive it
/// by value; `user_id` is the identity every authorization check keys on and
/// `username` only feeds human-readable notification and activity text.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ActorIdentity {
    pub user_id: String,
    pub username: String,
}
