use std::future::Future;
use std::pin::Pin;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub mod collaboration;
pub mod engagement;
pub mod ideas;
pub mod users;
