pub mod feed;
pub mod follow;
pub mod post;
pub mod raw;
pub mod user;

pub use feed::{Feed, NewFeed};
pub use follow::FeedFollow;
pub use post::{NewPost, NormalizedItem, Post};
pub use raw::{RawFeed, RawItem};
pub use user::User;
