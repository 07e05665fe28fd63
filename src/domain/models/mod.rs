//! Domain models

mod campaign;
mod metric;
mod tweet;
mod user;

pub use campaign::{Campaign, CampaignSlot};
pub use metric::{Metric, engagement_rate};
pub use tweet::{DueTweet, PostedTweetRef, Tweet, TweetStatus};
pub use user::User;
