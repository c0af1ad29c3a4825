//! Service layer
//!
//! Contains business logic separated from HTTP handlers.
//! Services own validation and orchestration over the database;
//! handlers only translate between the wire format and these types.

mod accounts;
mod feed;
mod posts;
mod tags;
mod votes;

pub use accounts::{AccountService, AuthenticatedUser, ClientInfo, SignupInput};
pub use feed::{DisplayPost, FeedService};
pub use posts::{PostInput, PostService};
pub use tags::TagService;
pub use votes::{VoteService, VoteSummary};
