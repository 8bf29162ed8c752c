pub mod access_token;
pub mod action_id;
pub mod ids;
pub mod media_ref;

pub use access_token::AccessToken;
pub use action_id::ActionId;
pub use ids::{BaseId, ChallengeId, GameId};
pub use media_ref::MediaRef;
