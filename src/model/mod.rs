//! Data model for the publishing core
//!
//! - `Collection` - ownable group of aliases/snippets with visibility state
//! - `Version` - immutable publish snapshot, monotonically numbered
//! - `Collectable` - a single alias or snippet
//! - `Subscription` - a user's or guild's binding to a collection

mod alias;
mod collection;
mod ids;
mod subscription;
mod version;

pub use alias::{validate_alias_set, Collectable, CollectableKind};
pub use collection::{
    Collaborator, CollaboratorRole, Collection, MetadataUpdate, Visibility,
};
pub use ids::{CollectionId, GuildId, UserId, VersionId};
pub use subscription::{PinMode, SubscriberId, Subscription};
pub use version::Version;
