//! Entity structs for all Tempo domain objects.
//!
//! Each entity maps to a table in the libSQL database (see `tempo-db`
//! migrations). All structs derive `Serialize`, `Deserialize`, and `JsonSchema`
//! for JSON roundtrip and schema validation.

mod contributor;
mod epic;
mod status_change;
mod story;

pub use contributor::{Contributor, NewContributor};
pub use epic::Epic;
pub use status_change::StatusChange;
pub use story::UserStory;
