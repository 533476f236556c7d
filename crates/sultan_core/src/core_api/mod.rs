pub mod card_catalog;
pub mod engine;
pub mod rite_catalog;
pub mod validate;

pub use card_catalog::{CardCatalog, CardCatalogEntry};
pub use engine::{
    ChangeEvent, ChangeKind, ConflictResolution, Engine, Session, SessionState,
};
pub use rite_catalog::RiteCatalog;
pub use validate::{EditContext, FieldValue, JsonKind};
