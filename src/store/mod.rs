//! Session store implementations

mod backend;
mod redb_store;
mod traits;

pub use backend::Backend;
pub use redb_store::{generate_session_id, RedbStore};
pub use traits::SessionStore;
