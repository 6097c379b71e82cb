use thiserror::Error;

use crate::raster::RenderError;
use crate::session::Slot;

/// Errors surfaced by the comparison engine.
///
/// `Cancelled` is a distinct terminal outcome rather than a failure, so
/// callers can tell "stopped by the user" from "broke".
#[derive(Debug, Error)]
pub enum Error {
    /// The bytes in the named slot could not be parsed or rendered. Aborts
    /// only that slot's load phase; the other slot is untouched.
    #[error("document in slot {slot} failed to load")]
    DocumentLoad {
        slot: Slot,
        #[source]
        source: RenderError,
    },

    /// `compare` was invoked before the named slot was loaded.
    #[error("slot {0} has no document loaded")]
    SlotEmpty(Slot),

    /// The in-flight phase was stopped via its `CancelToken`.
    #[error("operation cancelled")]
    Cancelled,
}
