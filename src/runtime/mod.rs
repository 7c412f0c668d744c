//! Single-writer async runtime and display event stream APIs.

/// Display event payloads emitted by the runtime.
pub mod events;
/// Handle, command loop, and tick loop implementation.
pub mod handle;
