//! Lock aliases so every crate agrees on which lock implementation it uses.

/// Mutex for short critical sections that never cross an `.await`.
pub type SyncMutex<T> = parking_lot::Mutex<T>;
/// Async aware mutex, for state held across suspension points.
pub type AsyncMutex<T> = tokio::sync::Mutex<T>;
