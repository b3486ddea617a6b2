#![allow(unused_macros)]

/// Helper macro for reading locked items
///
/// ```rust, ignore
///  let executor = read_lock!(self.executor);
/// ```
macro_rules! read_lock {
    ($arc_rwlock:expr) => {
        $arc_rwlock.read().map_err(|_| crate::Error::LockError)?
    };
}

/// Helper macro for writing to locked items
///
/// ```rust, ignore
///  let mut executor = write_lock!(self.executor);
///  *executor = Some(engine);
/// ```
macro_rules! write_lock {
    ($arc_rwlock:expr) => {
        $arc_rwlock.write().map_err(|_| crate::Error::LockError)?
    };
}
