//! Key functions turning call arguments into cache keys.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Uses the arguments themselves as the key.
///
/// Equal arguments give equal keys, with no chance of collision. This is
/// the default key function of [`Memoized::new`](crate::memoize::Memoized::new).
pub fn args_key<A, K>(args: &A) -> K
where
    A: Clone + Into<K>,
{
    args.clone().into()
}

/// Reduces the arguments to a 64-bit structural hash.
///
/// Keys are small and fixed-size, but two different argument sets may
/// collide. Stable within one process only.
pub fn digest_key<A: Hash + ?Sized>(args: &A) -> u64 {
    let mut hasher = DefaultHasher::new();
    args.hash(&mut hasher);
    hasher.finish()
}
