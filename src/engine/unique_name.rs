//! Collision-free naming for worlds landing in an occupied directory.

/// Resolve a name that does not collide with an existing entry.
///
/// The base name is trimmed; a blank base defaults to `"World"`. If the
/// predicate reports the base as free it is returned unchanged; otherwise
/// `base_1`, `base_2`, ... are probed in order until one is free. The
/// predicate is re-evaluated on every probe (it may perform I/O, e.g. a
/// remote stat) and nothing is cached across calls.
pub fn resolve_unique_name(base_name: &str, mut already_exists: impl FnMut(&str) -> bool) -> String {
    let trimmed = base_name.trim();
    let base = if trimmed.is_empty() { "World" } else { trimmed };

    if !already_exists(base) {
        return base.to_string();
    }
    let mut suffix = 1u32;
    loop {
        let candidate = format!("{base}_{suffix}");
        if !already_exists(&candidate) {
            return candidate;
        }
        suffix += 1;
    }
}
