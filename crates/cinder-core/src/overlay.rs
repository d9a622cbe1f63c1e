//! Environment-variable overlay resolution.
//!
//! Overlays merge deterministically: global < job < variant < step, with
//! later layers overriding same-named keys.

use std::collections::HashMap;

/// Merge overlays in precedence order. Later layers win on conflict.
pub fn resolve<'a, I>(layers: I) -> HashMap<String, String>
where
    I: IntoIterator<Item = &'a HashMap<String, String>>,
{
    let mut resolved = HashMap::new();
    for layer in layers {
        for (key, value) in layer {
            resolved.insert(key.clone(), value.clone());
        }
    }
    resolved
}
