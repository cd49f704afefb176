//! New-link detection against the previous snapshot

use crate::schema::LinkMap;

/// Links in `current` whose url is absent from `previous`.
///
/// With `stop_at_first_existing`, `current` is assumed newest-first: the scan
/// ends at the first known link that follows at least one new link. Known
/// links before any new one do not end it.
pub fn new_links(previous: &LinkMap, current: &LinkMap, stop_at_first_existing: bool) -> LinkMap {
    let mut result = LinkMap::new();
    let mut found_new = false;

    for (url, title) in current.iter() {
        if previous.contains(url) {
            if stop_at_first_existing && found_new {
                break;
            }
        } else {
            found_new = true;
            result.insert(url, title);
        }
    }

    result
}
