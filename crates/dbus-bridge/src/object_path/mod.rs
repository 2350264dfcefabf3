//! Object path validation.


/// Test if `path` is a valid D-Bus object path.
///
/// A path starts with `/` and consists of non-empty elements made up of
/// ASCII letters, digits and underscores. The root path `/` is valid, a
/// trailing slash is not.
pub fn is_object_path(path: &str) -> bool {
    let [b'/', bytes @ ..] = path.as_bytes() else {
        return false;
    };

    // Special case: "/" is a valid path.
    if bytes.is_empty() {
        return true;
    }

    let mut component = false;

    for &b in bytes {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'_' => {
                component = true;
            }
            b'/' => {
                if !component {
                    return false;
                }

                component = false;
            }
            _ => {
                return false;
            }
        }
    }

    component
}
