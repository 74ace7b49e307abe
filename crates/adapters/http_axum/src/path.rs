//! Request path normalisation and segment-at-a-time consumption.

/// Lexically clean a request path.
///
/// The result is rooted, has no empty, `.` or `..` segments and no trailing
/// slash (except for the root itself). `..` never climbs above the root.
pub fn clean_path(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    format!("/{}", segments.join("/"))
}

/// Walks a cleaned path one segment at a time, left to right.
#[derive(Debug, Clone, Copy)]
pub struct PathCursor<'a> {
    rest: &'a str,
}

impl<'a> PathCursor<'a> {
    pub fn new(path: &'a str) -> Self {
        Self {
            rest: path.trim_start_matches('/'),
        }
    }

    /// Consume and return the next segment, `None` once the path is used up.
    pub fn shift(&mut self) -> Option<&'a str> {
        if self.rest.is_empty() {
            return None;
        }
        let (head, tail) = self.rest.split_once('/').unwrap_or((self.rest, ""));
        self.rest = tail;
        Some(head)
    }

    pub fn is_empty(&self) -> bool {
        self.rest.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_clean_paths() {
        let cases = [
            ("", "/"),
            ("/", "/"),
            ("/devices/", "/devices"),
            ("//devices//3", "/devices/3"),
            ("/devices/./3", "/devices/3"),
            ("/devices/4/../3/on", "/devices/3/on"),
            ("/../../devices", "/devices"),
            ("devices", "/devices"),
        ];
        for (input, expected) in cases {
            assert_eq!(clean_path(input), expected, "input {input:?}");
        }
    }

    #[test]
    fn should_shift_one_segment_at_a_time() {
        let path = clean_path("/devices/3/dim/128");
        let mut cursor = PathCursor::new(&path);
        assert_eq!(cursor.shift(), Some("devices"));
        assert_eq!(cursor.shift(), Some("3"));
        assert!(!cursor.is_empty());
        assert_eq!(cursor.shift(), Some("dim"));
        assert_eq!(cursor.shift(), Some("128"));
        assert_eq!(cursor.shift(), None);
        assert!(cursor.is_empty());
    }

    #[test]
    fn should_yield_nothing_for_root() {
        let mut cursor = PathCursor::new("/");
        assert_eq!(cursor.shift(), None);
    }
}
