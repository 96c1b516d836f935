//! Joining base URLs and path fragments.
//!
//! # Design
//! The first fragment keeps its leading slashes so protocol-relative bases
//! such as `//host` survive the join. Every later fragment is stripped on
//! both ends, and fragments that end up empty are dropped.

/// Join path fragments into a single path separated by exactly one `/`.
///
/// ```
/// use api_call::build_path;
///
/// assert_eq!(build_path(&["https://h/", "/api"]), "https://h/api");
/// assert_eq!(build_path(&["//h", "/call"]), "//h/call");
/// ```
pub fn build_path<S: AsRef<str>>(parts: &[S]) -> String {
    parts
        .iter()
        .enumerate()
        .map(|(i, part)| {
            let part = part.as_ref().trim();
            if i == 0 {
                part.trim_end_matches('/')
            } else {
                part.trim_matches('/')
            }
        })
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_base_and_relative_path() {
        assert_eq!(build_path(&["https://h", "api"]), "https://h/api");
    }

    #[test]
    fn collapses_slashes_at_the_seam() {
        assert_eq!(build_path(&["https://h/", "/api"]), "https://h/api");
        assert_eq!(build_path(&["https://h/api", "/call"]), "https://h/api/call");
    }

    #[test]
    fn keeps_protocol_relative_base() {
        assert_eq!(build_path(&["//h", "/call"]), "//h/call");
    }

    #[test]
    fn single_fragment_keeps_leading_slash() {
        assert_eq!(build_path(&["/api"]), "/api");
    }

    #[test]
    fn drops_empty_and_whitespace_fragments() {
        assert_eq!(build_path(&["https://h", "  ", "/", " v1/ ", "users"]), "https://h/v1/users");
    }

    #[test]
    fn trailing_slashes_on_last_fragment_are_stripped() {
        assert_eq!(build_path(&["https://h", "users///"]), "https://h/users");
    }

    #[test]
    fn empty_input_yields_empty_path() {
        let parts: [&str; 0] = [];
        assert_eq!(build_path(&parts), "");
    }
}
