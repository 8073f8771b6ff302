use crate::config::MarkerMode;

/// Returns the prompt text if `line` is an interactive-input prompt.
///
/// The prompt is everything after the first occurrence of `marker`. An empty
/// marker never matches.
pub fn detect_prompt<'a>(line: &'a str, marker: &str, mode: MarkerMode) -> Option<&'a str> {
    if marker.is_empty() {
        return None;
    }
    match mode {
        MarkerMode::Substring => line
            .find(marker)
            .map(|idx| &line[idx + marker.len()..]),
        MarkerMode::Prefix => line.strip_prefix(marker),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MARKER: &str = ">>> ";

    #[test]
    fn plain_line_is_not_a_prompt() {
        assert_eq!(detect_prompt("hello", MARKER, MarkerMode::Substring), None);
        assert_eq!(detect_prompt(">>>no space", MARKER, MarkerMode::Substring), None);
    }

    #[test]
    fn leading_marker() {
        assert_eq!(
            detect_prompt(">>> Enter a number: ", MARKER, MarkerMode::Substring),
            Some("Enter a number: ")
        );
        assert_eq!(
            detect_prompt(">>> Enter a number: ", MARKER, MarkerMode::Prefix),
            Some("Enter a number: ")
        );
    }

    #[test]
    fn substring_matches_mid_line() {
        assert_eq!(
            detect_prompt("result: >>> done", MARKER, MarkerMode::Substring),
            Some("done")
        );
    }

    #[test]
    fn prefix_ignores_mid_line_marker() {
        assert_eq!(
            detect_prompt("result: >>> done", MARKER, MarkerMode::Prefix),
            None
        );
    }

    #[test]
    fn first_occurrence_wins() {
        assert_eq!(
            detect_prompt("a >>> b >>> c", MARKER, MarkerMode::Substring),
            Some("b >>> c")
        );
    }

    #[test]
    fn bare_marker_gives_empty_prompt() {
        assert_eq!(detect_prompt(">>> ", MARKER, MarkerMode::Substring), Some(""));
    }

    #[test]
    fn empty_marker_never_matches() {
        assert_eq!(detect_prompt("anything", "", MarkerMode::Substring), None);
    }
}
