//! Output folder naming.

/// Characters replaced by `-` in folder names.
const REPLACED: &[char] = &[':', '\\', '/', '*', '|', '<', '>', '?'];

/// Turn a tag query into a folder name that is safe on desktop and mobile
/// filesystems.
///
/// Spaces become `_`, path and shell metacharacters become `-`, double
/// quotes become single quotes and a leading `.` becomes `dot_`. An empty
/// result is named `unnamed_folder`.
pub fn sanitize_folder_name(name: &str) -> String {
    let mut out: String = name
        .chars()
        .map(|c| match c {
            ' ' => '_',
            '"' => '\'',
            c if REPLACED.contains(&c) => '-',
            c => c,
        })
        .collect();

    if let Some(rest) = out.strip_prefix('.') {
        out = format!("dot_{}", rest);
    }
    if out.is_empty() {
        out = "unnamed_folder".to_string();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spaces_and_metacharacters() {
        assert_eq!(sanitize_folder_name("fox solo"), "fox_solo");
        assert_eq!(sanitize_folder_name("rating:safe score:>100"), "rating-safe_score--100");
        assert_eq!(sanitize_folder_name(r#"a/b\c*d|e<f>g?h"#), "a-b-c-d-e-f-g-h");
        assert_eq!(sanitize_folder_name(r#"say "hi""#), "say_'hi'");
    }

    #[test]
    fn test_leading_dot() {
        assert_eq!(sanitize_folder_name(".hidden"), "dot_hidden");
        assert_eq!(sanitize_folder_name("."), "dot_");
    }

    #[test]
    fn test_empty_name() {
        assert_eq!(sanitize_folder_name(""), "unnamed_folder");
    }
}
