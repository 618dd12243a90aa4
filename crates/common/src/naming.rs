//! Compliant-name conversion
//!
//! External property and resource keys use lower snake_case regardless of how
//! the API document spells them.

/// Convert an API-document name to its compliant snake_case form.
///
/// Lowercases everything, collapses runs of non-alphanumeric characters into
/// a single underscore and inserts an underscore at camelCase boundaries
/// (`HTTPServer` becomes `http_server`, `listenPort` becomes `listen_port`).
pub fn compliant_name(s: &str) -> String {
    let mut result = String::new();
    let chars: Vec<char> = s.chars().collect();

    for (i, &ch) in chars.iter().enumerate() {
        if ch.is_uppercase() {
            // Underscore before an uppercase run boundary:
            // previous char is lowercase/digit, or the next char is lowercase
            // (handles HTTPServer -> http_server).
            let boundary = i > 0
                && (chars[i - 1].is_lowercase()
                    || chars[i - 1].is_ascii_digit()
                    || (i + 1 < chars.len() && chars[i + 1].is_lowercase()));

            if boundary && !result.ends_with('_') {
                result.push('_');
            }
            result.push(ch.to_ascii_lowercase());
        } else if ch.is_alphanumeric() {
            result.push(ch);
        } else if !result.is_empty() && !result.ends_with('_') {
            result.push('_');
        }
    }

    while result.contains("__") {
        result = result.replace("__", "_");
    }

    result.trim_matches('_').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_camel_case_boundaries() {
        assert_eq!(compliant_name("listenPort"), "listen_port");
        assert_eq!(compliant_name("HTTPServer"), "http_server");
        assert_eq!(compliant_name("XMLParser"), "xml_parser");
        assert_eq!(compliant_name("IOError"), "io_error");
    }

    #[test]
    fn test_non_alphanumeric_runs() {
        assert_eq!(compliant_name("some-resource"), "some_resource");
        assert_eq!(compliant_name("some--odd..name"), "some_odd_name");
        assert_eq!(compliant_name("__wrapped__"), "wrapped");
    }

    #[test]
    fn test_already_compliant() {
        assert_eq!(compliant_name("label"), "label");
        assert_eq!(compliant_name("v1_api"), "v1_api");
    }
}
