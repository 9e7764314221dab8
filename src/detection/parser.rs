//! Output parsing with regex extraction.

use regex::Regex;
use std::sync::LazyLock;

// `javac 1.8.0_202`: everything up to the first underscore is the version.
static JAVAC_BANNER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"javac\s+([^\s_]+)_(\S+)").expect("valid javac banner regex"));

static REG_SZ_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(.+?)\s+REG_(?:EXPAND_)?SZ\s+(.*?)\s*$").expect("valid reg query regex")
});

/// Extract the version and build from a compiler `-version` banner.
///
/// Only banners of the form `javac <version>_<build>` carry both parts:
///
/// - `javac 1.8.0_202` -> (`1.8.0`, `202`)
/// - `javac 1.7.0_80` -> (`1.7.0`, `80`)
/// - `javac 17.0.2` -> `None`
///
/// # Returns
///
/// `Some((version, build))` if the pattern matches, `None` otherwise.
pub(crate) fn parse_javac_banner(output: &str) -> Option<(String, String)> {
    let caps = JAVAC_BANNER.captures(output)?;
    Some((caps[1].to_string(), caps[2].to_string()))
}

/// Extract a `REG_SZ` value from `reg query <key> /v <name>` output.
///
/// ```text
/// HKEY_LOCAL_MACHINE\SOFTWARE\JavaSoft\Java Development Kit
///     CurrentVersion    REG_SZ    1.8
/// ```
pub(crate) fn parse_reg_query(output: &str, name: &str) -> Option<String> {
    output.lines().find_map(|line| {
        let caps = REG_SZ_LINE.captures(line)?;
        if caps[1].eq_ignore_ascii_case(name) && !caps[2].is_empty() {
            Some(caps[2].to_string())
        } else {
            None
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_java8_banner() {
        let result = parse_javac_banner("javac 1.8.0_202\n").unwrap();
        assert_eq!(result, ("1.8.0".to_string(), "202".to_string()));
    }

    #[test]
    fn test_parse_banner_with_jvm_noise() {
        let output = "Picked up _JAVA_OPTIONS: -Xmx512m\njavac 1.7.0_80\n";
        let result = parse_javac_banner(output).unwrap();
        assert_eq!(result, ("1.7.0".to_string(), "80".to_string()));
    }

    #[test]
    fn test_parse_banner_without_build() {
        assert!(parse_javac_banner("javac 17.0.2").is_none());
        assert!(parse_javac_banner("javac 11").is_none());
    }

    #[test]
    fn test_parse_banner_no_match() {
        assert!(parse_javac_banner("").is_none());
        assert!(parse_javac_banner("Unrecognized option: -J-d64").is_none());
    }

    #[test]
    fn test_parse_reg_query_current_version() {
        let output = "\r\nHKEY_LOCAL_MACHINE\\SOFTWARE\\JavaSoft\\Java Development Kit\r\n    CurrentVersion    REG_SZ    1.8\r\n\r\n";
        assert_eq!(
            parse_reg_query(output, "CurrentVersion"),
            Some("1.8".to_string())
        );
    }

    #[test]
    fn test_parse_reg_query_path_with_spaces() {
        let output = "HKEY_LOCAL_MACHINE\\SOFTWARE\\JavaSoft\\JDK\\17\n    JavaHome    REG_SZ    C:\\Program Files\\Java\\jdk-17\n";
        assert_eq!(
            parse_reg_query(output, "JavaHome"),
            Some("C:\\Program Files\\Java\\jdk-17".to_string())
        );
    }

    #[test]
    fn test_parse_reg_query_missing_value() {
        let output = "ERROR: The system was unable to find the specified registry key or value.";
        assert!(parse_reg_query(output, "JavaHome").is_none());
        assert!(parse_reg_query("    Other    REG_SZ    x", "JavaHome").is_none());
    }
}
