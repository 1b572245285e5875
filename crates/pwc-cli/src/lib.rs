//! Library half of the pwclean command line tool.
//!
//! The binary in `main.rs` is a thin clap front end over these modules:
//! - `logging`: tracing setup and the process-wide log cleaner
//! - `exit_codes`: stable process exit codes
//! - `report`: JSON payloads for `--stats` and `list`

pub mod exit_codes;
pub mod logging;
pub mod report;

use pwc_config::SecretSpec;

/// A `--secret PATTERN[=SUBSTITUTE]` argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretArg {
    pub pattern: String,
    pub substitute: Option<String>,
}

impl SecretArg {
    pub fn to_spec(&self) -> SecretSpec {
        let spec = SecretSpec::new(self.pattern.clone());
        match &self.substitute {
            Some(substitute) => spec.with_substitute(substitute.clone()),
            None => spec,
        }
    }
}

/// Parse `PATTERN[=SUBSTITUTE]`, splitting at the first `=`.
pub fn parse_secret_arg(raw: &str) -> Result<SecretArg, String> {
    let (pattern, substitute) = match raw.split_once('=') {
        Some((pattern, substitute)) => (pattern, Some(substitute.to_string())),
        None => (raw, None),
    };
    if pattern.is_empty() {
        return Err("secret pattern must not be empty".to_string());
    }
    Ok(SecretArg {
        pattern: pattern.to_string(),
        substitute,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_secret_arg() {
        assert_eq!(
            parse_secret_arg("hunter2").unwrap(),
            SecretArg {
                pattern: "hunter2".to_string(),
                substitute: None
            }
        );
        let arg = parse_secret_arg("token=[T]").unwrap();
        assert_eq!(arg.pattern, "token");
        assert_eq!(arg.substitute.as_deref(), Some("[T]"));

        // substitute may itself contain '=' or be empty
        assert_eq!(
            parse_secret_arg("k=a=b").unwrap().substitute.as_deref(),
            Some("a=b")
        );
        assert_eq!(parse_secret_arg("k=").unwrap().substitute.as_deref(), Some(""));
    }

    #[test]
    fn test_parse_secret_arg_rejects_empty_pattern() {
        assert!(parse_secret_arg("").is_err());
        assert!(parse_secret_arg("=sub").is_err());
    }

    #[test]
    fn test_to_spec() {
        let spec = parse_secret_arg("pw=X").unwrap().to_spec();
        assert_eq!(spec.pattern, "pw");
        assert_eq!(spec.substitute.as_deref(), Some("X"));
        assert_eq!(spec.encoding, pwc_config::PatternEncoding::Utf8);
    }
}
