use serde::{Deserialize, Serialize};

/// What to do when a rule can reach itself without consuming input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LeftRecursion {
    Allow,
    #[default]
    Warn,
    Reject,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ParseOptions {
    /// Accept rule names starting with `_`, these normally belong to generated helper rules.
    pub allow_reserved_names: bool,
    /// Name of the start rule, the first defined rule is used when unset.
    pub root: Option<String>,
    pub left_recursion: LeftRecursion,
    /// Upper bound for the counts in `{m,n}`.
    pub max_repetition: u32,
    /// How many parenthesized groups may be open at once.
    pub max_nesting: u32,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            allow_reserved_names: false,
            root: None,
            left_recursion: LeftRecursion::default(),
            max_repetition: 1024,
            max_nesting: 256,
        }
    }
}

impl ParseOptions {
    /// Options for parsing text produced by [`Grammar::print`](crate::Grammar::print), which
    /// contains generated rule names.
    pub fn reparse(&self) -> ParseOptions {
        ParseOptions {
            allow_reserved_names: true,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_for_missing_fields() {
        let options: ParseOptions = serde_json::from_str(r#"{ "root": "root" }"#).unwrap();
        assert_eq!(options.root.as_deref(), Some("root"));
        assert_eq!(options.left_recursion, LeftRecursion::Warn);
        assert_eq!(options.max_repetition, 1024);
        assert_eq!(options.max_nesting, 256);
        assert!(!options.allow_reserved_names);
    }

    #[test]
    fn camel_case_fields() {
        let json = r#"{
            "allowReservedNames": true,
            "leftRecursion": "reject",
            "maxRepetition": 16,
            "maxNesting": 8
        }"#;
        let options: ParseOptions = serde_json::from_str(json).unwrap();
        assert_eq!(
            options,
            ParseOptions {
                allow_reserved_names: true,
                root: None,
                left_recursion: LeftRecursion::Reject,
                max_repetition: 16,
                max_nesting: 8,
            }
        );
    }

    #[test]
    fn reparse_keeps_root() {
        let options = ParseOptions {
            root: Some("start".to_owned()),
            ..Default::default()
        };
        let reparse = options.reparse();
        assert!(reparse.allow_reserved_names);
        assert_eq!(reparse.root, options.root);
    }
}
