//! Reference interpolation over the merged variable set
//!
//! Values may reference other variables with shell-style syntax:
//!
//! - `$NAME` or `${NAME}` - substitute the effective value of `NAME`
//! - `${NAME:-default}` - substitute `default` when `NAME` is undefined
//! - `$$` - escape producing a literal `$`
//!
//! Resolution runs after the full layer merge and always substitutes the
//! effective value of the referenced name, never a per-layer intermediate.
//! References to undefined names and reference cycles are fatal.

use std::collections::{BTreeMap, HashSet};

use super::merge::MergedVar;

/// Errors during reference resolution
#[derive(Debug, thiserror::Error)]
pub enum InterpolateError {
    #[error("variable {referenced_by} references undefined variable {name}")]
    MissingReference {
        /// The undefined name
        name: String,
        /// The variable whose value contains the reference
        referenced_by: String,
    },

    #[error("reference cycle: {}", cycle.join(" -> "))]
    CyclicReference { cycle: Vec<String> },

    #[error("variable {referenced_by} contains an unclosed ${{ reference")]
    UnclosedReference { referenced_by: String },
}

/// Resolve every merged variable to its effective value.
///
/// Returns a name-to-value map with all references substituted. The input
/// map is untouched; resolving the same input twice yields identical output.
pub fn resolve_all(
    merged: &BTreeMap<String, MergedVar>,
) -> Result<BTreeMap<String, String>, InterpolateError> {
    let mut resolver = Resolver {
        merged,
        resolved: BTreeMap::new(),
        in_progress: HashSet::new(),
        stack: Vec::new(),
    };

    for name in merged.keys() {
        resolver.resolve(name)?;
    }

    Ok(resolver.resolved)
}

struct Resolver<'a> {
    merged: &'a BTreeMap<String, MergedVar>,
    resolved: BTreeMap<String, String>,
    in_progress: HashSet<String>,
    stack: Vec<String>,
}

impl Resolver<'_> {
    /// Resolve one variable, recursing into its references
    fn resolve(&mut self, name: &str) -> Result<String, InterpolateError> {
        if let Some(value) = self.resolved.get(name) {
            return Ok(value.clone());
        }

        if self.in_progress.contains(name) {
            let start = self.stack.iter().position(|n| n == name).unwrap_or(0);
            let mut cycle: Vec<String> = self.stack[start..].to_vec();
            cycle.push(name.to_string());
            return Err(InterpolateError::CyclicReference { cycle });
        }

        let raw = self.merged[name].raw_value.clone();
        self.in_progress.insert(name.to_string());
        self.stack.push(name.to_string());

        let result = self.substitute(name, &raw);

        self.stack.pop();
        self.in_progress.remove(name);

        let value = result?;
        self.resolved.insert(name.to_string(), value.clone());
        Ok(value)
    }

    /// Substitute all references inside one value
    fn substitute(&mut self, owner: &str, input: &str) -> Result<String, InterpolateError> {
        if !input.contains('$') {
            return Ok(input.to_string());
        }

        let mut result = String::with_capacity(input.len());
        let mut chars = input.chars().peekable();

        while let Some(c) = chars.next() {
            if c != '$' {
                result.push(c);
                continue;
            }

            match chars.peek() {
                // $$ -> literal $
                Some('$') => {
                    chars.next();
                    result.push('$');
                }

                // ${NAME} or ${NAME:-default}
                Some('{') => {
                    chars.next();

                    let mut name = String::new();
                    let mut default_value: Option<String> = None;
                    let mut closed = false;

                    while let Some(&ch) = chars.peek() {
                        if ch == '}' {
                            chars.next();
                            closed = true;
                            break;
                        } else if ch == ':' {
                            chars.next();
                            if chars.peek() == Some(&'-') {
                                chars.next();
                                let mut default = String::new();
                                for dch in chars.by_ref() {
                                    if dch == '}' {
                                        closed = true;
                                        break;
                                    }
                                    default.push(dch);
                                }
                                default_value = Some(default);
                                break;
                            }
                            name.push(':');
                        } else {
                            name.push(ch);
                            chars.next();
                        }
                    }

                    if !closed {
                        return Err(InterpolateError::UnclosedReference {
                            referenced_by: owner.to_string(),
                        });
                    }

                    if self.merged.contains_key(&name) {
                        let value = self.resolve(&name)?;
                        result.push_str(&value);
                    } else if let Some(default) = default_value {
                        result.push_str(&default);
                    } else {
                        return Err(InterpolateError::MissingReference {
                            name,
                            referenced_by: owner.to_string(),
                        });
                    }
                }

                // $NAME - bare reference, name chars only
                Some(ch) if ch.is_ascii_alphabetic() || *ch == '_' => {
                    let mut name = String::new();
                    while let Some(&ch) = chars.peek() {
                        if ch.is_ascii_alphanumeric() || ch == '_' {
                            name.push(ch);
                            chars.next();
                        } else {
                            break;
                        }
                    }

                    if self.merged.contains_key(&name) {
                        let value = self.resolve(&name)?;
                        result.push_str(&value);
                    } else {
                        return Err(InterpolateError::MissingReference {
                            name,
                            referenced_by: owner.to_string(),
                        });
                    }
                }

                // Lone $ before a non-name character is literal
                _ => {
                    result.push('$');
                }
            }
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::layer::{LayerOrigin, VarForm};

    fn merged(vars: &[(&str, &str)]) -> BTreeMap<String, MergedVar> {
        vars.iter()
            .map(|(name, value)| {
                (
                    name.to_string(),
                    MergedVar {
                        raw_value: value.to_string(),
                        form: VarForm::Set,
                        origin: LayerOrigin::Deployment,
                    },
                )
            })
            .collect()
    }

    #[test]
    fn test_no_references() {
        let resolved = resolve_all(&merged(&[("A", "plain")])).unwrap();
        assert_eq!(resolved["A"], "plain");
    }

    #[test]
    fn test_bare_reference() {
        let resolved = resolve_all(&merged(&[("A", "2"), ("B", "$A-x")])).unwrap();
        assert_eq!(resolved["A"], "2");
        assert_eq!(resolved["B"], "2-x");
    }

    #[test]
    fn test_braced_reference() {
        let resolved = resolve_all(&merged(&[("HOST", "dev.example.org"), ("URL", "https://${HOST}/v1")]))
            .unwrap();
        assert_eq!(resolved["URL"], "https://dev.example.org/v1");
    }

    #[test]
    fn test_transitive_reference() {
        let resolved = resolve_all(&merged(&[
            ("STAGE", "dev"),
            ("DOMAIN", "$STAGE.example.org"),
            ("URL", "https://$DOMAIN/"),
        ]))
        .unwrap();
        assert_eq!(resolved["URL"], "https://dev.example.org/");
    }

    #[test]
    fn test_reference_uses_effective_value() {
        // B references A; A was overridden, so B sees the override
        let mut vars = merged(&[("B", "$A-x")]);
        vars.insert(
            "A".to_string(),
            MergedVar {
                raw_value: "2".to_string(),
                form: VarForm::Set,
                origin: LayerOrigin::RootLocal,
            },
        );

        let resolved = resolve_all(&vars).unwrap();
        assert_eq!(resolved["B"], "2-x");
    }

    #[test]
    fn test_missing_reference() {
        let err = resolve_all(&merged(&[("B", "$NOPE")])).unwrap_err();
        match err {
            InterpolateError::MissingReference { name, referenced_by } => {
                assert_eq!(name, "NOPE");
                assert_eq!(referenced_by, "B");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_default_used_when_undefined() {
        let resolved = resolve_all(&merged(&[("PORT", "${LISTEN_PORT:-8080}")])).unwrap();
        assert_eq!(resolved["PORT"], "8080");
    }

    #[test]
    fn test_default_ignored_when_defined() {
        let resolved =
            resolve_all(&merged(&[("LISTEN_PORT", "9090"), ("PORT", "${LISTEN_PORT:-8080}")]))
                .unwrap();
        assert_eq!(resolved["PORT"], "9090");
    }

    #[test]
    fn test_empty_default() {
        let resolved = resolve_all(&merged(&[("OPT", "${MISSING:-}")])).unwrap();
        assert_eq!(resolved["OPT"], "");
    }

    #[test]
    fn test_dollar_escape() {
        let resolved = resolve_all(&merged(&[("COST", "$$5.00")])).unwrap();
        assert_eq!(resolved["COST"], "$5.00");
    }

    #[test]
    fn test_lone_dollar_literal() {
        let resolved = resolve_all(&merged(&[("PRICE", "5$ only")])).unwrap();
        assert_eq!(resolved["PRICE"], "5$ only");
    }

    #[test]
    fn test_unclosed_brace() {
        let err = resolve_all(&merged(&[("A", "${UNCLOSED")])).unwrap_err();
        assert!(matches!(err, InterpolateError::UnclosedReference { referenced_by } if referenced_by == "A"));
    }

    #[test]
    fn test_direct_cycle() {
        let err = resolve_all(&merged(&[("A", "$B"), ("B", "$A")])).unwrap_err();
        match err {
            InterpolateError::CyclicReference { cycle } => {
                assert_eq!(cycle.first(), cycle.last());
                assert!(cycle.len() >= 3);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_self_cycle() {
        let err = resolve_all(&merged(&[("A", "pre-$A")])).unwrap_err();
        assert!(matches!(err, InterpolateError::CyclicReference { .. }));
    }

    #[test]
    fn test_transitive_cycle() {
        let err = resolve_all(&merged(&[("A", "$B"), ("B", "$C"), ("C", "$A")])).unwrap_err();
        match err {
            InterpolateError::CyclicReference { cycle } => {
                assert!(cycle.len() >= 4);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_resolution_deterministic() {
        let vars = merged(&[("A", "1"), ("B", "$A"), ("C", "${B}-$A")]);
        let first = resolve_all(&vars).unwrap();
        let second = resolve_all(&vars).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_multiple_references_one_value() {
        let resolved = resolve_all(&merged(&[("A", "x"), ("B", "y"), ("C", "$A/$B/$A")])).unwrap();
        assert_eq!(resolved["C"], "x/y/x");
    }
}
