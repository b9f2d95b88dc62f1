//! Typed view of a `.gyp` build description.
//!
//! The raw literal is read by [`crate::literal`]; this module pulls out the
//! parts the resolver needs (global `variables.conditions`, each target's
//! `sources`, `conditions` and `direct_dependent_settings.conditions`) and
//! validates the shape of every condition list on the way in, including
//! lists nested inside a clause's defs blocks.

use std::path::{Path, PathBuf};

use crate::condition::{self, Expression};
use crate::error::{GypError, Result};
use crate::literal::{self, Dict, Value};

// ═══════════════════════════════════════════════════════════════════════════════
//  Condition clauses
// ═══════════════════════════════════════════════════════════════════════════════

/// One defs block of a condition clause.
#[derive(Debug, Clone, PartialEq)]
pub struct Branch {
    pub defs: Dict,
    /// Every `conditions` list found inside `defs`, at any depth, in the
    /// order a merge of `defs` discovers them.
    pub nested: ConditionList,
}

impl Branch {
    /// Walk `defs` with an explicit stack, parsing each nested
    /// `conditions` list on the way.
    fn parse(defs: &Dict, context: &str) -> Result<Self> {
        let mut nested = ConditionList::new();
        let mut stack = vec![defs.iter()];

        while let Some(frame) = stack.last_mut() {
            let Some((key, value)) = frame.next() else {
                stack.pop();
                continue;
            };

            match value {
                Value::List(items) if key == "conditions" => {
                    nested.extend(parse_condition_list(items, &format!("{context}.conditions"))?);
                }
                _ if key == "conditions" => {
                    return Err(GypError::Malformed(format!(
                        "{context}.conditions must be a list, found {}",
                        value.type_name()
                    )));
                }
                Value::Dict(inner) => stack.push(inner.iter()),
                _ => {}
            }
        }

        Ok(Self {
            defs: defs.clone(),
            nested,
        })
    }
}

/// One `[predicate, defs_if_true, defs_if_false?]` entry of a `conditions`
/// list.
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionClause {
    /// The predicate as written in the document.
    pub predicate: String,
    pub expression: Expression,
    pub then_branch: Branch,
    pub else_branch: Option<Branch>,
}

pub type ConditionList = Vec<ConditionClause>;

impl ConditionClause {
    fn parse(value: &Value, context: &str) -> Result<Self> {
        let items = value.as_list().ok_or_else(|| {
            GypError::Malformed(format!(
                "{context}: expected a condition list entry, found {}",
                value.type_name()
            ))
        })?;

        let (predicate, then_defs, else_defs) = match items {
            [p, t] => (p, t, None),
            [p, t, e] => (p, t, Some(e)),
            _ => {
                return Err(GypError::Malformed(format!(
                    "{context}: condition entry has {} elements, expected 2 or 3",
                    items.len()
                )));
            }
        };

        let predicate = predicate.as_str().ok_or_else(|| {
            GypError::Malformed(format!("{context}: condition predicate must be a string"))
        })?;
        let expression = condition::parse_condition(predicate)?;

        let branch = |v: &Value, which: &str| {
            let defs = v.as_dict().ok_or_else(|| {
                GypError::Malformed(format!(
                    "{context}: {which} branch must be a mapping, found {}",
                    v.type_name()
                ))
            })?;
            Branch::parse(defs, &format!("{context}.{which}"))
        };

        Ok(Self {
            predicate: predicate.to_string(),
            expression,
            then_branch: branch(then_defs, "true")?,
            else_branch: else_defs.map(|e| branch(e, "false")).transpose()?,
        })
    }
}

/// Validate a raw `conditions` list and parse every predicate in it.
pub fn parse_condition_list(values: &[Value], context: &str) -> Result<ConditionList> {
    values
        .iter()
        .enumerate()
        .map(|(i, v)| ConditionClause::parse(v, &format!("{context}[{i}]")))
        .collect()
}

fn conditions_at(dict: &Dict, context: &str) -> Result<Option<ConditionList>> {
    match dict.get("conditions") {
        None => Ok(None),
        Some(Value::List(items)) => {
            parse_condition_list(items, &format!("{context}.conditions")).map(Some)
        }
        Some(other) => Err(GypError::Malformed(format!(
            "{context}.conditions must be a list, found {}",
            other.type_name()
        ))),
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Target
// ═══════════════════════════════════════════════════════════════════════════════

/// A named build unit from the document's `targets` list.
///
/// Keys the resolver depends on are kept optional here; their absence only
/// becomes an error once the target is resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct Target {
    pub name: String,
    pub sources: Option<Vec<String>>,
    pub conditions: Option<ConditionList>,
    /// `direct_dependent_settings.conditions`.
    pub direct_dependent_conditions: Option<ConditionList>,
}

impl Target {
    fn parse(value: &Value, index: usize) -> Result<Self> {
        let dict = value.as_dict().ok_or_else(|| {
            GypError::Malformed(format!("targets[{index}] must be a mapping"))
        })?;

        let name = dict
            .get("target_name")
            .ok_or_else(|| GypError::MissingKey(format!("targets[{index}].target_name")))?
            .as_str()
            .ok_or_else(|| {
                GypError::Malformed(format!("targets[{index}].target_name must be a string"))
            })?
            .to_string();
        let context = format!("targets[{name}]");

        let sources = match dict.get("sources") {
            None => None,
            Some(Value::List(items)) => Some(
                items
                    .iter()
                    .map(|s| {
                        s.as_str().map(str::to_string).ok_or_else(|| {
                            GypError::Malformed(format!(
                                "{context}.sources: expected strings, found {}",
                                s.type_name()
                            ))
                        })
                    })
                    .collect::<Result<Vec<_>>>()?,
            ),
            Some(other) => {
                return Err(GypError::Malformed(format!(
                    "{context}.sources must be a list, found {}",
                    other.type_name()
                )));
            }
        };

        let conditions = conditions_at(dict, &context)?;

        let direct_dependent_conditions = match dict.get("direct_dependent_settings") {
            None => None,
            Some(Value::Dict(settings)) => {
                conditions_at(settings, &format!("{context}.direct_dependent_settings"))?
            }
            Some(other) => {
                return Err(GypError::Malformed(format!(
                    "{context}.direct_dependent_settings must be a mapping, found {}",
                    other.type_name()
                )));
            }
        };

        Ok(Self {
            name,
            sources,
            conditions,
            direct_dependent_conditions,
        })
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
//  BuildDocument
// ═══════════════════════════════════════════════════════════════════════════════

/// A parsed `.gyp` file.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildDocument {
    /// Directory containing the file, as the caller named it. `None` when
    /// created via [`BuildDocument::parse`] or when the path had no parent.
    directory: Option<PathBuf>,
    /// `variables.conditions`.
    pub variables: Option<ConditionList>,
    pub targets: Vec<Target>,
}

impl BuildDocument {
    /// Parse a build description from its source text.
    pub fn parse(source: &str) -> Result<Self> {
        let root = literal::parse_literal(source)?;
        let root = root.as_dict().ok_or_else(|| {
            GypError::Malformed(format!(
                "top level must be a mapping, found {}",
                root.type_name()
            ))
        })?;

        let variables = match root.get("variables") {
            None => None,
            Some(Value::Dict(vars)) => conditions_at(vars, "variables")?,
            Some(other) => {
                return Err(GypError::Malformed(format!(
                    "variables must be a mapping, found {}",
                    other.type_name()
                )));
            }
        };

        let targets = root
            .get("targets")
            .ok_or_else(|| GypError::MissingKey("targets".into()))?
            .as_list()
            .ok_or_else(|| GypError::Malformed("targets must be a list".into()))?
            .iter()
            .enumerate()
            .map(|(i, t)| Target::parse(t, i))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            directory: None,
            variables,
            targets,
        })
    }

    /// Load a build description from disk.
    ///
    /// The directory part of `path` is kept exactly as given so that
    /// resolved source paths stay relative to the caller.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|e| GypError::io(path, e))?;
        let mut document = Self::parse(&source)?;
        document.directory = path
            .parent()
            .filter(|d| !d.as_os_str().is_empty())
            .map(Path::to_path_buf);
        Ok(document)
    }

    /// The directory containing the file (set by [`from_file`](Self::from_file)).
    pub fn directory(&self) -> Option<&Path> {
        self.directory.as_deref()
    }

    /// Names of all targets, in document order.
    pub fn target_names(&self) -> Vec<&str> {
        self.targets.iter().map(|t| t.name.as_str()).collect()
    }

    /// Look up the single target called `name`.
    ///
    /// Zero matches is [`GypError::TargetNotFound`]; more than one is
    /// [`GypError::AmbiguousTarget`].
    pub fn find_target(&self, name: &str) -> Result<&Target> {
        let mut matches = self.targets.iter().filter(|t| t.name == name);
        let first = matches
            .next()
            .ok_or_else(|| GypError::TargetNotFound(name.to_string()))?;

        let extra = matches.count();
        if extra > 0 {
            return Err(GypError::AmbiguousTarget {
                name: name.to_string(),
                count: extra + 1,
            });
        }
        Ok(first)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    /// Smoke-test: every .gyp in the repo root must parse without error.
    #[test]
    fn parse_all_gyp_files() {
        let files = ["example.gyp"];
        for file in &files {
            let result = BuildDocument::from_file(file);
            assert!(result.is_ok(), "Failed to parse {file}: {}", result.unwrap_err());
        }
    }

    #[test]
    fn example_gyp_basic_shape() {
        let doc = BuildDocument::from_file("example.gyp").unwrap();
        assert_eq!(doc.target_names(), ["libuv", "run-tests", "libuv-shim"]);
        assert!(doc.variables.is_some());
        // Bare file name: no containing directory.
        assert_eq!(doc.directory(), None);

        let uv = doc.find_target("libuv").unwrap();
        let sources = uv.sources.as_ref().unwrap();
        assert!(sources.contains(&"src/fs-poll.c".to_string()));
        assert!(uv.conditions.as_ref().is_some_and(|c| !c.is_empty()));
        assert!(uv.direct_dependent_conditions.is_some());
    }

    #[test]
    fn find_target_not_found() {
        let doc = BuildDocument::parse("{'targets': [{'target_name': 'a'}]}").unwrap();
        let err = doc.find_target("b").unwrap_err();
        assert!(matches!(err, GypError::TargetNotFound(ref n) if n == "b"));
        assert_eq!(err.kind(), ErrorKind::Lookup);
    }

    #[test]
    fn find_target_ambiguous_is_hard_error() {
        let doc = BuildDocument::parse(
            "{'targets': [{'target_name': 'a'}, {'target_name': 'b'}, {'target_name': 'a'}]}",
        )
        .unwrap();
        let err = doc.find_target("a").unwrap_err();
        assert!(matches!(err, GypError::AmbiguousTarget { ref name, count: 2 } if name == "a"));
        assert_eq!(err.kind(), ErrorKind::Ambiguity);
        assert_eq!(doc.find_target("b").unwrap().name, "b");
    }

    #[test]
    fn clause_with_else_branch() {
        let doc = BuildDocument::parse(
            "{'targets': [{'target_name': 't', 'conditions': [
                ['OS==\"win\"', {'defines': ['WIN']}, {'defines': ['POSIX']}],
                ['OS==\"mac\"', {'defines': ['MAC']}],
            ]}]}",
        )
        .unwrap();
        let clauses = doc.targets[0].conditions.as_ref().unwrap();
        assert_eq!(clauses.len(), 2);
        assert_eq!(clauses[0].predicate, "OS==\"win\"");
        assert!(clauses[0].else_branch.is_some());
        assert!(clauses[1].else_branch.is_none());
    }

    #[test]
    fn missing_targets_is_lookup_error() {
        let err = BuildDocument::parse("{'variables': {}}").unwrap_err();
        assert!(matches!(err, GypError::MissingKey(ref k) if k == "targets"));
    }

    #[test]
    fn malformed_documents() {
        let cases = [
            "['not', 'a', 'mapping']",
            "{'targets': {}}",
            "{'targets': ['uv']}",
            "{'targets': [{'target_name': 1}]}",
            "{'targets': [{'target_name': 't', 'sources': 'a.c'}]}",
            "{'targets': [{'target_name': 't', 'sources': [1]}]}",
            "{'targets': [{'target_name': 't', 'conditions': [['OS==\"win\"']]}]}",
            "{'targets': [{'target_name': 't', 'conditions': [[1, {}]]}]}",
            "{'targets': [{'target_name': 't', 'conditions': [['OS==\"win\"', []]]}]}",
            "{'targets': [{'target_name': 't', 'conditions': [['a', {}, {}, {}]]}]}",
            "{'targets': [{'target_name': 't', 'direct_dependent_settings': []}]}",
            "{'variables': [], 'targets': []}",
        ];
        for input in cases {
            let err = BuildDocument::parse(input).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Malformed, "{input}: {err}");
        }
    }

    #[test]
    fn bad_predicate_fails_at_load() {
        let err = BuildDocument::parse(
            "{'targets': [{'target_name': 't', 'conditions': [['os.system(1)', {}]]}]}",
        )
        .unwrap_err();
        assert!(matches!(err, GypError::Condition { .. }), "got {err:?}");
    }

    #[test]
    fn nested_conditions_are_parsed_at_load() {
        let doc = BuildDocument::parse(
            "{'targets': [{'target_name': 't', 'conditions': [
                ['True', {
                    'conditions': [['OS==\"linux\"', {'defines': ['A']}]],
                    'link_settings': {'conditions': [['OS==\"mac\"', {}]]},
                }],
            ]}]}",
        )
        .unwrap();
        let clause = &doc.targets[0].conditions.as_ref().unwrap()[0];
        let nested: Vec<&str> =
            clause.then_branch.nested.iter().map(|c| c.predicate.as_str()).collect();
        assert_eq!(nested, ["OS==\"linux\"", "OS==\"mac\""]);
    }

    #[test]
    fn bad_nested_predicate_fails_at_load() {
        // The branch holding the bad predicate is never selected, but loading
        // still rejects it.
        let err = BuildDocument::parse(
            "{'targets': [{'target_name': 't', 'conditions': [
                ['False', {'conditions': [['os.system(1)', {}]]}],
            ]}]}",
        )
        .unwrap_err();
        assert!(matches!(err, GypError::Condition { .. }), "got {err:?}");

        let err = BuildDocument::parse(
            "{'targets': [{'target_name': 't', 'conditions': [
                ['True', {}, {'sources': {'conditions': ['not a clause']}}],
            ]}]}",
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Malformed);

        let err = BuildDocument::parse(
            "{'targets': [{'target_name': 't', 'conditions': [
                ['True', {'conditions': 'OS==\"win\"'}],
            ]}]}",
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Malformed);
    }

    #[test]
    fn from_file_records_directory_as_given() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("deps").join("uv");
        std::fs::create_dir_all(&nested).unwrap();
        let path = nested.join("uv.gyp");
        std::fs::write(&path, "{'targets': [{'target_name': 'uv'}]}").unwrap();

        let doc = BuildDocument::from_file(&path).unwrap();
        assert_eq!(doc.directory(), Some(nested.as_path()));
    }

    #[test]
    fn from_file_missing_is_io_error() {
        let err = BuildDocument::from_file("does/not/exist.gyp").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
        assert!(err.to_string().contains("does/not/exist.gyp"));
    }
}
