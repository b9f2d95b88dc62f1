//! Condition-list resolution and per-target configuration.
//!
//! Resolution walks a `conditions` list, picks the branch each predicate
//! selects, and flattens the chosen defs blocks into per-category buckets.
//! A round whose merged output carries another `conditions` list triggers a
//! further round on that list, until no nested list remains or the round
//! limit is reached.

use std::collections::HashMap;
use std::path::Path;

use crate::condition;
use crate::config::{Bindings, ResolveOptions};
use crate::document::{Branch, BuildDocument, ConditionClause};
use crate::error::{GypError, Result};
use crate::literal::{Dict, Value};

// ═══════════════════════════════════════════════════════════════════════════════
//  Defs accumulator
// ═══════════════════════════════════════════════════════════════════════════════

/// Flattened defs: category name → values in discovery order.
///
/// Buckets only ever grow; nothing is removed or overwritten once added.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Defs {
    categories: HashMap<String, Vec<Value>>,
}

impl Defs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flatten a defs block into the buckets.
    ///
    /// Every key gets a bucket, even when it contributes nothing. List
    /// values are appended in order; mapping values are walked in place, so
    /// arbitrarily nested blocks land in the same flat buckets. Scalars
    /// contribute nothing.
    pub fn merge_block(&mut self, block: &Dict) {
        let mut stack = vec![block.iter()];

        while let Some(frame) = stack.last_mut() {
            let Some((key, value)) = frame.next() else {
                stack.pop();
                continue;
            };

            let bucket = self.categories.entry(key.clone()).or_default();
            match value {
                Value::List(items) => bucket.extend(items.iter().cloned()),
                Value::Dict(nested) => stack.push(nested.iter()),
                _ => {}
            }
        }
    }

    /// Append every bucket of `other` onto the matching bucket here.
    pub fn append(&mut self, other: Defs) {
        for (key, values) in other.categories {
            self.categories.entry(key).or_default().extend(values);
        }
    }

    pub fn get(&self, category: &str) -> Option<&[Value]> {
        self.categories.get(category).map(Vec::as_slice)
    }

    pub fn contains(&self, category: &str) -> bool {
        self.categories.contains_key(category)
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Condition list evaluation
// ═══════════════════════════════════════════════════════════════════════════════

/// The branch `clause` selects: the first defs block when the predicate
/// holds, otherwise the second one if present.
fn selected_branch<'c>(clause: &'c ConditionClause, bindings: &Bindings) -> Option<&'c Branch> {
    let selected = if condition::evaluate(&clause.expression, bindings) {
        Some(&clause.then_branch)
    } else {
        clause.else_branch.as_ref()
    };

    log::trace!(
        "condition '{}' -> {}",
        clause.predicate,
        if selected.is_some() { "merged" } else { "skipped" }
    );
    selected
}

/// Evaluate every clause and merge each selected branch, in clause order.
///
/// A true predicate selects the first defs block; a false one selects the
/// second block when there is one and skips the clause otherwise. All
/// clauses are considered, not just the first match.
pub fn evaluate_condition_list(clauses: &[ConditionClause], bindings: &Bindings) -> Defs {
    let mut defs = Defs::new();
    for branch in clauses.iter().filter_map(|c| selected_branch(c, bindings)) {
        defs.merge_block(&branch.defs);
    }
    defs
}

/// Evaluate `clauses`, then keep evaluating the `conditions` lists carried
/// by the branches each round selected, accumulating every round.
///
/// Fails with [`GypError::TooManyRounds`] if nested lists are still pending
/// after `max_rounds` rounds.
pub fn resolve_recursively(
    clauses: &[ConditionClause],
    bindings: &Bindings,
    max_rounds: usize,
) -> Result<Defs> {
    let mut resolved = Defs::new();
    let mut round: Vec<&ConditionClause> = clauses.iter().collect();
    let mut rounds = 0;

    loop {
        rounds += 1;
        let mut next = Vec::new();
        for branch in round.into_iter().filter_map(|c| selected_branch(c, bindings)) {
            resolved.merge_block(&branch.defs);
            next.extend(&branch.nested);
        }

        if next.is_empty() {
            return Ok(resolved);
        }
        if rounds >= max_rounds {
            return Err(GypError::TooManyRounds(rounds));
        }

        log::trace!("round {rounds}: {} nested condition(s)", next.len());
        round = next;
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
//  ResolvedConfig
// ═══════════════════════════════════════════════════════════════════════════════

/// The flattened, platform-specific settings for one target.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedConfig {
    pub sources: Vec<String>,
    pub defines: Vec<String>,
    pub cflags: Vec<String>,
    pub ldflags: Vec<String>,
    pub libraries: Vec<String>,
}

impl ResolvedConfig {
    /// Append the five output categories of `defs`; anything else a defs
    /// block produces is dropped.
    fn absorb(&mut self, defs: &Defs) -> Result<()> {
        let buckets = [
            ("sources", &mut self.sources),
            ("defines", &mut self.defines),
            ("cflags", &mut self.cflags),
            ("ldflags", &mut self.ldflags),
            ("libraries", &mut self.libraries),
        ];

        for (category, bucket) in buckets {
            let Some(values) = defs.get(category) else {
                continue;
            };
            for value in values {
                let s = value.as_str().ok_or_else(|| {
                    GypError::Malformed(format!(
                        "{category}: expected strings, found {}",
                        value.type_name()
                    ))
                })?;
                bucket.push(s.to_string());
            }
        }
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Resolver
// ═══════════════════════════════════════════════════════════════════════════════

/// Resolves targets of a [`BuildDocument`] for one set of bindings.
///
/// Holds no state besides its options, so one resolver can serve any number
/// of documents and targets.
#[derive(Debug, Clone, Default)]
pub struct Resolver {
    options: ResolveOptions,
}

impl Resolver {
    pub fn new(options: ResolveOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ResolveOptions {
        &self.options
    }

    /// Resolve the target called `name` into its flat configuration.
    ///
    /// The target's own `sources` come first, followed by whatever the
    /// global `variables.conditions`, the target's `conditions` and its
    /// `direct_dependent_settings.conditions` contribute, in that order.
    /// Sources are then filtered to the allowed extensions and prefixed with
    /// the document's directory; libraries lose their link prefix.
    pub fn resolve_target_config(
        &self,
        document: &BuildDocument,
        name: &str,
    ) -> Result<ResolvedConfig> {
        let target = document.find_target(name)?;
        log::debug!("resolving target '{name}'");

        let sources = target
            .sources
            .as_ref()
            .ok_or_else(|| GypError::MissingKey(format!("targets[{name}].sources")))?;
        let variables = document
            .variables
            .as_ref()
            .ok_or_else(|| GypError::MissingKey("variables.conditions".into()))?;
        let conditions = target
            .conditions
            .as_ref()
            .ok_or_else(|| GypError::MissingKey(format!("targets[{name}].conditions")))?;
        let dependent = target.direct_dependent_conditions.as_ref().ok_or_else(|| {
            GypError::MissingKey(format!(
                "targets[{name}].direct_dependent_settings.conditions"
            ))
        })?;

        let mut config = ResolvedConfig {
            sources: sources.clone(),
            ..Default::default()
        };

        for clauses in [variables, conditions, dependent] {
            let defs =
                resolve_recursively(clauses, &self.options.bindings, self.options.max_rounds)?;
            config.absorb(&defs)?;
        }

        config.sources = self.filter_sources(config.sources, document.directory());
        config.libraries = self.normalize_libraries(config.libraries);

        Ok(config)
    }

    /// Keep allowed source files and prefix them with `directory`.
    ///
    /// The prefix is always `directory/entry`, even for absolute entries.
    fn filter_sources(&self, sources: Vec<String>, directory: Option<&Path>) -> Vec<String> {
        sources
            .into_iter()
            .filter(|s| {
                let keep = self.options.is_source_file(s);
                if !keep {
                    log::debug!("dropping non-source entry '{s}'");
                }
                keep
            })
            .map(|s| match directory {
                Some(dir) => format!("{}/{s}", dir.display()),
                None => s,
            })
            .collect()
    }

    /// Strip the link prefix from each library entry.
    ///
    /// Entries without the prefix are passed through unchanged.
    fn normalize_libraries(&self, libraries: Vec<String>) -> Vec<String> {
        let prefix = self.options.library_prefix.as_str();
        libraries
            .into_iter()
            .map(|lib| match lib.strip_prefix(prefix) {
                Some(bare) => bare.to_string(),
                None => {
                    log::warn!("library entry '{lib}' lacks the '{prefix}' prefix, keeping as-is");
                    lib
                }
            })
            .collect()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════════════
