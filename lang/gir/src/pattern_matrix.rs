//! §4.8's Maranget-style pattern matrix compiler: turns a function's
//! elaborated [`Clause`] vector into a [`DecisionTree`] the generator walks
//! to emit `switch_constr` terminators.
//!
//! Column selection follows §4.8 step 2: every still-live column is scored
//! (one point per constructor cell, frozen the moment a variable cell is
//! seen in that column) and the highest-scoring column is specialized next,
//! ties broken by lowest index ([`score_column`]/[`select_column`]). Within
//! one [`compile_rows`] call every row has the same column count and the
//! same occurrence at each index (specializing a column always replaces it
//! in place with its payload columns), so scoring by index is well-defined.
//!
//! The hard part this module exists to solve: a clause's body ([`Term`])
//! references its pattern-bound variables purely by de Bruijn [`Idx`], in
//! the order `bind_pattern` (in `elaborator::check`) pushed them — a
//! left-to-right, pre-order walk of the pattern tree that assigns a slot
//! to every `Pattern::Var` and skips `Pattern::Absurd` entirely. This
//! module replays that exact walk once per clause ([`assign_binding_slots`])
//! so a decision tree leaf's accumulated `(slot, occurrence)` bindings can
//! be turned back into `(Idx, occurrence)` bindings the generator
//! understands, independent of the order the matrix algorithm happens to
//! visit columns in.

use ast::clause::{Clause, Pattern};
use ast::ident::QualName;
use ast::ident::Idx;
use fxhash::FxHashMap;

/// A path from a clause's top-level scrutinee list down through nested
/// constructor arguments: `[2]` is the third top-level parameter, `[2, 0]`
/// is that parameter's first constructor argument, and so on. The
/// generator turns an occurrence into an actual GIR address by walking
/// this path with `tuple_element_address`/projection on the corresponding
/// scrutinee value.
pub type Occurrence = Vec<usize>;

/// A clause-local slot index, assigned by [`assign_binding_slots`] in the
/// same left-to-right, `Var`-only order `bind_pattern` assigns de Bruijn
/// indices in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BindingSlot(pub usize);

impl BindingSlot {
    /// Converts to the de Bruijn [`Idx`] this slot denotes inside a clause
    /// with `var_count` total `Var` patterns: slots are assigned in
    /// encounter order (first `Var` = slot 0) while indices count back
    /// from the most recently pushed binder (last `Var` = idx 0).
    pub fn to_idx(self, var_count: usize) -> Idx {
        Idx(var_count - 1 - self.0)
    }
}

/// Walks `patterns` left to right, depth-first, assigning the next
/// [`BindingSlot`] to each `Pattern::Var` encountered (`Pattern::Absurd`
/// consumes no slot, matching `bind_pattern`). Returns the occurrence of
/// every `Var` pattern and the total slot count.
pub fn assign_binding_slots(patterns: &[Pattern]) -> (FxHashMap<Occurrence, BindingSlot>, usize) {
    let mut slots = FxHashMap::default();
    let mut next = 0usize;
    for (i, pattern) in patterns.iter().enumerate() {
        walk(pattern, &mut vec![i], &mut slots, &mut next);
    }
    (slots, next)
}

fn walk(pattern: &Pattern, occurrence: &mut Occurrence, slots: &mut FxHashMap<Occurrence, BindingSlot>, next: &mut usize) {
    match pattern {
        Pattern::Var(_) => {
            slots.insert(occurrence.clone(), BindingSlot(*next));
            *next += 1;
        }
        Pattern::Absurd => {}
        Pattern::Constructor { args, .. } => {
            for (i, arg) in args.iter().enumerate() {
                occurrence.push(i);
                walk(arg, occurrence, slots, next);
                occurrence.pop();
            }
        }
    }
}

/// The compiled output for one function: a tree to walk, plus each
/// clause's total variable count (needed to turn a leaf's slots into
/// indices via [`BindingSlot::to_idx`]).
#[derive(Debug)]
pub struct CompiledMatrix {
    pub tree: DecisionTree,
    pub var_counts: Vec<usize>,
}

#[derive(Debug)]
pub enum DecisionTree {
    /// No row matches here — every clause provably does not apply. The
    /// generator emits `unreachable` (§4.8's "exhaustiveness" is checked
    /// upstream by the elaborator; a generator-time `Fail` would indicate
    /// a bug in either this compiler or the exhaustiveness check, not a
    /// legitimate program state, and is reported via `GirError::Bug`).
    Fail,
    /// Clause `clause_index` matches, with `bindings` mapping each of its
    /// pattern variables to the occurrence holding its value.
    Leaf { clause_index: usize, bindings: Vec<(BindingSlot, Occurrence)> },
    /// Dispatch on the value at `occurrence`. `arms` are in first-seen
    /// order (§4.8's tie-breaking); `default` covers constructors with no
    /// dedicated arm, if any row's column there was a variable pattern.
    Switch { occurrence: Occurrence, arms: Vec<(QualName, DecisionTree)>, default: Option<Box<DecisionTree>> },
}

#[derive(Debug, Clone)]
struct Row {
    columns: Vec<(Occurrence, Pattern)>,
    bindings: Vec<(BindingSlot, Occurrence)>,
    clause_index: usize,
}

/// Compiles `clauses` into a [`CompiledMatrix`]. `clauses` must already be
/// arity-checked (every clause has the same number of top-level patterns;
/// the elaborator guarantees this during `check_function`).
pub fn compile(clauses: &[Clause]) -> CompiledMatrix {
    let mut slot_maps = Vec::with_capacity(clauses.len());
    let mut var_counts = Vec::with_capacity(clauses.len());
    for clause in clauses {
        let (slots, count) = assign_binding_slots(&clause.patterns);
        slot_maps.push(slots);
        var_counts.push(count);
    }

    let rows = clauses
        .iter()
        .enumerate()
        .map(|(clause_index, clause)| Row {
            columns: clause.patterns.iter().enumerate().map(|(i, p)| (vec![i], p.clone())).collect(),
            bindings: Vec::new(),
            clause_index,
        })
        .collect();

    let tree = compile_rows(rows, &slot_maps);
    CompiledMatrix { tree, var_counts }
}

fn lookup_slot(slot_maps: &[FxHashMap<Occurrence, BindingSlot>], clause_index: usize, occurrence: &Occurrence) -> Option<BindingSlot> {
    slot_maps[clause_index].get(occurrence).copied()
}

/// §4.8 step 2: scores column `c` across `rows` — one point per
/// constructor cell, frozen (no further points added) the moment a
/// variable/absurd cell is seen in that column. A column with no
/// constructor cell anywhere scores 0.
fn score_column(rows: &[Row], c: usize) -> usize {
    let mut score = 0usize;
    let mut frozen = false;
    for r in rows {
        match &r.columns[c].1 {
            Pattern::Constructor { .. } if !frozen => score += 1,
            Pattern::Constructor { .. } => {}
            Pattern::Var(_) | Pattern::Absurd => frozen = true,
        }
    }
    score
}

/// Picks the highest-scoring column, ties broken by lowest index (§4.8
/// step 2/"Column scoring determinism", §8). Every row in `rows` has the
/// same column count by construction, so any nonempty `rows` has a
/// well-defined width to scan.
fn select_column(rows: &[Row]) -> (usize, usize) {
    let width = rows[0].columns.len();
    let mut best = (0usize, score_column(rows, 0));
    for c in 1..width {
        let score = score_column(rows, c);
        if score > best.1 {
            best = (c, score);
        }
    }
    best
}

fn compile_rows(rows: Vec<Row>, slot_maps: &[FxHashMap<Occurrence, BindingSlot>]) -> DecisionTree {
    let Some(first) = rows.first() else {
        return DecisionTree::Fail;
    };
    if first.columns.is_empty() {
        return DecisionTree::Leaf { clause_index: first.clause_index, bindings: first.bindings.clone() };
    }

    let (c, score) = select_column(&rows);
    if score == 0 {
        // No column anywhere has a constructor cell: nothing left to
        // scrutinize. Bind the selected (all-wildcard) column in every row
        // and carry every row forward unconditionally.
        let next_rows = rows.into_iter().map(|r| drop_column_at(r, c, None, slot_maps)).collect();
        return compile_rows(next_rows, slot_maps);
    }

    let occurrence = rows[0].columns[c].0.clone();

    let mut ctor_order: Vec<QualName> = Vec::new();
    for r in &rows {
        if let Pattern::Constructor { name, .. } = &r.columns[c].1 {
            if !ctor_order.contains(name) {
                ctor_order.push(name.clone());
            }
        }
    }

    let mut arms = Vec::with_capacity(ctor_order.len());
    for name in &ctor_order {
        let arity = rows
            .iter()
            .find_map(|r| match &r.columns[c].1 {
                Pattern::Constructor { name: n, args } if n == name => Some(args.len()),
                _ => None,
            })
            .expect("constructor name was collected from some row's selected column");

        let specialized: Vec<Row> = rows
            .iter()
            .filter_map(|r| match &r.columns[c].1 {
                Pattern::Constructor { name: n, args } if n == name => {
                    let mut new_columns: Vec<(Occurrence, Pattern)> = r.columns[..c].to_vec();
                    for (i, p) in args.iter().enumerate() {
                        let mut occ = occurrence.clone();
                        occ.push(i);
                        new_columns.push((occ, p.clone()));
                    }
                    new_columns.extend(r.columns[c + 1..].iter().cloned());
                    Some(Row { columns: new_columns, bindings: r.bindings.clone(), clause_index: r.clause_index })
                }
                Pattern::Constructor { .. } => None,
                Pattern::Var(_) | Pattern::Absurd => {
                    Some(specialize_wildcard_row(r, c, &occurrence, arity, slot_maps))
                }
            })
            .collect();

        arms.push((name.clone(), compile_rows(specialized, slot_maps)));
    }

    let default_rows: Vec<Row> = rows
        .iter()
        .filter(|r| !matches!(r.columns[c].1, Pattern::Constructor { .. }))
        .map(|r| drop_column_at(r.clone(), c, Some(&occurrence), slot_maps))
        .collect();
    let default = if default_rows.is_empty() { None } else { Some(Box::new(compile_rows(default_rows, slot_maps))) };

    DecisionTree::Switch { occurrence, arms, default }
}

/// Drops column `c` from `row`, recording a binding if it was a `Var`.
/// `occurrence_override` is used when the caller already computed the
/// shared switch occurrence (the default-arm path); otherwise the row's
/// own column-`c` occurrence is used (the all-wildcard-column path, where
/// every row's column-`c` occurrence is identical by construction anyway).
fn drop_column_at(
    row: Row,
    c: usize,
    occurrence_override: Option<&Occurrence>,
    slot_maps: &[FxHashMap<Occurrence, BindingSlot>],
) -> Row {
    let (occ, pattern) = row.columns[c].clone();
    let occurrence = occurrence_override.cloned().unwrap_or(occ);
    let mut bindings = row.bindings;
    if let Pattern::Var(_) = pattern {
        if let Some(slot) = lookup_slot(slot_maps, row.clause_index, &occurrence) {
            bindings.push((slot, occurrence));
        }
    }
    let mut columns = row.columns[..c].to_vec();
    columns.extend(row.columns[c + 1..].iter().cloned());
    Row { columns, bindings, clause_index: row.clause_index }
}

/// Propagates a variable/absurd row into a constructor arm it didn't
/// scrutinize: the row still matches (a variable matches anything), so it
/// is specialized with `arity` freshly-occurring wildcard columns that
/// carry no binding of their own — the original row's own variable, if
/// any, binds to the whole sub-value at `occurrence` instead.
fn specialize_wildcard_row(
    row: &Row,
    c: usize,
    occurrence: &Occurrence,
    arity: usize,
    slot_maps: &[FxHashMap<Occurrence, BindingSlot>],
) -> Row {
    let mut bindings = row.bindings.clone();
    if let Pattern::Var(_) = &row.columns[c].1 {
        if let Some(slot) = lookup_slot(slot_maps, row.clause_index, occurrence) {
            bindings.push((slot, occurrence.clone()));
        }
    }
    let mut new_columns: Vec<(Occurrence, Pattern)> = row.columns[..c].to_vec();
    for i in 0..arity {
        let mut occ = occurrence.clone();
        occ.push(i);
        new_columns.push((occ, Pattern::Var("_".to_string())));
    }
    new_columns.extend(row.columns[c + 1..].iter().cloned());
    Row { columns: new_columns, bindings, clause_index: row.clause_index }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ast::ident::QualName;

    fn qn(s: &str) -> QualName {
        QualName(s.to_string())
    }

    #[test]
    fn single_wildcard_clause_compiles_to_a_leaf() {
        let clauses = vec![Clause { patterns: vec![Pattern::Var("x".into())], body: None }];
        let compiled = compile(&clauses);
        match compiled.tree {
            DecisionTree::Leaf { clause_index: 0, ref bindings } => {
                assert_eq!(bindings.len(), 1);
                assert_eq!(bindings[0].0, BindingSlot(0));
            }
            other => panic!("expected a leaf, got {other:?}"),
        }
        assert_eq!(compiled.var_counts, vec![1]);
    }

    #[test]
    fn constructor_clauses_switch_on_column_zero() {
        let clauses = vec![
            Clause { patterns: vec![Pattern::Constructor { name: qn("zero"), args: vec![] }], body: None },
            Clause {
                patterns: vec![Pattern::Constructor { name: qn("suc"), args: vec![Pattern::Var("n".into())] }],
                body: None,
            },
        ];
        let compiled = compile(&clauses);
        match compiled.tree {
            DecisionTree::Switch { occurrence, arms, default } => {
                assert_eq!(occurrence, vec![0]);
                assert_eq!(arms.len(), 2);
                assert!(default.is_none());
                match &arms[1].1 {
                    DecisionTree::Leaf { clause_index: 1, bindings } => {
                        assert_eq!(bindings[0].1, vec![0, 0]);
                    }
                    other => panic!("expected suc arm to be a leaf, got {other:?}"),
                }
            }
            other => panic!("expected a switch, got {other:?}"),
        }
    }

    #[test]
    fn scoring_picks_the_column_with_constructor_cells_over_an_all_wildcard_one() {
        // Column 0 is all wildcards (score 0); column 1 has two constructor
        // cells before any wildcard (score 2). §4.8 step 2 must switch on
        // column 1, not column 0.
        let clauses = vec![
            Clause {
                patterns: vec![
                    Pattern::Var("_".into()),
                    Pattern::Constructor { name: qn("zero"), args: vec![] },
                ],
                body: None,
            },
            Clause {
                patterns: vec![
                    Pattern::Var("_".into()),
                    Pattern::Constructor { name: qn("suc"), args: vec![Pattern::Var("n".into())] },
                ],
                body: None,
            },
        ];
        let compiled = compile(&clauses);
        match compiled.tree {
            DecisionTree::Switch { occurrence, arms, .. } => {
                assert_eq!(occurrence, vec![1]);
                assert_eq!(arms.len(), 2);
            }
            other => panic!("expected a switch on column 1, got {other:?}"),
        }
    }

    #[test]
    fn wildcard_row_propagates_into_every_constructor_arm() {
        let clauses = vec![
            Clause { patterns: vec![Pattern::Var("_".into())], body: None },
            Clause { patterns: vec![Pattern::Constructor { name: qn("zero"), args: vec![] }], body: None },
        ];
        let compiled = compile(&clauses);
        match compiled.tree {
            DecisionTree::Switch { arms, default, .. } => {
                assert_eq!(arms.len(), 1);
                assert!(matches!(arms[0].1, DecisionTree::Leaf { clause_index: 0, .. }));
                assert!(default.is_some());
            }
            other => panic!("expected a switch, got {other:?}"),
        }
    }
}
