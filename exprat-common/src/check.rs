//! Expansion checker: validates that every expansion clause is a faithful
//! instantiation of some QBF matrix clause.

use crate::{
    expansion::{mapping_of, Expansion, ExpansionParts},
    formula::{prefix_position, warn_free_variable, Clause, Qbf, QbfParts, QuantifierKind},
    literal::{Literal, Variable},
    memory::Stack,
    sorting::quicksort_in_place,
};
use std::fmt;

/// What went wrong with an expansion clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FindingKind {
    /// No QBF clause produces the clause's literals.
    IncorrectLiterals,
    /// A matching QBF clause exists, but no candidate also satisfies the
    /// annotations.
    IncorrectAnnotation,
}

impl FindingKind {
    pub fn description(self) -> &'static str {
        match self {
            FindingKind::IncorrectLiterals => "No QBF clause matches the literals found",
            FindingKind::IncorrectAnnotation => "Annotations in expansion are incorrect",
        }
    }
}

/// One rejected expansion clause. The index is zero-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Finding {
    pub kind: FindingKind,
    pub clause: usize,
}

/// All findings of a run, in the order they were detected.
#[derive(Debug, PartialEq, Eq)]
pub struct CheckResult {
    pub findings: Stack<Finding>,
}

impl CheckResult {
    pub fn new() -> CheckResult {
        CheckResult {
            findings: Stack::new(),
        }
    }
    pub fn is_verified(&self) -> bool {
        self.findings.is_empty()
    }
    /// Print the findings as comment lines, with one-based clause indices.
    pub fn print(&self) {
        let noun = if self.findings.len() == 1 {
            "inconsistency"
        } else {
            "inconsistencies"
        };
        comment!("Found {} {}:", self.findings.len(), noun);
        for (number, finding) in self.findings.iter().enumerate() {
            comment!(
                "  {:4}. {} in expansion clause {}",
                number + 1,
                finding.kind.description(),
                finding.clause + 1
            );
        }
    }
}

/// A structural defect that makes the check impossible to carry out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckError {
    /// A clause origin points past the end of the QBF matrix.
    OriginOutOfRange { origin: usize, matrix_len: usize },
    /// An expansion clause uses a variable without a mapping comment.
    MissingMapping(Variable),
}

impl fmt::Display for CheckError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            CheckError::OriginOutOfRange { origin, matrix_len } => write!(
                f,
                "Given origin index {} is invalid, as there are only {} clauses in the QBF matrix",
                origin + 1,
                matrix_len
            ),
            CheckError::MissingMapping(variable) => write!(
                f,
                "Expansion variable {} has no mapping comment ('c x ...')",
                variable
            ),
        }
    }
}

/// Scratch state for checking one expansion against one QBF.
///
/// `u` collects (negations of) universal literals that occur in the
/// candidate QBF clause, `v` both polarities of universals that do not.
/// Both are kept sorted so annotation membership is a binary search.
struct Checker {
    u: Stack<Literal>,
    v: Stack<Literal>,
    partitions: Stack<usize>,
}

/// Check every expansion clause against the QBF.
///
/// Findings accumulate per clause; a structural defect aborts the whole
/// run with an error.
pub fn check(qbf: &mut Qbf, expansion: &mut Expansion) -> Result<CheckResult, CheckError> {
    let mut checker = Checker {
        u: Stack::new(),
        v: Stack::new(),
        partitions: Stack::new(),
    };
    let mut result = CheckResult::new();
    // Canonicalize each expansion clause to ascending numeric order. The
    // annotation walk relies on non-decreasing quantifier orderings.
    for offset in 0..expansion.clauses.len() {
        quicksort_in_place(
            &mut checker.partitions,
            expansion.clauses[offset].literals.as_mut_slice(),
            |literal: Literal| literal.raw(),
        );
    }
    let mut qbf_parts = qbf.parts();
    let mut expansion_parts = expansion.parts();
    for index in 0..expansion_parts.clauses.len() {
        checker.check_clause(&mut qbf_parts, &mut expansion_parts, index, &mut result)?;
    }
    Ok(result)
}

impl Checker {
    /// Find a QBF clause that this expansion clause is a faithful
    /// instantiation of, recording a finding if there is none.
    ///
    /// With clause origins present only the designated clause is tried.
    /// An origins list that does not cover this clause is discarded with
    /// a warning, falling back to scanning the whole matrix from the
    /// start.
    fn check_clause(
        &mut self,
        qbf: &mut QbfParts,
        expansion: &mut ExpansionParts,
        index: usize,
        result: &mut CheckResult,
    ) -> Result<(), CheckError> {
        let exp_clause = &expansion.clauses[index];
        let mut found_matching_clause = false;
        let mut has_origins = expansion.clause_origins.is_some();
        let mut offset = 0;
        while offset < qbf.matrix.len() {
            let matrix_index = if has_origins {
                let origins = match *expansion.clause_origins {
                    Some(ref origins) => origins,
                    None => crate::output::unreachable(),
                };
                if index >= origins.len() {
                    warn!(
                        "Expected {} clauses in clause origin mapping comment \
                         ('c o 1 4 2 2 ... 0'), but yielded {} clauses so far. Falling \
                         back to iterative search mode, this might be quite slow.",
                        origins.len(),
                        index
                    );
                    *expansion.clause_origins = None;
                    has_origins = false;
                    continue;
                }
                let matrix_index = origins[index];
                if matrix_index >= qbf.matrix.len() {
                    return Err(CheckError::OriginOutOfRange {
                        origin: matrix_index,
                        matrix_len: qbf.matrix.len(),
                    });
                }
                matrix_index
            } else {
                offset
            };
            let qbf_clause = &qbf.matrix[matrix_index];
            // A candidate whose annotations also check out settles this
            // clause immediately.
            if self.literals_originate(qbf_clause, exp_clause, qbf, expansion)? {
                found_matching_clause = true;
                if self.annotations_consistent(qbf_clause, exp_clause, qbf, expansion)? {
                    return Ok(());
                }
            }
            if has_origins {
                break;
            }
            offset += 1;
        }
        result.findings.push(Finding {
            kind: if found_matching_clause {
                FindingKind::IncorrectAnnotation
            } else {
                FindingKind::IncorrectLiterals
            },
            clause: index,
        });
        Ok(())
    }

    /// Phase A: could the expansion clause's literals have originated from
    /// this QBF clause?
    ///
    /// Every expansion literal must translate (same polarity) to a literal
    /// of the QBF clause, and the QBF clause must contain no existential
    /// literals beyond those, counting free variables as existential.
    fn literals_originate(
        &self,
        qbf_clause: &Clause,
        exp_clause: &Clause,
        qbf: &mut QbfParts,
        expansion: &ExpansionParts,
    ) -> Result<bool, CheckError> {
        for &exp_literal in &exp_clause.literals {
            let mapping = mapping_of(
                expansion.mapping_index,
                expansion.mappings,
                exp_literal.variable(),
            )
            .ok_or_else(|| CheckError::MissingMapping(exp_literal.variable()))?;
            let qbf_literal = Literal::from_variable(mapping.qbf_var, exp_literal.is_negative());
            if !qbf_clause.literals.contains(qbf_literal) {
                return Ok(false);
            }
        }
        let mut existentials = 0;
        for &literal in &qbf_clause.literals {
            match prefix_position(qbf.variable_index, literal.variable()) {
                Some(position) => {
                    if qbf.prefix[position].kind == QuantifierKind::Existential {
                        existentials += 1;
                    }
                }
                None => {
                    warn_free_variable(qbf.warned_free, literal.variable());
                    existentials += 1;
                }
            }
        }
        Ok(exp_clause.len() == existentials)
    }

    /// Phase B: are the annotations reproducible from the QBF prefix for
    /// this candidate clause?
    ///
    /// Walks the prefix once, left to right, processing the universal
    /// blocks strictly before each mapped variable's block. Universals
    /// that occur in the candidate clause contribute their negation to
    /// `u`; all others contribute both polarities to `v`. Each annotation
    /// must cover exactly the universals seen so far and be a subset of
    /// `u` and `v`; accepted annotations then pin the free universals by
    /// pruning their negations from `v`.
    fn annotations_consistent(
        &mut self,
        qbf_clause: &Clause,
        exp_clause: &Clause,
        qbf: &mut QbfParts,
        expansion: &ExpansionParts,
    ) -> Result<bool, CheckError> {
        self.u.clear();
        self.v.clear();
        let mut last_position = 0;
        let mut universals_so_far = 0;
        for &exp_literal in &exp_clause.literals {
            let mapping = mapping_of(
                expansion.mapping_index,
                expansion.mappings,
                exp_literal.variable(),
            )
            .ok_or_else(|| CheckError::MissingMapping(exp_literal.variable()))?;
            let position = match prefix_position(qbf.variable_index, mapping.qbf_var) {
                Some(position) => position,
                None => {
                    // A free variable counts as existentially quantified
                    // before the whole prefix, so nothing may be
                    // annotated. The walk does not advance.
                    warn_free_variable(qbf.warned_free, mapping.qbf_var);
                    if !mapping.annotation.is_empty() {
                        return Ok(false);
                    }
                    continue;
                }
            };
            for block in last_position..position {
                let quantifier = &qbf.prefix[block];
                if quantifier.kind != QuantifierKind::Universal {
                    continue;
                }
                for &variable in &quantifier.variables {
                    universals_so_far += 1;
                    match qbf_clause
                        .literals
                        .iter()
                        .find(|literal| literal.variable() == variable)
                    {
                        Some(&literal) => self.u.insert_sorted(-literal),
                        None => {
                            self.v.insert_sorted(Literal::from_variable(variable, false));
                            self.v.insert_sorted(Literal::from_variable(variable, true));
                        }
                    }
                }
            }
            if mapping.annotation.len() != universals_so_far {
                return Ok(false);
            }
            for &literal in &mapping.annotation {
                if !self.v.binary_contains(literal) && !self.u.binary_contains(literal) {
                    return Ok(false);
                }
            }
            // The annotation has pinned these universals, so their other
            // polarity is no longer available to later annotations.
            for &literal in &mapping.annotation {
                while let Some(found) = self.v.binary_search_position(-literal) {
                    self.v.remove(found);
                }
            }
            last_position = position;
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        input::Input,
        parser::{parse_expansion, parse_qbf},
    };

    fn input(text: &str) -> Input {
        Input::new(Box::new(text.as_bytes().iter().cloned()))
    }

    fn run_check(qbf_text: &str, expansion_text: &str) -> CheckResult {
        let mut qbf = parse_qbf(&mut input(qbf_text)).expect("QBF must parse");
        let mut expansion =
            parse_expansion(&mut input(expansion_text)).expect("expansion must parse");
        check(&mut qbf, &mut expansion).expect("check must not abort")
    }

    fn findings(result: &CheckResult) -> Vec<(FindingKind, usize)> {
        result
            .findings
            .iter()
            .map(|finding| (finding.kind, finding.clause))
            .collect()
    }

    #[test]
    fn empty_clause_verifies_against_empty_clause() {
        let result = run_check("p cnf 1 0\n0", "p cnf 1 0\n0");
        assert!(result.is_verified());
    }

    #[test]
    fn faithful_expansions_verify() {
        // ∀1 ∃2,3. (1 v 2 v 3) expanded under 1 ↦ false.
        let result = run_check(
            "p cnf 3 1\na 1 0\ne 2 3 0\n1 2 3 0",
            "c x 1 2 0 2 3 0 -1 0\nc o 1 0\np cnf 2 1\n1 2 0",
        );
        assert!(result.is_verified());

        // Same shape with shuffled variable names and literal order.
        let result = run_check(
            "p cnf 3 1\na 1 0\ne 3 2 0\n2 1 3 0",
            "c x 2 1 0 3 2 0 -1 0\nc o 1 0\np cnf 2 1\n2 1 0",
        );
        assert!(result.is_verified());

        // Two expansion clauses from one QBF clause each.
        let result = run_check(
            "p cnf 4 1\na 1 0\ne 3 2 0\ne 4 0\n2 1 3 0\n4 0",
            "c x 2 1 0 3 2 0 -1 0\nc x 3 0 4 0 1 0\nc o 1 1 2 0\np cnf 3 1\n2 1 0\n1 2 0\n 3 0",
        );
        assert!(result.is_verified());

        // Multiple alternations; origins may repeat a QBF clause.
        let result = run_check(
            "p cnf 6 4\na 1 0\ne 4 5 0\na 2 0\ne 6 0\na 3 0\n-1 4 5 0\n1 2 3 -4 -5 6 0\n\
             1 -2 -3 0\n-4 -5 -6 0\n",
            "c x 1 2 0 4 5 0 1 0\nc x 3 4 0 4 5 0 -1 0\nc x 5 0 6 0 -1 -2 0\n\
             c x 6 0 6 0 1 -2 0\nc x 7 0 6 0 1 2 0\nc o 1 2 3 4 4 0\n\
             p cnf 7 5\n1 2 0\n-3 -4 5 0\n0\n-1 -2 -7 0\n-1 -2 -6 0\n",
        );
        assert!(result.is_verified());
    }

    #[test]
    fn verdicts_do_not_depend_on_clause_origins() {
        let qbf_text = "p cnf 6 4\na 1 0\ne 4 5 0\na 2 0\ne 6 0\na 3 0\n-1 4 5 0\n\
                        1 2 3 -4 -5 6 0\n1 -2 -3 0\n-4 -5 -6 0\n";
        let with_origins = "c x 1 2 0 4 5 0 1 0\nc x 3 4 0 4 5 0 -1 0\nc x 5 0 6 0 -1 -2 0\n\
                            c x 6 0 6 0 1 -2 0\nc x 7 0 6 0 1 2 0\nc o 1 2 3 4 4 0\n\
                            p cnf 7 5\n1 2 0\n-3 -4 5 0\n0\n-1 -2 -7 0\n-1 -2 -6 0\n";
        let without_origins = "c x 1 2 0 4 5 0 1 0\nc x 3 4 0 4 5 0 -1 0\nc x 5 0 6 0 -1 -2 0\n\
                               c x 6 0 6 0 1 -2 0\nc x 7 0 6 0 1 2 0\n\
                               p cnf 7 5\n1 2 0\n-3 -4 5 0\n0\n-1 -2 -7 0\n-1 -2 -6 0\n";
        let first = run_check(qbf_text, with_origins);
        let second = run_check(qbf_text, without_origins);
        assert!(first.is_verified());
        assert_eq!(findings(&first), findings(&second));
    }

    #[test]
    fn surplus_existentials_reject_the_candidate() {
        // The only candidate has three existential literals but the
        // expansion clauses cover at most two.
        let result = run_check(
            "p cnf 5 2\na 1 0\ne 2 3 0\ne 4 5 0\n-5 2 1 3 0\n4 5 0",
            "c x 1 2 0 2 3 0 -1 0\nc x 3 0 4 0 0\nc o 1 1 2 0\np cnf 3 3\n2 1 0\n1 2 0\n 3 0",
        );
        assert_eq!(
            findings(&result),
            vec![
                (FindingKind::IncorrectLiterals, 0),
                (FindingKind::IncorrectLiterals, 1),
                (FindingKind::IncorrectLiterals, 2),
            ]
        );

        let result = run_check(
            "p cnf 5 2\na 1 0\ne 2 3 0\ne 4 5 0\n-5 2 1 3 0\n4 5 0",
            "c x 1 2 0 2 3 0 -1 0\nc x 3 4 0 4 5 0 1 0\nc o 1 1 2 0\np cnf 4 3\n1 0\n2 0\n3 4 0",
        );
        assert_eq!(
            findings(&result),
            vec![
                (FindingKind::IncorrectLiterals, 0),
                (FindingKind::IncorrectLiterals, 1),
            ]
        );
    }

    #[test]
    fn annotation_must_cover_all_preceding_universals() {
        // Mapping 5 <- 2 ^ [-1 -4] annotates a universal that lies to the
        // right of variable 2's block.
        let result = run_check(
            "p cnf 5 2\na 1 0\ne 2 3 0\na 4 0\ne 5 0\n-5 2 1 3 0\n4 5 0",
            "c x 1 2 0 2 3 0 -1 0\nc x 3 0 5 0 -1 4 0\nc x 4 0 5 0 -1 -4 0\n\
             c x 5 0 2 0 -1 -4 0\nc o 1 2 0\np cnf 4 2\n5 2 -3 0\n4 0",
        );
        assert_eq!(findings(&result), vec![(FindingKind::IncorrectAnnotation, 0)]);
    }

    #[test]
    fn free_variables_count_as_existential_with_empty_annotation() {
        // Variable 3 occurs in the matrix but not in the prefix.
        let qbf_text = "p cnf 3 1\na 1 0\ne 2 0\n2 3 0";
        let result = run_check(
            qbf_text,
            "c x 4 0 2 0 -1 0\nc x 5 0 3 0 0\nc o 1 0\np cnf 5 1\n4 5 0",
        );
        assert!(result.is_verified());

        // A free variable counts as quantified before the whole prefix,
        // so annotating it is inconsistent.
        let result = run_check(
            qbf_text,
            "c x 4 0 2 0 -1 0\nc x 5 0 3 0 -1 0\nc o 1 0\np cnf 5 1\n4 5 0",
        );
        assert_eq!(findings(&result), vec![(FindingKind::IncorrectAnnotation, 0)]);
    }

    #[test]
    fn conflicting_annotations_within_a_clause_are_rejected() {
        // Mappings 6 <- 6 ^ [1 -2] and 7 <- 6 ^ [-1 2] cannot stem from
        // the same universal assignment.
        let result = run_check(
            "p cnf 6 4\na 1 0\ne 4 5 0\na 2 0\ne 6 0\na 3 0\n-1 4 5 0\n1 2 3 -4 -5 6 0\n\
             1 -2 -3 0\n-4 -5 -6 0\n",
            "c x 1 2 0 4 5 0 1 0\nc x 3 4 0 4 5 0 -1 0\nc x 5 0 6 0 -1 -2 0\n\
             c x 6 0 6 0 1 -2 0\nc x 7 0 6 0 -1 2 0\nc o 1 2 3 4 4 0\n\
             p cnf 7 5\n1 2 0\n-3 -4 5 0\n0\n-1 -2 -7 0\n-1 -2 -6 0\n",
        );
        assert_eq!(findings(&result), vec![(FindingKind::IncorrectAnnotation, 3)]);
    }

    #[test]
    fn wrong_annotation_sizes_are_rejected() {
        // Mapping 3 <- 4 ^ [] misses the annotation for universal 1.
        let result = run_check(
            "p cnf 4 1\na 1 0\ne 3 2 0\ne 4 0\n2 1 3 0\n4 0",
            "c x 2 1 0 3 2 0 -1 0\nc x 3 0 4 0 0\nc o 1 1 2 0\np cnf 3 1\n2 1 0\n1 2 0\n 3 0",
        );
        assert_eq!(findings(&result), vec![(FindingKind::IncorrectAnnotation, 2)]);

        // Annotations shorter than the universal block they must cover.
        let result = run_check(
            "p cnf 6 4\na 1 0\ne 4 5 0\na 2 0\ne 6 0\na 3 0\n-1 4 5 0\n1 2 3 -4 -5 6 0\n\
             1 -2 -3 0\n-4 -5 -6 0\n",
            "c x 1 2 0 4 5 0 1 0\nc x 3 4 0 4 5 0 -1 0\nc x 5 0 6 0 -1 -2 0\n\
             c x 6 0 6 0 1 0\nc x 7 0 6 0 2 0\nc o 1 2 3 4 4 0\n\
             p cnf 7 5\n1 2 0\n-3 -4 5 0\n0\n-1 -2 -7 0\n-1 -2 -6 0\n",
        );
        assert_eq!(
            findings(&result),
            vec![
                (FindingKind::IncorrectAnnotation, 3),
                (FindingKind::IncorrectAnnotation, 4),
            ]
        );
    }

    #[test]
    fn out_of_range_origin_aborts_the_run() {
        let mut qbf = parse_qbf(&mut input("p cnf 2 1\ne 1 2 0\n1 2 0")).unwrap();
        let mut expansion = parse_expansion(&mut input(
            "c x 1 2 0 1 2 0 0\nc o 5 0\np cnf 2 1\n1 2 0",
        ))
        .unwrap();
        assert_eq!(
            check(&mut qbf, &mut expansion),
            Err(CheckError::OriginOutOfRange {
                origin: 4,
                matrix_len: 1
            })
        );
    }

    #[test]
    fn missing_mapping_aborts_the_run() {
        let mut qbf = parse_qbf(&mut input("p cnf 2 1\ne 1 2 0\n1 2 0")).unwrap();
        let mut expansion =
            parse_expansion(&mut input("c x 1 0 1 0 0\nc o 1 0\np cnf 2 1\n1 2 0")).unwrap();
        assert_eq!(
            check(&mut qbf, &mut expansion),
            Err(CheckError::MissingMapping(Variable::new(2)))
        );
    }

    #[test]
    fn short_origins_list_falls_back_to_exhaustive_search() {
        // Origins cover only the first of two expansion clauses.
        let result = run_check(
            "p cnf 4 1\na 1 0\ne 3 2 0\ne 4 0\n2 1 3 0\n4 0",
            "c x 2 1 0 3 2 0 -1 0\nc x 3 0 4 0 1 0\nc o 1 0\np cnf 3 2\n2 1 0\n3 0",
        );
        assert!(result.is_verified());
    }

    #[test]
    fn grouped_orderings_verify_like_prefix_ordered_clauses() {
        // Both expansion variables map into the same existential block;
        // the walk sees an empty quantifier range the second time.
        let result = run_check(
            "p cnf 3 1\na 1 0\ne 2 3 0\n1 2 3 0",
            "c x 1 0 2 0 -1 0\nc x 2 0 3 0 -1 0\nc o 1 0\np cnf 2 1\n1 2 0",
        );
        assert!(result.is_verified());
    }
}
