//! QBF model: prenex quantifier prefix plus clause matrix.

use crate::{
    hashtable::OpenAddressingMap,
    literal::{Literal, Variable},
    memory::Stack,
    sorting::quicksort_in_place,
};

/// Whether a quantifier binds universally or existentially.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantifierKind {
    Existential,
    Universal,
}

/// One block of the quantifier prefix.
///
/// The `ordering` equals the block's position in the prefix and is fixed
/// once the block has been added.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quantifier {
    pub kind: QuantifierKind,
    pub ordering: usize,
    pub variables: Stack<Variable>,
}

/// A disjunction of literals. Empty clauses are legal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clause {
    pub literals: Stack<Literal>,
}

impl Clause {
    pub fn new(literals: Stack<Literal>) -> Clause {
        Clause { literals }
    }
    pub fn len(&self) -> usize {
        self.literals.len()
    }
    pub fn is_empty(&self) -> bool {
        self.literals.is_empty()
    }
}

/// A QBF in prenex conjunctive normal form.
pub struct Qbf {
    /// The largest variable seen in the prefix or matrix
    pub max_variable: Variable,
    /// The number of kind changes between adjacent prefix blocks
    pub alternations: usize,
    /// The quantifier blocks, outermost first
    pub prefix: Stack<Quantifier>,
    /// The clauses
    pub matrix: Stack<Clause>,
    /// Maps a variable's hash to the position of its block in the prefix
    variable_index: OpenAddressingMap<usize>,
    /// Free variables we have already warned about
    warned_free: OpenAddressingMap<bool>,
}

/// Look up the prefix position of a variable. `None` means the variable
/// is free.
pub(crate) fn prefix_position(
    variable_index: &OpenAddressingMap<usize>,
    variable: Variable,
) -> Option<usize> {
    variable_index.get(variable.hash())
}

/// Warn about a free variable, once per variable per formula.
pub(crate) fn warn_free_variable(warned_free: &mut OpenAddressingMap<bool>, variable: Variable) {
    if warned_free.get(variable.hash()).is_some() {
        return;
    }
    warn!(
        "Variable {} not found in QBF prefix, assuming existentially quantified",
        variable
    );
    warned_free.insert(variable.hash(), true);
}

impl Qbf {
    pub fn new() -> Qbf {
        Qbf {
            max_variable: Variable::new(0),
            alternations: 0,
            prefix: Stack::new(),
            matrix: Stack::new(),
            variable_index: OpenAddressingMap::new(),
            warned_free: OpenAddressingMap::new(),
        }
    }

    /// Append a quantifier block to the prefix.
    ///
    /// Variables that already occur in the prefix are dropped with a
    /// warning, keeping their first appearance. A block left without
    /// variables is not added at all.
    pub fn add_quantifier(&mut self, kind: QuantifierKind, variables: Stack<Variable>) {
        let ordering = self.prefix.len();
        let mut block = Quantifier {
            kind,
            ordering,
            variables: Stack::with_capacity(variables.len()),
        };
        for &variable in &variables {
            if self.variable_index.get(variable.hash()).is_some() {
                warn!(
                    "Found duplicate variable {} in prefix, keeping its first appearance",
                    variable
                );
                continue;
            }
            self.variable_index.insert(variable.hash(), ordering);
            if variable > self.max_variable {
                self.max_variable = variable;
            }
            block.variables.push(variable);
        }
        if block.variables.is_empty() {
            return;
        }
        if let Some(last) = self.prefix.as_slice().last() {
            if last.kind != kind {
                self.alternations += 1;
            } else {
                warn!("Two quantifiers of same type in a row");
            }
        }
        self.prefix.push(block);
    }

    /// Append a clause to the matrix.
    pub fn add_clause(&mut self, literals: Stack<Literal>) {
        for &literal in &literals {
            if literal.variable() > self.max_variable {
                self.max_variable = literal.variable();
            }
        }
        self.matrix.push(Clause::new(literals));
    }

    /// The prefix position of the block binding this variable, or `None`
    /// for a free variable.
    pub fn quantifier_position(&self, variable: Variable) -> Option<usize> {
        prefix_position(&self.variable_index, variable)
    }

    /// Warn about a free variable, once per variable for this formula's
    /// lifetime.
    pub fn warn_free(&mut self, variable: Variable) {
        warn_free_variable(&mut self.warned_free, variable)
    }

    /// Borrow the pieces of the formula that the checker needs with
    /// disjoint lifetimes.
    pub(crate) fn parts(&mut self) -> QbfParts {
        QbfParts {
            prefix: &self.prefix,
            matrix: &self.matrix,
            variable_index: &self.variable_index,
            warned_free: &mut self.warned_free,
        }
    }

    /// Sort the literals of every matrix clause by the ordering of the
    /// block binding their variable. Free variables sort first, with a
    /// warning.
    pub fn sort_matrix_by_prefix(&mut self) {
        let Qbf {
            ref variable_index,
            ref mut warned_free,
            ref mut matrix,
            ..
        } = *self;
        let mut partitions = Stack::new();
        let mut ordering_key = |literal: Literal| -> u32 {
            match prefix_position(variable_index, literal.variable()) {
                Some(position) => position as u32,
                None => {
                    warn_free_variable(warned_free, literal.variable());
                    0
                }
            }
        };
        for offset in 0..matrix.len() {
            quicksort_in_place(
                &mut partitions,
                matrix[offset].literals.as_mut_slice(),
                &mut ordering_key,
            );
        }
    }

    /// Print the formula as comment lines.
    pub fn dump(&self) {
        comment!("QBF {{");
        comment!("  max_variable={}", self.max_variable);
        comment!("  alternations={}", self.alternations);
        comment!("  prefix:");
        for quantifier in &self.prefix {
            let kind = match quantifier.kind {
                QuantifierKind::Existential => "e",
                QuantifierKind::Universal => "a",
            };
            let variables: Vec<String> = quantifier
                .variables
                .iter()
                .map(|variable| format!("{}", variable))
                .collect();
            comment!("    {} {}", kind, variables.join(" "));
        }
        comment!("  matrix:");
        for clause in &self.matrix {
            let literals: Vec<String> = clause
                .literals
                .iter()
                .map(|literal| format!("{}", literal))
                .collect();
            comment!("    {}", literals.join(" "));
        }
        comment!("}}");
    }
}

impl Default for Qbf {
    fn default() -> Qbf {
        Qbf::new()
    }
}

/// Disjoint borrows of a [`Qbf`](struct.Qbf.html), so the checker can
/// record free-variable warnings while it holds references into the
/// prefix and matrix.
pub(crate) struct QbfParts<'a> {
    pub prefix: &'a Stack<Quantifier>,
    pub matrix: &'a Stack<Clause>,
    pub variable_index: &'a OpenAddressingMap<usize>,
    pub warned_free: &'a mut OpenAddressingMap<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn variables(values: &[u32]) -> Stack<Variable> {
        Stack::from_vec(values.iter().map(|&v| Variable::new(v)).collect())
    }

    fn literals(values: &[i32]) -> Stack<Literal> {
        Stack::from_vec(values.iter().map(|&v| Literal::new(v)).collect())
    }

    #[test]
    fn prefix_positions_and_alternations() {
        let mut qbf = Qbf::new();
        qbf.add_quantifier(QuantifierKind::Universal, variables(&[1]));
        qbf.add_quantifier(QuantifierKind::Existential, variables(&[2, 3]));
        qbf.add_quantifier(QuantifierKind::Universal, variables(&[4]));
        assert_eq!(qbf.alternations, 2);
        assert_eq!(qbf.quantifier_position(Variable::new(1)), Some(0));
        assert_eq!(qbf.quantifier_position(Variable::new(3)), Some(1));
        assert_eq!(qbf.quantifier_position(Variable::new(4)), Some(2));
        assert_eq!(qbf.quantifier_position(Variable::new(5)), None);
        assert_eq!(qbf.max_variable, Variable::new(4));
    }

    #[test]
    fn duplicate_prefix_variables_keep_first_appearance() {
        let mut qbf = Qbf::new();
        qbf.add_quantifier(QuantifierKind::Universal, variables(&[1, 2]));
        qbf.add_quantifier(QuantifierKind::Existential, variables(&[2, 3]));
        assert_eq!(qbf.quantifier_position(Variable::new(2)), Some(0));
        assert_eq!(qbf.prefix[1].variables.as_slice(), &[Variable::new(3)]);
    }

    #[test]
    fn fully_duplicated_quantifier_is_dropped() {
        let mut qbf = Qbf::new();
        qbf.add_quantifier(QuantifierKind::Universal, variables(&[1]));
        qbf.add_quantifier(QuantifierKind::Existential, variables(&[1]));
        assert_eq!(qbf.prefix.len(), 1);
        assert_eq!(qbf.alternations, 0);
    }

    #[test]
    fn matrix_sorted_by_quantifier_ordering() {
        let mut qbf = Qbf::new();
        qbf.add_quantifier(QuantifierKind::Universal, variables(&[1]));
        qbf.add_quantifier(QuantifierKind::Existential, variables(&[2, 3]));
        qbf.add_clause(literals(&[2, 1, 3]));
        qbf.sort_matrix_by_prefix();
        assert_eq!(qbf.matrix[0].literals[0], Literal::new(1));
    }
}
