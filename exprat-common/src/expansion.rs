//! Expansion model: a CNF whose variables carry annotations tying them
//! back to QBF variables.

use crate::{
    formula::Clause,
    hashtable::OpenAddressingMap,
    literal::{Literal, Variable},
    memory::Stack,
};

/// Ties one expansion variable to the QBF variable it instantiates,
/// together with the universal assignment (annotation) under which the
/// instantiation happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VarMapping {
    pub exp_var: Variable,
    pub qbf_var: Variable,
    pub annotation: Stack<Literal>,
}

/// The expansion CNF, its variable mappings and optional clause origins.
pub struct Expansion {
    /// The largest variable declared in the mapping comments
    pub max_variable: Variable,
    /// The clause count declared in the header
    pub declared_clauses: u64,
    /// All variable mappings, in declaration order
    mappings: Stack<VarMapping>,
    /// Maps an expansion variable's hash to an offset into `mappings`
    mapping_index: OpenAddressingMap<usize>,
    /// For each expansion clause, the index of the QBF matrix clause it
    /// claims to originate from. `None` means exhaustive search.
    pub clause_origins: Option<Stack<usize>>,
    /// The clauses
    pub clauses: Stack<Clause>,
}

/// Look up the mapping for an expansion variable.
pub(crate) fn mapping_of<'a>(
    mapping_index: &OpenAddressingMap<usize>,
    mappings: &'a Stack<VarMapping>,
    variable: Variable,
) -> Option<&'a VarMapping> {
    mapping_index
        .get(variable.hash())
        .map(|offset| &mappings[offset])
}

impl Expansion {
    pub fn new() -> Expansion {
        Expansion {
            max_variable: Variable::new(0),
            declared_clauses: 0,
            mappings: Stack::new(),
            mapping_index: OpenAddressingMap::new(),
            clause_origins: None,
            clauses: Stack::new(),
        }
    }

    /// Record the mapping for one expansion variable.
    pub fn add_mapping(&mut self, exp_var: Variable, qbf_var: Variable, annotation: Stack<Literal>) {
        if exp_var > self.max_variable {
            self.max_variable = exp_var;
        }
        self.mapping_index.insert(exp_var.hash(), self.mappings.len());
        self.mappings.push(VarMapping {
            exp_var,
            qbf_var,
            annotation,
        });
    }

    pub fn mapping(&self, variable: Variable) -> Option<&VarMapping> {
        mapping_of(&self.mapping_index, &self.mappings, variable)
    }

    pub fn add_clause(&mut self, literals: Stack<Literal>) {
        self.clauses.push(Clause::new(literals));
    }

    /// Borrow the pieces of the expansion that the checker needs with
    /// disjoint lifetimes.
    pub(crate) fn parts(&mut self) -> ExpansionParts {
        ExpansionParts {
            mappings: &self.mappings,
            mapping_index: &self.mapping_index,
            clause_origins: &mut self.clause_origins,
            clauses: &self.clauses,
        }
    }

    /// Print the expansion as comment lines.
    pub fn dump(&self) {
        comment!("Expansion {{");
        comment!("  max_variable={}", self.max_variable);
        if let Some(origins) = &self.clause_origins {
            let origins: Vec<String> = origins.iter().map(|o| format!("{}", o + 1)).collect();
            comment!("  clause origins: {}", origins.join(" "));
        } else {
            comment!("  clause origins: none (exhaustive search)");
        }
        for mapping in &self.mappings {
            let annotation: Vec<String> = mapping
                .annotation
                .iter()
                .map(|literal| format!("{}", literal))
                .collect();
            comment!(
                "  mapping: {} <- {} ^ [{}]",
                mapping.exp_var,
                mapping.qbf_var,
                annotation.join(" ")
            );
        }
        comment!("  clauses={}", self.clauses.len());
        comment!("}}");
    }
}

impl Default for Expansion {
    fn default() -> Expansion {
        Expansion::new()
    }
}

/// Disjoint borrows of an [`Expansion`](struct.Expansion.html), so the
/// checker can drop an incomplete origins list while it holds references
/// into the clauses and mappings.
pub(crate) struct ExpansionParts<'a> {
    pub mappings: &'a Stack<VarMapping>,
    pub mapping_index: &'a OpenAddressingMap<usize>,
    pub clause_origins: &'a mut Option<Stack<usize>>,
    pub clauses: &'a Stack<Clause>,
}
