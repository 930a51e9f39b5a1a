//! Variable and literal representations

use static_assertions::const_assert;
use std::{fmt, fmt::Display, mem::size_of, ops};

/// A propositional variable, in the range `[1, i32::MAX]`.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, PartialOrd, Ord)]
pub struct Variable(pub u32);

/// A variable with a polarity, encoded as `2 * variable + sign`.
///
/// This ordering groups the two polarities of a variable next to each
/// other, with the positive literal first.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, PartialOrd, Ord)]
pub struct Literal {
    encoding: u32,
}

const_assert!(size_of::<Literal>() == 4);

impl Variable {
    pub fn new(value: u32) -> Variable {
        Variable(value)
    }
    /// The key under which this variable is stored in hash tables.
    pub fn hash(self) -> u64 {
        crate::hashtable::hash_fnv1a(u64::from(self.0))
    }
}

impl Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Literal {
    /// Construct a new literal from the usual signed representation.
    pub fn new(value: i32) -> Literal {
        Literal {
            encoding: (value.abs() as u32) * 2 + ((value < 0) as u32),
        }
    }
    /// Construct a literal from a variable and a polarity.
    pub fn from_variable(variable: Variable, negative: bool) -> Literal {
        Literal {
            encoding: variable.0 * 2 + (negative as u32),
        }
    }
    pub fn from_raw(encoding: u32) -> Literal {
        Literal { encoding }
    }
    pub fn raw(self) -> u32 {
        self.encoding
    }
    pub fn decode(self) -> i32 {
        let magnitude = self.variable().0 as i32;
        if self.is_negative() {
            -magnitude
        } else {
            magnitude
        }
    }
    pub fn variable(self) -> Variable {
        Variable(self.encoding / 2)
    }
    pub fn is_negative(self) -> bool {
        self.encoding & 1 != 0
    }
}

impl Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.decode())
    }
}

impl ops::Neg for Literal {
    type Output = Literal;
    fn neg(self) -> Literal {
        Literal {
            encoding: self.encoding ^ 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoding() {
        assert_eq!(Literal::new(3).raw(), 6);
        assert_eq!(Literal::new(-3).raw(), 7);
        assert_eq!(Literal::from_variable(Variable::new(3), true), Literal::new(-3));
    }

    #[test]
    fn negation_flips_only_the_polarity() {
        let literal = Literal::new(42);
        assert_eq!(-literal, Literal::new(-42));
        assert_eq!(-(-literal), literal);
        assert_eq!((-literal).variable(), literal.variable());
    }

    #[test]
    fn display_is_signed() {
        assert_eq!(format!("{}", Literal::new(-17)), "-17");
        assert_eq!(format!("{}", Literal::new(17)), "17");
    }
}
