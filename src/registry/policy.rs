//! Per-function argument evaluation policy
//!
//! Most functions receive fully evaluated arguments. A few take some of their
//! arguments as raw terms (a location to write to, rules to run later), and
//! the conditionals decide which of their arguments get evaluated at all.

/// Which argument positions are passed unevaluated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RawArgs {
    /// Every argument is evaluated
    #[default]
    None,
    /// This position and all after it are raw
    From(usize),
    /// Exactly these positions are raw
    At(&'static [usize]),
}

/// Short-circuit behavior of the conditional builtins
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShortCircuit {
    /// No short-circuiting
    #[default]
    None,
    /// `if(cond, consequent...)`: consequents run only when cond is true
    If,
    /// `iif(cond, when_true, when_false)`: exactly one branch runs
    Iif,
}

/// Declarative argument policy of one function
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ArgumentPolicy {
    /// Raw argument positions
    pub raw: RawArgs,
    /// Conditional evaluation
    pub short_circuit: ShortCircuit,
}

impl ArgumentPolicy {
    /// Evaluate every argument
    pub const EAGER: Self = Self {
        raw: RawArgs::None,
        short_circuit: ShortCircuit::None,
    };

    /// Pass the arguments from `position` on as raw terms
    pub const fn raw_from(position: usize) -> Self {
        Self {
            raw: RawArgs::From(position),
            short_circuit: ShortCircuit::None,
        }
    }

    /// Pass the listed argument positions as raw terms
    pub const fn raw_at(positions: &'static [usize]) -> Self {
        Self {
            raw: RawArgs::At(positions),
            short_circuit: ShortCircuit::None,
        }
    }

    /// Conditional policy
    pub const fn conditional(kind: ShortCircuit) -> Self {
        Self {
            raw: RawArgs::None,
            short_circuit: kind,
        }
    }

    /// Whether the argument at `position` is passed unevaluated
    pub fn is_raw(&self, position: usize) -> bool {
        match self.raw {
            RawArgs::None => false,
            RawArgs::From(start) => position >= start,
            RawArgs::At(positions) => positions.contains(&position),
        }
    }

    /// Whether the argument at `position` should be skipped, given the
    /// already evaluated condition
    pub fn skips(&self, position: usize, condition: bool) -> bool {
        match self.short_circuit {
            ShortCircuit::None => false,
            ShortCircuit::If => position >= 1 && !condition,
            ShortCircuit::Iif => match position {
                1 => !condition,
                2 => condition,
                _ => false,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_positions() {
        let store = ArgumentPolicy::raw_from(1);
        assert!(!store.is_raw(0));
        assert!(store.is_raw(1));
        assert!(store.is_raw(4));

        let getitem = ArgumentPolicy::raw_at(&[1]);
        assert!(getitem.is_raw(1));
        assert!(!getitem.is_raw(2));
        assert!(!ArgumentPolicy::EAGER.is_raw(0));
    }

    #[test]
    fn test_conditional_skips() {
        let iif = ArgumentPolicy::conditional(ShortCircuit::Iif);
        assert!(!iif.skips(1, true));
        assert!(iif.skips(2, true));
        assert!(iif.skips(1, false));
        assert!(!iif.skips(2, false));

        let when = ArgumentPolicy::conditional(ShortCircuit::If);
        assert!(!when.skips(0, false));
        assert!(when.skips(3, false));
        assert!(!when.skips(3, true));
    }
}
