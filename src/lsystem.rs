//! L-system grammar engine
//!
//! Deterministic string-rewriting over a closed symbol alphabet. Rules are
//! context-free and may be stochastic: each symbol maps to one or more
//! weighted replacement sequences whose probabilities sum to 1, selected with
//! the seeded RNG threaded in by the caller. The worst-case expansion length
//! is checked before any rewriting happens, so a run can never exceed its
//! configured symbol budget.

use rand::Rng;
use rand_chacha::ChaCha8Rng;

use crate::config::RuleSpec;
use crate::error::LayoutError;

/// One symbol of the turtle alphabet.
///
/// `Variable` covers caller-defined non-terminals that have no geometric
/// meaning of their own.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Symbol {
    /// Draw forward one step.
    Forward,
    /// Turn left by the configured angle increment.
    Left,
    /// Turn right by the configured angle increment.
    Right,
    /// Push (position, heading) onto the branch stack.
    Push,
    /// Pop the branch stack.
    Pop,
    /// Caller-defined non-terminal.
    Variable(char),
}

impl Symbol {
    pub fn from_char(c: char) -> Result<Symbol, LayoutError> {
        match c {
            'F' => Ok(Symbol::Forward),
            '+' => Ok(Symbol::Left),
            '-' => Ok(Symbol::Right),
            '[' => Ok(Symbol::Push),
            ']' => Ok(Symbol::Pop),
            c if c.is_ascii_alphabetic() => Ok(Symbol::Variable(c)),
            c => Err(LayoutError::Config(format!(
                "unknown L-system symbol '{}'",
                c
            ))),
        }
    }

    pub fn to_char(self) -> char {
        match self {
            Symbol::Forward => 'F',
            Symbol::Left => '+',
            Symbol::Right => '-',
            Symbol::Push => '[',
            Symbol::Pop => ']',
            Symbol::Variable(c) => c,
        }
    }
}

/// Parse a symbol string like "F[+F]F" into the closed alphabet.
pub fn parse_symbols(s: &str) -> Result<Vec<Symbol>, LayoutError> {
    s.chars().map(Symbol::from_char).collect()
}

/// Render a symbol sequence back to its textual form.
pub fn symbols_to_string(symbols: &[Symbol]) -> String {
    symbols.iter().map(|s| s.to_char()).collect()
}

/// One weighted replacement of a stochastic rule.
#[derive(Clone, Debug, PartialEq)]
pub struct Production {
    pub replacement: Vec<Symbol>,
    pub probability: f64,
}

/// The production rules of a grammar, in deterministic declaration order.
#[derive(Clone, Debug, Default)]
pub struct RuleSet {
    rules: Vec<(Symbol, Vec<Production>)>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// Add one production for `symbol`.
    pub fn add_rule(&mut self, symbol: Symbol, replacement: Vec<Symbol>, probability: f64) {
        if let Some((_, productions)) = self.rules.iter_mut().find(|(s, _)| *s == symbol) {
            productions.push(Production { replacement, probability });
        } else {
            self.rules.push((symbol, vec![Production { replacement, probability }]));
        }
    }

    /// Build a rule set from the textual specs used in configs.
    pub fn from_specs(specs: &[RuleSpec]) -> Result<RuleSet, LayoutError> {
        let mut rules = RuleSet::new();
        for spec in specs {
            let symbol = Symbol::from_char(spec.symbol)?;
            let replacement = parse_symbols(&spec.replacement)?;
            rules.add_rule(symbol, replacement, spec.probability);
        }
        rules.validate()?;
        Ok(rules)
    }

    /// Check probability weights: each in (0, 1], each symbol summing to 1.
    pub fn validate(&self) -> Result<(), LayoutError> {
        for (symbol, productions) in &self.rules {
            let mut sum = 0.0;
            for production in productions {
                if production.probability <= 0.0 || production.probability > 1.0 {
                    return Err(LayoutError::Config(format!(
                        "rule for '{}' has probability {} outside (0, 1]",
                        symbol.to_char(),
                        production.probability
                    )));
                }
                sum += production.probability;
            }
            if (sum - 1.0).abs() > 1e-6 {
                return Err(LayoutError::Config(format!(
                    "probabilities for '{}' sum to {}, expected 1",
                    symbol.to_char(),
                    sum
                )));
            }
        }
        Ok(())
    }

    fn productions(&self, symbol: Symbol) -> Option<&[Production]> {
        self.rules
            .iter()
            .find(|(s, _)| *s == symbol)
            .map(|(_, p)| p.as_slice())
    }

    /// Largest single-symbol growth factor across all productions.
    pub fn max_expansion_factor(&self) -> usize {
        self.rules
            .iter()
            .flat_map(|(_, productions)| productions.iter())
            .map(|p| p.replacement.len())
            .max()
            .unwrap_or(1)
            .max(1)
    }
}

/// Worst-case expanded length: axiom length times factor^iterations,
/// saturating on overflow.
fn worst_case_length(axiom_len: usize, factor: usize, iterations: u32) -> usize {
    let mut total = axiom_len;
    for _ in 0..iterations {
        total = total.saturating_mul(factor);
    }
    total
}

/// Rewrite `axiom` for `iterations` generations.
///
/// All rules apply simultaneously to every symbol of the current generation;
/// symbols without a rule map to themselves. Exceeding `max_symbols` in the
/// worst case aborts with a `Generation` error before any work is done.
pub fn expand(
    axiom: &[Symbol],
    rules: &RuleSet,
    iterations: u32,
    max_symbols: usize,
    rng: &mut ChaCha8Rng,
) -> Result<Vec<Symbol>, LayoutError> {
    rules.validate()?;

    let worst = worst_case_length(axiom.len(), rules.max_expansion_factor(), iterations);
    if worst > max_symbols {
        return Err(LayoutError::Generation(format!(
            "expansion could reach {} symbols, exceeding the {} symbol bound",
            worst, max_symbols
        )));
    }

    let mut current = axiom.to_vec();
    for _ in 0..iterations {
        let mut next = Vec::with_capacity(current.len() * 2);
        for &symbol in &current {
            match rules.productions(symbol) {
                Some(productions) => {
                    let chosen = select_production(productions, rng);
                    next.extend_from_slice(&chosen.replacement);
                }
                None => next.push(symbol),
            }
        }
        current = next;
    }
    Ok(current)
}

/// Cumulative-weight selection. A single production short-circuits without
/// consuming randomness, keeping deterministic grammars RNG-neutral.
fn select_production<'a>(productions: &'a [Production], rng: &mut ChaCha8Rng) -> &'a Production {
    if productions.len() == 1 {
        return &productions[0];
    }
    let roll: f64 = rng.gen();
    let mut cumulative = 0.0;
    for production in productions {
        cumulative += production.probability;
        if roll < cumulative {
            return production;
        }
    }
    // Floating point residue: fall back to the last production.
    productions.last().unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn basic_rules() -> RuleSet {
        let mut rules = RuleSet::new();
        rules.add_rule(Symbol::Forward, parse_symbols("F[+F]F[-F]F").unwrap(), 1.0);
        rules
    }

    #[test]
    fn test_two_iterations_of_branching_rule() {
        let axiom = parse_symbols("F").unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let result = expand(&axiom, &basic_rules(), 2, 100_000, &mut rng).unwrap();

        assert_eq!(
            symbols_to_string(&result),
            "F[+F]F[-F]F[+F[+F]F[-F]F]F[+F]F[-F]F[-F[+F]F[-F]F]F[+F]F[-F]F"
        );
    }

    #[test]
    fn test_expansion_is_deterministic() {
        let mut rules = RuleSet::new();
        rules.add_rule(Symbol::Forward, parse_symbols("F[+F]").unwrap(), 0.5);
        rules.add_rule(Symbol::Forward, parse_symbols("F[-F]").unwrap(), 0.5);

        let axiom = parse_symbols("FFF").unwrap();
        let mut rng_a = ChaCha8Rng::seed_from_u64(9);
        let mut rng_b = ChaCha8Rng::seed_from_u64(9);
        let a = expand(&axiom, &rules, 4, 100_000, &mut rng_a).unwrap();
        let b = expand(&axiom, &rules, 4, 100_000, &mut rng_b).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_symbols_without_rules_are_copied() {
        let mut rules = RuleSet::new();
        rules.add_rule(Symbol::Variable('X'), parse_symbols("F[+X]").unwrap(), 1.0);

        let axiom = parse_symbols("X").unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let result = expand(&axiom, &rules, 2, 100_000, &mut rng).unwrap();
        assert_eq!(symbols_to_string(&result), "F[+F[+X]]");
    }

    #[test]
    fn test_symbol_budget_is_enforced_before_expansion() {
        let axiom = parse_symbols("F").unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        // 11^8 comfortably exceeds the budget.
        let result = expand(&axiom, &basic_rules(), 8, 10_000, &mut rng);
        assert!(matches!(result, Err(LayoutError::Generation(_))));
    }

    #[test]
    fn test_probabilities_must_sum_to_one() {
        let mut rules = RuleSet::new();
        rules.add_rule(Symbol::Forward, parse_symbols("FF").unwrap(), 0.5);
        rules.add_rule(Symbol::Forward, parse_symbols("F").unwrap(), 0.3);

        assert!(matches!(rules.validate(), Err(LayoutError::Config(_))));
    }

    #[test]
    fn test_parse_rejects_unknown_symbols() {
        assert!(parse_symbols("F{").is_err());
        assert!(parse_symbols("F[+F]X").is_ok());
    }

    #[test]
    fn test_round_trip_text_form() {
        let text = "F[+F]F[-X]F";
        let symbols = parse_symbols(text).unwrap();
        assert_eq!(symbols_to_string(&symbols), text);
    }
}
