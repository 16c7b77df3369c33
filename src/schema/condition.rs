use serde::Serialize;

use super::stats::StatSample;

/// Comparison operator of a stat predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum CmpOp {
    Less,
    LessEq,
    Eq,
    GreaterEq,
    Greater,
}

impl CmpOp {
    /// Returns the operator's source spelling.
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Less => "<",
            Self::LessEq => "<=",
            Self::Eq => "=",
            Self::GreaterEq => ">=",
            Self::Greater => ">",
        }
    }

    pub fn test(&self, lhs: i32, rhs: i32) -> bool {
        match self {
            Self::Less => lhs < rhs,
            Self::LessEq => lhs <= rhs,
            Self::Eq => lhs == rhs,
            Self::GreaterEq => lhs >= rhs,
            Self::Greater => lhs > rhs,
        }
    }
}

/// A single `<op><int>` comparison against a stat value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Comparison {
    pub op: CmpOp,
    pub threshold: i32,
}

impl Comparison {
    pub fn new(op: CmpOp, threshold: i32) -> Self {
        Self { op, threshold }
    }

    /// Parse a comparison operand such as `"<=40"` or `"15"`.
    ///
    /// Two-character operators are matched before one-character ones, and
    /// an operand without a leading operator means `>=`. The numeric part
    /// is read like C `atoi`: leading whitespace, an optional sign, then
    /// digits; anything unparseable reads as 0.
    pub fn parse(input: &str) -> Comparison {
        let (op, rest) = if let Some(rest) = input.strip_prefix("<=") {
            (CmpOp::LessEq, rest)
        } else if let Some(rest) = input.strip_prefix(">=") {
            (CmpOp::GreaterEq, rest)
        } else if let Some(rest) = input.strip_prefix('<') {
            (CmpOp::Less, rest)
        } else if let Some(rest) = input.strip_prefix('>') {
            (CmpOp::Greater, rest)
        } else if let Some(rest) = input.strip_prefix('=') {
            (CmpOp::Eq, rest)
        } else {
            (CmpOp::GreaterEq, input)
        };
        Comparison {
            op,
            threshold: leading_int(rest),
        }
    }

    pub fn holds(&self, value: i32) -> bool {
        self.op.test(value, self.threshold)
    }
}

impl std::fmt::Display for Comparison {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.op.symbol(), self.threshold)
    }
}

fn leading_int(s: &str) -> i32 {
    let s = s.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let mut value: i64 = 0;
    for b in digits.bytes().take_while(u8::is_ascii_digit) {
        value = (value * 10 + i64::from(b - b'0')).min(i64::from(i32::MAX) + 1);
    }
    if negative {
        value = -value;
    }
    value.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

/// The full guard of an auto-check.
///
/// Every part is optional; an absent part is satisfied. `flag` and `flag2`
/// must be set, `not_flag` must be unset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Condition {
    pub clarity: Option<Comparison>,
    pub anxiety: Option<Comparison>,
    pub balance: Option<Comparison>,
    pub flag: Option<String>,
    pub flag2: Option<String>,
    pub not_flag: Option<String>,
}

impl Condition {
    /// Evaluate against sampled stat targets and a flag lookup.
    pub fn holds<F>(&self, stats: StatSample, has_flag: F) -> bool
    where
        F: Fn(&str) -> bool,
    {
        let compare = |cmp: &Option<Comparison>, value: i32| cmp.map_or(true, |c| c.holds(value));

        compare(&self.clarity, stats.clarity)
            && compare(&self.anxiety, stats.anxiety)
            && compare(&self.balance, stats.balance)
            && self.flag.as_deref().map_or(true, &has_flag)
            && self.flag2.as_deref().map_or(true, &has_flag)
            && self.not_flag.as_deref().map_or(true, |name| !has_flag(name))
    }

    /// True when no part of the guard is specified.
    pub fn is_unconditional(&self) -> bool {
        *self == Condition::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(clarity: i32, anxiety: i32, balance: i32) -> StatSample {
        StatSample {
            clarity,
            anxiety,
            balance,
        }
    }

    #[test]
    fn parse_all_operators() {
        assert_eq!(Comparison::parse("<5"), Comparison::new(CmpOp::Less, 5));
        assert_eq!(Comparison::parse("<=5"), Comparison::new(CmpOp::LessEq, 5));
        assert_eq!(Comparison::parse("=5"), Comparison::new(CmpOp::Eq, 5));
        assert_eq!(Comparison::parse(">=5"), Comparison::new(CmpOp::GreaterEq, 5));
        assert_eq!(Comparison::parse(">5"), Comparison::new(CmpOp::Greater, 5));
        assert_eq!(Comparison::parse("5"), Comparison::new(CmpOp::GreaterEq, 5));
    }

    #[test]
    fn parse_numeric_part_like_atoi() {
        assert_eq!(Comparison::parse(">= 12").threshold, 12);
        assert_eq!(Comparison::parse("<-40").threshold, -40);
        assert_eq!(Comparison::parse(">+7").threshold, 7);
        assert_eq!(Comparison::parse("30abc").threshold, 30);
        assert_eq!(Comparison::parse("abc").threshold, 0);
        assert_eq!(Comparison::parse("").threshold, 0);
        assert_eq!(Comparison::parse("99999999999").threshold, i32::MAX);
    }

    #[test]
    fn operators_match_integer_comparison() {
        let ops = [
            CmpOp::Less,
            CmpOp::LessEq,
            CmpOp::Eq,
            CmpOp::GreaterEq,
            CmpOp::Greater,
        ];
        for op in ops {
            for lhs in -3..=3 {
                for rhs in -3..=3 {
                    let expected = match op {
                        CmpOp::Less => lhs < rhs,
                        CmpOp::LessEq => lhs <= rhs,
                        CmpOp::Eq => lhs == rhs,
                        CmpOp::GreaterEq => lhs >= rhs,
                        CmpOp::Greater => lhs > rhs,
                    };
                    assert_eq!(op.test(lhs, rhs), expected, "{lhs} {} {rhs}", op.symbol());
                }
            }
        }
    }

    #[test]
    fn boundary_values() {
        let at_least_50 = Comparison::parse(">=50");
        assert!(!at_least_50.holds(49));
        assert!(at_least_50.holds(50));
        assert!(at_least_50.holds(51));

        let under_50 = Comparison::parse("<50");
        assert!(under_50.holds(49));
        assert!(!under_50.holds(50));
    }

    #[test]
    fn display_round_trips_spelling() {
        assert_eq!(Comparison::parse("<=40").to_string(), "<=40");
        assert_eq!(Comparison::parse("7").to_string(), ">=7");
    }

    #[test]
    fn empty_condition_always_holds() {
        let cond = Condition::default();
        assert!(cond.is_unconditional());
        assert!(cond.holds(sample(0, 0, 0), |_| false));
    }

    #[test]
    fn stat_parts_are_conjunctive() {
        let cond = Condition {
            clarity: Some(Comparison::parse(">=50")),
            anxiety: Some(Comparison::parse("<30")),
            ..Condition::default()
        };
        assert!(cond.holds(sample(50, 29, 0), |_| false));
        assert!(!cond.holds(sample(50, 30, 0), |_| false));
        assert!(!cond.holds(sample(49, 10, 0), |_| false));
    }

    #[test]
    fn flag_parts() {
        let cond = Condition {
            flag: Some("met_anna".to_string()),
            flag2: Some("has_key".to_string()),
            not_flag: Some("door_locked".to_string()),
            ..Condition::default()
        };
        let set = ["met_anna", "has_key"];
        assert!(cond.holds(sample(0, 0, 0), |f| set.contains(&f)));

        let missing_second = ["met_anna"];
        assert!(!cond.holds(sample(0, 0, 0), |f| missing_second.contains(&f)));

        let forbidden = ["met_anna", "has_key", "door_locked"];
        assert!(!cond.holds(sample(0, 0, 0), |f| forbidden.contains(&f)));
    }
}
