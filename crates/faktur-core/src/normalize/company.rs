//! Company legal-form suffix abbreviation.
//!
//! The rules form an ordered pipeline. Polish forms apply anywhere in the
//! name; English and German forms only when the matched phrase closes the
//! name. Ordering is part of the contract and is kept as declared.

use lazy_static::lazy_static;
use regex::Regex;

/// Where in the name a rule may match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleScope {
    /// Replace every occurrence.
    Anywhere,
    /// Replace only when the phrase ends the name (trailing whitespace allowed).
    AtEnd,
}

/// One substitution in the pipeline.
pub struct SuffixRule {
    pattern: Regex,
    replacement: &'static str,
    scope: RuleScope,
}

impl SuffixRule {
    fn new(pattern: &str, replacement: &'static str, scope: RuleScope) -> Self {
        let anchored = match scope {
            RuleScope::Anywhere => format!("(?i){pattern}"),
            RuleScope::AtEnd => format!("(?i){pattern}\\s*$"),
        };
        Self {
            pattern: Regex::new(&anchored).unwrap(),
            replacement,
            scope,
        }
    }

    fn apply(&self, name: &str) -> String {
        match self.scope {
            RuleScope::Anywhere => self.pattern.replace_all(name, self.replacement).into_owned(),
            RuleScope::AtEnd => self.pattern.replace(name, self.replacement).into_owned(),
        }
    }
}

lazy_static! {
    static ref SUFFIX_RULES: Vec<SuffixRule> = vec![
        // Spelling variants of the abbreviation itself.
        SuffixRule::new(r"\bsp\.?\s*z\s*o\.?\s*o\.?", "sp. z o.o.", RuleScope::Anywhere),
        // Polish legal-form phrases.
        SuffixRule::new(r"\bspółka\s+akcyjna\b", "S.A.", RuleScope::Anywhere),
        SuffixRule::new(
            r"\bspółka\s+z\s+ograniczoną\s+odpowiedzialnością\b",
            "sp. z o.o.",
            RuleScope::Anywhere,
        ),
        SuffixRule::new(r"\bspółka\s+komandytowa\b", "sp.k.", RuleScope::Anywhere),
        SuffixRule::new(r"\bspółka\s+jawna\b", "sp.j.", RuleScope::Anywhere),
        SuffixRule::new(r"\bspółka\s+partnerska\b", "sp.p.", RuleScope::Anywhere),
        SuffixRule::new(
            r"\bspółka\s+komandytowo-akcyjna\b",
            "S.K.A.",
            RuleScope::Anywhere,
        ),
        SuffixRule::new(r"\bspółka\s+cywilna\b", "s.c.", RuleScope::Anywhere),
        // English and German forms, end of name only.
        SuffixRule::new(r"\bLimited\b", "Ltd.", RuleScope::AtEnd),
        SuffixRule::new(r"\bIncorporated\b", "Inc.", RuleScope::AtEnd),
        SuffixRule::new(r"\bCorporation\b", "Corp.", RuleScope::AtEnd),
        SuffixRule::new(r"\bCompany\b", "Co.", RuleScope::AtEnd),
        SuffixRule::new(r"\bPublic\s+Limited\s+Company\b", "PLC", RuleScope::AtEnd),
        SuffixRule::new(
            r"\bGesellschaft\s+mit\s+beschränkter\s+Haftung\b",
            "GmbH",
            RuleScope::AtEnd,
        ),
        SuffixRule::new(r"\bAktiengesellschaft\b", "AG", RuleScope::AtEnd),
    ];
}

/// Abbreviate legal-form suffixes in a company name.
///
/// Deterministic, pure. Blank input comes back unchanged.
pub fn abbreviate(name: &str) -> String {
    if name.trim().is_empty() {
        return name.to_string();
    }

    SUFFIX_RULES
        .iter()
        .fold(name.to_string(), |current, rule| rule.apply(&current))
}
