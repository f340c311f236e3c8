//! Splits DeepSMILES into space separated tokens.
//!
//! Tokenization is an ordered table of text rewrites. Each rule sees the
//! output of the previous one, and several rules only work because of the
//! spacing an earlier rule inserted, so the table order must not change.

use anyhow::{Context, Result};
use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;
use tracing::*;

use crate::*;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenizeError {
    #[error("SMILES {0} has more than one fragment")]
    MultiFragment(String),
}

enum Rewrite {
    Literal(&'static str, &'static str),
    Pattern(Regex, &'static str),
    /// Applied again until the pattern no longer matches.
    UntilStable(Regex, &'static str),
    Trim,
}

/// One step of the tokenizer.
pub struct Rule {
    pub name: &'static str,
    rewrite: Rewrite,
}

impl Rule {
    fn literal(name: &'static str, from: &'static str, to: &'static str) -> Self {
        Self {
            name,
            rewrite: Rewrite::Literal(from, to),
        }
    }

    fn pattern(name: &'static str, pattern: &str, replacement: &'static str) -> Self {
        Self {
            name,
            rewrite: Rewrite::Pattern(compile(pattern), replacement),
        }
    }

    pub fn apply(&self, text: &str) -> String {
        match &self.rewrite {
            Rewrite::Literal(from, to) => text.replace(from, to),
            Rewrite::Pattern(regex, replacement) => {
                regex.replace_all(text, *replacement).into_owned()
            }
            Rewrite::UntilStable(regex, replacement) => {
                let mut text = text.to_string();
                while regex.is_match(&text) {
                    text = regex.replace_all(&text, *replacement).into_owned();
                }
                text
            }
            Rewrite::Trim => text.trim().to_string(),
        }
    }
}

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|e| panic!("Invalid tokenizer pattern {pattern}: {e}"))
}

lazy_static! {
    /// The tokenizer rules, in the order they are applied.
    pub static ref RULES: Vec<Rule> = vec![
        Rule::pattern("bracket atoms", r"\[[^\]]+\]", " ${0} "),
        Rule::literal("ring escapes", "%", " %"),
        Rule::literal("branch closings", ")", " ) "),
        Rule::literal("single bonds", "-", " - "),
        // Negative charges stay inside their bracket token
        Rule::pattern("charge signs", r" - ([0-9]*)\]", "-${1}]"),
        Rule::literal("double bonds", "=", " = "),
        Rule::literal("triple bonds", "#", " # "),
        Rule::literal("quadruple bonds", "$", " $ "),
        Rule::literal("aromatic bonds", ":", " : "),
        Rule::pattern("escaped ring numbers", r"%([0-9]{2})", " %${1} "),
        Rule {
            name: "ring digits",
            rewrite: Rewrite::UntilStable(compile(r" ([0-9])([0-9])"), " ${1} ${2}"),
        },
        Rule::literal("up bonds", "/", " / "),
        Rule::literal("down bonds", "\\", " \\ "),
        Rule::pattern("spaces", r" +", " "),
        Rule {
            name: "trim",
            rewrite: Rewrite::Trim,
        },
    ];
}

/// Space separates the tokens of a DeepSMILES string.
///
/// Removing every space from the result gives back `dsmi`. Malformed input
/// is rewritten all the same.
pub fn tokenize(dsmi: &str) -> String {
    RULES
        .iter()
        .fold(dsmi.to_string(), |text, rule| rule.apply(&text))
}

/// Tokenizes one single-fragment SMILES string: every atom is bracketed
/// with its hydrogens, the result is encoded as DeepSMILES and then split
/// into tokens.
pub fn tokenize_smiles(smiles: &str) -> Result<String> {
    if smiles.contains('.') {
        return Err(TokenizeError::MultiFragment(smiles.to_string()).into());
    }
    let protected = protect_smiles(smiles)?;
    trace!("Protected SMILES: {protected}");
    let dsmi = smiles_to_deepsmiles(&protected)
        .context(format!("Failed to encode {protected} as DeepSMILES"))?;
    trace!("DeepSMILES: {dsmi}");
    let tokens = tokenize(&dsmi);
    trace!("Tokens: {tokens}");
    Ok(tokens)
}
