//! Keyword routing between advisor personas.

use std::fmt;

const INSURANCE_TERMS: &[&str] = &[
    "insurance",
    "insure",
    "policy",
    "premium",
    "coverage",
    "beneficiary",
    "term life",
    "whole life",
    "universal life",
    "death benefit",
    "underwriting",
    "rider",
];

const RETIREMENT_TERMS: &[&str] = &[
    "retire",
    "retirement",
    "pension",
    "401k",
    "401(k)",
    "ira",
    "roth",
    "annuity",
    "annuities",
    "social security",
    "nest egg",
    "withdrawal",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Persona {
    #[default]
    General,
    InsuranceAdvisor,
    RetirementPlanner,
}

impl Persona {
    /// Extra system instruction for the persona; empty for `General`.
    pub fn instruction(self) -> &'static str {
        match self {
            Self::General => "",
            Self::InsuranceAdvisor => {
                "Act as an insurance advisor: choose the best life insurance plan from the \
                 knowledge base and compare coverage, premiums and riders."
            }
            Self::RetirementPlanner => {
                "Act as a retirement planner: give tailored retirement advice from the \
                 knowledge base, favouring tax-advantaged, low-risk options."
            }
        }
    }
}

impl fmt::Display for Persona {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::General => "general",
            Self::InsuranceAdvisor => "insurance advisor",
            Self::RetirementPlanner => "retirement planner",
        };
        f.write_str(name)
    }
}

fn score(text: &str, tokens: &[&str], terms: &[&str]) -> usize {
    terms
        .iter()
        .filter(|term| {
            if term.contains(' ') || term.contains('(') {
                text.contains(*term)
            } else {
                tokens.iter().any(|t| t == *term)
            }
        })
        .count()
}

/// Pick a persona from keyword hits. Ties and no hits fall back to `General`.
pub fn route(query: &str) -> Persona {
    let text = query.to_lowercase();
    let tokens: Vec<&str> = text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .collect();
    let insurance = score(&text, &tokens, INSURANCE_TERMS);
    let retirement = score(&text, &tokens, RETIREMENT_TERMS);
    match insurance.cmp(&retirement) {
        std::cmp::Ordering::Greater => Persona::InsuranceAdvisor,
        std::cmp::Ordering::Less => Persona::RetirementPlanner,
        std::cmp::Ordering::Equal => Persona::General,
    }
}
