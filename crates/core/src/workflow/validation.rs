use serde::{Deserialize, Serialize};

/// Wording that compliance review disallows in offer copy.
const RESTRICTED_TERMS: [&str; 5] =
    ["guaranteed", "risk-free", "risk free", "free money", "no strings attached"];

/// Ceiling on any single dollar figure mentioned in the offer objective.
const BUDGET_CAP_DOLLARS: u64 = 100_000;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationRule {
    BrandGuidelines,
    BudgetLimits,
}

impl ValidationRule {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BrandGuidelines => "brand_guidelines",
            Self::BudgetLimits => "budget_limits",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    Passed,
    Warning,
    Failed,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationCheck {
    #[serde(rename = "check")]
    pub rule: ValidationRule,
    pub status: CheckStatus,
    pub message: String,
}

/// Runs every compliance rule against the offer objective text and returns
/// one result per rule, pass or fail.
pub fn run_checks(objective: &str) -> Vec<ValidationCheck> {
    vec![check_brand_guidelines(objective), check_budget_limits(objective)]
}

fn check_brand_guidelines(objective: &str) -> ValidationCheck {
    let lowered = objective.to_lowercase();
    let hit = RESTRICTED_TERMS.iter().find(|term| lowered.contains(*term));
    match hit {
        Some(term) => ValidationCheck {
            rule: ValidationRule::BrandGuidelines,
            status: CheckStatus::Failed,
            message: format!("offer copy uses restricted wording: \"{term}\""),
        },
        None => ValidationCheck {
            rule: ValidationRule::BrandGuidelines,
            status: CheckStatus::Passed,
            message: "offer copy complies with brand guidelines".to_string(),
        },
    }
}

fn check_budget_limits(objective: &str) -> ValidationCheck {
    match largest_dollar_figure(objective) {
        Some(amount) if amount > BUDGET_CAP_DOLLARS => ValidationCheck {
            rule: ValidationRule::BudgetLimits,
            status: CheckStatus::Failed,
            message: format!(
                "budget of ${amount} exceeds the ${BUDGET_CAP_DOLLARS} program cap"
            ),
        },
        _ => ValidationCheck {
            rule: ValidationRule::BudgetLimits,
            status: CheckStatus::Passed,
            message: "budget is within program limits".to_string(),
        },
    }
}

/// Finds the largest `$N` figure in the text. Commas and a decimal part are
/// tolerated; fractional cents are truncated. A figure too large for `u64`
/// saturates rather than vanishing, so it still trips the cap.
fn largest_dollar_figure(text: &str) -> Option<u64> {
    let mut best = None;
    let mut rest = text;
    while let Some(pos) = rest.find('$') {
        rest = &rest[pos + 1..];
        let digits: String = rest
            .chars()
            .take_while(|c| c.is_ascii_digit() || *c == ',' || *c == '.')
            .filter(|c| c.is_ascii_digit() || *c == '.')
            .collect();
        let whole = digits.split('.').next().unwrap_or("");
        if whole.is_empty() {
            continue;
        }
        let amount = whole.parse::<u64>().unwrap_or(u64::MAX);
        best = Some(best.map_or(amount, |current: u64| current.max(amount)));
    }
    best
}
