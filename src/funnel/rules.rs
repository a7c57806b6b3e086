//! Reply classification rules, evaluated on normalized text.
//!
//! | Stage                      | Rule (in order)                         | Result        |
//! |----------------------------|-----------------------------------------|---------------|
//! | any                        | contains a start keyword                | start funnel  |
//! | AwaitingProfile            | exactly `1`..`5`                        | profile 1..5  |
//! | AwaitingDecision           | exactly `1` or `2`                      | enroll        |
//! | AwaitingDecision           | exactly `3` or `4`                      | advisor       |
//! | AwaitingPaymentMethod      | contains `1` or `yape`                  | wallet        |
//! | AwaitingPaymentMethod      | contains `2`, `bcp`, `deposito`, `transferencia` | bank |
//! | AwaitingPaymentMethod      | contains `3` or `web`                   | web checkout  |
//! | AwaitingWebPaymentDecision | exactly `1`                             | paid          |
//! | AwaitingWebPaymentDecision | exactly `2`                             | needs help    |
//!
//! Payment rules are checked top to bottom; the first match wins.

/// Phrases that start (or restart) the funnel.
const START_KEYWORDS: &[&str] = &[
    "hola, estoy en",
    "info",
    "informacion",
    "facilitar",
    "quiero",
    "quisiera",
];

/// Whether normalized text asks to start the funnel.
pub fn is_start_trigger(text: &str) -> bool {
    START_KEYWORDS.iter().any(|k| text.contains(k))
}

/// Answer to the profile question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProfileAnswer(u8);

impl ProfileAnswer {
    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "1" => Some(Self(1)),
            "2" => Some(Self(2)),
            "3" => Some(Self(3)),
            "4" => Some(Self(4)),
            "5" => Some(Self(5)),
            _ => None,
        }
    }

    pub fn number(self) -> u8 {
        self.0
    }

    /// Answers 3 and 4 (student, intern) get student pricing.
    pub fn is_student(self) -> bool {
        matches!(self.0, 3 | 4)
    }
}

/// Choice after the investment message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Enroll,
    TalkToAdvisor,
}

impl Decision {
    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "1" | "2" => Some(Self::Enroll),
            "3" | "4" => Some(Self::TalkToAdvisor),
            _ => None,
        }
    }
}

/// Payment method picked by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentMethod {
    Wallet,
    BankTransfer,
    WebCheckout,
}

/// One row of the payment rule table.
struct PaymentRule {
    tokens: &'static [&'static str],
    method: PaymentMethod,
}

const PAYMENT_RULES: &[PaymentRule] = &[
    PaymentRule {
        tokens: &["1", "yape"],
        method: PaymentMethod::Wallet,
    },
    PaymentRule {
        tokens: &["2", "bcp", "deposito", "transferencia"],
        method: PaymentMethod::BankTransfer,
    },
    PaymentRule {
        tokens: &["3", "web"],
        method: PaymentMethod::WebCheckout,
    },
];

impl PaymentMethod {
    pub fn parse(text: &str) -> Option<Self> {
        PAYMENT_RULES
            .iter()
            .find(|rule| rule.tokens.iter().any(|t| text.contains(t)))
            .map(|rule| rule.method)
    }
}

/// Answer to "did the web payment go through?".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebPaymentOutcome {
    Completed,
    NeedsHelp,
}

impl WebPaymentOutcome {
    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "1" => Some(Self::Completed),
            "2" => Some(Self::NeedsHelp),
            _ => None,
        }
    }
}
