//! Typed catalog records.
//!
//! Everything here is validated once by the loader; the funnel reads these
//! values without further defensive checks.

use crate::channels::MediaRef;
use crate::catalog::normalize_text;

/// Profile prompt used when `profile.json` is missing.
pub const FALLBACK_PROFILE_PROMPT: &str = "🚨 *Para asesorarte y brindarte la INVERSIÓN del programa, por favor indícame tu perfil:*\n\n1️⃣ Soy egresado\n2️⃣ Soy bachiller\n3️⃣ Soy estudiante\n4️⃣ Soy practicante\n5️⃣ Soy independiente";

/// Normalized classification of a catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Short course (`CURSO` in the source sheet).
    #[default]
    Course,
    /// Any other program type (diplomas, specializations).
    Program,
}

impl Category {
    /// Classify a raw category cell. Only `CURSO` is a course; blank or
    /// missing cells are programs.
    pub fn from_raw(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_uppercase()) {
            Some(s) if s == "CURSO" => Self::Course,
            _ => Self::Program,
        }
    }

    pub fn is_course(self) -> bool {
        self == Self::Course
    }
}

/// Audience segment for pricing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment {
    Student,
    Standard,
}

impl Segment {
    pub fn from_is_student(is_student: bool) -> Self {
        if is_student { Self::Student } else { Self::Standard }
    }
}

/// Raw price cells for one audience segment.
///
/// Amounts stay as text; the pricing calculator parses them so a malformed
/// cell degrades to the "price unavailable" sentinel instead of failing the
/// message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SegmentPricing {
    /// Maximum-discount single payment.
    pub cash: String,
    /// Discounted price in installments.
    pub installment: String,
    /// Undiscounted list price.
    pub list: String,
    /// Amount that reserves a seat.
    pub reservation: String,
}

/// Media attached to a catalog entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryMedia {
    pub intro_video: Option<MediaRef>,
    pub image: Option<MediaRef>,
    pub brochure: Option<MediaRef>,
}

/// One program edition offered through the funnel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub program_name: String,
    pub edition: String,
    pub category: Category,
    pub personalized: Option<String>,
    pub benefits: Option<String>,
    pub schedule: Option<String>,
    pub media: EntryMedia,
    /// Responses to profile answers 1..=5, by index.
    pub profile_responses: [Option<String>; 5],
    pub student: SegmentPricing,
    pub standard: SegmentPricing,
    pub checkout_link: Option<String>,
}

impl CatalogEntry {
    /// Minimal entry, used by tests and as a builder base.
    pub fn new(program_name: impl Into<String>, edition: impl Into<String>) -> Self {
        Self {
            program_name: program_name.into(),
            edition: edition.into(),
            category: Category::Course,
            personalized: None,
            benefits: None,
            schedule: None,
            media: EntryMedia::default(),
            profile_responses: Default::default(),
            student: SegmentPricing::default(),
            standard: SegmentPricing::default(),
            checkout_link: None,
        }
    }

    /// Whether this entry is identified by `(program_name, edition)` after
    /// normalization.
    pub fn is_keyed_by(&self, program_name: &str, edition: &str) -> bool {
        normalize_text(&self.program_name) == normalize_text(program_name)
            && normalize_text(&self.edition) == normalize_text(edition)
    }

    /// Response text for a profile answer (1-based).
    pub fn profile_response(&self, answer: u8) -> Option<&str> {
        let index = usize::from(answer).checked_sub(1)?;
        self.profile_responses.get(index)?.as_deref()
    }

    pub fn pricing(&self, segment: Segment) -> &SegmentPricing {
        match segment {
            Segment::Student => &self.student,
            Segment::Standard => &self.standard,
        }
    }
}

/// Singleton text blocks.
#[derive(Debug, Clone, Default)]
pub struct TextBlocks {
    pub greeting: Option<String>,
    pub profile_prompt: Option<String>,
    pub upsell: Option<String>,
    pub call_to_action: Option<String>,
    pub promo_headline: Option<String>,
}

/// Mobile wallet payee.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
pub struct WalletDetails {
    pub number: String,
    pub holder: String,
}

/// Bank account for transfers.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
pub struct BankAccount {
    pub bank: String,
    pub account: String,
    pub cci: String,
    pub holder: String,
}

/// Payment instructions, varying by category.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
pub struct PaymentDetails {
    pub wallet: WalletDetails,
    pub course_bank: BankAccount,
    pub program_bank: BankAccount,
}

impl PaymentDetails {
    pub fn bank_for(&self, category: Category) -> &BankAccount {
        match category {
            Category::Course => &self.course_bank,
            Category::Program => &self.program_bank,
        }
    }
}

/// Fixed media used by the payment branches.
#[derive(Debug, Clone, Default)]
pub struct PaymentAssets {
    pub wallet_qr_course: Option<MediaRef>,
    pub wallet_qr_program: Option<MediaRef>,
    pub checkout_video: Option<MediaRef>,
    pub registration_image: Option<MediaRef>,
}

impl PaymentAssets {
    pub fn wallet_qr(&self, category: Category) -> Option<&MediaRef> {
        match category {
            Category::Course => self.wallet_qr_course.as_ref(),
            Category::Program => self.wallet_qr_program.as_ref(),
        }
    }
}

/// The whole read-only content catalog.
#[derive(Debug, Clone)]
pub struct ContentCatalog {
    entries: Vec<CatalogEntry>,
    pub texts: TextBlocks,
    pub payments: PaymentDetails,
    pub assets: PaymentAssets,
}

impl ContentCatalog {
    pub fn new(
        entries: Vec<CatalogEntry>,
        texts: TextBlocks,
        payments: PaymentDetails,
        assets: PaymentAssets,
    ) -> Self {
        Self {
            entries,
            texts,
            payments,
            assets,
        }
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    /// Resolve a stored `(program_name, edition)` reference.
    pub fn find(&self, program_name: &str, edition: &str) -> Option<&CatalogEntry> {
        self.entries
            .iter()
            .find(|e| e.is_keyed_by(program_name, edition))
    }

    /// Profile prompt, falling back to the built-in text.
    pub fn profile_prompt(&self) -> &str {
        self.texts
            .profile_prompt
            .as_deref()
            .unwrap_or(FALLBACK_PROFILE_PROMPT)
    }
}
