//! Loads the content catalog from JSON files once at startup.
//!
//! `programs.json` keeps the column names of the spreadsheet it is exported
//! from; rows are validated here into typed [`CatalogEntry`] values.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde::de::DeserializeOwned;
use tokio::fs;

use crate::catalog::model::{
    CatalogEntry, Category, ContentCatalog, EntryMedia, PaymentAssets, PaymentDetails,
    SegmentPricing, TextBlocks,
};
use crate::channels::MediaRef;
use crate::error::CatalogError;

/// Well-known catalog file names.
pub mod files {
    pub const PROGRAMS: &str = "programs.json";
    pub const PAYMENTS: &str = "payments.json";
    pub const GREETING: &str = "greetings.json";
    pub const PROFILE: &str = "profile.json";
    pub const UPSELL: &str = "plus.json";
    pub const CALL_TO_ACTION: &str = "cta.json";
    pub const PROMO: &str = "promo.json";
}

/// Fixed media paths, relative to the media root.
pub mod assets {
    pub const WALLET_QR_COURSE: &str = "pago/yapecursos.jpeg";
    pub const WALLET_QR_PROGRAM: &str = "pago/yapeprog.jpeg";
    pub const CHECKOUT_VIDEO: &str = "videos/WEB.mp4";
    pub const REGISTRATION_IMAGE: &str = "pago/webins.jpg";
}

/// One spreadsheet row as exported.
#[derive(Debug, Deserialize)]
struct RawProgram {
    #[serde(rename = "PROGRAMA")]
    program: Option<String>,
    #[serde(rename = "EDICION")]
    edition: Option<serde_json::Value>,
    #[serde(rename = "CATEGORIA")]
    category: Option<String>,
    #[serde(rename = "PERSONALIZADO")]
    personalized: Option<String>,
    #[serde(rename = "BENEFICIOS")]
    benefits: Option<String>,
    #[serde(rename = "HORARIOS")]
    schedule: Option<String>,
    #[serde(rename = "VIDEO")]
    video: Option<String>,
    #[serde(rename = "POSTDOCEN")]
    image: Option<String>,
    #[serde(rename = "BROCHURE")]
    brochure: Option<String>,
    #[serde(rename = "RES1")]
    res1: Option<String>,
    #[serde(rename = "RES2")]
    res2: Option<String>,
    #[serde(rename = "RES3")]
    res3: Option<String>,
    #[serde(rename = "RES4")]
    res4: Option<String>,
    #[serde(rename = "RES5")]
    res5: Option<String>,
    #[serde(rename = "EXEST")]
    student_cash: Option<serde_json::Value>,
    #[serde(rename = "INV EST")]
    student_installment: Option<serde_json::Value>,
    #[serde(rename = "INV EST T")]
    student_list: Option<serde_json::Value>,
    #[serde(rename = "RESEST")]
    student_reservation: Option<serde_json::Value>,
    #[serde(rename = "EXPRO")]
    standard_cash: Option<serde_json::Value>,
    #[serde(rename = "INV PRO")]
    standard_installment: Option<serde_json::Value>,
    #[serde(rename = "INV PRO T")]
    standard_list: Option<serde_json::Value>,
    #[serde(rename = "RESPRO")]
    standard_reservation: Option<serde_json::Value>,
    #[serde(rename = "ENLACE")]
    link: Option<String>,
}

/// `{"texto": "..."}` singleton file.
#[derive(Debug, Deserialize)]
struct TextFile {
    texto: Option<String>,
}

/// Load the whole catalog from `catalog_dir`, resolving media under `media_dir`.
pub async fn load_catalog(catalog_dir: &Path, media_dir: &Path) -> Result<ContentCatalog, CatalogError> {
    let raw_programs: Vec<RawProgram> = read_json(&catalog_dir.join(files::PROGRAMS)).await?;
    let payments: PaymentDetails = read_json(&catalog_dir.join(files::PAYMENTS)).await?;

    let media = MediaRoot::new(media_dir);
    let mut entries = Vec::with_capacity(raw_programs.len());
    for (index, raw) in raw_programs.into_iter().enumerate() {
        match validate_program(index, raw, &media).await {
            Ok(entry) => entries.push(entry),
            Err(e) => tracing::warn!(index, error = %e, "Skipping invalid program row"),
        }
    }

    let texts = TextBlocks {
        greeting: read_text_block(catalog_dir, files::GREETING).await,
        profile_prompt: read_text_block(catalog_dir, files::PROFILE).await,
        upsell: read_text_block(catalog_dir, files::UPSELL).await,
        call_to_action: read_text_block(catalog_dir, files::CALL_TO_ACTION).await,
        promo_headline: read_text_block(catalog_dir, files::PROMO).await,
    };

    let assets = PaymentAssets {
        wallet_qr_course: media.resolve(Some(assets::WALLET_QR_COURSE)).await,
        wallet_qr_program: media.resolve(Some(assets::WALLET_QR_PROGRAM)).await,
        checkout_video: media.resolve(Some(assets::CHECKOUT_VIDEO)).await,
        registration_image: media.resolve(Some(assets::REGISTRATION_IMAGE)).await,
    };

    tracing::info!(
        programs = entries.len(),
        media_root = %media_dir.display(),
        "Catalog loaded"
    );

    Ok(ContentCatalog::new(entries, texts, payments, assets))
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, CatalogError> {
    let raw = fs::read_to_string(path)
        .await
        .map_err(|source| CatalogError::Read {
            path: path.to_path_buf(),
            source,
        })?;
    serde_json::from_str(&raw).map_err(|source| CatalogError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Optional text block. Missing or malformed files yield `None`.
async fn read_text_block(dir: &Path, file: &str) -> Option<String> {
    match read_json::<TextFile>(&dir.join(file)).await {
        Ok(block) => non_blank(block.texto),
        Err(CatalogError::Read { .. }) => {
            tracing::info!(file, "Text block not found, skipping");
            None
        }
        Err(e) => {
            tracing::warn!(file, error = %e, "Ignoring malformed text block");
            None
        }
    }
}

async fn validate_program(
    index: usize,
    raw: RawProgram,
    media: &MediaRoot,
) -> Result<CatalogEntry, CatalogError> {
    let program_name = non_blank(raw.program).ok_or_else(|| CatalogError::InvalidEntry {
        index,
        reason: "blank PROGRAMA".into(),
    })?;
    let edition = raw.edition.as_ref().map(cell_to_string).unwrap_or_default();

    let student = SegmentPricing {
        cash: price_cell(raw.student_cash.as_ref()),
        installment: price_cell(raw.student_installment.as_ref()),
        list: price_cell(raw.student_list.as_ref()),
        reservation: price_cell(raw.student_reservation.as_ref()),
    };
    let standard = SegmentPricing {
        cash: price_cell(raw.standard_cash.as_ref()),
        installment: price_cell(raw.standard_installment.as_ref()),
        list: price_cell(raw.standard_list.as_ref()),
        reservation: price_cell(raw.standard_reservation.as_ref()),
    };

    Ok(CatalogEntry {
        category: Category::from_raw(raw.category.as_deref()),
        personalized: non_blank(raw.personalized),
        benefits: non_blank(raw.benefits),
        schedule: non_blank(raw.schedule),
        media: EntryMedia {
            intro_video: media.resolve(raw.video.as_deref()).await,
            image: media.resolve(raw.image.as_deref()).await,
            brochure: media.resolve(raw.brochure.as_deref()).await,
        },
        profile_responses: [
            non_blank(raw.res1),
            non_blank(raw.res2),
            non_blank(raw.res3),
            non_blank(raw.res4),
            non_blank(raw.res5),
        ],
        student,
        standard,
        checkout_link: non_blank(raw.link),
        program_name,
        edition,
    })
}

/// Resolves media keys to existing files under a root directory.
struct MediaRoot {
    root: PathBuf,
}

impl MediaRoot {
    fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    /// `None` for blank keys or files that do not exist.
    async fn resolve(&self, key: Option<&str>) -> Option<MediaRef> {
        let key = key.map(str::trim).filter(|k| !k.is_empty())?;
        let path = self.root.join(key);
        if fs::try_exists(&path).await.unwrap_or(false) {
            Some(MediaRef::new(path))
        } else {
            tracing::warn!(media = %path.display(), "Media file missing, dropping reference");
            None
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

fn cell_to_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.trim().to_string(),
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn price_cell(value: Option<&serde_json::Value>) -> String {
    value.map(cell_to_string).unwrap_or_default()
}
