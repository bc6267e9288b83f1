//! Typed representation of one firmware-update descriptor.
//!
//! The external catalog loader hands this crate a sequence of raw key/value
//! records ([`RawRecord`], the serde view of one `Assets` entry).
//! [`Record::from_raw`] turns one of them into an immutable [`Record`] or
//! fails with [`OtaError::MalformedRecord`] when required fields are absent
//! or unusable. Everything derived — corrected build number, release type,
//! beta number, release date — is computed once here and cached on the
//! record.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::OtaError;
use crate::version::{BuildNumber, Version};

/// Sentinel for an unconditional (full-install) prerequisite.
pub(crate) const NOT_APPLICABLE: &str = "N/A";

/// A beta OTA payload has never been observed above this size; entries
/// declared `Beta` but larger than this are really public releases.
const OVERSIZED_BETA_BYTES: u64 = 550_000_000;

/// Builds the vendor mis-declared in the catalog: the entry asserts the
/// left-hand string, devices report the right-hand one. The catalog pads a
/// `4`/`5` (and sometimes a filler zero) after the train letter.
const INFLATED_BUILDS: &[(&str, &str)] = &[
    ("12F5061", "12F61"),
    ("12H4321", "12H321"),
    ("13G4034", "13G34"),
    ("14A5456", "14A456"),
    ("14C5092", "14C92"),
    ("16B5092", "16B92"),
];

/// Early deltas predate the `PrerequisiteOSVersion` key; their versions are
/// only known from the build they applied to.
const LEGACY_PREREQUISITE_VERSIONS: &[(&str, &str)] = &[("10A405", "6.0"), ("10B141", "6.1")];

/// Date token embedded in release-file URLs, e.g. `091-7689.20151214`.
static DATE_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{4}[-.]\d{7,8}").expect("valid regex"));

/// One raw `Assets` entry, as produced by the external catalog loader.
///
/// Every field is optional at this layer; [`Record::from_raw`] decides what
/// is required. Field names mirror the loader schema.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawRecord {
    #[serde(rename = "SupportedDevices")]
    pub supported_devices: Vec<String>,
    #[serde(rename = "SupportedDeviceModels")]
    pub supported_models: Vec<String>,
    #[serde(rename = "Build")]
    pub build: Option<String>,
    #[serde(rename = "OSVersion")]
    pub os_version: Option<String>,
    #[serde(rename = "MarketingVersion")]
    pub marketing_version: Option<String>,
    #[serde(rename = "PrerequisiteBuild")]
    pub prerequisite_build: Option<String>,
    #[serde(rename = "PrerequisiteOSVersion")]
    pub prerequisite_version: Option<String>,
    #[serde(rename = "ReleaseType")]
    pub release_type: Option<String>,
    #[serde(rename = "SUDocumentationID")]
    pub documentation_id: Option<String>,
    #[serde(rename = "CompatibilityVersion")]
    pub compatibility_version: Option<u32>,
    #[serde(rename = "AllowableOTA")]
    pub allowable_ota: Option<bool>,
    #[serde(rename = "Suffix")]
    pub suffix: Option<String>,
    #[serde(rename = "RealUpdateAttributes")]
    pub real_update: Option<RealUpdateAttributes>,
    #[serde(rename = "_DownloadSize")]
    pub download_size: Option<u64>,
    #[serde(rename = "__BaseURL")]
    pub base_url: Option<String>,
    #[serde(rename = "__RelativePath")]
    pub relative_path: Option<String>,
}

/// Payload location for entries that wrap the real update in a stub shell.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RealUpdateAttributes {
    #[serde(rename = "RealUpdateURL")]
    pub url: Option<String>,
    #[serde(rename = "RealUpdateDownloadSize")]
    pub download_size: Option<u64>,
}

/// How a release was classified after inspecting its declared type and
/// documentation id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseType {
    Public,
    PublicBeta,
    Beta,
    CarrierBeta,
    Internal,
}

impl ReleaseType {
    pub fn is_public(self) -> bool {
        matches!(self, ReleaseType::Public)
    }

    /// Label used by the plain report, `None` for public releases.
    pub(crate) fn plain_label(self) -> Option<&'static str> {
        match self {
            ReleaseType::Public => None,
            ReleaseType::PublicBeta => Some("Public Beta"),
            ReleaseType::Beta => Some("beta"),
            ReleaseType::CarrierBeta => Some("Carrier Beta"),
            ReleaseType::Internal => Some("Internal"),
        }
    }

    /// Label used inside wiki version cells; carrier betas collapse into
    /// plain "beta" there, `None` for public releases.
    pub(crate) fn wiki_label(self) -> Option<&'static str> {
        match self {
            ReleaseType::Public => None,
            ReleaseType::PublicBeta => Some("Public Beta"),
            ReleaseType::Beta | ReleaseType::CarrierBeta => Some("beta"),
            ReleaseType::Internal => Some("Internal"),
        }
    }
}

/// Release date as extracted from the URL's embedded token (`yyyymmdd`).
/// Not always accurate to the day, but the best the catalog offers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseDate {
    digits: String,
}

impl ReleaseDate {
    pub fn year(&self) -> &str {
        &self.digits[0..4]
    }

    pub fn month(&self) -> &str {
        &self.digits[4..6]
    }

    pub fn day(&self) -> &str {
        &self.digits[6..8]
    }
}

/// One firmware-update descriptor, immutable once constructed.
#[derive(Debug, Clone)]
pub struct Record {
    /// Original catalog position; the sort tiebreaker.
    pub position: usize,
    pub supported_devices: Vec<String>,
    pub supported_models: Vec<String>,
    /// Display version. Synthesized from the OS version when the catalog
    /// carries none (the legacy Apple TV family).
    pub marketing_version: String,
    pub os_version: String,
    /// The build string as asserted inside the record.
    pub declared_build: String,
    /// The build string to display; differs from `declared_build` for
    /// known inflated builds.
    pub actual_build: String,
    /// False iff the declared build is a known inflated one.
    pub is_honest_build: bool,
    pub prerequisite_build: String,
    pub prerequisite_version: String,
    pub release_type: ReleaseType,
    /// 0 for non-beta, 1 for a first unlabeled beta, ≥2 numbered.
    pub beta_number: u32,
    /// The literal declared type label, for display: `Public`, `Beta`,
    /// `Carrier`, or `Internal`.
    pub reported_release_type: String,
    /// Watch-companion pairing requirement; 0 when not applicable.
    pub compatibility_version: u32,
    pub url: String,
    pub size_bytes: u64,
    pub release_date: Option<ReleaseDate>,
    /// Optional disambiguating label appended to the version cell.
    pub suffix: Option<String>,
    /// False for stub placeholder entries that are not deliverable updates.
    pub allowable_ota: bool,
    pub(crate) sort_version: Version,
    pub(crate) sort_build: BuildNumber,
}

impl Record {
    /// Build a typed record from one raw catalog entry.
    pub fn from_raw(raw: &RawRecord, position: usize) -> Result<Record, OtaError> {
        let declared_build = required(raw.build.as_deref(), "Build", position)?.to_string();
        let os_version = required(raw.os_version.as_deref(), "OSVersion", position)?.to_string();

        if raw.supported_devices.is_empty() {
            return Err(malformed(position, "SupportedDevices is missing or empty"));
        }

        let (url, size_bytes) = resolve_payload(raw, position)?;

        let marketing_version = match &raw.marketing_version {
            Some(v) if v.contains('.') => v.clone(),
            Some(v) => format!("{v}.0"),
            None => os_version.clone(),
        };

        let prerequisite_build = raw
            .prerequisite_build
            .clone()
            .unwrap_or_else(|| NOT_APPLICABLE.to_string());
        let prerequisite_version = match &raw.prerequisite_version {
            Some(v) => v.clone(),
            None => legacy_prerequisite_version(&prerequisite_build),
        };

        let reported_release_type = raw
            .release_type
            .clone()
            .unwrap_or_else(|| "Public".to_string());
        let documentation_id = raw
            .documentation_id
            .clone()
            .unwrap_or_else(|| "0Seed".to_string());
        let release_type =
            classify(&reported_release_type, &documentation_id, size_bytes, position)?;
        let beta_number = beta_number(release_type, &documentation_id);

        let (actual_build, is_honest_build) = match lookup_inflated(&declared_build) {
            Some(actual) => (actual.to_string(), false),
            None => (declared_build.clone(), true),
        };

        let sort_version = Version::parse(&os_version)
            .map_err(|_| malformed(position, &format!("unparseable OSVersion '{os_version}'")))?;
        let sort_build = BuildNumber::new(&actual_build);

        Ok(Record {
            position,
            supported_devices: raw.supported_devices.clone(),
            supported_models: raw.supported_models.clone(),
            marketing_version,
            os_version,
            declared_build,
            actual_build,
            is_honest_build,
            prerequisite_build,
            prerequisite_version,
            release_type,
            beta_number,
            reported_release_type,
            compatibility_version: raw.compatibility_version.unwrap_or(0),
            release_date: extract_date(&url),
            url,
            size_bytes,
            suffix: raw.suffix.clone(),
            allowable_ota: raw.allowable_ota.unwrap_or(true),
            sort_version,
            sort_build,
        })
    }

    /// True when this update applies unconditionally (no prerequisite).
    pub fn is_full_install(&self) -> bool {
        self.prerequisite_build == NOT_APPLICABLE
    }

    /// File size with thousands separators, as both renderers print it.
    pub fn size_display(&self) -> String {
        group_thousands(self.size_bytes)
    }
}

fn required<'a>(value: Option<&'a str>, key: &str, position: usize) -> Result<&'a str, OtaError> {
    value.ok_or_else(|| malformed(position, &format!("missing required key '{key}'")))
}

fn malformed(position: usize, reason: &str) -> OtaError {
    OtaError::MalformedRecord {
        position,
        reason: reason.to_string(),
    }
}

/// Stub entries hide the deliverable payload under `RealUpdateAttributes`;
/// everything else carries the URL split across base and relative path.
fn resolve_payload(raw: &RawRecord, position: usize) -> Result<(String, u64), OtaError> {
    if let Some(real) = &raw.real_update {
        let url = real
            .url
            .clone()
            .ok_or_else(|| malformed(position, "RealUpdateAttributes without RealUpdateURL"))?;
        let size = real.download_size.ok_or_else(|| {
            malformed(position, "RealUpdateAttributes without RealUpdateDownloadSize")
        })?;
        return Ok((url, size));
    }

    let base = required(raw.base_url.as_deref(), "__BaseURL", position)?;
    let relative = required(raw.relative_path.as_deref(), "__RelativePath", position)?;
    let size = raw
        .download_size
        .ok_or_else(|| malformed(position, "missing required key '_DownloadSize'"))?;

    Ok((format!("{base}{relative}"), size))
}

fn classify(
    reported: &str,
    documentation_id: &str,
    size_bytes: u64,
    position: usize,
) -> Result<ReleaseType, OtaError> {
    match reported {
        "Public" => Ok(ReleaseType::Public),
        "Carrier" => Ok(ReleaseType::CarrierBeta),
        "Internal" => Ok(ReleaseType::Internal),
        "Beta" => Ok(classify_declared_beta(documentation_id, size_bytes)),
        other => Err(malformed(
            position,
            &format!("unknown ReleaseType '{other}'"),
        )),
    }
}

/// The `Beta` label alone is unreliable; the documentation id and payload
/// size decide what the entry really is.
fn classify_declared_beta(documentation_id: &str, size_bytes: u64) -> ReleaseType {
    if documentation_id == "PreRelease" {
        ReleaseType::Beta
    } else if size_bytes > OVERSIZED_BETA_BYTES {
        ReleaseType::Public
    } else if documentation_id.contains("Public") {
        ReleaseType::PublicBeta
    } else if documentation_id.contains("Beta") || documentation_id.contains("Seed") {
        ReleaseType::Beta
    } else {
        ReleaseType::Public
    }
}

/// Beta ordinal from the documentation id's trailing digit; 1 when the id
/// carries none (a first, unlabeled beta).
fn beta_number(release_type: ReleaseType, documentation_id: &str) -> u32 {
    if release_type.is_public() {
        return 0;
    }

    documentation_id
        .chars()
        .last()
        .and_then(|c| c.to_digit(10))
        .filter(|_| documentation_id != "PreRelease")
        .unwrap_or(1)
}

fn lookup_inflated(declared: &str) -> Option<&'static str> {
    INFLATED_BUILDS
        .iter()
        .find(|(from, _)| *from == declared)
        .map(|(_, to)| *to)
}

fn legacy_prerequisite_version(prerequisite_build: &str) -> String {
    LEGACY_PREREQUISITE_VERSIONS
        .iter()
        .find(|(build, _)| *build == prerequisite_build)
        .map(|(_, version)| version.to_string())
        .unwrap_or_else(|| NOT_APPLICABLE.to_string())
}

/// Pull the `yyyymmdd` date out of the URL's embedded token. A 7-digit
/// token spells a single-digit day, which gets zero-padded.
fn extract_date(url: &str) -> Option<ReleaseDate> {
    let token = DATE_TOKEN.find(url)?.as_str();
    let digits = &token[5..];

    let digits = if digits.len() == 7 {
        format!("{}0{}", &digits[..6], &digits[6..])
    } else {
        digits.to_string()
    };

    Some(ReleaseDate { digits })
}

pub(crate) fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);

    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }

    out
}
