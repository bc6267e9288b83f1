//! Caller-supplied filter parameters and their validation.
//!
//! A [`Criteria`] names the device to search for plus optional model,
//! version bounds, and the beta/stub flags. Validation runs up front —
//! before any record is touched — so a bad identifier never reaches the
//! filter pipeline.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::OtaError;
use crate::version::Version;

static DEVICE_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(AppleTV|AudioAccessory|iPad|iPhone|iPod|Watch)\d{1,2},\d+$")
        .expect("valid regex")
});

static MODEL_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[BDJKMNP]\d{1,3}[A-Za-z]?AP$").expect("valid regex"));

/// Devices whose catalog entries are split by board model and need the
/// model identifier to disambiguate.
static MODEL_REQUIRED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(iPad6,(11|12)|iPhone8,(1|2|4))$").expect("valid regex"));

/// The 32-bit Apple TV boards; their entries carry no marketing version.
static LEGACY_TV: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^AppleTV(2,1|3,1|3,2)$").expect("valid regex"));

/// Device family, derived from the identifier's leading token. Drives the
/// OS-name prefix, the watch-only table columns, and the watch-scoped
/// span exceptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceFamily {
    /// 32-bit Apple TV boards (Apple TV software, no marketing version)
    LegacyAppleTv,
    AppleTv,
    AudioAccessory,
    Watch,
    /// iPhone, iPad, and iPod touch
    Ios,
}

impl DeviceFamily {
    pub fn of(device: &str) -> DeviceFamily {
        if LEGACY_TV.is_match(device) {
            DeviceFamily::LegacyAppleTv
        } else if device.starts_with("AppleTV") {
            DeviceFamily::AppleTv
        } else if device.starts_with("AudioAccessory") {
            DeviceFamily::AudioAccessory
        } else if device.starts_with("Watch") {
            DeviceFamily::Watch
        } else {
            DeviceFamily::Ios
        }
    }

    /// OS-name prefix used by the plain report.
    pub fn os_name(self) -> &'static str {
        match self {
            DeviceFamily::LegacyAppleTv => "Apple TV software",
            DeviceFamily::AppleTv => "tvOS",
            DeviceFamily::AudioAccessory => "audioOS",
            DeviceFamily::Watch => "watchOS",
            DeviceFamily::Ios => "iOS",
        }
    }
}

/// Filter parameters for one catalog run.
#[derive(Debug, Clone)]
pub struct Criteria {
    pub device: String,
    pub model: Option<String>,
    pub minimum: Option<Version>,
    pub maximum: Option<Version>,
    pub include_beta: bool,
    pub remove_stubs: bool,
}

impl Criteria {
    pub fn new(device: impl Into<String>) -> Self {
        Criteria {
            device: device.into(),
            model: None,
            minimum: None,
            maximum: None,
            include_beta: false,
            remove_stubs: false,
        }
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn minimum(mut self, minimum: Version) -> Self {
        self.minimum = Some(minimum);
        self
    }

    pub fn maximum(mut self, maximum: Version) -> Self {
        self.maximum = Some(maximum);
        self
    }

    pub fn include_beta(mut self, include_beta: bool) -> Self {
        self.include_beta = include_beta;
        self
    }

    pub fn remove_stubs(mut self, remove_stubs: bool) -> Self {
        self.remove_stubs = remove_stubs;
        self
    }

    /// Check the identifiers before the pipeline runs.
    ///
    /// Fails with [`OtaError::InvalidDevice`] for a bad device identifier,
    /// and [`OtaError::MissingModel`]/[`OtaError::InvalidModel`] when the
    /// device needs a model and none (or a malformed one) was given.
    pub fn validate(&self) -> Result<(), OtaError> {
        if !DEVICE_ID.is_match(&self.device) {
            return Err(OtaError::InvalidDevice(self.device.clone()));
        }

        if self.requires_model() {
            match &self.model {
                None => {
                    return Err(OtaError::MissingModel {
                        device: self.device.clone(),
                    })
                }
                Some(model) if !MODEL_ID.is_match(model) => {
                    return Err(OtaError::InvalidModel(model.clone()));
                }
                Some(_) => {}
            }
        }

        Ok(())
    }

    /// Whether this device's entries must be disambiguated by board model.
    pub fn requires_model(&self) -> bool {
        MODEL_REQUIRED.is_match(&self.device)
    }

    pub fn device_family(&self) -> DeviceFamily {
        DeviceFamily::of(&self.device)
    }

    pub(crate) fn is_watch(&self) -> bool {
        self.device_family() == DeviceFamily::Watch
    }

    pub(crate) fn is_legacy_tv(&self) -> bool {
        self.device_family() == DeviceFamily::LegacyAppleTv
    }
}
