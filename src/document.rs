//! Document types and the dispatch tables keyed on them.
//!
//! A document type selects two things: the extraction prompt sent to the
//! model ([`crate::prompts::extraction_prompt`]) and the verification rule
//! applied to the parsed record ([`DocumentType::verification_rule`]). Both
//! dispatches are exhaustive `match`es over this enum; any key not listed
//! here parses to [`DocumentType::Other`] and gets the generic prompt and
//! the generic rule.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of document being extracted.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DocumentType {
    Aadhar,
    AadharFront,
    AadharBack,
    Pan,
    Passport,
    PassportPhoto,
    AddressProof,
    ElectricityBill,
    Signature,
    DrivingLicense,
    Noc,
    /// Any other key (lower-cased). The empty string lands here too.
    Other(String),
}

/// Verification rule selected by a [`DocumentType`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationRule {
    /// At least half of the fields must be meaningful.
    Generic,
    /// `name`, `aadhar_number`, `address` required.
    Aadhar,
    /// `name`, `pan_number`, `dob` required; PAN format checked.
    Pan,
    /// `name`, `passport_number`, `dob`, `expiry_date` required; not expired.
    Passport,
    /// `clarity_score` ≥ 0.7, `is_passport_style` and `face_visible` true.
    PassportPhoto,
    /// `clarity_score` ≥ 0.7, `is_handwritten` and `is_complete` true.
    Signature,
}

impl DocumentType {
    /// Parse a caller-supplied key, case-insensitively.
    pub fn parse(key: &str) -> Self {
        let key = key.to_lowercase();
        match key.as_str() {
            "aadhar" => Self::Aadhar,
            "aadhar_front" => Self::AadharFront,
            "aadhar_back" => Self::AadharBack,
            "pan" => Self::Pan,
            "passport" => Self::Passport,
            "passport_photo" => Self::PassportPhoto,
            "address_proof" => Self::AddressProof,
            "electricity_bill" => Self::ElectricityBill,
            "signature" => Self::Signature,
            "driving_license" => Self::DrivingLicense,
            "noc" => Self::Noc,
            _ => Self::Other(key),
        }
    }

    /// The lower-cased key of this type.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Aadhar => "aadhar",
            Self::AadharFront => "aadhar_front",
            Self::AadharBack => "aadhar_back",
            Self::Pan => "pan",
            Self::Passport => "passport",
            Self::PassportPhoto => "passport_photo",
            Self::AddressProof => "address_proof",
            Self::ElectricityBill => "electricity_bill",
            Self::Signature => "signature",
            Self::DrivingLicense => "driving_license",
            Self::Noc => "noc",
            Self::Other(key) => key,
        }
    }

    /// Which verification rule applies to this type.
    ///
    /// Only the full Aadhar card carries name, number and address together;
    /// the single-sided `aadhar_front` / `aadhar_back` scans use the generic
    /// rule.
    pub fn verification_rule(&self) -> VerificationRule {
        match self {
            Self::Aadhar => VerificationRule::Aadhar,
            Self::Pan => VerificationRule::Pan,
            Self::Passport => VerificationRule::Passport,
            Self::PassportPhoto => VerificationRule::PassportPhoto,
            Self::Signature => VerificationRule::Signature,
            Self::AadharFront
            | Self::AadharBack
            | Self::AddressProof
            | Self::ElectricityBill
            | Self::DrivingLicense
            | Self::Noc
            | Self::Other(_) => VerificationRule::Generic,
        }
    }

    /// Key of the type-specific validity flag, e.g. `is_valid_pan`.
    pub fn validity_key(&self) -> String {
        format!("is_valid_{}", self.as_str())
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for DocumentType {
    fn from(key: &str) -> Self {
        Self::parse(key)
    }
}
