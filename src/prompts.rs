//! Prompts for VLM-based document field extraction.
//!
//! Every template asks for a single flat JSON object whose keys match what
//! [`crate::pipeline::verify`] checks for that document type. Unreadable
//! fields are reported as [`crate::output::NOT_EXTRACTED`] so the generic
//! rule can tell them apart from real values.
//!
//! Callers can override the system instruction via
//! [`crate::config::ExtractionConfig::system_prompt`]; the templates
//! themselves are fixed.

use crate::document::DocumentType;

/// Default system instruction for every extraction request.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a precise document data extraction assistant.";

const OUTPUT_RULES: &str = r#"
Rules:
- Respond with ONE JSON object and nothing else.
- Use "Not Extracted" for any field you cannot read.
- Write dates as DD/MM/YYYY.
- Use true/false for yes/no fields."#;

const AADHAR_PROMPT: &str = r#"Extract the following fields from this Aadhaar card image:
- name: full name of the card holder
- aadhar_number: the 12-digit Aadhaar number as printed
- dob: date of birth
- gender: gender as printed
- address: full address
- is_masked: true if the first 8 digits of the number are masked
- valid: true if this looks like a genuine, legible Aadhaar card"#;

const PAN_PROMPT: &str = r#"Extract the following fields from this PAN card image:
- name: card holder's name
- father_name: father's name
- pan_number: 10-character PAN (5 letters, 4 digits, 1 letter), upper case
- dob: date of birth
- valid: true if this looks like a genuine, legible PAN card"#;

const PASSPORT_PROMPT: &str = r#"Extract the following fields from this passport data page:
- name: given names and surname
- passport_number: passport number
- nationality: nationality
- dob: date of birth
- place_of_birth: place of birth
- issue_date: date of issue
- expiry_date: date of expiry
- valid: true if this looks like a genuine, legible passport page"#;

const PASSPORT_PHOTO_PROMPT: &str = r#"Assess this passport-size photograph and report:
- clarity_score: number between 0.0 and 1.0 for sharpness and lighting
- is_passport_style: true if plain background, frontal pose, head and shoulders
- face_visible: true if the full face is clearly visible and unobstructed
- valid: true if the photo is acceptable for an identity application"#;

const ADDRESS_PROOF_PROMPT: &str = r#"Extract the following fields from this address proof document:
- document_kind: what kind of document this is
- name: name of the person the document is issued to
- address: full address
- issue_date: date of issue or statement date
- issuer: issuing organisation
- valid: true if the document clearly proves the address"#;

const BILL_PROMPT: &str = r#"Extract the following fields from this electricity bill:
- consumer_name: name of the consumer
- consumer_number: consumer or account number
- address: service address
- bill_date: bill date
- due_date: due date
- amount_due: amount payable
- provider: electricity provider
- valid: true if this is a legible electricity bill"#;

const SIGNATURE_PROMPT: &str = r#"Assess this signature image and report:
- clarity_score: number between 0.0 and 1.0 for legibility of the strokes
- is_handwritten: true if the signature is handwritten, not typed or printed
- is_complete: true if the whole signature is within the image
- valid: true if the signature is usable for verification"#;

const DRIVING_LICENSE_PROMPT: &str = r#"Extract the following fields from this driving licence:
- name: licence holder's name
- license_number: licence number
- dob: date of birth
- address: address
- issue_date: date of issue
- expiry_date: validity end date
- vehicle_classes: authorised vehicle classes
- valid: true if this looks like a genuine, legible driving licence"#;

const NOC_PROMPT: &str = r#"Extract the following fields from this No Objection Certificate:
- issued_by: person or organisation issuing the NOC
- issued_to: person or organisation the NOC is addressed to
- purpose: purpose of the NOC
- issue_date: date of issue
- has_signature: true if the document is signed
- has_stamp: true if the document carries a seal or stamp
- valid: true if this is a complete, signed NOC"#;

const GENERIC_PROMPT: &str = r#"Extract every identifiable field from this document image as key/value pairs.
Use short snake_case keys (for example name, document_number, date, address).
Include:
- document_kind: what kind of document this is
- valid_document: true if the document is legible and appears genuine"#;

/// Extraction instruction for a document type, with the shared output rules
/// appended. Unlisted types get the generic template.
pub fn extraction_prompt(document_type: &DocumentType) -> String {
    let template = match document_type {
        DocumentType::Aadhar | DocumentType::AadharFront | DocumentType::AadharBack => {
            AADHAR_PROMPT
        }
        DocumentType::Pan => PAN_PROMPT,
        DocumentType::Passport => PASSPORT_PROMPT,
        DocumentType::PassportPhoto => PASSPORT_PHOTO_PROMPT,
        DocumentType::AddressProof => ADDRESS_PROOF_PROMPT,
        DocumentType::ElectricityBill => BILL_PROMPT,
        DocumentType::Signature => SIGNATURE_PROMPT,
        DocumentType::DrivingLicense => DRIVING_LICENSE_PROMPT,
        DocumentType::Noc => NOC_PROMPT,
        DocumentType::Other(_) => GENERIC_PROMPT,
    };
    format!("{template}\n{OUTPUT_RULES}")
}
