use crate::utils::error::{DirectoryError, Result};
use crate::utils::timestamp::Timestamp;
use crate::utils::validation::{normalize_optional, validate_non_empty_string, Validate};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Storage key of the persisted collection.
pub const STORAGE_KEY: &str = "medical-contacts-licenses";

pub const ROLE_SUGGESTIONS: [&str; 9] = [
    "Médecin radiologue",
    "Manipulateur radio",
    "Secrétaire médicale",
    "Directeur",
    "Infirmier(ère)",
    "Technicien",
    "Responsable administratif",
    "Médecin généraliste",
    "Coordinateur",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LicenseType {
    #[serde(rename = "imagerie")]
    ImagingCenter,
    #[serde(rename = "maison_sante")]
    HealthClinic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LicenseMode {
    #[default]
    Full,
    Light,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Connector {
    Xplore,
    Gxd5,
    Venus,
    Onemanager,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LicenseOption {
    Allodoct,
    CourrierPostal,
    DiffusionCr,
    Scanner,
    DemandesRdv,
}

impl LicenseType {
    pub const ALL: [LicenseType; 2] = [LicenseType::ImagingCenter, LicenseType::HealthClinic];

    pub fn as_str(&self) -> &'static str {
        match self {
            LicenseType::ImagingCenter => "imagerie",
            LicenseType::HealthClinic => "maison_sante",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            LicenseType::ImagingCenter => "Centre d'imagerie médicale",
            LicenseType::HealthClinic => "Maison de santé",
        }
    }
}

impl LicenseMode {
    pub const ALL: [LicenseMode; 2] = [LicenseMode::Full, LicenseMode::Light];

    pub fn as_str(&self) -> &'static str {
        match self {
            LicenseMode::Full => "full",
            LicenseMode::Light => "light",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            LicenseMode::Full => "Full",
            LicenseMode::Light => "Light",
        }
    }
}

impl Connector {
    pub const ALL: [Connector; 4] = [
        Connector::Xplore,
        Connector::Gxd5,
        Connector::Venus,
        Connector::Onemanager,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Connector::Xplore => "xplore",
            Connector::Gxd5 => "gxd5",
            Connector::Venus => "venus",
            Connector::Onemanager => "onemanager",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Connector::Xplore => "Xplore",
            Connector::Gxd5 => "GxD5",
            Connector::Venus => "Venus",
            Connector::Onemanager => "Onemanager",
        }
    }
}

impl LicenseOption {
    pub const ALL: [LicenseOption; 5] = [
        LicenseOption::Allodoct,
        LicenseOption::CourrierPostal,
        LicenseOption::DiffusionCr,
        LicenseOption::Scanner,
        LicenseOption::DemandesRdv,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LicenseOption::Allodoct => "allodoct",
            LicenseOption::CourrierPostal => "courrier_postal",
            LicenseOption::DiffusionCr => "diffusion_cr",
            LicenseOption::Scanner => "scanner",
            LicenseOption::DemandesRdv => "demandes_rdv",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            LicenseOption::Allodoct => "Allodoct",
            LicenseOption::CourrierPostal => "Courrier postal",
            LicenseOption::DiffusionCr => "Diffusion des comptes rendus",
            LicenseOption::Scanner => "Scanner",
            LicenseOption::DemandesRdv => "Demandes de rendez-vous",
        }
    }
}

macro_rules! wire_enum_text {
    ($ty:ty, $field:literal) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = DirectoryError;

            fn from_str(s: &str) -> Result<Self> {
                let needle = s.trim().to_lowercase();
                Self::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str() == needle)
                    .ok_or_else(|| {
                        let valid: Vec<&str> = Self::ALL.iter().map(|v| v.as_str()).collect();
                        DirectoryError::validation(
                            $field,
                            format!("unknown value '{}', expected one of: {}", s, valid.join(", ")),
                        )
                    })
            }
        }
    };
}

wire_enum_text!(LicenseType, "type");
wire_enum_text!(LicenseMode, "mode");
wire_enum_text!(Connector, "connector");
wire_enum_text!(LicenseOption, "options");

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_fixed: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_mobile: Option<String>,
    /// 不認得的欄位原樣保留
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Contact {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct License {
    pub id: String,
    pub license_number: String,
    pub name: String,
    #[serde(rename = "type")]
    pub license_type: LicenseType,
    pub mode: LicenseMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default)]
    pub connector: Option<Connector>,
    #[serde(default)]
    pub options: Vec<LicenseOption>,
    #[serde(default)]
    pub is_fit_center: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default)]
    pub contacts: Vec<Contact>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl License {
    pub fn contact(&self, contact_id: &str) -> Option<&Contact> {
        self.contacts.iter().find(|c| c.id == contact_id)
    }

    pub fn has_option(&self, option: LicenseOption) -> bool {
        self.options.contains(&option)
    }
}

/// 新增 License 時使用者提供的欄位
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLicense {
    pub license_number: String,
    pub name: String,
    pub license_type: LicenseType,
    pub mode: LicenseMode,
    pub address: Option<String>,
    pub connector: Option<Connector>,
    pub options: Vec<LicenseOption>,
    pub is_fit_center: bool,
    pub notes: Option<String>,
}

impl NewLicense {
    pub fn new(license_number: &str, name: &str, license_type: LicenseType) -> Self {
        Self {
            license_number: license_number.to_string(),
            name: name.to_string(),
            license_type,
            mode: LicenseMode::Full,
            address: None,
            connector: None,
            options: Vec::new(),
            is_fit_center: false,
            notes: None,
        }
    }

    pub fn normalized(self) -> Self {
        Self {
            license_number: self.license_number.trim().to_string(),
            name: self.name.trim().to_string(),
            address: normalize_optional(self.address),
            notes: normalize_optional(self.notes),
            options: dedup_options(self.options),
            ..self
        }
    }
}

impl Validate for NewLicense {
    fn validate(&self) -> Result<()> {
        validate_non_empty_string("licenseNumber", &self.license_number)?;
        validate_non_empty_string("name", &self.name)?;
        Ok(())
    }
}

/// 只包含要修改的欄位；`Some(None)` 表示清除可選欄位
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LicensePatch {
    pub license_number: Option<String>,
    pub name: Option<String>,
    pub license_type: Option<LicenseType>,
    pub mode: Option<LicenseMode>,
    pub address: Option<Option<String>>,
    pub connector: Option<Option<Connector>>,
    pub options: Option<Vec<LicenseOption>>,
    pub is_fit_center: Option<bool>,
    pub notes: Option<Option<String>>,
}

impl LicensePatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn normalized(self) -> Self {
        Self {
            license_number: self.license_number.map(|v| v.trim().to_string()),
            name: self.name.map(|v| v.trim().to_string()),
            address: self.address.map(normalize_optional),
            notes: self.notes.map(normalize_optional),
            options: self.options.map(dedup_options),
            ..self
        }
    }

    /// 套用到既有 License，回傳新的副本；id、contacts、createdAt 不變
    pub fn apply(&self, license: &License, now: DateTime<Utc>) -> License {
        let mut next = license.clone();
        if let Some(v) = &self.license_number {
            next.license_number = v.clone();
        }
        if let Some(v) = &self.name {
            next.name = v.clone();
        }
        if let Some(v) = self.license_type {
            next.license_type = v;
        }
        if let Some(v) = self.mode {
            next.mode = v;
        }
        if let Some(v) = &self.address {
            next.address = v.clone();
        }
        if let Some(v) = self.connector {
            next.connector = v;
        }
        if let Some(v) = &self.options {
            next.options = v.clone();
        }
        if let Some(v) = self.is_fit_center {
            next.is_fit_center = v;
        }
        if let Some(v) = &self.notes {
            next.notes = v.clone();
        }
        next.updated_at = now.into();
        next
    }
}

impl Validate for LicensePatch {
    fn validate(&self) -> Result<()> {
        if let Some(v) = &self.license_number {
            validate_non_empty_string("licenseNumber", v)?;
        }
        if let Some(v) = &self.name {
            validate_non_empty_string("name", v)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewContact {
    pub first_name: String,
    pub last_name: String,
    pub role: String,
    pub phone_fixed: Option<String>,
    pub phone_mobile: Option<String>,
}

impl NewContact {
    pub fn new(first_name: &str, last_name: &str, role: &str) -> Self {
        Self {
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            role: role.to_string(),
            phone_fixed: None,
            phone_mobile: None,
        }
    }

    pub fn normalized(self) -> Self {
        Self {
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            role: self.role.trim().to_string(),
            phone_fixed: normalize_optional(self.phone_fixed),
            phone_mobile: normalize_optional(self.phone_mobile),
        }
    }

    pub fn into_contact(self, id: String) -> Contact {
        Contact {
            id,
            first_name: self.first_name,
            last_name: self.last_name,
            role: self.role,
            phone_fixed: self.phone_fixed,
            phone_mobile: self.phone_mobile,
            extra: Map::new(),
        }
    }
}

impl Validate for NewContact {
    fn validate(&self) -> Result<()> {
        validate_non_empty_string("firstName", &self.first_name)?;
        validate_non_empty_string("lastName", &self.last_name)?;
        validate_non_empty_string("role", &self.role)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactPatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: Option<String>,
    pub phone_fixed: Option<Option<String>>,
    pub phone_mobile: Option<Option<String>>,
}

impl ContactPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn normalized(self) -> Self {
        Self {
            first_name: self.first_name.map(|v| v.trim().to_string()),
            last_name: self.last_name.map(|v| v.trim().to_string()),
            role: self.role.map(|v| v.trim().to_string()),
            phone_fixed: self.phone_fixed.map(normalize_optional),
            phone_mobile: self.phone_mobile.map(normalize_optional),
        }
    }

    pub fn apply(&self, contact: &Contact) -> Contact {
        let mut next = contact.clone();
        if let Some(v) = &self.first_name {
            next.first_name = v.clone();
        }
        if let Some(v) = &self.last_name {
            next.last_name = v.clone();
        }
        if let Some(v) = &self.role {
            next.role = v.clone();
        }
        if let Some(v) = &self.phone_fixed {
            next.phone_fixed = v.clone();
        }
        if let Some(v) = &self.phone_mobile {
            next.phone_mobile = v.clone();
        }
        next
    }
}

impl Validate for ContactPatch {
    fn validate(&self) -> Result<()> {
        if let Some(v) = &self.first_name {
            validate_non_empty_string("firstName", v)?;
        }
        if let Some(v) = &self.last_name {
            validate_non_empty_string("lastName", v)?;
        }
        if let Some(v) = &self.role {
            validate_non_empty_string("role", v)?;
        }
        Ok(())
    }
}

fn dedup_options(options: Vec<LicenseOption>) -> Vec<LicenseOption> {
    let mut seen = Vec::with_capacity(options.len());
    for option in options {
        if !seen.contains(&option) {
            seen.push(option);
        }
    }
    seen
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_license() -> License {
        let ts = Utc.with_ymd_and_hms(2024, 1, 15, 8, 0, 0).unwrap();
        License {
            id: "lic-1".to_string(),
            license_number: "LIC-001".to_string(),
            name: "Centre Imagerie Nord".to_string(),
            license_type: LicenseType::ImagingCenter,
            mode: LicenseMode::Light,
            address: Some("12 rue de la Paix".to_string()),
            connector: Some(Connector::Gxd5),
            options: vec![LicenseOption::Scanner, LicenseOption::DemandesRdv],
            is_fit_center: true,
            notes: None,
            contacts: vec![Contact {
                id: "c-1".to_string(),
                first_name: "Marie".to_string(),
                last_name: "Dupont".to_string(),
                role: "Directeur".to_string(),
                phone_fixed: Some("01 23 45 67 89".to_string()),
                phone_mobile: None,
                extra: Map::new(),
            }],
            created_at: ts.into(),
            updated_at: ts.into(),
            extra: Map::new(),
        }
    }

    #[test]
    fn test_license_wire_format() {
        let json = serde_json::to_value(sample_license()).unwrap();

        assert_eq!(json["licenseNumber"], "LIC-001");
        assert_eq!(json["type"], "imagerie");
        assert_eq!(json["mode"], "light");
        assert_eq!(json["connector"], "gxd5");
        assert_eq!(json["options"], serde_json::json!(["scanner", "demandes_rdv"]));
        assert_eq!(json["isFitCenter"], true);
        assert_eq!(json["createdAt"], "2024-01-15T08:00:00.000Z");
        assert_eq!(json["contacts"][0]["firstName"], "Marie");
        assert_eq!(json["contacts"][0]["phoneFixed"], "01 23 45 67 89");
        assert!(json.get("notes").is_none());
        assert!(json["contacts"][0].get("phoneMobile").is_none());
    }

    #[test]
    fn test_connector_none_is_written_as_null() {
        let mut license = sample_license();
        license.connector = None;
        let json = serde_json::to_value(&license).unwrap();
        assert!(json["connector"].is_null());
    }

    #[test]
    fn test_stored_record_round_trips_unknown_fields_and_timestamps() {
        let raw = serde_json::json!({
            "id": "lic-7",
            "licenseNumber": "LIC-007",
            "name": "Imagerie Ouest",
            "type": "imagerie",
            "mode": "full",
            "connector": null,
            "options": [],
            "isFitCenter": false,
            "contacts": [{
                "id": "c-7",
                "firstName": "Paul",
                "lastName": "Martin",
                "role": "Technicien",
                "badge": 42
            }],
            "createdAt": "2022-05-01T10:00:00Z",
            "updatedAt": "2022-05-01T11:00:00+01:00",
            "region": "Bretagne"
        });

        let license: License = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(license.extra["region"], "Bretagne");
        assert_eq!(license.contacts[0].extra["badge"], 42);
        assert_eq!(license.created_at.instant(), license.updated_at.instant());
        assert_eq!(serde_json::to_value(&license).unwrap(), raw);
    }

    #[test]
    fn test_empty_patches() {
        assert!(LicensePatch::default().is_empty());
        assert!(ContactPatch::default().is_empty());

        let patch = LicensePatch {
            notes: Some(None),
            ..Default::default()
        };
        assert!(!patch.is_empty());
    }

    #[test]
    fn test_health_clinic_wire_name() {
        let json = serde_json::to_value(LicenseType::HealthClinic).unwrap();
        assert_eq!(json, "maison_sante");
        assert_eq!("maison_sante".parse::<LicenseType>().unwrap(), LicenseType::HealthClinic);
        assert!("clinic".parse::<LicenseType>().is_err());
    }

    #[test]
    fn test_new_license_normalization() {
        let mut input = NewLicense::new("  LIC-9 ", " Maison Santé Sud ", LicenseType::HealthClinic);
        input.address = Some("   ".to_string());
        input.notes = Some(" parking derrière ".to_string());
        input.options = vec![LicenseOption::Scanner, LicenseOption::Allodoct, LicenseOption::Scanner];

        let normalized = input.normalized();
        assert_eq!(normalized.license_number, "LIC-9");
        assert_eq!(normalized.name, "Maison Santé Sud");
        assert_eq!(normalized.address, None);
        assert_eq!(normalized.notes.as_deref(), Some("parking derrière"));
        assert_eq!(normalized.options, vec![LicenseOption::Scanner, LicenseOption::Allodoct]);
    }

    #[test]
    fn test_new_license_requires_name_and_number() {
        assert!(NewLicense::new("LIC-1", "Nord", LicenseType::ImagingCenter).validate().is_ok());
        assert!(NewLicense::new("  ", "Nord", LicenseType::ImagingCenter).validate().is_err());
        assert!(NewLicense::new("LIC-1", "", LicenseType::ImagingCenter).validate().is_err());
    }

    #[test]
    fn test_license_patch_clears_optional_fields() {
        let license = sample_license();
        let later = Utc.with_ymd_and_hms(2024, 2, 1, 8, 0, 0).unwrap();
        let patch = LicensePatch {
            connector: Some(None),
            address: Some(None),
            ..Default::default()
        };

        let next = patch.apply(&license, later);
        assert_eq!(next.connector, None);
        assert_eq!(next.address, None);
        assert_eq!(next.name, license.name);
        assert_eq!(next.updated_at.instant(), later);
        assert_eq!(next.created_at, license.created_at);
    }

    #[test]
    fn test_contact_validation() {
        assert!(NewContact::new("Marie", "Dupont", "Directeur").validate().is_ok());
        assert!(NewContact::new("Marie", "Dupont", " ").validate().is_err());

        let patch = ContactPatch {
            last_name: Some(String::new()),
            ..Default::default()
        };
        assert!(patch.validate().is_err());
    }
}
