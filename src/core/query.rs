use crate::domain::model::{Connector, License, LicenseMode, LicenseOption, LicenseType};

fn contains_ci(haystack: &str, needle_lower: &str) -> bool {
    haystack.to_lowercase().contains(needle_lower)
}

fn optional_contains_ci(haystack: &Option<String>, needle_lower: &str) -> bool {
    haystack
        .as_deref()
        .is_some_and(|h| contains_ci(h, needle_lower))
}

/// Case-insensitive substring match over license and contact fields.
/// A blank query matches everything.
pub fn matches_text(license: &License, query: &str) -> bool {
    if query.trim().is_empty() {
        return true;
    }
    let needle = query.to_lowercase();

    let own = contains_ci(&license.name, &needle)
        || contains_ci(&license.license_number, &needle)
        || optional_contains_ci(&license.address, &needle);

    own || license.contacts.iter().any(|c| {
        contains_ci(&c.first_name, &needle)
            || contains_ci(&c.last_name, &needle)
            || contains_ci(&c.role, &needle)
            || optional_contains_ci(&c.phone_fixed, &needle)
            || optional_contains_ci(&c.phone_mobile, &needle)
    })
}

pub fn search<'a>(licenses: &'a [License], query: &str) -> Vec<&'a License> {
    licenses
        .iter()
        .filter(|l| matches_text(l, query))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectorFilter {
    /// Licenses without any connector.
    Without,
    Only(Connector),
}

impl ConnectorFilter {
    pub fn matches(&self, connector: Option<Connector>) -> bool {
        match self {
            ConnectorFilter::Without => connector.is_none(),
            ConnectorFilter::Only(wanted) => connector == Some(*wanted),
        }
    }
}

impl std::str::FromStr for ConnectorFilter {
    type Err = crate::utils::error::DirectoryError;

    fn from_str(s: &str) -> crate::utils::error::Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "none" | "aucun" => Ok(ConnectorFilter::Without),
            other => other.parse().map(ConnectorFilter::Only),
        }
    }
}

/// Structured constraints; `None` / empty means "don't care".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LicenseFilters {
    pub is_fit_center: Option<bool>,
    pub mode: Option<LicenseMode>,
    pub license_type: Option<LicenseType>,
    pub connector: Option<ConnectorFilter>,
    /// Any-of: at least one must be present on the license.
    pub options: Vec<LicenseOption>,
}

impl LicenseFilters {
    pub fn matches(&self, license: &License) -> bool {
        self.is_fit_center.map_or(true, |v| license.is_fit_center == v)
            && self.mode.map_or(true, |m| license.mode == m)
            && self.license_type.map_or(true, |t| license.license_type == t)
            && self.connector.map_or(true, |c| c.matches(license.connector))
            && (self.options.is_empty() || self.options.iter().any(|o| license.has_option(*o)))
    }

    pub fn active_count(&self) -> usize {
        [
            self.is_fit_center.is_some(),
            self.mode.is_some(),
            self.license_type.is_some(),
            self.connector.is_some(),
            !self.options.is_empty(),
        ]
        .iter()
        .filter(|active| **active)
        .count()
    }

    pub fn is_empty(&self) -> bool {
        self.active_count() == 0
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn toggle_option(&mut self, option: LicenseOption) {
        if let Some(pos) = self.options.iter().position(|o| *o == option) {
            self.options.remove(pos);
        } else {
            self.options.push(option);
        }
    }
}

/// Free-text search combined with structured filters. Holds only the criteria;
/// results are recomputed from the collection on every call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LicenseQuery {
    pub text: String,
    pub filters: LicenseFilters,
}

impl LicenseQuery {
    pub fn text(text: &str) -> Self {
        Self {
            text: text.to_string(),
            filters: LicenseFilters::default(),
        }
    }

    pub fn matches(&self, license: &License) -> bool {
        matches_text(license, &self.text) && self.filters.matches(license)
    }

    pub fn apply<'a>(&self, licenses: &'a [License]) -> Vec<&'a License> {
        licenses.iter().filter(|l| self.matches(l)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::Contact;
    use chrono::{TimeZone, Utc};

    fn license(id: &str, name: &str) -> License {
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        License {
            id: id.to_string(),
            license_number: format!("N-{}", id),
            name: name.to_string(),
            license_type: LicenseType::ImagingCenter,
            mode: LicenseMode::Full,
            address: None,
            connector: None,
            options: Vec::new(),
            is_fit_center: false,
            notes: None,
            contacts: Vec::new(),
            created_at: ts.into(),
            updated_at: ts.into(),
            extra: Default::default(),
        }
    }

    #[test]
    fn test_blank_query_keeps_order() {
        let licenses = vec![license("b", "Beta"), license("a", "Alpha")];
        let ids: Vec<&str> = search(&licenses, "   ").iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
    }

    #[test]
    fn test_search_own_fields_case_insensitive() {
        let mut with_address = license("a", "Alpha");
        with_address.address = Some("3 Avenue Foch, Lyon".to_string());
        let licenses = vec![with_address, license("b", "Imagerie BETA")];

        assert_eq!(search(&licenses, "lyon").len(), 1);
        assert_eq!(search(&licenses, "beta")[0].id, "b");
        assert_eq!(search(&licenses, "n-a")[0].id, "a");
        assert!(search(&licenses, "zzz").is_empty());
    }

    #[test]
    fn test_search_matches_contact_phone() {
        let mut l = license("a", "Alpha");
        l.contacts.push(Contact {
            id: "c".to_string(),
            first_name: "Jean".to_string(),
            last_name: "Martin".to_string(),
            role: "Technicien".to_string(),
            phone_fixed: None,
            phone_mobile: Some("06 12 34 56 78".to_string()),
            extra: Default::default(),
        });
        assert!(matches_text(&l, "34 56"));
        assert!(matches_text(&l, "TECHNI"));
    }

    #[test]
    fn test_connector_filter() {
        let mut with = license("a", "A");
        with.connector = Some(Connector::Venus);
        let without = license("b", "B");

        let only_venus = LicenseFilters {
            connector: Some(ConnectorFilter::Only(Connector::Venus)),
            ..Default::default()
        };
        let none = LicenseFilters {
            connector: Some(ConnectorFilter::Without),
            ..Default::default()
        };

        assert!(only_venus.matches(&with));
        assert!(!only_venus.matches(&without));
        assert!(none.matches(&without));
        assert!(!none.matches(&with));
        assert_eq!("aucun".parse::<ConnectorFilter>().unwrap(), ConnectorFilter::Without);
        assert_eq!(
            "xplore".parse::<ConnectorFilter>().unwrap(),
            ConnectorFilter::Only(Connector::Xplore)
        );
    }

    #[test]
    fn test_fit_center_tri_state() {
        let mut fit = license("a", "A");
        fit.is_fit_center = true;
        let plain = license("b", "B");
        let licenses = vec![fit, plain];

        let mut query = LicenseQuery::default();
        assert_eq!(query.apply(&licenses).len(), 2);
        query.filters.is_fit_center = Some(true);
        assert_eq!(query.apply(&licenses)[0].id, "a");
        query.filters.is_fit_center = Some(false);
        assert_eq!(query.apply(&licenses)[0].id, "b");
    }

    #[test]
    fn test_active_count_and_toggle() {
        let mut filters = LicenseFilters::default();
        assert!(filters.is_empty());

        filters.mode = Some(LicenseMode::Light);
        filters.toggle_option(LicenseOption::Scanner);
        assert_eq!(filters.active_count(), 2);

        filters.toggle_option(LicenseOption::Scanner);
        assert_eq!(filters.active_count(), 1);

        filters.reset();
        assert!(filters.is_empty());
    }
}
