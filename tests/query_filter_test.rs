use medical_contacts::adapters::{MemoryStorage, RecordingNotifier};
use medical_contacts::core::query::{search, ConnectorFilter, LicenseFilters, LicenseQuery};
use medical_contacts::domain::model::{
    Connector, LicenseMode, LicenseOption, LicenseType, NewContact, NewLicense,
};
use medical_contacts::LicenseDirectory;

fn directory() -> LicenseDirectory<MemoryStorage, RecordingNotifier> {
    let mut dir = LicenseDirectory::open(MemoryStorage::new(), RecordingNotifier::new());

    let mut parc = NewLicense::new("IMG-001", "Imagerie du Parc", LicenseType::ImagingCenter);
    parc.options = vec![LicenseOption::Scanner, LicenseOption::Allodoct];
    parc.connector = Some(Connector::Xplore);
    parc.is_fit_center = true;
    let parc = dir.add_license(parc).unwrap();
    let mut contact = NewContact::new("Marie", "Dupont", "Secrétaire médicale");
    contact.phone_fixed = Some("04 72 10 20 30".to_string());
    dir.add_contact(&parc.id, contact).unwrap();

    let mut sud = NewLicense::new("MSP-002", "Maison de Santé Sud", LicenseType::HealthClinic);
    sud.options = vec![LicenseOption::Allodoct];
    sud.mode = LicenseMode::Light;
    sud.address = Some("18 rue Garibaldi, Lyon".to_string());
    dir.add_license(sud).unwrap();

    let mut gare = NewLicense::new("IMG-003", "Radiologie de la Gare", LicenseType::ImagingCenter);
    gare.connector = Some(Connector::Venus);
    dir.add_license(gare).unwrap();

    dir
}

fn names(licenses: Vec<&medical_contacts::License>) -> Vec<String> {
    licenses.into_iter().map(|l| l.name.clone()).collect()
}

#[test]
fn test_contact_name_matches_license() {
    let dir = directory();
    // 名稱與編號都不含 dupont，但聯絡人符合
    assert_eq!(names(search(dir.licenses(), "dupont")), vec!["Imagerie du Parc"]);
    assert_eq!(names(search(dir.licenses(), "DUPONT")), vec!["Imagerie du Parc"]);
}

#[test]
fn test_search_by_phone_and_address() {
    let dir = directory();
    assert_eq!(names(search(dir.licenses(), "10 20")), vec!["Imagerie du Parc"]);
    assert_eq!(names(search(dir.licenses(), "garibaldi")), vec!["Maison de Santé Sud"]);
}

#[test]
fn test_empty_query_returns_everything_in_order() {
    let dir = directory();
    assert_eq!(
        names(search(dir.licenses(), "")),
        vec!["Imagerie du Parc", "Maison de Santé Sud", "Radiologie de la Gare"]
    );
}

#[test]
fn test_option_filter_uses_any_of() {
    let dir = directory();
    let filters = LicenseFilters {
        options: vec![LicenseOption::Scanner],
        ..Default::default()
    };
    let query = LicenseQuery {
        text: String::new(),
        filters,
    };
    assert_eq!(names(query.apply(dir.licenses())), vec!["Imagerie du Parc"]);

    let any_of = LicenseQuery {
        text: String::new(),
        filters: LicenseFilters {
            options: vec![LicenseOption::Scanner, LicenseOption::Allodoct],
            ..Default::default()
        },
    };
    assert_eq!(
        names(any_of.apply(dir.licenses())),
        vec!["Imagerie du Parc", "Maison de Santé Sud"]
    );
}

#[test]
fn test_structured_filters_combine_with_text() {
    let dir = directory();

    let mut query = LicenseQuery::text("img-");
    assert_eq!(query.apply(dir.licenses()).len(), 2);

    query.filters.connector = Some(ConnectorFilter::Only(Connector::Venus));
    assert_eq!(names(query.apply(dir.licenses())), vec!["Radiologie de la Gare"]);

    query.filters.connector = None;
    query.filters.is_fit_center = Some(true);
    assert_eq!(names(query.apply(dir.licenses())), vec!["Imagerie du Parc"]);
}

#[test]
fn test_mode_type_and_no_connector_filters() {
    let dir = directory();

    let light = LicenseFilters {
        mode: Some(LicenseMode::Light),
        ..Default::default()
    };
    let clinics = LicenseFilters {
        license_type: Some(LicenseType::HealthClinic),
        ..Default::default()
    };
    let without_connector = LicenseFilters {
        connector: Some(ConnectorFilter::Without),
        ..Default::default()
    };

    for filters in [light, clinics, without_connector] {
        let matched: Vec<&str> = dir
            .licenses()
            .iter()
            .filter(|l| filters.matches(l))
            .map(|l| l.name.as_str())
            .collect();
        assert_eq!(matched, vec!["Maison de Santé Sud"]);
    }
}

#[test]
fn test_filters_track_live_collection() {
    let mut dir = directory();
    let query = LicenseQuery::text("dupont");
    assert_eq!(query.apply(dir.licenses()).len(), 1);

    let id = dir.licenses()[0].id.clone();
    dir.delete_license(&id);
    assert!(query.apply(dir.licenses()).is_empty());
}
