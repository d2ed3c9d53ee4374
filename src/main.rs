use clap::Parser;
use medical_contacts::adapters::{ConsoleNotifier, FileStorage, PathSource, SystemClock};
use medical_contacts::config::{AppConfig, CliConfig, Command};
use medical_contacts::core::directory::LicenseDirectory;
use medical_contacts::domain::model::{ContactPatch, License, LicensePatch, ROLE_SUGGESTIONS};
use medical_contacts::utils::error::{DirectoryError, ErrorSeverity};
use medical_contacts::utils::{logger, validation::Validate};
use std::path::Path;

type Directory = LicenseDirectory<FileStorage, ConsoleNotifier, SystemClock>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    // 載入設定檔
    let mut config = match AppConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load configuration: {}", e);
            eprintln!("💡 {}", e.recovery_suggestion());
            std::process::exit(1);
        }
    };
    cli.apply_overrides(&mut config);

    // 初始化日誌
    let level = config.logging.level.clone();
    if config.json_logs() {
        logger::init_json_logger(cli.verbose, level.as_deref());
    } else {
        logger::init_cli_logger(cli.verbose, level.as_deref());
    }

    tracing::debug!("CLI config: {:?}", cli);

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    let mut storage = FileStorage::new(&config.storage.data_dir);
    if let Some(quota) = config.storage.quota_bytes {
        storage = storage.with_quota(quota);
    }
    tracing::debug!("📁 Data directory: {}", storage.base_path().display());

    let mut directory =
        LicenseDirectory::with_key(storage, &config.storage.key, ConsoleNotifier, SystemClock);

    if let Err(e) = run(&mut directory, cli.command, &config).await {
        tracing::error!(
            "❌ Command failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        eprintln!("💡 {}", e.recovery_suggestion());

        let exit_code = match e.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        };
        if exit_code > 0 {
            std::process::exit(exit_code);
        }
    }

    Ok(())
}

async fn run(
    directory: &mut Directory,
    command: Command,
    config: &AppConfig,
) -> Result<(), DirectoryError> {
    match command {
        Command::List(args) => {
            let query = args.to_query();
            let matches = query.apply(directory.licenses());
            if args.json {
                println!("{}", serde_json::to_string_pretty(&matches)?);
            } else if directory.licenses().is_empty() {
                println!("No licenses yet. Add one with `medical-contacts add-license`.");
            } else if matches.is_empty() {
                println!("No results for \"{}\"", query.text);
            } else {
                for license in matches {
                    print_license_line(license);
                }
            }
        }
        Command::Show { id } => match directory.get(&id) {
            Some(license) => print_license_details(license),
            None => println!("No license with id {}", id),
        },
        Command::Stats => {
            let stats = directory.stats();
            println!("Licenses:        {}", stats.licenses);
            println!("Contacts:        {}", stats.contacts);
            println!("FIT centers:     {}", stats.fit_centers);
            println!("Imaging centers: {}", stats.imaging_centers);
            println!("Health clinics:  {}", stats.health_clinics);
        }
        Command::Roles => {
            for role in ROLE_SUGGESTIONS {
                println!("{}", role);
            }
        }
        Command::AddLicense(args) => {
            let license = directory.add_license(args.into())?;
            println!("{}", license.id);
        }
        Command::UpdateLicense { id, changes } => {
            let patch = LicensePatch::from(changes);
            if patch.is_empty() {
                println!("Nothing to update, pass at least one field option");
            } else {
                directory.update_license(&id, patch)?;
            }
        }
        Command::DeleteLicense { id } => directory.delete_license(&id),
        Command::AddContact {
            license_id,
            contact,
        } => {
            let contact = directory.add_contact(&license_id, contact.into())?;
            println!("{}", contact.id);
        }
        Command::UpdateContact {
            license_id,
            contact_id,
            changes,
        } => {
            let patch = ContactPatch::from(changes);
            if patch.is_empty() {
                println!("Nothing to update, pass at least one field option");
            } else {
                directory.update_contact(&license_id, &contact_id, patch)?;
            }
        }
        Command::DeleteContact {
            license_id,
            contact_id,
        } => directory.delete_contact(&license_id, &contact_id),
        Command::Export { .. } => {
            let bundle = directory.export(chrono::Utc::now().date_naive())?;
            let output_dir = Path::new(&config.export.output_dir);
            tokio::fs::create_dir_all(output_dir).await?;
            let output_path = output_dir.join(&bundle.file_name);
            tokio::fs::write(&output_path, bundle.contents).await?;
            tracing::info!("📁 Output saved to: {}", output_path.display());
            println!("📁 {}", output_path.display());
        }
        Command::Import { file } => {
            directory.import(&PathSource::new(file)).await?;
        }
    }
    Ok(())
}

fn print_license_line(license: &License) {
    println!(
        "{}  {:<12} {:<32} {:<26} {:<5} {:<10} {} contact(s){}",
        license.id,
        license.license_number,
        license.name,
        license.license_type.label(),
        license.mode.label(),
        license.connector.map(|c| c.label()).unwrap_or("-"),
        license.contacts.len(),
        if license.is_fit_center { "  [FIT]" } else { "" }
    );
}

fn print_license_details(license: &License) {
    println!("{} ({})", license.name, license.license_number);
    println!("  id:        {}", license.id);
    println!("  type:      {}", license.license_type.label());
    println!("  mode:      {}", license.mode.label());
    println!(
        "  connector: {}",
        license.connector.map(|c| c.label()).unwrap_or("Aucun")
    );
    if let Some(address) = &license.address {
        println!("  address:   {}", address);
    }
    if !license.options.is_empty() {
        let labels: Vec<&str> = license.options.iter().map(|o| o.label()).collect();
        println!("  options:   {}", labels.join(", "));
    }
    println!("  FIT:       {}", if license.is_fit_center { "yes" } else { "no" });
    if let Some(notes) = &license.notes {
        println!("  notes:     {}", notes);
    }
    println!("  created:   {}", license.created_at);
    println!("  updated:   {}", license.updated_at);
    println!("  contacts:");
    for contact in &license.contacts {
        let phones: Vec<&str> = [contact.phone_fixed.as_deref(), contact.phone_mobile.as_deref()]
            .into_iter()
            .flatten()
            .collect();
        println!(
            "    {}  {} - {} {}",
            contact.id,
            contact.full_name(),
            contact.role,
            phones.join(" / ")
        );
    }
}
