pub mod toml_config;

pub use toml_config::AppConfig;

#[cfg(feature = "cli")]
pub use cli::*;

#[cfg(feature = "cli")]
mod cli {
    use super::AppConfig;
    use crate::core::query::{ConnectorFilter, LicenseFilters, LicenseQuery};
    use crate::domain::model::{
        ContactPatch, LicenseMode, LicenseOption, LicensePatch, LicenseType, NewContact,
        NewLicense,
    };
    use clap::{Args, Parser, Subcommand};

    #[derive(Debug, Clone, Parser)]
    #[command(name = "medical-contacts")]
    #[command(about = "Directory of imaging centers, health clinics and their contacts")]
    pub struct CliConfig {
        /// Path to TOML configuration file
        #[arg(short, long, global = true)]
        pub config: Option<String>,

        /// Override the data directory from the configuration
        #[arg(long, global = true)]
        pub data_dir: Option<String>,

        #[arg(short, long, global = true, help = "Enable verbose output")]
        pub verbose: bool,

        #[arg(long, global = true, help = "Emit logs as JSON lines")]
        pub json_logs: bool,

        #[command(subcommand)]
        pub command: Command,
    }

    impl CliConfig {
        /// 命令列參數覆蓋設定檔
        pub fn apply_overrides(&self, config: &mut AppConfig) {
            if let Some(dir) = &self.data_dir {
                config.storage.data_dir = dir.clone();
            }
            if self.json_logs {
                config.logging.format = "json".to_string();
            }
            if let Command::Export { output_dir: Some(dir) } = &self.command {
                config.export.output_dir = dir.clone();
            }
        }
    }

    #[derive(Debug, Clone, Subcommand)]
    pub enum Command {
        /// List licenses, optionally searched and filtered
        List(ListArgs),
        /// Show one license with its contacts
        Show { id: String },
        /// Totals of licenses and contacts
        Stats,
        /// Suggested contact roles
        Roles,
        AddLicense(NewLicenseArgs),
        UpdateLicense {
            id: String,
            #[command(flatten)]
            changes: LicenseChangeArgs,
        },
        DeleteLicense { id: String },
        AddContact {
            license_id: String,
            #[command(flatten)]
            contact: NewContactArgs,
        },
        UpdateContact {
            license_id: String,
            contact_id: String,
            #[command(flatten)]
            changes: ContactChangeArgs,
        },
        DeleteContact {
            license_id: String,
            contact_id: String,
        },
        /// Write the whole collection to medical-contacts-export-<date>.json
        Export {
            #[arg(long)]
            output_dir: Option<String>,
        },
        /// Merge licenses from an export file, skipping ids already present
        Import { file: String },
    }

    #[derive(Debug, Clone, Args)]
    pub struct ListArgs {
        /// Free-text search over license and contact fields
        #[arg(short, long, default_value = "")]
        pub query: String,

        #[arg(long)]
        pub fit_center: Option<bool>,

        #[arg(long)]
        pub mode: Option<LicenseMode>,

        #[arg(long = "type")]
        pub license_type: Option<LicenseType>,

        /// Connector name, or "none" for licenses without one
        #[arg(long)]
        pub connector: Option<ConnectorFilter>,

        /// Matches licenses having at least one of the given options
        #[arg(long = "option")]
        pub options: Vec<LicenseOption>,

        #[arg(long, help = "Print matching licenses as JSON")]
        pub json: bool,
    }

    impl ListArgs {
        pub fn to_query(&self) -> LicenseQuery {
            LicenseQuery {
                text: self.query.clone(),
                filters: LicenseFilters {
                    is_fit_center: self.fit_center,
                    mode: self.mode,
                    license_type: self.license_type,
                    connector: self.connector,
                    options: self.options.clone(),
                },
            }
        }
    }

    #[derive(Debug, Clone, Args)]
    pub struct NewLicenseArgs {
        #[arg(long)]
        pub number: String,

        #[arg(long)]
        pub name: String,

        #[arg(long = "type")]
        pub license_type: LicenseType,

        #[arg(long, default_value = "full")]
        pub mode: LicenseMode,

        #[arg(long)]
        pub address: Option<String>,

        #[arg(long)]
        pub connector: Option<ConnectorFilter>,

        #[arg(long = "option")]
        pub options: Vec<LicenseOption>,

        #[arg(long)]
        pub fit_center: bool,

        #[arg(long)]
        pub notes: Option<String>,
    }

    impl From<NewLicenseArgs> for NewLicense {
        fn from(args: NewLicenseArgs) -> Self {
            NewLicense {
                license_number: args.number,
                name: args.name,
                license_type: args.license_type,
                mode: args.mode,
                address: args.address,
                connector: connector_value(args.connector),
                options: args.options,
                is_fit_center: args.fit_center,
                notes: args.notes,
            }
        }
    }

    #[derive(Debug, Clone, Args)]
    pub struct LicenseChangeArgs {
        #[arg(long)]
        pub number: Option<String>,

        #[arg(long)]
        pub name: Option<String>,

        #[arg(long = "type")]
        pub license_type: Option<LicenseType>,

        #[arg(long)]
        pub mode: Option<LicenseMode>,

        #[arg(long, conflicts_with = "clear_address")]
        pub address: Option<String>,

        #[arg(long)]
        pub clear_address: bool,

        /// Connector name, or "none" to remove it
        #[arg(long)]
        pub connector: Option<ConnectorFilter>,

        /// Replaces the whole option set
        #[arg(long = "option", conflicts_with = "clear_options")]
        pub options: Vec<LicenseOption>,

        #[arg(long)]
        pub clear_options: bool,

        #[arg(long)]
        pub fit_center: Option<bool>,

        #[arg(long, conflicts_with = "clear_notes")]
        pub notes: Option<String>,

        #[arg(long)]
        pub clear_notes: bool,
    }

    impl From<LicenseChangeArgs> for LicensePatch {
        fn from(args: LicenseChangeArgs) -> Self {
            let options = if args.clear_options {
                Some(Vec::new())
            } else if args.options.is_empty() {
                None
            } else {
                Some(args.options)
            };

            LicensePatch {
                license_number: args.number,
                name: args.name,
                license_type: args.license_type,
                mode: args.mode,
                address: clearable(args.address, args.clear_address),
                connector: args.connector.map(|c| connector_value(Some(c))),
                options,
                is_fit_center: args.fit_center,
                notes: clearable(args.notes, args.clear_notes),
            }
        }
    }

    #[derive(Debug, Clone, Args)]
    pub struct NewContactArgs {
        #[arg(long)]
        pub first_name: String,

        #[arg(long)]
        pub last_name: String,

        /// e.g. "Médecin radiologue", "Secrétaire médicale"
        #[arg(long)]
        pub role: String,

        #[arg(long)]
        pub phone_fixed: Option<String>,

        #[arg(long)]
        pub phone_mobile: Option<String>,
    }

    impl From<NewContactArgs> for NewContact {
        fn from(args: NewContactArgs) -> Self {
            NewContact {
                first_name: args.first_name,
                last_name: args.last_name,
                role: args.role,
                phone_fixed: args.phone_fixed,
                phone_mobile: args.phone_mobile,
            }
        }
    }

    #[derive(Debug, Clone, Args)]
    pub struct ContactChangeArgs {
        #[arg(long)]
        pub first_name: Option<String>,

        #[arg(long)]
        pub last_name: Option<String>,

        #[arg(long)]
        pub role: Option<String>,

        #[arg(long, conflicts_with = "clear_phone_fixed")]
        pub phone_fixed: Option<String>,

        #[arg(long)]
        pub clear_phone_fixed: bool,

        #[arg(long, conflicts_with = "clear_phone_mobile")]
        pub phone_mobile: Option<String>,

        #[arg(long)]
        pub clear_phone_mobile: bool,
    }

    impl From<ContactChangeArgs> for ContactPatch {
        fn from(args: ContactChangeArgs) -> Self {
            ContactPatch {
                first_name: args.first_name,
                last_name: args.last_name,
                role: args.role,
                phone_fixed: clearable(args.phone_fixed, args.clear_phone_fixed),
                phone_mobile: clearable(args.phone_mobile, args.clear_phone_mobile),
            }
        }
    }

    fn clearable(value: Option<String>, clear: bool) -> Option<Option<String>> {
        if clear {
            Some(None)
        } else {
            value.map(Some)
        }
    }

    fn connector_value(filter: Option<ConnectorFilter>) -> Option<crate::domain::model::Connector> {
        match filter {
            Some(ConnectorFilter::Only(connector)) => Some(connector),
            Some(ConnectorFilter::Without) | None => None,
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use crate::domain::model::Connector;

        #[test]
        fn test_parse_list_filters() {
            let cli = CliConfig::parse_from([
                "medical-contacts",
                "list",
                "--query",
                "dupont",
                "--type",
                "imagerie",
                "--connector",
                "none",
                "--option",
                "scanner",
                "--option",
                "allodoct",
                "--fit-center",
                "true",
            ]);

            let Command::List(args) = cli.command else {
                panic!("expected list command");
            };
            let query = args.to_query();
            assert_eq!(query.text, "dupont");
            assert_eq!(query.filters.license_type, Some(LicenseType::ImagingCenter));
            assert_eq!(query.filters.connector, Some(ConnectorFilter::Without));
            assert_eq!(
                query.filters.options,
                vec![LicenseOption::Scanner, LicenseOption::Allodoct]
            );
            assert_eq!(query.filters.is_fit_center, Some(true));
        }

        #[test]
        fn test_update_license_args_to_patch() {
            let cli = CliConfig::parse_from([
                "medical-contacts",
                "update-license",
                "abc",
                "--name",
                "Nouveau nom",
                "--connector",
                "venus",
                "--clear-address",
            ]);

            let Command::UpdateLicense { id, changes } = cli.command else {
                panic!("expected update-license command");
            };
            let patch = LicensePatch::from(changes);
            assert_eq!(id, "abc");
            assert_eq!(patch.name.as_deref(), Some("Nouveau nom"));
            assert_eq!(patch.connector, Some(Some(Connector::Venus)));
            assert_eq!(patch.address, Some(None));
            assert_eq!(patch.options, None);
            assert_eq!(patch.notes, None);
        }

        #[test]
        fn test_global_overrides() {
            let cli = CliConfig::parse_from([
                "medical-contacts",
                "export",
                "--output-dir",
                "/tmp/out",
                "--data-dir",
                "/tmp/data",
                "--json-logs",
            ]);
            let mut config = AppConfig::default();
            cli.apply_overrides(&mut config);

            assert_eq!(config.storage.data_dir, "/tmp/data");
            assert_eq!(config.export.output_dir, "/tmp/out");
            assert!(config.json_logs());
        }
    }
}
