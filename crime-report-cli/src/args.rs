//! Command-line arguments.
//!
//! Every connection setting can come from a flag or from the environment
//! (a `.env` file is loaded first).

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crime_report::{Address, ClientConfig, ReportId};

/// Crime report client
#[derive(Parser, Debug)]
#[command(name = "crime-report")]
#[command(about = "Submit and manage crime reports on the ledger")]
pub struct Args {
    /// Wallet provider JSON-RPC endpoint
    #[arg(long, env = "RPC_URL")]
    pub rpc_url: Option<String>,

    /// AdminManager contract address
    #[arg(long, env = "ADMIN_MANAGER_ADDRESS")]
    pub admin_manager_address: Option<Address>,

    /// UserManager contract address
    #[arg(long, env = "USER_MANAGER_ADDRESS")]
    pub user_manager_address: Option<Address>,

    /// CrimeReport contract address
    #[arg(long, env = "CRIME_REPORT_ADDRESS")]
    pub crime_report_address: Option<Address>,

    /// Pinata API key
    #[arg(long, env = "PINATA_API_KEY", hide_env_values = true)]
    pub pinata_api_key: Option<String>,

    /// Pinata secret API key
    #[arg(long, env = "PINATA_SECRET_API_KEY", hide_env_values = true)]
    pub pinata_secret_api_key: Option<String>,

    /// IPFS gateway base URL
    #[arg(long, env = "IPFS_GATEWAY_URL")]
    pub gateway_url: Option<String>,

    /// Attempts per content upload
    #[arg(long, env = "UPLOAD_ATTEMPTS")]
    pub upload_attempts: Option<u32>,

    /// Run against a fresh in-memory devnet instead of a real provider
    #[arg(long)]
    pub devnet: bool,

    /// Account to act as on the devnet (the devnet owner by default)
    #[arg(long, requires = "devnet")]
    pub devnet_account: Option<Address>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "warn")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Check that content can be pinned
    Status,

    /// Connect the wallet and log in
    Login,

    /// Connect the wallet and register the selected account
    Register,

    /// Submit a report
    Report {
        /// What happened
        #[arg(long)]
        description: String,

        /// Where it happened
        #[arg(long, default_value = "")]
        location: String,

        /// Reporter name (ignored when anonymous)
        #[arg(long, default_value = "")]
        name: String,

        /// Submit without a name
        #[arg(long)]
        anonymous: bool,

        /// Evidence file
        #[arg(long)]
        media: Option<PathBuf>,
    },

    /// Show one report
    Show { id: ReportId },

    /// List reports filed by the selected account
    Mine {
        /// Skip reports that fail to load instead of failing the listing
        #[arg(long)]
        lenient: bool,
    },

    /// Number of reports on the ledger
    Count,

    /// Resolve a case (admins only)
    Resolve { id: ReportId, message: String },

    /// List all reports, split by status (admins only)
    Dashboard {
        /// Filter by description, location or name
        #[arg(long)]
        search: Option<String>,
    },

    /// Add an admin (owner only)
    AddAdmin { address: Address, name: String },

    /// Deregister a user
    Deregister { address: Address },

    /// Show the registry owner
    Owner,
}

impl Args {
    /// Apply flag values over the environment-derived configuration.
    pub fn apply(&self, config: &mut ClientConfig) {
        if let Some(url) = &self.rpc_url {
            config.rpc_url = Some(url.clone());
        }
        if self.admin_manager_address.is_some() {
            config.admin_manager_address = self.admin_manager_address;
        }
        if self.user_manager_address.is_some() {
            config.user_manager_address = self.user_manager_address;
        }
        if self.crime_report_address.is_some() {
            config.crime_report_address = self.crime_report_address;
        }
        if let Some(key) = &self.pinata_api_key {
            config.pinata.api_key = key.clone();
        }
        if let Some(secret) = &self.pinata_secret_api_key {
            config.pinata.secret_api_key = secret.clone();
        }
        if let Some(url) = &self.gateway_url {
            config.gateway_url = url.clone();
        }
        if let Some(attempts) = self.upload_attempts {
            config.upload_attempts = attempts.max(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_report_command() {
        let args = Args::try_parse_from([
            "crime-report",
            "--devnet",
            "report",
            "--description",
            "Broken window",
            "--anonymous",
        ])
        .unwrap();
        assert!(args.devnet);
        match args.command {
            Command::Report {
                description,
                anonymous,
                media,
                ..
            } => {
                assert_eq!(description, "Broken window");
                assert!(anonymous);
                assert!(media.is_none());
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_flags_override_config() {
        let args = Args::try_parse_from([
            "crime-report",
            "--crime-report-address",
            "0x00000000000000000000000000000000000000c3",
            "--upload-attempts",
            "0",
            "count",
        ])
        .unwrap();

        let mut config = ClientConfig::default();
        args.apply(&mut config);
        assert_eq!(config.crime_report_address, Some(Address::from_low_u64(0xc3)));
        assert_eq!(config.upload_attempts, 1);
    }

    #[test]
    fn test_address_arguments_are_validated() {
        assert!(Args::try_parse_from(["crime-report", "deregister", "0xnothex"]).is_err());
    }
}
