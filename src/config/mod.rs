//! Importer configuration
//!
//! A JSON file mapping statement identifiers (account numbers, masked card
//! numbers, loan references, insurance contract ids) to ledger accounts,
//! plus the counter accounts each importer books against.
//!
//! ```json
//! {
//!   "accounts": {
//!     "00040754305": "Actif:Boursorama:CCJoint",
//!     "4979********1979": "Passif:Boursorama:CBJoint"
//!   },
//!   "generali": { "counterpart_account": "Actif:Boursorama:CCJoint" }
//! }
//! ```

use crate::error::{ImportError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Environment variable overriding the config location
pub const CONFIG_ENV: &str = "RELEVE_IMPORT_CONFIG";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Statement identifier -> ledger account
    pub accounts: BTreeMap<String, String>,
    pub boursorama: BoursoramaConfig,
    pub payslip: PayslipConfig,
    pub generali: GeneraliConfig,
    pub qif: QifConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BoursoramaConfig {
    /// Account debited by loan instalments
    pub loan_payment_account: String,
    pub loan_interest_account: String,
    pub loan_insurance_account: String,
}

impl Default for BoursoramaConfig {
    fn default() -> Self {
        Self {
            loan_payment_account: "Actif:Boursorama:CCJoint".to_string(),
            loan_interest_account: "Depenses:Banque:Interet".to_string(),
            loan_insurance_account: "Depenses:Banque:AssuEmprunt".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PayslipConfig {
    /// Text identifying a payslip (name of the payroll software)
    pub marker: String,
    /// Employer SIREN/SIRET printed on the payslip, also the accounts key
    pub employer_id: String,
    pub tax_account: String,
    pub bank_account: String,
    pub payee: String,
    pub narration: String,
}

impl Default for PayslipConfig {
    fn default() -> Self {
        Self {
            marker: "Sage".to_string(),
            employer_id: "025680471 00015".to_string(),
            tax_account: "Depenses:Impots:IR".to_string(),
            bank_account: "Actif:Boursorama:CCTim".to_string(),
            payee: "VIR SEPA TECNAL S.A.S".to_string(),
            narration: "VIREMENT-SALAIRE".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneraliConfig {
    /// Funding account for contributions
    pub counterpart_account: String,
    pub fees_account: String,
    pub dividends_account: String,
}

impl Default for GeneraliConfig {
    fn default() -> Self {
        Self {
            counterpart_account: "Actif:FIXME".to_string(),
            fees_account: "Depenses:FIXME".to_string(),
            dividends_account: "Revenus:FIXME".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QifConfig {
    /// Counter leg of every QIF operation, to be categorized by hand
    pub unclassified_account: String,
}

impl Default for QifConfig {
    fn default() -> Self {
        Self {
            unclassified_account: "Depenses:A-CLASSER".to_string(),
        }
    }
}

impl Config {
    pub fn with_accounts<I, K, V>(accounts: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            accounts: accounts
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            ..Self::default()
        }
    }

    /// Ledger account for a statement identifier
    pub fn account(&self, key: &str) -> Result<&str> {
        self.accounts
            .get(key)
            .map(String::as_str)
            .ok_or_else(|| ImportError::UnknownAccount(key.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ImportError::io(path, e))?;
        let config: Config = serde_json::from_str(&content)?;
        log::info!(
            "Loaded {} account mappings from {}",
            config.accounts.len(),
            path.display()
        );
        Ok(config)
    }

    /// `$RELEVE_IMPORT_CONFIG`, else `<config dir>/releve-import/config.json`
    pub fn default_path() -> Option<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            return Some(PathBuf::from(path));
        }
        dirs::config_dir().map(|d| d.join("releve-import").join("config.json"))
    }

    /// Load the default config file, or defaults when there is none
    pub fn load_default() -> Result<Self> {
        match Self::default_path() {
            Some(path) if path.exists() => Self::load(&path),
            Some(path) => {
                log::warn!("No config at {}, no account is mapped", path.display());
                Ok(Self::default())
            }
            None => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config: Config = serde_json::from_str(
            r#"{
                "accounts": { "00040754305": "Actif:Boursorama:CCJoint" },
                "generali": { "counterpart_account": "Actif:Boursorama:CCTim" }
            }"#,
        )
        .unwrap();

        assert_eq!(config.account("00040754305").unwrap(), "Actif:Boursorama:CCJoint");
        assert_eq!(config.generali.counterpart_account, "Actif:Boursorama:CCTim");
        assert_eq!(config.generali.fees_account, "Depenses:FIXME");
        assert_eq!(config.qif.unclassified_account, "Depenses:A-CLASSER");
        assert_eq!(config.payslip.marker, "Sage");
    }

    #[test]
    fn test_unknown_account() {
        let config = Config::default();
        assert!(matches!(
            config.account("123"),
            Err(ImportError::UnknownAccount(key)) if key == "123"
        ));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"accounts": {"P54112927": "Actif:Linxea:AVTim1"}}"#).unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.account("P54112927").unwrap(), "Actif:Linxea:AVTim1");

        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(Config::load(&path), Err(ImportError::Json(_))));
    }
}
