//! Trust store resolution and TLS client settings.
//!
//! The trust store (a PEM bundle, a PKCS#12 store or a single DER
//! certificate) holds the roots used to validate the management service's
//! TLS certificate. Its settings are loaded into an explicit
//! [`TlsOptions`] value that every HTTP client of the run is built from;
//! nothing is installed process-wide.

use openssl::pkcs12::Pkcs12;
use reqwest::Certificate;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ImportError;
use crate::model::TokenConfig;
use crate::prompt::Prompter;
use crate::secret::{self, Secret};

/// Trust store location offered when none is configured, relative to the
/// install home.
pub const DEFAULT_TRUST_STORE_PATH: &str = "conf/truststore.pem";

/// Trust store password used when the operator accepts the default.
pub const DEFAULT_TRUST_STORE_PASSWORD: &str = "apigate";

/// Timeout applied to every request of the run.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// A resolved trust store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustStore {
    /// Location as configured or entered; written back to the configuration.
    pub location: String,

    /// Absolute path of the bundle.
    pub path: PathBuf,

    /// Password protecting the store.
    ///
    /// Opens PKCS#12 stores; PEM and DER bundles are read without it.
    pub password: Secret,
}

/// Result of trust store resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustStoreResolution {
    pub trust_store: TrustStore,

    /// Set when the location or the password had to be prompted for.
    pub needs_persist: bool,
}

/// Resolve the trust store location and password.
///
/// The configured location wins over `--truststore`; with neither, the
/// operator is asked and an empty answer selects
/// [`DEFAULT_TRUST_STORE_PATH`]. The password is recovered from the
/// configuration with the operator's password; if it is missing or cannot be
/// decrypted, `--truststore-pass` is used, then a masked prompt where an
/// empty answer selects [`DEFAULT_TRUST_STORE_PASSWORD`].
///
/// Relative locations resolve against `home`.
///
/// # Errors
///
/// Returns [`ImportError::Runtime`] if the resolved file does not exist or
/// prompting fails.
pub fn resolve_trust_store(
    config: &TokenConfig,
    cli_location: Option<&str>,
    cli_password: Option<&str>,
    operator_password: &Secret,
    home: &Path,
    prompter: &dyn Prompter,
) -> Result<TrustStoreResolution, ImportError> {
    let mut needs_persist = false;

    let location = if !config.trust_store_location.is_empty() {
        config.trust_store_location.clone()
    } else if let Some(location) = cli_location.filter(|l| !l.is_empty()) {
        location.to_string()
    } else {
        needs_persist = true;
        let entered = prompter.read_line(&format!(
            "Enter Trust store location: [{}] ",
            DEFAULT_TRUST_STORE_PATH
        ))?;
        match entered.trim() {
            "" => DEFAULT_TRUST_STORE_PATH.to_string(),
            entered => entered.to_string(),
        }
    };

    let recovered = secret::recover(
        &config.trust_store_password,
        operator_password,
        "trust store password",
    );
    let password = match recovered.into_secret() {
        Some(password) => password,
        None => match cli_password.filter(|p| !p.is_empty()) {
            Some(password) => Secret::new(password),
            None => {
                needs_persist = true;
                let entered = prompter.read_password("Enter Trust store password: [ use default? ] ")?;
                if entered.trim().is_empty() {
                    Secret::new(DEFAULT_TRUST_STORE_PASSWORD)
                } else {
                    Secret::new(entered)
                }
            }
        },
    };

    let path = resolve_path(&location, home);
    if !path.exists() {
        tracing::error!("Provided trust store location {:?} does not exist.", path);
        return Err(ImportError::runtime(format!(
            "Provided trust store location {} does not exist.",
            path.display()
        )));
    }

    tracing::debug!("Using trust store {:?}", path);

    Ok(TrustStoreResolution {
        trust_store: TrustStore {
            location,
            path,
            password,
        },
        needs_persist,
    })
}

/// Resolve `location` against `home` unless it is already absolute.
pub fn resolve_path(location: &str, home: &Path) -> PathBuf {
    let path = Path::new(location);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        home.join(path)
    }
}

impl TrustStore {
    /// Read the trusted certificates in the store.
    ///
    /// PEM bundles and PKCS#12 stores may hold several certificates; a
    /// PKCS#12 store is opened with the trust store password. Anything else
    /// is read as a single DER certificate.
    pub fn load_certificates(&self) -> Result<Vec<Certificate>, ImportError> {
        let bytes = std::fs::read(&self.path).map_err(|e| {
            tracing::error!("Failed to read trust store {:?}: {}", self.path, e);
            ImportError::runtime(format!(
                "Unable to read trust store {}.",
                self.path.display()
            ))
        })?;

        let format = StoreFormat::detect(&bytes);
        tracing::debug!("Reading trust store {:?} as {:?}", self.path, format);

        let certificates = match format {
            StoreFormat::Pem => {
                Certificate::from_pem_bundle(&bytes).map_err(|e| self.unusable(e))?
            }
            StoreFormat::Pkcs12 => self
                .pkcs12_certificates(&bytes)?
                .iter()
                .map(|der| Certificate::from_der(der))
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| self.unusable(e))?,
            StoreFormat::Der => vec![Certificate::from_der(&bytes).map_err(|e| self.unusable(e))?],
        };

        if certificates.is_empty() {
            return Err(self.unusable("no certificates found"));
        }

        tracing::debug!("Loaded {} certificate(s) from trust store", certificates.len());
        Ok(certificates)
    }

    /// DER encodings of every certificate in a PKCS#12 store.
    fn pkcs12_certificates(&self, bytes: &[u8]) -> Result<Vec<Vec<u8>>, ImportError> {
        let password = self.password.expose();
        let locked = || {
            ImportError::runtime(format!(
                "Unable to open trust store {}; check the trust store password.",
                self.path.display()
            ))
        };
        if password.contains('\0') {
            return Err(locked());
        }

        let parsed = Pkcs12::from_der(bytes)
            .and_then(|store| store.parse2(password))
            .map_err(|e| {
                tracing::error!("Failed to open PKCS#12 trust store {:?}: {}", self.path, e);
                locked()
            })?;

        parsed
            .cert
            .iter()
            .map(|certificate| certificate.to_der())
            .chain(
                parsed
                    .ca
                    .iter()
                    .flat_map(|chain| chain.iter())
                    .map(|certificate| certificate.to_der()),
            )
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| self.unusable(e))
    }

    fn unusable(&self, cause: impl fmt::Display) -> ImportError {
        tracing::error!("Failed to parse trust store {:?}: {}", self.path, cause);
        ImportError::runtime(format!(
            "Trust store {} does not contain usable certificates.",
            self.path.display()
        ))
    }
}

/// Encoding of a trust store file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StoreFormat {
    Pem,
    Pkcs12,
    Der,
}

impl StoreFormat {
    fn detect(bytes: &[u8]) -> Self {
        if bytes.windows(10).any(|w| w == b"-----BEGIN") {
            return Self::Pem;
        }

        // A PKCS#12 PFX is a SEQUENCE opening with its INTEGER version; an
        // X.509 certificate opens with the tbsCertificate SEQUENCE.
        if bytes.first() != Some(&0x30) {
            return Self::Der;
        }
        let header = match bytes.get(1) {
            Some(&len) if len < 0x80 => 2,
            Some(&len) => 2 + usize::from(len & 0x7f),
            None => return Self::Der,
        };
        if bytes.get(header) == Some(&0x02) {
            Self::Pkcs12
        } else {
            Self::Der
        }
    }
}

/// TLS and transport settings for every request of a run.
#[derive(Clone)]
pub struct TlsOptions {
    /// Additional trusted root certificates.
    pub certificates: Vec<Certificate>,

    /// Skip certificate validation entirely.
    pub insecure: bool,

    /// Per-request timeout.
    pub timeout: Duration,
}

impl TlsOptions {
    pub fn new(certificates: Vec<Certificate>, insecure: bool) -> Self {
        Self {
            certificates,
            insecure,
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Build an HTTP client honouring these settings.
    pub fn build_client(&self) -> Result<reqwest::Client, reqwest::Error> {
        let mut builder = reqwest::Client::builder()
            .timeout(self.timeout)
            .danger_accept_invalid_certs(self.insecure);

        for certificate in &self.certificates {
            builder = builder.add_root_certificate(certificate.clone());
        }

        if self.insecure {
            tracing::warn!("TLS certificate validation is disabled for this run");
        }

        builder.build()
    }
}

impl Default for TlsOptions {
    fn default() -> Self {
        Self::new(Vec::new(), false)
    }
}

impl fmt::Debug for TlsOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TlsOptions")
            .field("certificates", &self.certificates.len())
            .field("insecure", &self.insecure)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cipher;
    use crate::prompt::ScriptedPrompter;
    use std::fs;
    use tempfile::TempDir;

    fn home_with_store(relative: &str) -> TempDir {
        let home = TempDir::new().unwrap();
        let path = home.path().join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, b"placeholder").unwrap();
        home
    }

    #[test]
    fn test_relative_location_resolves_against_home() {
        let home = home_with_store("conf/ts.p12");
        let config = TokenConfig {
            trust_store_location: "conf/ts.p12".to_string(),
            ..TokenConfig::default()
        };
        let prompter = ScriptedPrompter::new(Vec::<String>::new());

        let resolution = resolve_trust_store(
            &config,
            None,
            Some("store-pass"),
            &Secret::new("pw"),
            home.path(),
            &prompter,
        )
        .unwrap();

        assert_eq!(resolution.trust_store.path, home.path().join("conf/ts.p12"));
        assert_eq!(resolution.trust_store.location, "conf/ts.p12");
        assert_eq!(resolution.trust_store.password.expose(), "store-pass");
        assert!(!resolution.needs_persist);
    }

    #[test]
    fn test_missing_store_is_runtime_error() {
        let home = TempDir::new().unwrap();
        let config = TokenConfig {
            trust_store_location: "conf/ts.p12".to_string(),
            ..TokenConfig::default()
        };
        let prompter = ScriptedPrompter::new(Vec::<String>::new());

        let result = resolve_trust_store(
            &config,
            None,
            Some("store-pass"),
            &Secret::new("pw"),
            home.path(),
            &prompter,
        );

        match result {
            Err(ImportError::Runtime { message }) => assert!(message.contains("ts.p12")),
            other => panic!("expected runtime error, got {:?}", other),
        }
    }

    #[test]
    fn test_prompted_defaults_require_persist() {
        let home = home_with_store(DEFAULT_TRUST_STORE_PATH);
        let prompter = ScriptedPrompter::new(["", ""]);

        let resolution = resolve_trust_store(
            &TokenConfig::default(),
            None,
            None,
            &Secret::new("pw"),
            home.path(),
            &prompter,
        )
        .unwrap();

        assert!(resolution.needs_persist);
        assert_eq!(resolution.trust_store.location, DEFAULT_TRUST_STORE_PATH);
        assert_eq!(
            resolution.trust_store.password.expose(),
            DEFAULT_TRUST_STORE_PASSWORD
        );
    }

    #[test]
    fn test_entered_location_is_used() {
        let home = home_with_store("certs/custom.pem");
        let prompter = ScriptedPrompter::new(["certs/custom.pem", "custom-pass"]);

        let resolution = resolve_trust_store(
            &TokenConfig::default(),
            None,
            None,
            &Secret::new("pw"),
            home.path(),
            &prompter,
        )
        .unwrap();

        assert_eq!(resolution.trust_store.location, "certs/custom.pem");
        assert_eq!(resolution.trust_store.password.expose(), "custom-pass");
    }

    #[test]
    fn test_stored_password_recovered() {
        let home = home_with_store("conf/ts.pem");
        let config = TokenConfig {
            trust_store_location: "conf/ts.pem".to_string(),
            trust_store_password: cipher::encrypt("stored-pass", "pw").unwrap(),
            ..TokenConfig::default()
        };
        let prompter = ScriptedPrompter::new(Vec::<String>::new());

        let resolution = resolve_trust_store(
            &config,
            None,
            Some("flag-pass"),
            &Secret::new("pw"),
            home.path(),
            &prompter,
        )
        .unwrap();

        assert_eq!(resolution.trust_store.password.expose(), "stored-pass");
    }

    #[test]
    fn test_undecryptable_password_falls_back_to_prompt() {
        let home = home_with_store("conf/ts.pem");
        let config = TokenConfig {
            trust_store_location: "conf/ts.pem".to_string(),
            trust_store_password: cipher::encrypt("stored-pass", "old-password").unwrap(),
            ..TokenConfig::default()
        };
        let prompter = ScriptedPrompter::new(["fresh-pass"]);

        let resolution = resolve_trust_store(
            &config,
            None,
            None,
            &Secret::new("new-password"),
            home.path(),
            &prompter,
        )
        .unwrap();

        assert_eq!(resolution.trust_store.password.expose(), "fresh-pass");
        assert!(resolution.needs_persist);
    }

    #[test]
    fn test_load_certificates_rejects_garbage() {
        let home = home_with_store("conf/ts.pem");
        let store = TrustStore {
            location: "conf/ts.pem".to_string(),
            path: home.path().join("conf/ts.pem"),
            password: Secret::new(""),
        };
        assert!(matches!(
            store.load_certificates(),
            Err(ImportError::Runtime { .. })
        ));
    }

    #[test]
    fn test_load_pem_bundle() {
        let home = TempDir::new().unwrap();
        let path = home.path().join("truststore.pem");
        fs::write(&path, include_str!("../tests/fixtures/truststore.pem")).unwrap();
        let store = TrustStore {
            location: "truststore.pem".to_string(),
            path,
            password: Secret::new(DEFAULT_TRUST_STORE_PASSWORD),
        };

        let certificates = store.load_certificates().unwrap();
        assert_eq!(certificates.len(), 1);

        let options = TlsOptions::new(certificates, false);
        assert!(options.build_client().is_ok());
        assert!(format!("{:?}", options).contains("certificates: 1"));
    }

    fn store_with(file_name: &str, contents: &[u8], password: &str) -> (TempDir, TrustStore) {
        let home = TempDir::new().unwrap();
        let path = home.path().join(file_name);
        fs::write(&path, contents).unwrap();
        let store = TrustStore {
            location: file_name.to_string(),
            path,
            password: Secret::new(password),
        };
        (home, store)
    }

    #[test]
    fn test_load_der_certificate() {
        let (_home, store) = store_with(
            "truststore.der",
            include_bytes!("../tests/fixtures/truststore.der"),
            "",
        );

        assert_eq!(store.load_certificates().unwrap().len(), 1);
    }

    #[test]
    fn test_load_pkcs12_store() {
        let (_home, store) = store_with(
            "truststore.p12",
            include_bytes!("../tests/fixtures/truststore.p12"),
            "changeit",
        );

        let certificates = store.load_certificates().unwrap();
        assert_eq!(certificates.len(), 1);
        assert!(TlsOptions::new(certificates, false).build_client().is_ok());
    }

    #[test]
    fn test_pkcs12_wrong_password() {
        let (_home, store) = store_with(
            "truststore.p12",
            include_bytes!("../tests/fixtures/truststore.p12"),
            "wrong",
        );

        match store.load_certificates() {
            Err(ImportError::Runtime { message }) => assert!(message.contains("password")),
            other => panic!("expected runtime error, got {:?}", other),
        }
    }

    #[test]
    fn test_store_format_detection() {
        assert_eq!(
            StoreFormat::detect(include_bytes!("../tests/fixtures/truststore.pem")),
            StoreFormat::Pem
        );
        assert_eq!(
            StoreFormat::detect(include_bytes!("../tests/fixtures/truststore.der")),
            StoreFormat::Der
        );
        assert_eq!(
            StoreFormat::detect(include_bytes!("../tests/fixtures/truststore.p12")),
            StoreFormat::Pkcs12
        );
        assert_eq!(StoreFormat::detect(b""), StoreFormat::Der);
    }

    #[test]
    fn test_absolute_location_is_kept() {
        let home = TempDir::new().unwrap();
        let absolute = home.path().join("abs.pem");
        assert_eq!(
            resolve_path(absolute.to_str().unwrap(), Path::new("/elsewhere")),
            absolute
        );
    }
}
