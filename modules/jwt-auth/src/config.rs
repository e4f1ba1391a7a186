//! Configuration of the MP-JWT authentication mechanism.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use jsonwebtoken::DecodingKey;
use serde::{Deserialize, Serialize};

/// Prefix of environment variables overriding file configuration.
pub const ENV_PREFIX: &str = "MPJWT_";

const PEM_LABEL: &str = "PUBLIC KEY";

fn default_exp_grace_period_secs() -> u64 {
    60
}

fn default_require_auth_by_default() -> bool {
    true
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("no issuer configured: set `issuer` or `issuer_file`")]
    MissingIssuer,

    #[error("no signer public key configured: set `signer_public_key` or `signer_public_key_file`")]
    MissingSignerKey,

    #[error("signer public key is not a valid RSA public key: {0}")]
    InvalidSignerKey(String),

    #[error("invalid public route '{path}': {reason}")]
    InvalidRoute { path: String, reason: String },

    #[error("configuration file not found: {}", .0.display())]
    MissingFile(PathBuf),

    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to load configuration: {0}")]
    Figment(#[from] figment::Error),
}

/// MP-JWT authentication configuration.
///
/// Inline values take precedence over their `*_file` counterparts.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct JwtAuthConfig {
    /// Expected `iss` claim value.
    #[serde(default)]
    pub issuer: Option<String>,
    #[serde(default)]
    pub issuer_file: Option<PathBuf>,

    /// Signer RSA public key, as PEM or as a bare base64 body.
    #[serde(default)]
    pub signer_public_key: Option<String>,
    #[serde(default)]
    pub signer_public_key_file: Option<PathBuf>,

    /// Tolerated clock skew for `exp` and `nbf`, in seconds.
    #[serde(default = "default_exp_grace_period_secs")]
    pub exp_grace_period_secs: u64,

    /// If true, every route not listed in `public_routes` requires a valid token.
    #[serde(default = "default_require_auth_by_default")]
    pub require_auth_by_default: bool,

    /// Route patterns in `matchit` syntax (`/items/{id}`, `/static/{*path}`).
    #[serde(default)]
    pub public_routes: Vec<String>,

    /// Extra roles granted per token group.
    #[serde(default)]
    pub role_mappings: HashMap<String, Vec<String>>,
}

impl Default for JwtAuthConfig {
    fn default() -> Self {
        Self {
            issuer: None,
            issuer_file: None,
            signer_public_key: None,
            signer_public_key_file: None,
            exp_grace_period_secs: default_exp_grace_period_secs(),
            require_auth_by_default: default_require_auth_by_default(),
            public_routes: Vec::new(),
            role_mappings: HashMap::new(),
        }
    }
}

impl JwtAuthConfig {
    /// Load configuration from defaults, an optional YAML file, and
    /// `MPJWT_`-prefixed environment variables, in increasing priority.
    ///
    /// Nested keys use `__` in variable names, e.g. `MPJWT_ROLE_MAPPINGS__ADMINS`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingFile`] when `path` does not exist and
    /// [`ConfigError::Figment`] when a source cannot be parsed.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(path) = path {
            if !path.is_file() {
                return Err(ConfigError::MissingFile(path.to_path_buf()));
            }
            figment = figment.merge(Yaml::file(path));
        }
        let config: Self = figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;
        tracing::debug!(
            "Loaded MP-JWT configuration (grace period {}s)",
            config.exp_grace_period_secs
        );
        Ok(config)
    }
}

/// Resolved verification parameters shared by every request.
#[derive(Clone)]
pub struct AuthContext {
    issuer: String,
    decoding_key: DecodingKey,
    exp_grace_period_secs: u64,
}

impl AuthContext {
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidSignerKey`] when `public_key` does not
    /// hold an RSA public key.
    pub fn new(
        issuer: impl Into<String>,
        public_key: &str,
        exp_grace_period_secs: u64,
    ) -> Result<Self, ConfigError> {
        let pem = normalize_public_key(public_key);
        let decoding_key = DecodingKey::from_rsa_pem(pem.as_bytes())
            .map_err(|e| ConfigError::InvalidSignerKey(e.to_string()))?;
        Ok(Self {
            issuer: issuer.into(),
            decoding_key,
            exp_grace_period_secs,
        })
    }

    /// Resolve issuer and signer key from inline values or their files.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingIssuer`] or [`ConfigError::MissingSignerKey`]
    /// when neither source is set, [`ConfigError::Io`] when a file cannot be
    /// read, and [`ConfigError::InvalidSignerKey`] for a bad key.
    pub fn from_config(config: &JwtAuthConfig) -> Result<Self, ConfigError> {
        let issuer = resolve(config.issuer.as_deref(), config.issuer_file.as_deref())?
            .ok_or(ConfigError::MissingIssuer)?;
        let key = resolve(
            config.signer_public_key.as_deref(),
            config.signer_public_key_file.as_deref(),
        )?
        .ok_or(ConfigError::MissingSignerKey)?;
        Self::new(issuer, &key, config.exp_grace_period_secs)
    }

    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    #[must_use]
    pub fn decoding_key(&self) -> &DecodingKey {
        &self.decoding_key
    }

    #[must_use]
    pub fn exp_grace_period_secs(&self) -> u64 {
        self.exp_grace_period_secs
    }
}

impl fmt::Debug for AuthContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthContext")
            .field("issuer", &self.issuer)
            .field("exp_grace_period_secs", &self.exp_grace_period_secs)
            .finish_non_exhaustive()
    }
}

fn resolve(inline: Option<&str>, file: Option<&Path>) -> Result<Option<String>, ConfigError> {
    if let Some(value) = inline.map(str::trim).filter(|v| !v.is_empty()) {
        return Ok(Some(value.to_owned()));
    }
    let Some(path) = file else {
        return Ok(None);
    };
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let contents = contents.trim();
    Ok((!contents.is_empty()).then(|| contents.to_owned()))
}

/// Rebuild a PEM document from a PEM or bare base64 public key.
///
/// Keys passed through URL-decoding layers arrive with `+` turned into
/// spaces; those are restored before the body is rewrapped.
pub(crate) fn normalize_public_key(key: &str) -> String {
    let mut label = PEM_LABEL;
    let mut body = String::with_capacity(key.len());
    for line in key.lines() {
        if let Some(header) = line
            .trim()
            .strip_prefix("-----BEGIN ")
            .and_then(|rest| rest.strip_suffix("-----"))
        {
            label = header;
        } else if !line.trim_start().starts_with("-----END ") {
            body.push_str(line.trim_end_matches('\r'));
        }
    }
    let body: String = body
        .trim()
        .replace(' ', "+")
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();

    let mut pem = format!("-----BEGIN {label}-----\n");
    for chunk in body.as_bytes().chunks(64) {
        pem.push_str(&String::from_utf8_lossy(chunk));
        pem.push('\n');
    }
    pem.push_str(&format!("-----END {label}-----\n"));
    pem
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use figment::Jail;

    const PUBLIC_KEY: &str = include_str!("../tests/keys/signer-public.pem");

    fn bare_body() -> String {
        PUBLIC_KEY
            .lines()
            .filter(|l| !l.starts_with("-----"))
            .collect()
    }

    #[test]
    fn pem_and_bare_body_normalize_identically() {
        assert_eq!(
            normalize_public_key(PUBLIC_KEY),
            normalize_public_key(&bare_body())
        );
        assert!(normalize_public_key(&bare_body()).starts_with("-----BEGIN PUBLIC KEY-----\n"));
    }

    #[test]
    fn spaces_are_restored_to_plus() {
        let body = bare_body();
        assert!(body.contains('+'), "fixture key should contain '+'");
        let mangled = body.replace('+', " ");
        assert_eq!(normalize_public_key(&mangled), normalize_public_key(&body));
        assert!(AuthContext::new("iss", &mangled, 60).is_ok());
    }

    #[test]
    fn pkcs1_label_is_kept() {
        let pem = "-----BEGIN RSA PUBLIC KEY-----\nAAAA\n-----END RSA PUBLIC KEY-----\n";
        assert!(normalize_public_key(pem).starts_with("-----BEGIN RSA PUBLIC KEY-----"));
    }

    #[test]
    fn garbage_key_is_rejected() {
        assert!(matches!(
            AuthContext::new("iss", "not-a-key", 60),
            Err(ConfigError::InvalidSignerKey(_))
        ));
    }

    #[test]
    fn missing_issuer_or_key_is_fatal() {
        let config = JwtAuthConfig {
            signer_public_key: Some(PUBLIC_KEY.to_owned()),
            ..JwtAuthConfig::default()
        };
        assert!(matches!(
            AuthContext::from_config(&config),
            Err(ConfigError::MissingIssuer)
        ));

        let config = JwtAuthConfig {
            issuer: Some("https://server.example.com".to_owned()),
            ..JwtAuthConfig::default()
        };
        assert!(matches!(
            AuthContext::from_config(&config),
            Err(ConfigError::MissingSignerKey)
        ));
    }

    #[test]
    fn files_back_inline_values() {
        Jail::expect_with(|jail| {
            jail.create_file("issuer.txt", "https://server.example.com\n")?;
            jail.create_file("signer.pem", PUBLIC_KEY)?;
            let config = JwtAuthConfig {
                issuer_file: Some(jail.directory().join("issuer.txt")),
                signer_public_key_file: Some(jail.directory().join("signer.pem")),
                ..JwtAuthConfig::default()
            };
            let ctx = AuthContext::from_config(&config).unwrap();
            assert_eq!(ctx.issuer(), "https://server.example.com");
            assert_eq!(ctx.exp_grace_period_secs(), 60);
            Ok(())
        });
    }

    #[test]
    fn unreadable_file_is_reported() {
        let config = JwtAuthConfig {
            issuer_file: Some(PathBuf::from("/nonexistent/issuer.txt")),
            ..JwtAuthConfig::default()
        };
        assert!(matches!(
            AuthContext::from_config(&config),
            Err(ConfigError::Io { .. })
        ));
    }

    #[test]
    fn yaml_then_env_overrides() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "mpjwt.yaml",
                r"
issuer: https://server.example.com
exp_grace_period_secs: 30
public_routes:
  - /endp/health
role_mappings:
  group1:
    - Group1MappedRole
",
            )?;
            jail.set_env("MPJWT_EXP_GRACE_PERIOD_SECS", "5");
            jail.set_env("MPJWT_REQUIRE_AUTH_BY_DEFAULT", "false");

            let config = JwtAuthConfig::load(Some(Path::new("mpjwt.yaml"))).unwrap();
            assert_eq!(config.issuer.as_deref(), Some("https://server.example.com"));
            assert_eq!(config.exp_grace_period_secs, 5);
            assert!(!config.require_auth_by_default);
            assert_eq!(config.public_routes, vec!["/endp/health".to_owned()]);
            assert_eq!(
                config.role_mappings["group1"],
                vec!["Group1MappedRole".to_owned()]
            );
            Ok(())
        });
    }

    #[test]
    fn defaults_without_file() {
        Jail::expect_with(|_| {
            let config = JwtAuthConfig::load(None).unwrap();
            assert_eq!(config.exp_grace_period_secs, 60);
            assert!(config.require_auth_by_default);
            assert!(config.public_routes.is_empty());
            Ok(())
        });
    }

    #[test]
    fn unknown_keys_are_rejected() {
        Jail::expect_with(|jail| {
            jail.create_file("mpjwt.yaml", "issuer: x\nissuedBy: y\n")?;
            assert!(matches!(
                JwtAuthConfig::load(Some(Path::new("mpjwt.yaml"))),
                Err(ConfigError::Figment(_))
            ));
            Ok(())
        });
    }

    #[test]
    fn missing_config_file_is_reported() {
        assert!(matches!(
            JwtAuthConfig::load(Some(Path::new("/nonexistent/mpjwt.yaml"))),
            Err(ConfigError::MissingFile(_))
        ));
    }
}
