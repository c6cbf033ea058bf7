//! TLS client identity loaded from a PKCS#12 keystore
//!
//! A [`ClientIdentity`] is validated once at load time (file readable,
//! password correct) and is read-only afterwards, so it can be shared across
//! any number of tasks through an `Arc`.

use openssl::nid::Nid;
use openssl::pkcs12::Pkcs12;
use openssl::x509::X509Ref;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{EngineError, Result};

pub struct ClientIdentity {
    aliases: Vec<String>,
    file: PathBuf,
    password: String,
    der: Vec<u8>,
}

impl ClientIdentity {
    /// Open the keystore at `file` and unlock it with `password`.
    ///
    /// Fails with [`EngineError::InvalidCertificate`] when the file is
    /// missing or unreadable, is not a PKCS#12 store, or the password does
    /// not unlock it. Aliases come from the certificates' friendly names,
    /// end-entity certificate first, then the CA chain.
    pub fn load(file: impl AsRef<Path>, password: &str) -> Result<Self> {
        let file = file.as_ref().to_path_buf();
        let invalid = |reason: String| EngineError::InvalidCertificate {
            path: file.clone(),
            reason,
        };

        let der = fs::read(&file).map_err(|e| invalid(format!("cannot read file: {e}")))?;

        let parsed = Pkcs12::from_der(&der)
            .map_err(|e| invalid(format!("not a PKCS#12 keystore: {e}")))?
            .parse2(password)
            .map_err(|e| {
                debug!(path = %file.display(), error = %e, "Keystore rejected password");
                invalid("keystore could not be unlocked with the given password".to_string())
            })?;

        let mut aliases: Vec<String> = Vec::new();
        let certs = parsed
            .cert
            .iter()
            .map(|c| &**c)
            .chain(parsed.ca.iter().flat_map(|stack| stack.iter()));

        for (position, cert) in certs.enumerate() {
            let alias = alias_of(cert).unwrap_or_else(|| position.to_string());
            if !aliases.contains(&alias) {
                aliases.push(alias);
            }
        }

        if aliases.is_empty() {
            return Err(invalid("keystore contains no certificates".to_string()));
        }

        info!(path = %file.display(), count = aliases.len(), "Loaded client certificate store");

        Ok(Self {
            aliases,
            file,
            password: password.to_string(),
            der,
        })
    }

    /// Certificate aliases in store order
    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    pub fn contains(&self, alias: &str) -> bool {
        self.aliases.iter().any(|a| a == alias)
    }

    pub fn file(&self) -> &Path {
        &self.file
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    /// TLS identity for the HTTP client
    pub fn tls_identity(&self) -> std::result::Result<reqwest::Identity, reqwest::Error> {
        reqwest::Identity::from_pkcs12_der(&self.der, &self.password)
    }
}

fn alias_of(cert: &X509Ref) -> Option<String> {
    if let Some(alias) = cert.alias() {
        return Some(String::from_utf8_lossy(alias).into_owned());
    }

    cert.subject_name()
        .entries_by_nid(Nid::COMMONNAME)
        .next()
        .map(|entry| String::from_utf8_lossy(entry.data().as_slice()).into_owned())
}

impl fmt::Debug for ClientIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientIdentity")
            .field("aliases", &self.aliases)
            .field("file", &self.file)
            .field("password", &"***")
            .finish()
    }
}
