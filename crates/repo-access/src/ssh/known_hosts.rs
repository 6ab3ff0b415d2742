//! Host key verification against an OpenSSH `known_hosts` file.

use std::path::{Path, PathBuf};

use russh::keys::HashAlg;

use crate::auth::{HostKey, HostVerifier};

/// Trusts the keys listed in a `known_hosts` file.
///
/// Hosts on port 22 are looked up by name; other ports use the
/// `[host]:port` form, as OpenSSH writes them. Hashed host names and
/// `@cert-authority`/`@revoked` markers are not supported and never match.
#[derive(Debug, Clone)]
pub struct KnownHosts {
    path: PathBuf,
}

impl KnownHosts {
    /// Use the file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `$SSH_KNOWN_HOSTS`, or `~/.ssh/known_hosts`.
    #[must_use]
    pub fn default_location() -> Self {
        if let Ok(path) = std::env::var("SSH_KNOWN_HOSTS") {
            return Self::new(path);
        }
        let home = std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string());
        Self::new(PathBuf::from(home).join(".ssh").join("known_hosts"))
    }

    /// The file this verifier reads.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl HostVerifier for KnownHosts {
    fn verify(&self, host: &str, port: u16, key: &HostKey) -> bool {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) => {
                tracing::warn!(
                    host = %host,
                    path = %self.path.display(),
                    error = %e,
                    "Cannot read known_hosts, rejecting key"
                );
                return false;
            }
        };
        check(&contents, host, port, key)
    }
}

fn host_pattern(host: &str, port: u16) -> String {
    if port == 22 {
        host.to_string()
    } else {
        format!("[{host}]:{port}")
    }
}

/// Accept only if an entry for the host carries a key with the same
/// algorithm and SHA-256 fingerprint.
fn check(contents: &str, host: &str, port: u16, key: &HostKey) -> bool {
    let pattern = host_pattern(host, port);
    let mut listed = false;

    for line in contents.lines().map(str::trim) {
        if line.is_empty() || line.starts_with('#') || line.starts_with('@') {
            continue;
        }
        let mut fields = line.split_whitespace();
        let (Some(hosts), Some(key_type), Some(key_data)) =
            (fields.next(), fields.next(), fields.next())
        else {
            continue;
        };
        if !hosts.split(',').any(|h| h == pattern) {
            continue;
        }

        listed = true;
        if key_type != key.algorithm {
            continue;
        }
        if fingerprint(key_data).is_some_and(|stored| stored == key.fingerprint) {
            tracing::debug!(host = %host, "Host key verified against known_hosts");
            return true;
        }
    }

    if listed {
        tracing::error!(host = %host, "HOST KEY MISMATCH! Possible man-in-the-middle attack!");
    } else {
        tracing::warn!(host = %host, "Host not found in known_hosts file");
    }
    false
}

fn fingerprint(key_data: &str) -> Option<String> {
    russh::keys::parse_public_key_base64(key_data)
        .ok()
        .map(|key| key.fingerprint(HashAlg::Sha256).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY_DATA: &str = "AAAAC3NzaC1lZDI1NTE5AAAAIL37/bJ7jAjTse+NK0wAOKeB8k6eIi8keQ0L4ZTyeENf";
    const FINGERPRINT: &str = "SHA256:enL95wmSguJmbBttoFo8l8WCL8DKmrz3unRSkZttJKs";

    fn key() -> HostKey {
        HostKey::new("ssh-ed25519", FINGERPRINT)
    }

    #[test]
    fn fingerprint_matches_openssh() {
        assert_eq!(fingerprint(KEY_DATA).as_deref(), Some(FINGERPRINT));
        assert_eq!(fingerprint("not base64!"), None);
    }

    #[test]
    fn accepts_listed_key() {
        let contents = format!("# comment\n\nother.example.com,svn.example.com ssh-ed25519 {KEY_DATA}\n");
        assert!(check(&contents, "svn.example.com", 22, &key()));
        assert!(!check(&contents, "svn.example.com", 2222, &key()));
    }

    #[test]
    fn non_default_port_uses_bracket_form() {
        let contents = format!("[svn.example.com]:2222 ssh-ed25519 {KEY_DATA}");
        assert!(check(&contents, "svn.example.com", 2222, &key()));
        assert!(!check(&contents, "svn.example.com", 22, &key()));
    }

    #[test]
    fn rejects_other_key_for_listed_host() {
        let contents = format!("svn.example.com ssh-ed25519 {KEY_DATA}");
        let other = HostKey::new("ssh-ed25519", "SHA256:somethingelse");
        assert!(!check(&contents, "svn.example.com", 22, &other));

        let wrong_type = HostKey::new("ssh-rsa", FINGERPRINT);
        assert!(!check(&contents, "svn.example.com", 22, &wrong_type));
    }

    #[test]
    fn missing_file_rejects() {
        let verifier = KnownHosts::new("/nonexistent/known_hosts");
        assert!(!verifier.verify("svn.example.com", 22, &key()));
    }
}
