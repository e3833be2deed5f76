use std::fs;
use std::path::Path;

use url::Url;
use uuid::Uuid;

/// Wire protocol version sent as the `v` query parameter.
pub const PROTOCOL_VERSION: &str = "0.0.1";

/// Immutable per-process client identity.
///
/// Built once when the client is constructed and shared by reference across
/// all collectors and transport calls. Never mutated afterwards.
#[derive(Debug, Clone)]
pub struct ClientIdentity {
    pub protocol_version: &'static str,
    pub platform: &'static str,
    /// Stable per-device identifier, persisted across runs when a state path
    /// is configured.
    pub install_id: String,
    /// Fresh identifier for this process.
    pub session_id: String,
    pub token: String,
    pub context: Option<String>,
}

impl ClientIdentity {
    pub fn new(token: String, context: Option<String>, state_path: Option<&Path>) -> Self {
        Self {
            protocol_version: PROTOCOL_VERSION,
            platform: std::env::consts::OS,
            install_id: load_or_create_install_id(state_path),
            session_id: Uuid::new_v4().to_string(),
            token,
            context,
        }
    }

    /// Append the common query parameters (`v`, `t`, `s`, `tk`, and `cd` when
    /// context data is set) to a request URL.
    pub fn append_query_params(&self, url: &mut Url) {
        let mut pairs = url.query_pairs_mut();
        pairs.append_pair("v", self.protocol_version);
        pairs.append_pair("t", self.platform);
        pairs.append_pair("s", &self.session_id);
        pairs.append_pair("tk", &self.token);
        if let Some(context) = &self.context {
            pairs.append_pair("cd", context);
        }
    }
}

/// Load the install id from the state file, creating it on first use.
///
/// Any I/O failure degrades to an ephemeral id so that identity construction
/// never fails.
fn load_or_create_install_id(state_path: Option<&Path>) -> String {
    let path = match state_path {
        Some(path) => path,
        None => return Uuid::new_v4().to_string(),
    };

    if let Ok(contents) = fs::read_to_string(path) {
        let stored = contents.trim();
        if Uuid::parse_str(stored).is_ok() {
            log::debug!("loaded install id from {}", path.display());
            return stored.to_string();
        }
        log::warn!("state file {} is not a valid install id, regenerating", path.display());
    }

    let fresh = Uuid::new_v4().to_string();

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            if let Err(e) = fs::create_dir_all(parent) {
                log::warn!("failed to create state directory {}: {e}", parent.display());
                return fresh;
            }
        }
    }

    match fs::write(path, &fresh) {
        Ok(()) => log::debug!("wrote new install id to {}", path.display()),
        Err(e) => log::warn!("failed to persist install id to {}: {e}", path.display()),
    }

    fresh
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn identity_with_state(state_path: Option<&Path>) -> ClientIdentity {
        ClientIdentity::new("test-token".to_string(), None, state_path)
    }

    #[test]
    fn test_install_id_created_and_stable() {
        let dir = TempDir::new().unwrap();
        let state = dir.path().join("state").join("install-id");

        let first = identity_with_state(Some(&state));
        let second = identity_with_state(Some(&state));

        assert_eq!(first.install_id, second.install_id);
        assert!(Uuid::parse_str(&first.install_id).is_ok());
    }

    #[test]
    fn test_session_id_fresh_per_process() {
        let a = identity_with_state(None);
        let b = identity_with_state(None);
        assert_ne!(a.session_id, b.session_id);
    }

    #[test]
    fn test_corrupt_state_file_regenerated() {
        let dir = TempDir::new().unwrap();
        let state = dir.path().join("install-id");
        fs::write(&state, "not a uuid").unwrap();

        let identity = identity_with_state(Some(&state));
        assert!(Uuid::parse_str(&identity.install_id).is_ok());

        // The regenerated id is persisted for the next run.
        let stored = fs::read_to_string(&state).unwrap();
        assert_eq!(stored.trim(), identity.install_id);
    }

    #[test]
    fn test_unwritable_state_degrades_to_ephemeral() {
        let identity = identity_with_state(Some(Path::new("/proc/no-such-dir/install-id")));
        assert!(Uuid::parse_str(&identity.install_id).is_ok());
    }

    #[test]
    fn test_query_params() {
        let mut identity = identity_with_state(None);
        identity.context = Some("signup-form".to_string());

        let mut url = Url::parse("https://in.example.com/r/bundle").unwrap();
        identity.append_query_params(&mut url);

        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        assert_eq!(pairs[0], ("v".to_string(), PROTOCOL_VERSION.to_string()));
        assert_eq!(pairs[1], ("t".to_string(), std::env::consts::OS.to_string()));
        assert_eq!(pairs[2], ("s".to_string(), identity.session_id.clone()));
        assert_eq!(pairs[3], ("tk".to_string(), "test-token".to_string()));
        assert_eq!(pairs[4], ("cd".to_string(), "signup-form".to_string()));
    }

    #[test]
    fn test_context_omitted_when_unset() {
        let identity = identity_with_state(None);
        let mut url = Url::parse("https://in.example.com/r/bundle").unwrap();
        identity.append_query_params(&mut url);
        assert!(!url.query_pairs().any(|(k, _)| k == "cd"));
    }
}
