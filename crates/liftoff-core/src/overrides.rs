use std::collections::BTreeMap;
use std::path::Path;

/// Keys recognized by [`DeploymentConfig::resolve`](crate::DeploymentConfig::resolve).
///
/// [`Overrides::from_pairs`] ignores anything else, which is what lets the
/// process environment be used as a layer directly. `liftoff.toml` is
/// stricter and rejects unknown keys.
pub const RECOGNIZED_KEYS: &[&str] = &[
    "MODE",
    "PROJECT_ID",
    "REGION",
    "SERVICE_NAME",
    "REPO_NAME",
    "IMAGE_NAME",
    "TAG",
    "SERVICE_ACCOUNT",
    "MEMORY",
    "CPU",
    "CONCURRENCY",
    "TIMEOUT",
    "MIN_INSTANCES",
    "MAX_INSTANCES",
    "PORT",
    "INGRESS",
    "ALLOW_UNAUTHENTICATED",
    "INVOKER",
    "SECRET_NAME",
    "SECRET_ENV_VAR",
    "SECRET_VALUE",
    "ENV_VARS",
    "ENVIRONMENT",
    "SOURCE_DIR",
    "DESCRIPTOR_TEMPLATE",
    "HEALTH_PATH",
    "DOCS_PATH",
    "INVOKE_PATH",
    "INVOKE_BODY",
];

/// Project-level defaults file, lowest-precedence input layer.
pub const CONFIG_FILE: &str = "liftoff.toml";

/// Layered key/value input for the configuration resolver.
///
/// Later layers win: `defaults.layer(file).layer(env).layer(flags)`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    values: BTreeMap<String, String>,
}

impl Overrides {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect recognized keys from arbitrary pairs, dropping the rest.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let values = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .filter(|(k, _)| RECOGNIZED_KEYS.contains(&k.as_str()))
            .collect();
        Self { values }
    }

    /// Parse a flat TOML table whose keys are the lowercase key names.
    ///
    /// Unknown keys are an error so a misspelt setting cannot silently
    /// fall back to its default.
    ///
    /// ```
    /// use liftoff_core::Overrides;
    ///
    /// let o = Overrides::from_toml_str("region = \"europe-west1\"\nmax_instances = 5", "liftoff.toml".as_ref()).unwrap();
    /// assert_eq!(o.get("REGION"), Some("europe-west1"));
    /// assert_eq!(o.get("MAX_INSTANCES"), Some("5"));
    /// ```
    pub fn from_toml_str(content: &str, path: &Path) -> crate::Result<Self> {
        let table: toml::Table = toml::from_str(content).map_err(|e| crate::Error::ConfigParse {
            path: path.to_path_buf(),
            source: e,
        })?;

        let mut pairs = Vec::with_capacity(table.len());
        for (key, value) in table {
            let value = match value {
                toml::Value::String(s) => s,
                toml::Value::Integer(i) => i.to_string(),
                toml::Value::Float(f) => f.to_string(),
                toml::Value::Boolean(b) => b.to_string(),
                _ => {
                    return Err(crate::Error::ConfigValueType {
                        path: path.to_path_buf(),
                        key,
                    });
                }
            };
            let name = key.to_ascii_uppercase();
            if !RECOGNIZED_KEYS.contains(&name.as_str()) {
                return Err(crate::Error::UnknownConfigKey {
                    path: path.to_path_buf(),
                    key,
                });
            }
            pairs.push((name, value));
        }
        Ok(Self::from_pairs(pairs))
    }

    /// Load `liftoff.toml` from `dir`, or an empty layer if there is none.
    pub fn load_file(dir: &Path) -> crate::Result<Self> {
        let path = dir.join(CONFIG_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(&path).map_err(|e| crate::Error::ConfigLoad {
            path: path.clone(),
            source: e,
        })?;
        Self::from_toml_str(&content, &path)
    }

    /// Read a dotenv file without touching the process environment.
    ///
    /// A missing file is an empty layer unless `required` is set.
    pub fn load_env_file(path: &Path, required: bool) -> crate::Result<Self> {
        if !required && !path.exists() {
            return Ok(Self::default());
        }
        let env_error = |e| crate::Error::EnvFile {
            path: path.to_path_buf(),
            source: e,
        };

        let mut pairs = Vec::new();
        for item in dotenvy::from_path_iter(path).map_err(env_error)? {
            pairs.push(item.map_err(env_error)?);
        }
        Ok(Self::from_pairs(pairs))
    }

    /// Overlay `other` on top of `self`.
    pub fn layer(mut self, other: Overrides) -> Self {
        self.values.extend(other.values);
        self
    }

    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        self.values.insert(key.to_owned(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Like [`get`](Self::get), but blank values count as unset.
    pub fn non_empty(&self, key: &str) -> Option<&str> {
        self.get(key).map(str::trim).filter(|v| !v.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
