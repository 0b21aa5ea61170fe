//! # Configuration
//!
//! Resolves one immutable [`Config`] from three layers, highest precedence
//! first:
//!
//! 1. CLI override tokens (`NAME=value` or bare `NAME`)
//! 2. Environment variables with the same name as a property
//! 3. The JSON configuration file, overlaid on built-in defaults
//!
//! The type of every property is fixed by its default. Override text is
//! parsed with the parser for that type; a value of any other type aborts
//! loading.
//!
//! ## Example
//!
//! ```no_run
//! use org_control::config;
//!
//! # fn example() -> Result<(), org_control::ConfigError> {
//! let args = vec!["DRY_RUN=true".to_string()];
//! let config = config::init("config.json", &args)?;
//! assert!(config.dry_run());
//! # Ok(())
//! # }
//! ```

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::Path;
use std::sync::OnceLock;

use serde::de::{Deserializer, MapAccess, Visitor};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::classify::AffiliationPolicy;
use crate::error::ConfigError;
use crate::teams::TeamLabelStrategy;

pub const DRY_RUN: &str = "DRY_RUN";
pub const GITHUB_ORGANIZATION: &str = "GITHUB_ORGANIZATION";
pub const GITHUB_REPO: &str = "GITHUB_REPO";
pub const PROXIES: &str = "PROXIES";
pub const TEAM_TO_LABEL: &str = "TEAM_TO_LABEL";
pub const TEAM_LABEL_STRATEGY: &str = "TEAM_LABEL_STRATEGY";
pub const AFFILIATED_EMAIL_DOMAINS: &str = "AFFILIATED_EMAIL_DOMAINS";
pub const AFFILIATED_COMPANIES: &str = "AFFILIATED_COMPANIES";
pub const LABEL_ORG_MEMBER_PRS: &str = "LABEL_ORG_MEMBER_PRS";
pub const WORKERS: &str = "WORKERS";

static CONFIG: OnceLock<Config> = OnceLock::new();

/// Load the process-wide configuration once.
///
/// The first successful call wins; later calls return the already resolved
/// snapshot and ignore their arguments.
pub fn init(path: impl AsRef<Path>, cli_args: &[String]) -> Result<&'static Config, ConfigError> {
    if let Some(config) = CONFIG.get() {
        debug!("Configuration already initialized, ignoring new arguments");
        return Ok(config);
    }
    let config = Config::load(path, cli_args)?;
    Ok(CONFIG.get_or_init(|| config))
}

/// The process-wide configuration, if [`init`] has succeeded
pub fn get() -> Option<&'static Config> {
    CONFIG.get()
}

/// Runtime type of a property, taken from its default value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyKind {
    Null,
    Bool,
    Integer,
    Float,
    String,
    Array,
    Object,
}

impl PropertyKind {
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(_) => Self::Bool,
            Value::Number(n) if n.is_f64() => Self::Float,
            Value::Number(_) => Self::Integer,
            Value::String(_) => Self::String,
            Value::Array(_) => Self::Array,
            Value::Object(_) => Self::Object,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool => "bool",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::String => "string",
            Self::Array => "array",
            Self::Object => "object",
        }
    }

    /// Parse override text as a literal of this kind
    fn parse(self, text: &str) -> Option<Value> {
        let text = text.trim();
        match self {
            Self::Null => matches!(text, "null" | "None").then_some(Value::Null),
            Self::Bool => {
                if text.eq_ignore_ascii_case("true") {
                    Some(Value::Bool(true))
                } else if text.eq_ignore_ascii_case("false") {
                    Some(Value::Bool(false))
                } else {
                    None
                }
            }
            Self::Integer => text.parse::<i64>().ok().map(Value::from),
            Self::Float => text
                .parse::<f64>()
                .ok()
                .and_then(serde_json::Number::from_f64)
                .map(Value::Number),
            Self::String => Some(Value::String(unquote(text).to_string())),
            Self::Array | Self::Object => serde_json::from_str(text).ok(),
        }
    }
}

impl fmt::Display for PropertyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn unquote(text: &str) -> &str {
    for quote in ['"', '\''] {
        if text.len() >= 2 && text.starts_with(quote) && text.ends_with(quote) {
            return &text[1..text.len() - 1];
        }
    }
    text
}

/// A CLI override token
#[derive(Debug, Clone, PartialEq, Eq)]
enum Override {
    /// Bare `NAME`
    Flag,
    /// `NAME=value`
    Text(String),
}

/// Properties the file may omit, with their defaults
fn builtin_defaults() -> BTreeMap<String, Value> {
    BTreeMap::from([
        (TEAM_LABEL_STRATEGY.to_string(), Value::from("map")),
        (AFFILIATED_EMAIL_DOMAINS.to_string(), Value::from(vec!["intel.com"])),
        (AFFILIATED_COMPANIES.to_string(), Value::from(vec!["intel"])),
        (LABEL_ORG_MEMBER_PRS.to_string(), Value::Bool(true)),
        (WORKERS.to_string(), Value::from(1)),
    ])
}

/// Top-level entries of a configuration file, in file order, duplicates kept
struct FileEntries(Vec<(String, Value)>);

impl<'de> Deserialize<'de> for FileEntries {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct EntriesVisitor;

        impl<'de> Visitor<'de> for EntriesVisitor {
            type Value = FileEntries;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a JSON object of configuration properties")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<FileEntries, A::Error> {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some(entry) = map.next_entry::<String, serde_json::Value>()? {
                    entries.push(entry);
                }
                Ok(FileEntries(entries))
            }
        }

        deserializer.deserialize_map(EntriesVisitor)
    }
}

/// Parse configuration file contents into ordered top-level entries
pub fn parse_entries(contents: &str, path: &Path) -> Result<Vec<(String, Value)>, ConfigError> {
    serde_json::from_str::<FileEntries>(contents)
        .map(|entries| entries.0)
        .map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
}

/// Resolved, validated configuration
#[derive(Debug, Clone)]
pub struct Config {
    properties: BTreeMap<String, Value>,
    dry_run: bool,
    github_organization: String,
    github_repo: String,
    proxies: BTreeMap<String, Option<String>>,
    team_to_label: BTreeMap<String, String>,
    team_label_strategy: TeamLabelStrategy,
    affiliation: AffiliationPolicy,
    label_org_member_prs: bool,
    workers: usize,
}

impl Config {
    /// Load from a file, CLI tokens and the process environment, then export
    /// the configured proxies.
    pub fn load(path: impl AsRef<Path>, cli_args: &[String]) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let entries = parse_entries(&contents, path)?;
        let config = Self::resolve(entries, cli_args, |name| std::env::var(name).ok())?;
        info!(path = %path.display(), "Configuration loaded");
        config.apply_proxies();
        Ok(config)
    }

    /// Resolve file entries against CLI tokens and an environment lookup.
    ///
    /// Performs no I/O; `env` stands in for the process environment.
    pub fn resolve<F>(
        file_entries: Vec<(String, Value)>,
        cli_args: &[String],
        env: F,
    ) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut defaults = builtin_defaults();
        let mut declared = HashSet::new();
        for (name, value) in file_entries {
            if !declared.insert(name.clone()) {
                return Err(ConfigError::DuplicateProperty(name));
            }
            defaults.insert(name, value);
        }

        let overrides = parse_cli_args(cli_args, &defaults)?;

        let mut properties = BTreeMap::new();
        for (name, default) in defaults {
            let value = match overrides.get(&name) {
                Some(Override::Flag) => Some(Value::Bool(true)),
                Some(Override::Text(text)) if !text.is_empty() => Some(coerce(&default, text)),
                _ => env(&name)
                    .filter(|v| !v.is_empty())
                    .map(|text| coerce(&default, &text)),
            };
            let value = match value {
                Some(value) => {
                    check_kind(&name, PropertyKind::of(&default), &value)?;
                    debug!(property = %name, "Property overridden");
                    value
                }
                None => default,
            };
            properties.insert(name, value);
        }

        Self::from_properties(properties)
    }

    fn from_properties(properties: BTreeMap<String, Value>) -> Result<Self, ConfigError> {
        let github_repo = required_str(&properties, GITHUB_REPO)?.to_string();
        if github_repo.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                name: GITHUB_REPO.to_string(),
                reason: "repository name must not be empty".to_string(),
            });
        }

        let team_label_strategy = required_str(&properties, TEAM_LABEL_STRATEGY)?
            .parse()
            .map_err(|reason| ConfigError::InvalidValue {
                name: TEAM_LABEL_STRATEGY.to_string(),
                reason,
            })?;

        let workers = required_int(&properties, WORKERS)?;
        let workers = usize::try_from(workers)
            .ok()
            .filter(|w| *w > 0)
            .ok_or_else(|| ConfigError::InvalidValue {
                name: WORKERS.to_string(),
                reason: format!("expected a positive worker count, got {workers}"),
            })?;

        Ok(Self {
            dry_run: required_bool(&properties, DRY_RUN)?,
            github_organization: required_str(&properties, GITHUB_ORGANIZATION)?.to_string(),
            github_repo,
            proxies: proxy_map(&properties)?,
            team_to_label: string_map(&properties, TEAM_TO_LABEL)?,
            team_label_strategy,
            affiliation: AffiliationPolicy::new(
                string_list(&properties, AFFILIATED_EMAIL_DOMAINS)?,
                string_list(&properties, AFFILIATED_COMPANIES)?,
            ),
            label_org_member_prs: required_bool(&properties, LABEL_ORG_MEMBER_PRS)?,
            workers,
            properties,
        })
    }

    /// All resolved properties by name
    pub fn properties(&self) -> &BTreeMap<String, Value> {
        &self.properties
    }

    /// A single resolved property
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }

    pub fn dry_run(&self) -> bool {
        self.dry_run
    }

    pub fn github_organization(&self) -> &str {
        &self.github_organization
    }

    pub fn github_repo(&self) -> &str {
        &self.github_repo
    }

    pub fn proxies(&self) -> &BTreeMap<String, Option<String>> {
        &self.proxies
    }

    pub fn team_to_label(&self) -> &BTreeMap<String, String> {
        &self.team_to_label
    }

    pub fn team_label_strategy(&self) -> TeamLabelStrategy {
        self.team_label_strategy
    }

    pub fn affiliation(&self) -> &AffiliationPolicy {
        &self.affiliation
    }

    /// Whether organization members get their type label written
    pub fn label_org_member_prs(&self) -> bool {
        self.label_org_member_prs
    }

    /// Maximum number of PRs processed concurrently
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Proxy variables with a value, as `(name, url)` pairs
    pub fn proxy_exports(&self) -> impl Iterator<Item = (&str, &str)> {
        self.proxies
            .iter()
            .filter_map(|(name, url)| url.as_deref().map(|url| (name.as_str(), url)))
    }

    /// Export every non-null proxy into the process environment
    pub fn apply_proxies(&self) {
        for (name, url) in self.proxy_exports() {
            info!(proxy = name, url, "Set proxy");
            std::env::set_var(name, url);
        }
    }
}

fn parse_cli_args(
    cli_args: &[String],
    defaults: &BTreeMap<String, Value>,
) -> Result<BTreeMap<String, Override>, ConfigError> {
    let mut overrides = BTreeMap::new();
    for arg in cli_args {
        let (name, value) = match arg.split_once('=') {
            Some((name, value)) => (name, Override::Text(value.to_string())),
            None => (arg.as_str(), Override::Flag),
        };
        if !defaults.contains_key(name) {
            return Err(ConfigError::UnsupportedArgument(arg.clone()));
        }
        overrides.insert(name.to_string(), value);
    }
    Ok(overrides)
}

/// Parse override text with the parser of the default's kind, falling back to
/// the raw string when it does not parse.
fn coerce(default: &Value, text: &str) -> Value {
    PropertyKind::of(default)
        .parse(text)
        .unwrap_or_else(|| Value::String(text.to_string()))
}

fn check_kind(name: &str, expected: PropertyKind, value: &Value) -> Result<(), ConfigError> {
    if PropertyKind::of(value) == expected {
        Ok(())
    } else {
        Err(mismatch(name, expected, value))
    }
}

fn mismatch(name: &str, expected: PropertyKind, value: &Value) -> ConfigError {
    ConfigError::TypeMismatch {
        name: name.to_string(),
        expected: expected.name(),
        value: match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        },
    }
}

fn required<'a>(
    properties: &'a BTreeMap<String, Value>,
    name: &'static str,
) -> Result<&'a Value, ConfigError> {
    properties
        .get(name)
        .ok_or(ConfigError::MissingProperty(name))
}

fn required_bool(properties: &BTreeMap<String, Value>, name: &'static str) -> Result<bool, ConfigError> {
    let value = required(properties, name)?;
    value
        .as_bool()
        .ok_or_else(|| mismatch(name, PropertyKind::Bool, value))
}

fn required_int(properties: &BTreeMap<String, Value>, name: &'static str) -> Result<i64, ConfigError> {
    let value = required(properties, name)?;
    value
        .as_i64()
        .ok_or_else(|| mismatch(name, PropertyKind::Integer, value))
}

fn required_str<'a>(
    properties: &'a BTreeMap<String, Value>,
    name: &'static str,
) -> Result<&'a str, ConfigError> {
    let value = required(properties, name)?;
    value
        .as_str()
        .ok_or_else(|| mismatch(name, PropertyKind::String, value))
}

fn string_map(
    properties: &BTreeMap<String, Value>,
    name: &'static str,
) -> Result<BTreeMap<String, String>, ConfigError> {
    let value = required(properties, name)?;
    let object = value
        .as_object()
        .ok_or_else(|| mismatch(name, PropertyKind::Object, value))?;
    object
        .iter()
        .map(|(key, v)| match v.as_str() {
            Some(s) => Ok((key.clone(), s.to_string())),
            None => Err(mismatch(&format!("{name}.{key}"), PropertyKind::String, v)),
        })
        .collect()
}

fn proxy_map(
    properties: &BTreeMap<String, Value>,
) -> Result<BTreeMap<String, Option<String>>, ConfigError> {
    let value = required(properties, PROXIES)?;
    let object = value
        .as_object()
        .ok_or_else(|| mismatch(PROXIES, PropertyKind::Object, value))?;
    object
        .iter()
        .map(|(key, v)| match v {
            Value::Null => Ok((key.clone(), None)),
            Value::String(url) => Ok((key.clone(), Some(url.clone()))),
            other => Err(mismatch(
                &format!("{PROXIES}.{key}"),
                PropertyKind::String,
                other,
            )),
        })
        .collect()
}

fn string_list(
    properties: &BTreeMap<String, Value>,
    name: &'static str,
) -> Result<Vec<String>, ConfigError> {
    let value = required(properties, name)?;
    let items = value
        .as_array()
        .ok_or_else(|| mismatch(name, PropertyKind::Array, value))?;
    items
        .iter()
        .map(|item| {
            item.as_str()
                .map(str::to_string)
                .ok_or_else(|| mismatch(name, PropertyKind::String, item))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;
    use std::io::Write;

    fn base_entries() -> Vec<(String, Value)> {
        vec![
            (DRY_RUN.to_string(), json!(false)),
            (GITHUB_ORGANIZATION.to_string(), json!("myorg")),
            (GITHUB_REPO.to_string(), json!("myrepo")),
            (
                PROXIES.to_string(),
                json!({"HTTP_PROXY": null, "HTTPS_PROXY": "http://proxy:911"}),
            ),
            (
                TEAM_TO_LABEL.to_string(),
                json!({"myrepo-docs-maintainers": "category: docs"}),
            ),
        ]
    }

    fn args(tokens: &[&str]) -> Vec<String> {
        tokens.iter().map(|t| (*t).to_string()).collect()
    }

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_defaults_resolve() {
        let config = Config::resolve(base_entries(), &[], no_env).unwrap();
        assert!(!config.dry_run());
        assert_eq!(config.github_repo(), "myrepo");
        assert_eq!(config.github_organization(), "myorg");
        assert_eq!(config.team_label_strategy(), TeamLabelStrategy::Map);
        assert_eq!(config.workers(), 1);
        assert!(config.label_org_member_prs());
        assert_eq!(
            config.team_to_label().get("myrepo-docs-maintainers").map(String::as_str),
            Some("category: docs")
        );
    }

    #[test]
    fn test_cli_beats_env_beats_file() {
        let env = env_of(&[(DRY_RUN, "true")]);
        let config = Config::resolve(base_entries(), &args(&["DRY_RUN=false"]), env).unwrap();
        assert!(!config.dry_run());

        let env = env_of(&[(DRY_RUN, "True")]);
        let config = Config::resolve(base_entries(), &[], env).unwrap();
        assert!(config.dry_run());
    }

    #[test]
    fn test_bare_flag_is_true() {
        let config = Config::resolve(base_entries(), &args(&["DRY_RUN"]), no_env).unwrap();
        assert!(config.dry_run());
    }

    #[test]
    fn test_empty_override_falls_through() {
        let env = env_of(&[(DRY_RUN, "true")]);
        let config = Config::resolve(base_entries(), &args(&["DRY_RUN="]), env).unwrap();
        assert!(config.dry_run());

        let env = env_of(&[(GITHUB_REPO, "")]);
        let config = Config::resolve(base_entries(), &[], env).unwrap();
        assert_eq!(config.github_repo(), "myrepo");
    }

    #[test]
    fn test_integer_override_rejects_text() {
        let mut entries = base_entries();
        entries.push(("N".to_string(), json!(0)));
        let err = Config::resolve(entries, &args(&["N=abc"]), no_env).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::TypeMismatch { ref name, expected: "integer", .. } if name == "N"
        ));
    }

    #[test]
    fn test_integer_override_parses() {
        let mut entries = base_entries();
        entries.push(("N".to_string(), json!(0)));
        let config = Config::resolve(entries, &args(&["N=42", "WORKERS=4"]), no_env).unwrap();
        assert_eq!(config.get("N"), Some(&json!(42)));
        assert_eq!(config.workers(), 4);
    }

    #[test]
    fn test_flag_on_non_bool_is_mismatch() {
        let err = Config::resolve(base_entries(), &args(&["GITHUB_REPO"]), no_env).unwrap_err();
        assert!(matches!(err, ConfigError::TypeMismatch { expected: "string", .. }));
    }

    #[test]
    fn test_env_type_mismatch_fails() {
        let env = env_of(&[(DRY_RUN, "maybe")]);
        let err = Config::resolve(base_entries(), &[], env).unwrap_err();
        assert!(matches!(err, ConfigError::TypeMismatch { ref name, .. } if name == DRY_RUN));
    }

    #[test]
    fn test_string_override_keeps_raw_or_unquotes() {
        let config =
            Config::resolve(base_entries(), &args(&["GITHUB_REPO='other'"]), no_env).unwrap();
        assert_eq!(config.github_repo(), "other");

        let config = Config::resolve(base_entries(), &args(&["GITHUB_REPO=a=b"]), no_env).unwrap();
        assert_eq!(config.github_repo(), "a=b");
    }

    #[test]
    fn test_object_override_parses_json() {
        let config = Config::resolve(
            base_entries(),
            &args(&[r#"TEAM_TO_LABEL={"t1":"category: x"}"#]),
            no_env,
        )
        .unwrap();
        assert_eq!(config.team_to_label().len(), 1);
        assert_eq!(config.team_to_label()["t1"], "category: x");

        let err = Config::resolve(base_entries(), &args(&["TEAM_TO_LABEL=[1]"]), no_env)
            .unwrap_err();
        assert!(matches!(err, ConfigError::TypeMismatch { expected: "object", .. }));
    }

    #[test]
    fn test_unsupported_argument() {
        let err = Config::resolve(base_entries(), &args(&["NOPE=1"]), no_env).unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedArgument(ref a) if a == "NOPE=1"));
    }

    #[test]
    fn test_unknown_env_is_ignored() {
        let env = env_of(&[("NOPE", "1")]);
        assert!(Config::resolve(base_entries(), &[], env).is_ok());
    }

    #[test]
    fn test_duplicate_property_in_file() {
        let mut entries = base_entries();
        entries.push((DRY_RUN.to_string(), json!(true)));
        let err = Config::resolve(entries, &[], no_env).unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateProperty(ref n) if n == DRY_RUN));
    }

    #[test]
    fn test_file_overrides_builtin_default() {
        let mut entries = base_entries();
        entries.push((TEAM_LABEL_STRATEGY.to_string(), json!("both")));
        let config = Config::resolve(entries, &[], no_env).unwrap();
        assert_eq!(config.team_label_strategy(), TeamLabelStrategy::Both);
    }

    #[test]
    fn test_missing_required_property() {
        let entries: Vec<_> = base_entries()
            .into_iter()
            .filter(|(name, _)| name != GITHUB_REPO)
            .collect();
        let err = Config::resolve(entries, &[], no_env).unwrap_err();
        assert!(matches!(err, ConfigError::MissingProperty(GITHUB_REPO)));
    }

    #[test]
    fn test_invalid_strategy() {
        let err = Config::resolve(base_entries(), &args(&["TEAM_LABEL_STRATEGY=guess"]), no_env)
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_zero_workers_rejected() {
        let err = Config::resolve(base_entries(), &args(&["WORKERS=0"]), no_env).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref name, .. } if name == WORKERS));
    }

    #[test]
    fn test_proxy_exports_skip_null() {
        let config = Config::resolve(base_entries(), &[], no_env).unwrap();
        let exports: Vec<_> = config.proxy_exports().collect();
        assert_eq!(exports, vec![("HTTPS_PROXY", "http://proxy:911")]);
    }

    #[test]
    fn test_parse_entries_keeps_duplicates_in_order() {
        let entries = parse_entries(r#"{"A": 1, "B": true, "A": 2}"#, Path::new("c.json")).unwrap();
        let names: Vec<_> = entries.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["A", "B", "A"]);
    }

    #[test]
    fn test_parse_entries_rejects_non_object() {
        let err = parse_entries("[1, 2]", Path::new("c.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_load_missing_file() {
        let err = Config::load("/nonexistent/org-control.json", &[]).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "DRY_RUN": true,
                "GITHUB_ORGANIZATION": "myorg",
                "GITHUB_REPO": "myrepo",
                "PROXIES": {{"HTTP_PROXY": null}},
                "TEAM_TO_LABEL": {{}}
            }}"#
        )
        .unwrap();

        let config = Config::load(file.path(), &[]).unwrap();
        assert!(config.dry_run());
        assert!(config.team_to_label().is_empty());
        assert_eq!(config.proxy_exports().count(), 0);
    }

    #[test]
    fn test_load_exports_proxies_to_environment() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "DRY_RUN": false,
                "GITHUB_ORGANIZATION": "myorg",
                "GITHUB_REPO": "myrepo",
                "PROXIES": {{
                    "ORG_CONTROL_TEST_EXPORTED_PROXY": "http://proxy.local:911",
                    "ORG_CONTROL_TEST_NULL_PROXY": null
                }},
                "TEAM_TO_LABEL": {{}}
            }}"#
        )
        .unwrap();

        Config::load(file.path(), &[]).unwrap();

        assert_eq!(
            std::env::var("ORG_CONTROL_TEST_EXPORTED_PROXY").as_deref(),
            Ok("http://proxy.local:911")
        );
        assert!(std::env::var("ORG_CONTROL_TEST_NULL_PROXY").is_err());
    }

    #[test]
    fn test_init_first_writer_wins() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"DRY_RUN": false, "GITHUB_ORGANIZATION": "o", "GITHUB_REPO": "r",
                "PROXIES": {{}}, "TEAM_TO_LABEL": {{}}}}"#
        )
        .unwrap();

        let first = init(file.path(), &args(&["DRY_RUN=true"])).unwrap();
        let second = init("/nonexistent/org-control.json", &args(&["BOGUS"])).unwrap();
        assert!(std::ptr::eq(first, second));
        assert!(second.dry_run());
        assert!(get().is_some());
    }
}
