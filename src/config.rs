//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/wipedev/wipedev.toml`
//! 3. Explicit config file passed with `--config`
//! 4. Environment variables: `WIPEDEV__*` prefix, `__` between sections

use std::path::{Component, Path, PathBuf};

use config::{Config, ConfigError, Environment, File, FileFormat};
use directories::ProjectDirs;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::application::ApplicationError;
use crate::domain::{expand_env_vars, AdminBootstrapRecord, ServiceId};

/// Caller authorization.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AuthConfig {
    /// The single identity allowed to run any operation
    pub allowed_caller: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            allowed_caller: "wipeuser".into(),
        }
    }
}

/// Start/stop script pair for one service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServiceScripts {
    pub start: PathBuf,
    pub stop: PathBuf,
}

impl ServiceScripts {
    fn under(service_dir: &str) -> Self {
        let dir = PathBuf::from("/kb/deployment/services").join(service_dir);
        Self {
            start: dir.join("start_service"),
            stop: dir.join("stop_service"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ServicesConfig {
    pub object_store: ServiceScripts,
    pub workspace: ServiceScripts,
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            object_store: ServiceScripts::under("shock_service"),
            workspace: ServiceScripts::under("workspace"),
        }
    }
}

impl ServicesConfig {
    pub fn scripts(&self, service: ServiceId) -> &ServiceScripts {
        match service {
            ServiceId::ObjectStore => &self.object_store,
            ServiceId::Workspace => &self.workspace,
        }
    }
}

/// Document database layout.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct MongoConfig {
    pub uri: String,
    /// Metadata (workspace) database
    pub workspace_db: String,
    /// Object-store database
    pub object_store_db: String,
    /// Collection in `workspace_db` holding the settings document
    pub settings_collection: String,
    /// Collection in `object_store_db` holding version records
    pub version_collection: String,
    /// Collection in `object_store_db` holding user accounts
    pub user_collection: String,
}

impl Default for MongoConfig {
    fn default() -> Self {
        Self {
            uri: "mongodb://localhost:27017".into(),
            workspace_db: "workspace".into(),
            object_store_db: "ShockDB".into(),
            settings_collection: "settings".into(),
            version_collection: "Versions".into(),
            user_collection: "Users".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ObjectStoreConfig {
    /// Backing data directory whose contents are deleted
    pub data_dir: PathBuf,
}

impl Default for ObjectStoreConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("/mnt/Shock/data"),
        }
    }
}

/// Relational side table cleared with the database's own CLI client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RelationalConfig {
    pub client: String,
    pub user: String,
    pub database: String,
    pub table: String,
}

impl Default for RelationalConfig {
    fn default() -> Self {
        Self {
            client: "mysql".into(),
            user: "root".into(),
            database: "hsi".into(),
            table: "Handle".into(),
        }
    }
}

/// Shape of the main wipe sequence.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct WipeConfig {
    /// Stop and restart the workspace service as part of the main sequence
    pub manage_workspace_service: bool,
    /// Reseed the admin bootstrap record after the object-store drop
    pub reseed_admin: bool,
    pub admin: AdminBootstrapRecord,
}

impl Default for WipeConfig {
    fn default() -> Self {
        Self {
            manage_workspace_service: true,
            reseed_admin: false,
            admin: AdminBootstrapRecord::default(),
        }
    }
}

/// Test runner script generation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RunnerConfig {
    pub tool: String,
    pub target: String,
    /// Section of the test config file holding the properties
    pub section: String,
    /// Keys forwarded as `-Dkey=value`, in this order
    pub keys: Vec<String>,
    /// Keys that must all hold different values (e.g. two test accounts)
    pub distinct_keys: Vec<String>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        let keys = [
            "test.jgi.user",
            "test.jgi.pwd",
            "test.kbase.jgi.gmail.user",
            "test.kbase.jgi.gmail.pwd",
            "test.kbase.user1",
            "test.kbase.pwd1",
            "test.kbase.user2",
            "test.kbase.pwd2",
            "test.kbase.wipe_user",
            "test.kbase.wipe_pwd",
        ];
        Self {
            tool: "ant".into(),
            target: "test".into(),
            section: "JGIIntTest".into(),
            keys: keys.iter().map(|k| k.to_string()).collect(),
            distinct_keys: vec!["test.kbase.user1".into(), "test.kbase.user2".into()],
        }
    }
}

/// CI test report source.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ReportsConfig {
    pub base_url: String,
    pub suite: String,
    pub timeout_secs: u64,
}

impl Default for ReportsConfig {
    fn default() -> Self {
        Self {
            base_url: "https://jenkins.kbase.us".into(),
            suite: "jgi_kbase_integration_test".into(),
            timeout_secs: 30,
        }
    }
}

/// Identifier translation endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TranslateConfig {
    /// Identifier is appended verbatim
    pub url_prefix: String,
    pub timeout_secs: u64,
    /// Pause between retries of a transient failure
    pub retry_pause_secs: u64,
}

impl Default for TranslateConfig {
    fn default() -> Self {
        Self {
            url_prefix: "http://genome.jgi.doe.gov/ext-api/genome-admin/\
                         getPortalIdByParameter?parameterName=jgiProjectId&parameterValue="
                .into(),
            timeout_secs: 30,
            retry_pause_secs: 5,
        }
    }
}

/// Unified configuration for wipedev.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct Settings {
    pub auth: AuthConfig,
    pub services: ServicesConfig,
    pub mongo: MongoConfig,
    pub object_store: ObjectStoreConfig,
    pub relational: RelationalConfig,
    pub wipe: WipeConfig,
    pub runner: RunnerConfig,
    pub reports: ReportsConfig,
    pub translate: TranslateConfig,
}

/// Get the XDG config directory for wipedev.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "wipedev").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("wipedev.toml"))
}

impl Settings {
    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `explicit` - Optional config file; must exist when given
    pub fn load(explicit: Option<&Path>) -> Result<Self, ApplicationError> {
        let defaults = Config::try_from(&Settings::default()).map_err(config_err)?;
        let mut builder = Config::builder().add_source(defaults);

        if let Some(global_path) = global_config_path() {
            if global_path.exists() {
                builder = builder.add_source(File::from(global_path).required(false));
            }
        }

        if let Some(path) = explicit {
            if !path.exists() {
                return Err(ApplicationError::Config {
                    message: format!("config file not found: {}", path.display()),
                });
            }
            builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix("WIPEDEV")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build().map_err(config_err)?;
        let mut settings: Self = config.try_deserialize().map_err(config_err)?;

        // Expand ~ and $VAR in path-like fields
        settings.expand_paths();

        Ok(settings)
    }

    /// Expand shell variables and tilde in path-like fields.
    fn expand_paths(&mut self) {
        let expand = |p: &PathBuf| PathBuf::from(expand_env_vars(p.to_string_lossy().as_ref()));
        for scripts in [&mut self.services.object_store, &mut self.services.workspace] {
            scripts.start = expand(&scripts.start);
            scripts.stop = expand(&scripts.stop);
        }
        self.object_store.data_dir = expand(&self.object_store.data_dir);
    }

    /// Reject values that would make a destructive step unsafe or malformed.
    pub fn validate(&self) -> Result<(), ApplicationError> {
        let invalid = |message: String| Err(ApplicationError::Config { message });

        if self.auth.allowed_caller.is_empty() {
            return invalid("auth.allowed_caller must not be empty".into());
        }

        for service in [ServiceId::ObjectStore, ServiceId::Workspace] {
            let scripts = self.services.scripts(service);
            if scripts.start.as_os_str().is_empty() || scripts.stop.as_os_str().is_empty() {
                return invalid(format!("services.{}: start and stop scripts required", service));
            }
        }

        let data_dir = &self.object_store.data_dir;
        let climbs = data_dir
            .components()
            .any(|c| matches!(c, Component::ParentDir));
        if !data_dir.is_absolute() || data_dir.parent().is_none() || climbs {
            return invalid(format!(
                "object_store.data_dir must be an absolute path below / without '..': {}",
                data_dir.display()
            ));
        }

        let identifier = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").map_err(|e| {
            ApplicationError::Config {
                message: e.to_string(),
            }
        })?;
        for (field, value) in [
            ("relational.database", &self.relational.database),
            ("relational.table", &self.relational.table),
            ("relational.user", &self.relational.user),
        ] {
            if !identifier.is_match(value) {
                return invalid(format!("{} is not a plain identifier: {:?}", field, value));
            }
        }
        if self.relational.client.trim().is_empty() {
            return invalid("relational.client must not be empty".into());
        }

        for (field, value) in [
            ("mongo.workspace_db", &self.mongo.workspace_db),
            ("mongo.object_store_db", &self.mongo.object_store_db),
        ] {
            if value.is_empty() {
                return invalid(format!("{} must not be empty", field));
            }
        }
        if self.mongo.workspace_db == self.mongo.object_store_db {
            return invalid("mongo.workspace_db and mongo.object_store_db must differ".into());
        }

        Ok(())
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize config: {e}"),
        })
    }

    /// Generate a template config file.
    pub fn template() -> String {
        r#"# wipedev configuration
#
# Locations (by precedence, lowest to highest):
#   Global:   ~/.config/wipedev/wipedev.toml
#   Explicit: --config <file>
#   Env:      WIPEDEV__<SECTION>__<KEY>, e.g. WIPEDEV__AUTH__ALLOWED_CALLER

[auth]
# The only caller identity allowed to run wipe/stop/start
# allowed_caller = "wipeuser"

# [services.object_store]
# start = "/kb/deployment/services/shock_service/start_service"
# stop = "/kb/deployment/services/shock_service/stop_service"

# [services.workspace]
# start = "/kb/deployment/services/workspace/start_service"
# stop = "/kb/deployment/services/workspace/stop_service"

[mongo]
# uri = "mongodb://localhost:27017"
# workspace_db = "workspace"
# object_store_db = "ShockDB"
# settings_collection = "settings"
# version_collection = "Versions"
# user_collection = "Users"

[object_store]
# Contents of this directory are deleted on every wipe
# data_dir = "/mnt/Shock/data"

[relational]
# client = "mysql"
# user = "root"
# database = "hsi"
# table = "Handle"

[wipe]
# Stop/restart the workspace service inside the main wipe sequence.
# When false, use `wipedev workspace stop|start` around the wipe instead.
# manage_workspace_service = true

# Reseed a fixed admin account into the object store after the drop.
# reseed_admin = false

# [wipe.admin]
# uuid = "5f1c3a9e-8a4b-4c2e-9d3f-0b6a7e2d1c40"
# username = "wipedevadmin"
# fullname = "Wipe Admin"
# email = ""
"#
        .to_string()
    }
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}
