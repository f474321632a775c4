//! Test runner script generation
//!
//! Turns one section of a TOML test config into an executable shell script
//! invoking the build tool with the recognized keys as `-Dkey=value`.

use std::collections::BTreeMap;
use std::path::Path;

use itertools::Itertools;
use tracing::{debug, info};

use crate::application::{ApplicationError, ApplicationResult, IoResultExt};
use crate::config::RunnerConfig;

pub const GENERATED_HEADER: &str = "# Generated file - do not check into git\n";

pub struct RunnerScriptGenerator {
    runner: RunnerConfig,
}

impl RunnerScriptGenerator {
    pub fn new(runner: RunnerConfig) -> Self {
        Self { runner }
    }

    /// Read the configured section of a TOML test config as flat strings.
    pub fn load_section(&self, path: &Path) -> ApplicationResult<BTreeMap<String, String>> {
        let content = std::fs::read_to_string(path).with_path_context("read test config", path)?;
        let table: toml::Table = toml::from_str(&content).map_err(|e| ApplicationError::RunnerConfig {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        let section = table
            .get(&self.runner.section)
            .and_then(|v| v.as_table())
            .ok_or_else(|| ApplicationError::RunnerConfig {
                path: path.to_path_buf(),
                message: format!("missing section [{}]", self.runner.section),
            })?;

        Ok(section
            .iter()
            .map(|(k, v)| {
                let value = match v {
                    toml::Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (k.clone(), value)
            })
            .collect())
    }

    /// Build the script text. Unrecognized keys are ignored.
    pub fn render(&self, section: &BTreeMap<String, String>) -> ApplicationResult<String> {
        let present: Vec<(&String, &String)> = self
            .runner
            .distinct_keys
            .iter()
            .filter_map(|k| section.get(k).map(|v| (k, v)))
            .collect();
        if let Some(((a, _), (b, _))) = present
            .iter()
            .tuple_combinations()
            .find(|((_, va), (_, vb))| va == vb)
        {
            return Err(ApplicationError::Config {
                message: format!("{} and {} are identical", a, b),
            });
        }

        let properties = self
            .runner
            .keys
            .iter()
            .filter_map(|k| section.get(k).map(|v| format!(" -D{}={}", k, v)))
            .join("");
        debug!("rendered {} properties", section.len());

        Ok(format!(
            "{}{} {}{}\n",
            GENERATED_HEADER, self.runner.tool, self.runner.target, properties
        ))
    }

    /// Write the runner script for `config_path` to `out`, mode 0755.
    pub fn generate(&self, config_path: &Path, out: &Path) -> ApplicationResult<()> {
        let section = self.load_section(config_path)?;
        let script = self.render(&section)?;
        std::fs::write(out, script).with_path_context("write runner script", out)?;
        make_executable(out)?;
        info!(
            "wrote test runner with target \"{}\" to {}",
            self.runner.target,
            out.display()
        );
        Ok(())
    }
}

#[cfg(unix)]
fn make_executable(path: &Path) -> ApplicationResult<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
        .with_path_context("chmod runner script", path)
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> ApplicationResult<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn section(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn given_recognized_keys_when_rendered_then_properties_in_key_order() {
        let generator = RunnerScriptGenerator::new(RunnerConfig::default());
        let cfg = section(&[
            ("test.kbase.user2", "bob"),
            ("test.kbase.user1", "alice"),
            ("unrelated.key", "ignored"),
        ]);

        let script = generator.render(&cfg).unwrap();

        assert_eq!(
            script,
            "# Generated file - do not check into git\n\
             ant test -Dtest.kbase.user1=alice -Dtest.kbase.user2=bob\n"
        );
    }

    #[test]
    fn given_identical_users_when_rendered_then_refused() {
        let generator = RunnerScriptGenerator::new(RunnerConfig::default());
        let cfg = section(&[("test.kbase.user1", "same"), ("test.kbase.user2", "same")]);

        let err = generator.render(&cfg).unwrap_err();

        assert!(err.to_string().contains("identical"));
    }

    #[test]
    fn given_empty_section_when_rendered_then_bare_command() {
        let generator = RunnerScriptGenerator::new(RunnerConfig::default());
        let script = generator.render(&BTreeMap::new()).unwrap();
        assert!(script.ends_with("ant test\n"));
    }
}
