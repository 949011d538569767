// CLI commands for grading and project setup
use anyhow::{bail, Context, Result};
use gabarito_common::config::DEFAULT_CONFIG_PATH;
use gabarito_common::{Fixture, GradeRequest, GraderConfig, Verdict};
use gabarito_engine::Grader;
use std::fs;
use std::path::Path;
use tracing::info;

/// Explicit config file if given, config/grader.json or defaults otherwise
pub fn load_config(path: Option<&Path>) -> Result<GraderConfig> {
    match path {
        Some(path) => GraderConfig::load(path)?.with_env_overrides(|key| std::env::var(key).ok()),
        None => GraderConfig::load_default(),
    }
}

fn load_fixtures(path: &Path) -> Result<Vec<Fixture>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read fixtures file {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse fixtures file {}", path.display()))
}

/// Grade one source file against a fixtures file
pub async fn grade(
    config: &GraderConfig,
    source: &Path,
    fixtures: &Path,
    entry_point: &str,
    timeout_ms: Option<u64>,
    samples_only: bool,
) -> Result<Verdict> {
    let source_code = fs::read_to_string(source)
        .with_context(|| format!("Failed to read source file {}", source.display()))?;

    let mut test_cases = load_fixtures(fixtures)?;
    if samples_only {
        test_cases.retain(|f| f.is_sample);
    }

    let request = GradeRequest {
        source_code,
        function_name: entry_point.to_string(),
        test_cases,
        timeout_ms,
    };
    request.validate(config)?;

    let time_limit = config.clamp_time_limit(request.timeout_ms);
    info!(
        source = %source.display(),
        test_cases = request.test_cases.len(),
        time_limit_ms = time_limit.as_millis() as u64,
        "Grading"
    );

    let grader = Grader::from_config(config);
    let verdict = grader
        .grade_within(&request.program(), &request.test_cases, time_limit)
        .await?;
    Ok(verdict)
}

/// Write a default grader config under `path`
pub fn init_project(path: &Path, force: bool) -> Result<()> {
    let config_path = path.join(DEFAULT_CONFIG_PATH);
    if config_path.exists() && !force {
        bail!(
            "{} already exists (use --force to overwrite)",
            config_path.display()
        );
    }

    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let json_content = serde_json::to_string_pretty(&GraderConfig::default())
        .context("Failed to serialize grader config")?;
    fs::write(&config_path, json_content + "\n")
        .with_context(|| format!("Failed to write {}", config_path.display()))?;

    println!("✓ Wrote {}", config_path.display());
    Ok(())
}
