//! Suffix-chain validation.
//!
//! Every stage that writes into the working directory gets a predicted
//! sample product name. A downstream glob must select the samples of the
//! stages it names as sources and nothing written by any other earlier
//! stage.

use crate::errors::{ConfigurationError, ErrorInfo};
use crate::process::is_pattern;
use crate::stages::{file_stem, InputSelection, StageSpec};
use glob::Pattern;
use std::path::Path;

const EXTERNAL_SAMPLE_STEM: &str = "input";

/// Predicts one product name per stage, `None` for stages writing outside
/// the working directory.
pub(crate) fn sample_products(
    stages: &[StageSpec],
) -> Result<Vec<Option<String>>, ConfigurationError> {
    let mut samples: Vec<Option<String>> = Vec::with_capacity(stages.len());

    for spec in stages {
        let stem = match &spec.input {
            InputSelection::External { path } => external_stem(path),
            InputSelection::Upstream { sources, .. } => {
                let source = sources.first().ok_or_else(|| {
                    ConfigurationError::new("upstream input names no source stage")
                        .with_stage(spec.name.clone())
                })?;
                let index = stages
                    .iter()
                    .position(|s| &s.name == source)
                    .ok_or_else(|| unknown_source(spec, source))?;
                let sample = samples
                    .get(index)
                    .and_then(Option::as_deref)
                    .ok_or_else(|| {
                        ConfigurationError::new(format!(
                            "stage '{source}' does not write into the working directory"
                        ))
                        .with_stage(spec.name.clone())
                    })?;
                file_stem(sample).to_string()
            }
        };

        let sample = spec
            .output
            .sample_product(&stem)
            .map_err(|e| e.with_stage(spec.name.clone()))?;
        samples.push(sample);
    }

    Ok(samples)
}

/// Checks every upstream glob against the predicted products of all
/// earlier stages.
pub(crate) fn check_globs(
    stages: &[StageSpec],
    samples: &[Option<String>],
) -> Result<(), ConfigurationError> {
    for (index, spec) in stages.iter().enumerate() {
        let InputSelection::Upstream { pattern, sources } = &spec.input else {
            continue;
        };

        if pattern.contains(['/', '\\']) {
            return Err(ConfigurationError::new(format!(
                "input glob '{pattern}' must be a file name relative to the working directory"
            ))
            .with_stage(spec.name.clone()));
        }
        let compiled = Pattern::new(pattern).map_err(|e| {
            ConfigurationError::new(format!("invalid input glob '{pattern}': {e}"))
                .with_stage(spec.name.clone())
        })?;

        for (earlier, sample) in stages[..index].iter().zip(&samples[..index]) {
            let Some(sample) = sample else { continue };
            let selected = compiled.matches(sample);
            let wanted = sources.contains(&earlier.name);

            if wanted != selected {
                let verb = if wanted { "does not select" } else { "also selects" };
                return Err(chain_error(
                    spec,
                    format!(
                        "input glob '{pattern}' {verb} '{sample}' written by stage '{}'",
                        earlier.name
                    ),
                    pattern,
                    sample,
                    &earlier.name,
                ));
            }
        }
    }
    Ok(())
}

fn external_stem(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    if name.is_empty() || (is_pattern(&name) && !path.is_file()) {
        EXTERNAL_SAMPLE_STEM.to_string()
    } else {
        file_stem(&name).to_string()
    }
}

fn unknown_source(spec: &StageSpec, source: &str) -> ConfigurationError {
    ConfigurationError::new(format!(
        "stage '{}' reads from unknown stage '{source}'",
        spec.name
    ))
    .with_stage(spec.name.clone())
}

fn chain_error(
    spec: &StageSpec,
    message: String,
    pattern: &str,
    sample: &str,
    producer: &str,
) -> ConfigurationError {
    ConfigurationError::new(message)
        .with_stage(spec.name.clone())
        .with_error_info(
            ErrorInfo::new("PIPELINE-CONFIG-GLOB", "Input glob breaks the suffix chain")
                .with_fix_hint(
                    "Narrow the glob to <base>*<accumulated suffix>.<ext> of the intended stage.",
                )
                .with_context_entry("pattern", pattern)
                .with_context_entry("sample", sample)
                .with_context_entry("producer", producer),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stages::ProductNaming;
    use pretty_assertions::assert_eq;

    fn chain(third_glob: &str, third_sources: &[&str]) -> Vec<StageSpec> {
        vec![
            StageSpec::new(
                "tile",
                "lastile",
                InputSelection::external("strips/*.laz"),
                ProductNaming::tiles("tile", "laz"),
            ),
            StageSpec::new(
                "ground",
                "lasground",
                InputSelection::upstream("tile*.laz", ["tile"]),
                ProductNaming::derived("_g", "laz"),
            ),
            StageSpec::new(
                "height",
                "lasheight",
                InputSelection::upstream(third_glob, third_sources.iter().copied()),
                ProductNaming::derived("h", "laz"),
            ),
        ]
    }

    #[test]
    fn test_samples_follow_suffixes() {
        let stages = chain("tile*_g.laz", &["ground"]);
        let samples = sample_products(&stages).unwrap();

        assert_eq!(
            samples,
            vec![
                Some("tile_630000_4834000.laz".to_string()),
                Some("tile_630000_4834000_g.laz".to_string()),
                Some("tile_630000_4834000_gh.laz".to_string()),
            ]
        );
        assert!(check_globs(&stages, &samples).is_ok());
    }

    #[test]
    fn test_broad_glob_is_rejected() {
        let stages = chain("tile*.laz", &["ground"]);
        let samples = sample_products(&stages).unwrap();
        let err = check_globs(&stages, &samples).unwrap_err();

        assert!(err.message.contains("also selects 'tile_630000_4834000.laz'"));
        let info = err.error_info.unwrap();
        assert_eq!(info.code, "PIPELINE-CONFIG-GLOB");
        assert_eq!(info.context.get("pattern").map(String::as_str), Some("tile*.laz"));
        assert_eq!(info.context.get("producer").map(String::as_str), Some("tile"));
    }

    #[test]
    fn test_glob_missing_its_source_is_rejected() {
        let stages = chain("tile*_gh.laz", &["ground"]);
        let samples = sample_products(&stages).unwrap();
        let err = check_globs(&stages, &samples).unwrap_err();

        assert!(err.message.contains("does not select"));
        assert_eq!(err.stage.as_deref(), Some("height"));
    }

    #[test]
    fn test_glob_with_directory_is_rejected() {
        let stages = chain("../tile*_g.laz", &["ground"]);
        let samples = sample_products(&stages).unwrap();
        assert!(check_globs(&stages, &samples).is_err());
    }

    #[test]
    fn test_source_outside_working_dir() {
        let stages = vec![
            StageSpec::new(
                "merge",
                "lasgrid",
                InputSelection::external("in.laz"),
                ProductNaming::final_output("out.tif"),
            ),
            StageSpec::new(
                "after",
                "lasinfo",
                InputSelection::upstream("out*.tif", ["merge"]),
                ProductNaming::derived("_i", "txt"),
            ),
        ];
        assert!(sample_products(&stages).is_err());
    }
}
