//! Pre-built schema profiles

use crate::SchemaRegistry;
use sag_core::{ArgType, ArgumentSpec, SchemaError, Value, VerbSchema};

/// Schema profile for common software development verbs.
pub struct SoftwareDevProfile;

impl SoftwareDevProfile {
    pub const VERBS: [&'static str; 12] = [
        "build",
        "test",
        "deploy",
        "rollback",
        "review",
        "merge",
        "lint",
        "scan",
        "release",
        "provision",
        "monitor",
        "migrate",
    ];

    /// A registry pre-populated with the profile's verb schemas.
    pub fn registry() -> Result<SchemaRegistry, SchemaError> {
        let mut registry = SchemaRegistry::new();

        registry.register(
            VerbSchema::builder("build")
                .positional(ArgumentSpec::required("target", ArgType::String, "Build target"))
                .named(ArgumentSpec::optional("config", ArgType::String, "Build configuration"))
                .named(ArgumentSpec::optional("clean", ArgType::Boolean, "Clean before building"))
                .build()?,
        );

        registry.register(
            VerbSchema::builder("test")
                .positional(ArgumentSpec::required("suite", ArgType::String, "Test suite to run"))
                .named(ArgumentSpec::optional("coverage", ArgType::Boolean, "Enable coverage reporting"))
                .named(
                    ArgumentSpec::optional("timeout", ArgType::Integer, "Timeout in seconds")
                        .with_range(1.0, 3600.0),
                )
                .named(ArgumentSpec::optional("parallel", ArgType::Boolean, "Run tests in parallel"))
                .build()?,
        );

        registry.register(
            VerbSchema::builder("deploy")
                .positional(ArgumentSpec::required("app", ArgType::String, "Application to deploy"))
                .named(ArgumentSpec::optional("version", ArgType::Integer, "Version number"))
                .named(
                    ArgumentSpec::optional("env", ArgType::String, "Target environment")
                        .with_allowed_values(envs()),
                )
                .named(
                    ArgumentSpec::optional("replicas", ArgType::Integer, "Number of replicas")
                        .with_range(1.0, 100.0),
                )
                .build()?,
        );

        registry.register(
            VerbSchema::builder("rollback")
                .positional(ArgumentSpec::required("app", ArgType::String, "Application to rollback"))
                .named(ArgumentSpec::optional("version", ArgType::Integer, "Version to rollback to"))
                .named(
                    ArgumentSpec::optional("env", ArgType::String, "Target environment")
                        .with_allowed_values(envs()),
                )
                .build()?,
        );

        registry.register(
            VerbSchema::builder("review")
                .positional(ArgumentSpec::required("target", ArgType::String, "Review target"))
                .named(ArgumentSpec::optional("reviewer", ArgType::String, "Reviewer name"))
                .named(ArgumentSpec::optional("auto_merge", ArgType::Boolean, "Auto-merge on approval"))
                .build()?,
        );

        registry.register(
            VerbSchema::builder("merge")
                .positional(ArgumentSpec::required("source", ArgType::String, "Source branch"))
                .positional(ArgumentSpec::required("target", ArgType::String, "Target branch"))
                .named(
                    ArgumentSpec::optional("strategy", ArgType::String, "Merge strategy")
                        .with_allowed_values(vec![
                            Value::from("merge"),
                            Value::from("rebase"),
                            Value::from("squash"),
                        ]),
                )
                .named(ArgumentSpec::optional("squash", ArgType::Boolean, "Squash commits"))
                .build()?,
        );

        registry.register(
            VerbSchema::builder("lint")
                .positional(ArgumentSpec::required("target", ArgType::String, "Lint target"))
                .named(ArgumentSpec::optional("fix", ArgType::Boolean, "Auto-fix issues"))
                .named(ArgumentSpec::optional("config", ArgType::String, "Linter configuration"))
                .build()?,
        );

        registry.register(
            VerbSchema::builder("scan")
                .positional(ArgumentSpec::required("target", ArgType::String, "Scan target"))
                .named(
                    ArgumentSpec::optional("scan_type", ArgType::String, "Type of scan")
                        .with_allowed_values(vec![
                            Value::from("sast"),
                            Value::from("dast"),
                            Value::from("sca"),
                            Value::from("container"),
                        ]),
                )
                .named(
                    ArgumentSpec::optional("severity", ArgType::String, "Minimum severity level")
                        .with_allowed_values(vec![
                            Value::from("low"),
                            Value::from("medium"),
                            Value::from("high"),
                            Value::from("critical"),
                        ]),
                )
                .build()?,
        );

        registry.register(
            VerbSchema::builder("release")
                .positional(
                    ArgumentSpec::required("version", ArgType::String, "Release version")
                        .with_pattern(r"\d+\.\d+\.\d+"),
                )
                .named(ArgumentSpec::optional("tag", ArgType::String, "Git tag"))
                .named(ArgumentSpec::optional("draft", ArgType::Boolean, "Create as draft"))
                .named(ArgumentSpec::optional("notes", ArgType::String, "Release notes"))
                .build()?,
        );

        registry.register(
            VerbSchema::builder("provision")
                .positional(ArgumentSpec::required("resource", ArgType::String, "Resource to provision"))
                .named(
                    ArgumentSpec::optional("provider", ArgType::String, "Cloud provider")
                        .with_allowed_values(vec![
                            Value::from("aws"),
                            Value::from("gcp"),
                            Value::from("azure"),
                        ]),
                )
                .named(ArgumentSpec::optional("region", ArgType::String, "Deployment region"))
                .named(
                    ArgumentSpec::optional("count", ArgType::Integer, "Number of instances")
                        .with_range(1.0, 100.0),
                )
                .build()?,
        );

        registry.register(
            VerbSchema::builder("monitor")
                .positional(ArgumentSpec::required("target", ArgType::String, "Monitor target"))
                .named(
                    ArgumentSpec::optional("interval", ArgType::Integer, "Check interval in seconds")
                        .with_range(1.0, 86400.0),
                )
                .named(
                    ArgumentSpec::optional("alert_threshold", ArgType::Float, "Alert threshold value")
                        .with_range(0.0, 1.0),
                )
                .build()?,
        );

        registry.register(
            VerbSchema::builder("migrate")
                .positional(ArgumentSpec::required("target", ArgType::String, "Migration target"))
                .named(
                    ArgumentSpec::optional("direction", ArgType::String, "Migration direction")
                        .with_allowed_values(vec![Value::from("up"), Value::from("down")]),
                )
                .named(ArgumentSpec::optional("version", ArgType::String, "Target version"))
                .named(ArgumentSpec::optional("dry_run", ArgType::Boolean, "Dry run mode"))
                .build()?,
        );

        Ok(registry)
    }
}

fn envs() -> Vec<Value> {
    vec![
        Value::from("dev"),
        Value::from("staging"),
        Value::from("production"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_covers_all_verbs() {
        let registry = SoftwareDevProfile::registry().expect("profile");
        assert_eq!(registry.len(), SoftwareDevProfile::VERBS.len());
        for verb in SoftwareDevProfile::VERBS {
            assert!(registry.has(verb), "missing schema for {}", verb);
        }
    }

    #[test]
    fn test_deploy_schema_shape() {
        let registry = SoftwareDevProfile::registry().expect("profile");
        let deploy = registry.get("deploy").expect("deploy schema");
        assert_eq!(deploy.positional_args.len(), 1);
        assert!(deploy.positional_args[0].required);
        assert!(!deploy.allow_extra_args);
        let replicas = deploy.named_arg("replicas").expect("replicas spec");
        assert_eq!(replicas.min_value, Some(1.0));
        assert_eq!(replicas.max_value, Some(100.0));
    }

    #[test]
    fn test_release_pattern_is_semver() {
        let registry = SoftwareDevProfile::registry().expect("profile");
        let release = registry.get("release").expect("release schema");
        assert_eq!(
            release.positional_args[0].pattern.as_deref(),
            Some(r"\d+\.\d+\.\d+")
        );
    }
}
