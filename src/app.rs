//! Application orchestration for synthesizing, deploying and destroying the
//! resized images bucket.

use crate::backend::{MockBackend, ProvisioningBackend, S3Backend};
use crate::exports::{ExportStore, FileExportStore, MockExportStore};
use crate::models::{Config, StackInputs};
use crate::provisioner::{declare, resolve_and_declare, Declaration};
use crate::role::{IamRoleResolver, MockRoleResolver, RoleResolver};
use crate::template;
use crate::Result;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::Region;
use tracing::{error, info};

/// Coordinates role lookup, bucket realization and export publishing.
pub struct App {
    inputs: StackInputs,
    resolver: Box<dyn RoleResolver>,
    backend: Box<dyn ProvisioningBackend>,
    exports: Box<dyn ExportStore>,
}

/// Injectable service bundle used to construct [`App`] in tests/harnesses.
pub struct AppServices {
    pub resolver: Box<dyn RoleResolver>,
    pub backend: Box<dyn ProvisioningBackend>,
    pub exports: Box<dyn ExportStore>,
}

impl App {
    /// Build an app from concrete service dependencies.
    pub fn with_services(services: AppServices, inputs: StackInputs) -> Self {
        Self {
            inputs,
            resolver: services.resolver,
            backend: services.backend,
            exports: services.exports,
        }
    }

    /// Construct an app from environment configuration (`Config::from_env`).
    pub async fn new() -> Result<Self> {
        let config = Config::from_env()?;
        Self::from_config(config).await
    }

    pub async fn from_config(config: Config) -> Result<Self> {
        let services = if config.dry_run {
            info!("DRY_RUN enabled; AWS will not be contacted, the edge role is assumed to exist and exports stay in memory");
            AppServices {
                resolver: Box::new(
                    MockRoleResolver::new().with_role(&config.inputs.edge_function_role_arn),
                ),
                backend: Box::new(MockBackend::new()),
                exports: Box::new(MockExportStore::new()),
            }
        } else {
            info!("Exports will be written to {}", config.exports_path.display());
            let mut loader = aws_config::defaults(BehaviorVersion::latest());
            if let Some(region) = &config.region {
                loader = loader.region(Region::new(region.clone()));
            }
            let sdk_config = loader.load().await;

            AppServices {
                resolver: Box::new(IamRoleResolver::new(&sdk_config)),
                backend: Box::new(S3Backend::new(&sdk_config)),
                exports: Box::new(FileExportStore::new(config.exports_path.clone())),
            }
        };

        Ok(Self::with_services(services, config.inputs))
    }

    /// Render the template for the current inputs without applying it.
    pub async fn synth(&self) -> Result<String> {
        let declaration = resolve_and_declare(&self.inputs, self.resolver.as_ref()).await?;
        template::render_pretty(&declaration)
    }

    /// Realize the bucket and publish its exports.
    ///
    /// Exports are only published once the backend has applied everything.
    pub async fn deploy(&self) -> Result<Declaration> {
        let declaration = resolve_and_declare(&self.inputs, self.resolver.as_ref()).await?;

        if let Err(e) = self.backend.apply(&declaration).await {
            error!("Provisioning bucket {} failed: {}", declaration.bucket.name, e);
            return Err(e);
        }

        self.exports.publish(&declaration.exports).await?;
        for export in &declaration.exports {
            info!("Exported {} = {}", export.export_name, export.value);
        }

        Ok(declaration)
    }

    /// Tear the bucket down and withdraw its exports.
    pub async fn destroy(&self) -> Result<()> {
        // The edge grant has no bearing on teardown, so the role is not looked up.
        let declaration = declare(&self.inputs.validate()?, None)?;

        self.backend.teardown(&declaration.bucket).await?;
        self.exports.remove(&declaration.export_names()).await?;
        info!("Destroyed bucket {}", declaration.bucket.name);

        Ok(())
    }

    /// Look up a published export by name.
    pub async fn lookup_export(&self, export_name: &str) -> Result<Option<String>> {
        self.exports.lookup(export_name).await
    }
}
