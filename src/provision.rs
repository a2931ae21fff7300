//! Provisioning workflow
//!
//! Decides which steps are needed from the state left by previous runs, lets
//! explicit flags override those decisions, then runs the steps in order:
//! certificate, configuration, trust.

use davtls_config::ConfigDocument;
use tracing::info;

use crate::certificate::{CertificateGenerator, CertificateProvisioner};
use crate::error::{Error, Result};
use crate::paths::PathPrettifier;
use crate::request::ProvisioningRequest;
use crate::tls::{TlsConfigurator, tls_enabled};
use crate::trust::TrustRegistrar;

/// What previous runs left behind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PriorState {
    pub cert_exists: bool,
    pub key_exists: bool,
    /// `server.ssl` is on in the current configuration
    pub tls_enabled: bool,
}

impl PriorState {
    /// Inspect the filesystem and configuration named by `request`
    ///
    /// A missing configuration file counts as TLS being off.
    pub fn inspect(request: &ProvisioningRequest) -> Result<Self> {
        let doc = ConfigDocument::load_or_default(&request.config_path)?;
        Ok(Self {
            cert_exists: request.cert_path.exists(),
            key_exists: request.key_path.exists(),
            tls_enabled: tls_enabled(&doc),
        })
    }
}

/// Whether a step runs, and whether the user asked for that explicitly
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub enabled: bool,
    pub explicit: bool,
}

impl Decision {
    fn derived(enabled: bool) -> Self {
        Self {
            enabled,
            explicit: false,
        }
    }

    fn overridden(self, value: Option<bool>) -> Self {
        match value {
            Some(enabled) => Self {
                enabled,
                explicit: true,
            },
            None => self,
        }
    }
}

/// Explicit step switches from the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Overrides {
    pub generate_certificate: Option<bool>,
    pub enable_tls: Option<bool>,
    pub trust: Option<bool>,
}

/// The steps of one run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Plan {
    pub generate_certificate: Decision,
    pub enable_tls: Decision,
    pub trust: Decision,
    /// The platform has a trust store
    pub trust_supported: bool,
}

impl Plan {
    /// Default decisions for the given prior state
    ///
    /// A fresh certificate is trusted by default wherever a trust store exists.
    pub fn derive(prior: &PriorState, force: bool, trust_supported: bool) -> Self {
        let generate_certificate = !(prior.cert_exists && prior.key_exists) || force;
        let enable_tls = !prior.tls_enabled || force;
        Self {
            generate_certificate: Decision::derived(generate_certificate),
            enable_tls: Decision::derived(enable_tls),
            trust: Decision::derived(generate_certificate && trust_supported),
            trust_supported,
        }
    }

    /// Replace derived decisions with explicit ones
    ///
    /// Without an explicit trust switch, trust follows the effective
    /// certificate decision.
    pub fn with_overrides(self, overrides: &Overrides) -> Self {
        let generate_certificate = self
            .generate_certificate
            .overridden(overrides.generate_certificate);
        let trust = match overrides.trust {
            Some(_) => self.trust.overridden(overrides.trust),
            None => Decision::derived(generate_certificate.enabled && self.trust_supported),
        };
        Self {
            generate_certificate,
            enable_tls: self.enable_tls.overridden(overrides.enable_tls),
            trust,
            trust_supported: self.trust_supported,
        }
    }
}

/// Why the trust step does not run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrustSkip {
    /// The platform has no trust store
    Unsupported,
    /// Switched off on the command line
    Declined,
    /// No new certificate to register
    NothingNew,
}

impl Plan {
    /// The reason the trust step is skipped, or `None` when it runs
    pub fn trust_skip(&self) -> Option<TrustSkip> {
        if !self.trust_supported {
            // An explicit request on an unsupported platform is rejected before any step.
            return (!self.trust.enabled).then_some(TrustSkip::Unsupported);
        }
        match (self.trust.enabled, self.trust.explicit) {
            (true, _) => None,
            (false, true) => Some(TrustSkip::Declined),
            (false, false) => Some(TrustSkip::NothingNew),
        }
    }
}

/// Steps that actually ran
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Outcome {
    pub certificate_generated: bool,
    pub tls_configured: bool,
    pub trusted: bool,
}

/// Runs a [`Plan`] against one [`ProvisioningRequest`]
pub struct Provisioner<'a> {
    request: &'a ProvisioningRequest,
    prettifier: &'a PathPrettifier,
    generator: &'a dyn CertificateGenerator,
    registrar: TrustRegistrar<'a>,
}

impl<'a> Provisioner<'a> {
    pub fn new(
        request: &'a ProvisioningRequest,
        prettifier: &'a PathPrettifier,
        generator: &'a dyn CertificateGenerator,
        registrar: TrustRegistrar<'a>,
    ) -> Self {
        Self {
            request,
            prettifier,
            generator,
            registrar,
        }
    }

    /// Derive the plan from the current state and apply `overrides`
    pub fn plan(&self, overrides: &Overrides) -> Result<Plan> {
        let prior = PriorState::inspect(self.request)?;
        let derived = Plan::derive(&prior, self.request.force, self.registrar.is_supported());
        let plan = derived.with_overrides(overrides);

        info!(
            "📋 Generate certificate: {} (default {})",
            plan.generate_certificate.enabled, derived.generate_certificate.enabled
        );
        info!(
            "📋 Enable TLS: {} (default {})",
            plan.enable_tls.enabled, derived.enable_tls.enabled
        );
        info!(
            "📋 Trust certificate: {} (default {})",
            plan.trust.enabled, derived.trust.enabled
        );
        Ok(plan)
    }

    /// Execute the plan
    ///
    /// The first failing step aborts the run.
    pub fn run(&self, plan: &Plan) -> Result<Outcome> {
        let request = self.request;

        if plan.trust.enabled && plan.trust.explicit && !self.registrar.is_supported() {
            return Err(Error::UnsupportedPlatform {
                platform: std::env::consts::OS,
            });
        }

        let mut outcome = Outcome::default();

        if plan.generate_certificate.enabled {
            CertificateProvisioner::new(self.generator, self.prettifier).provision(request)?;
            outcome.certificate_generated = true;
        } else if plan.generate_certificate.explicit {
            info!("⏭️  Skipping certificate generation");
        } else {
            info!(
                "✅ Certificate {} and key {} already exist, use --force to regenerate",
                self.prettifier.display(&request.cert_path),
                self.prettifier.display(&request.key_path)
            );
        }

        if plan.enable_tls.enabled {
            TlsConfigurator::new(self.prettifier).configure(request)?;
            outcome.tls_configured = true;
        } else if plan.enable_tls.explicit {
            info!("⏭️  Skipping TLS configuration");
        } else {
            info!(
                "✅ TLS already enabled in {}, use --force to reconfigure",
                self.prettifier.display(&request.config_path)
            );
        }

        match plan.trust_skip() {
            None => {
                self.registrar
                    .trust(&request.cert_path, request.keychain.as_deref())?;
                outcome.trusted = true;
            }
            Some(TrustSkip::Unsupported) => info!(
                "⏭️  No trust store on {}, skipping trust registration",
                std::env::consts::OS
            ),
            Some(TrustSkip::Declined) => info!("⏭️  Skipping trust store registration"),
            Some(TrustSkip::NothingNew) => info!(
                "✅ Certificate {} was not regenerated, use --force or --trust to register it again",
                self.prettifier.display(&request.cert_path)
            ),
        }

        Ok(outcome)
    }
}
