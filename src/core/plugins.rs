//! Plugin resolution for pluggable capabilities
//!
//! Each capability ([`Exporter`], [`FaultHandler`]) is resolved once, lazily,
//! from the first source that yields something:
//!
//! 1. system property `asynclogger.plugin.<Capability>.implementation`
//! 2. the same key in the file-backed properties
//! 3. every service provider registered in the capability's [`Catalog`]
//! 4. the capability's built-in default implementation
//!
//! An override naming an implementation that cannot be instantiated is a
//! fatal [`LoggerError::ResolutionFailure`]; it never falls through to the
//! next source. The result is kept in a write-once [`PluginSlot`]; any later
//! registration attempt is a [`LoggerError::ConfigurationConflict`].
//!
//! Implementations are looked up by name in a [`Catalog`] of zero-argument
//! factories instead of being loaded reflectively.

use super::config::keys;
use super::error::{LoggerError, Result};
use super::exporter::Exporter;
use super::fault::{panic_message, report, FaultHandler, StderrFaultHandler};
use super::properties::{
    FileProperties, LayeredProperties, PropertySource, SystemProperties,
};
use crate::exporters::ConsoleExporter;
use once_cell::sync::OnceCell;
use std::collections::BTreeMap;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

/// Prefix shared by all implementation override keys
pub const PLUGIN_PROPERTY_PREFIX: &str = "asynclogger.plugin.";

/// A pluggable capability, implemented for its trait object type
pub trait Capability: 'static {
    /// Name used in override keys and error messages
    const NAME: &'static str;

    /// Catalog name instantiated when nothing else resolves
    const DEFAULT_IMPLEMENTATION: &'static str;
}

/// Override key for a capability, e.g. `asynclogger.plugin.Exporter.implementation`
pub fn implementation_key<C: ?Sized + Capability>() -> String {
    format!("{}{}.implementation", PLUGIN_PROPERTY_PREFIX, C::NAME)
}

/// Where a resolved implementation set came from, highest priority first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResolutionSource {
    ExplicitOverride,
    FileOverride,
    ServiceDiscovery,
    BuiltInDefault,
    /// Set programmatically through `register_*`
    Registered,
}

impl fmt::Display for ResolutionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ResolutionSource::ExplicitOverride => "system property",
            ResolutionSource::FileOverride => "file property",
            ResolutionSource::ServiceDiscovery => "service discovery",
            ResolutionSource::BuiltInDefault => "built-in default",
            ResolutionSource::Registered => "registration",
        };
        f.write_str(text)
    }
}

/// Zero-argument constructor for one implementation of `C`
pub type Factory<C> = Arc<dyn Fn() -> Result<Arc<C>> + Send + Sync>;

/// Named factories for one capability
///
/// Entries added with [`register_service`](Catalog::register_service) are
/// also service providers: they are enumerated by [`discover`](Catalog::discover).
pub struct Catalog<C: ?Sized> {
    factories: BTreeMap<String, Factory<C>>,
    services: Vec<String>,
}

impl<C: ?Sized + Capability> Catalog<C> {
    /// Catalog with no entries, not even the default implementation
    pub fn new() -> Self {
        Self {
            factories: BTreeMap::new(),
            services: Vec::new(),
        }
    }

    /// Make `name` loadable through an override key
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn() -> Result<Arc<C>> + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Arc::new(factory));
        self
    }

    /// Register `name` and announce it as a service provider
    pub fn register_service<F>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn() -> Result<Arc<C>> + Send + Sync + 'static,
    {
        let name = name.into();
        if !self.services.contains(&name) {
            self.services.push(name.clone());
        }
        self.register(name, factory)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Instantiate the implementation registered under `name`
    ///
    /// # Errors
    ///
    /// `ResolutionFailure` if no factory is registered under `name`, or the
    /// factory fails or panics.
    pub fn instantiate(&self, name: &str) -> Result<Arc<C>> {
        let factory = self.factories.get(name).ok_or_else(|| {
            LoggerError::resolution(C::NAME, name, "no implementation registered under this name")
        })?;

        match catch_unwind(AssertUnwindSafe(|| factory())) {
            Ok(Ok(instance)) => Ok(instance),
            Ok(Err(e)) => Err(LoggerError::resolution(
                C::NAME,
                name,
                format!("not able to be instantiated: {}", e),
            )),
            Err(payload) => Err(LoggerError::resolution(
                C::NAME,
                name,
                format!("constructor panicked: {}", panic_message(&*payload)),
            )),
        }
    }

    /// Instantiate every service provider
    ///
    /// Providers that fail to instantiate are reported and skipped. Callers
    /// must not rely on enumeration order.
    pub fn discover(&self) -> Vec<Arc<C>> {
        self.services
            .iter()
            .filter_map(|name| match self.instantiate(name) {
                Ok(instance) => Some(instance),
                Err(e) => {
                    report(format_args!(
                        "[LOGGER WARNING] Skipping {} service provider: {}",
                        C::NAME,
                        e
                    ));
                    None
                }
            })
            .collect()
    }
}

impl<C: ?Sized + Capability> Default for Catalog<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl Catalog<dyn Exporter> {
    /// Catalog with the exporters that need nothing beyond configuration
    ///
    /// `console` is the built-in default. File-based and network exporters
    /// read their target from `properties` when instantiated.
    pub fn with_builtins(properties: LayeredProperties) -> Self {
        let mut catalog = Self::new();
        catalog.register("console", || {
            Ok(Arc::new(ConsoleExporter::new()) as Arc<dyn Exporter>)
        });

        #[cfg(feature = "file")]
        {
            let props = properties.clone();
            catalog.register("file", move || {
                let path = props.get_string_or(keys::FILE_EXPORTER_PATH, "async-logger.log");
                Ok(Arc::new(crate::exporters::FileExporter::new(path)?) as Arc<dyn Exporter>)
            });
        }

        let props = properties.clone();
        catalog.register("json", move || {
            let path = props.get_string_or(keys::JSON_EXPORTER_PATH, "async-logger.jsonl");
            Ok(Arc::new(crate::exporters::JsonExporter::new(path)?) as Arc<dyn Exporter>)
        });

        #[cfg(feature = "async-exporters")]
        {
            let props = properties.clone();
            catalog.register("async_file", move || {
                let path =
                    props.get_string_or(keys::ASYNC_FILE_EXPORTER_PATH, "async-logger.log");
                Ok(Arc::new(crate::exporters::BlockingExporter::open_file(path)?)
                    as Arc<dyn Exporter>)
            });
        }

        catalog.register("network", move || {
            let address = properties
                .get_string(keys::NETWORK_EXPORTER_ADDRESS)
                .ok_or_else(|| {
                    LoggerError::config(
                        "NetworkExporter",
                        format!("{} is not set", keys::NETWORK_EXPORTER_ADDRESS),
                    )
                })?;
            Ok(Arc::new(crate::exporters::NetworkExporter::new(address)?) as Arc<dyn Exporter>)
        });

        catalog
    }
}

impl Catalog<dyn FaultHandler> {
    /// Catalog holding the `stderr` default handler
    pub fn with_builtins() -> Self {
        let mut catalog = Self::new();
        catalog.register("stderr", || {
            Ok(Arc::new(StderrFaultHandler::new()) as Arc<dyn FaultHandler>)
        });
        catalog
    }
}

/// A resolved implementation set and where it came from
pub struct Resolution<C: ?Sized> {
    pub source: ResolutionSource,
    pub implementations: Vec<Arc<C>>,
}

impl<C: ?Sized> fmt::Debug for Resolution<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolution")
            .field("source", &self.source)
            .field("implementations", &self.implementations.len())
            .finish()
    }
}

/// Write-once holder for a capability's resolution
pub struct PluginSlot<C: ?Sized> {
    cell: OnceCell<Resolution<C>>,
}

impl<C: ?Sized + Capability> PluginSlot<C> {
    pub fn new() -> Self {
        Self {
            cell: OnceCell::new(),
        }
    }

    /// Resolution if one has happened
    pub fn get(&self) -> Option<&Resolution<C>> {
        self.cell.get()
    }

    /// Resolve on first access; concurrent callers wait for the one resolver
    ///
    /// A failed resolution leaves the slot empty.
    pub fn get_or_resolve(
        &self,
        resolve: impl FnOnce() -> Result<Resolution<C>>,
    ) -> Result<&Resolution<C>> {
        self.cell.get_or_try_init(resolve)
    }

    /// Install an implementation set programmatically
    ///
    /// # Errors
    ///
    /// - `InvalidConfiguration` if `implementations` is empty
    /// - `ConfigurationConflict` if the slot already holds a resolution
    pub fn register(&self, implementations: Vec<Arc<C>>) -> Result<()> {
        if implementations.is_empty() {
            return Err(LoggerError::config(
                C::NAME,
                "cannot register an empty implementation set",
            ));
        }

        self.cell
            .set(Resolution {
                source: ResolutionSource::Registered,
                implementations,
            })
            .map_err(|_| LoggerError::conflict(C::NAME))
    }
}

impl<C: ?Sized + Capability> Default for PluginSlot<C> {
    fn default() -> Self {
        Self::new()
    }
}

/// Run the four-source resolution for one capability
pub fn resolve<C: ?Sized + Capability>(
    catalog: &Catalog<C>,
    system: &dyn PropertySource,
    file: &dyn PropertySource,
) -> Result<Resolution<C>> {
    let key = implementation_key::<C>();

    let overrides = [
        (ResolutionSource::ExplicitOverride, system),
        (ResolutionSource::FileOverride, file),
    ];

    for (source, props) in overrides {
        let name = props.get_string(&key);
        if let Some(name) = name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
            let implementation = catalog.instantiate(name)?;
            report_resolution::<C>(source, name);
            return Ok(Resolution {
                source,
                implementations: vec![implementation],
            });
        }
    }

    let discovered = catalog.discover();
    if !discovered.is_empty() {
        report_resolution::<C>(
            ResolutionSource::ServiceDiscovery,
            &catalog.services.join(", "),
        );
        return Ok(Resolution {
            source: ResolutionSource::ServiceDiscovery,
            implementations: discovered,
        });
    }

    let default = catalog.instantiate(C::DEFAULT_IMPLEMENTATION)?;
    report_resolution::<C>(ResolutionSource::BuiltInDefault, C::DEFAULT_IMPLEMENTATION);
    Ok(Resolution {
        source: ResolutionSource::BuiltInDefault,
        implementations: vec![default],
    })
}

fn report_resolution<C: ?Sized + Capability>(source: ResolutionSource, names: &str) {
    report(format_args!(
        "[LOGGER INFO] {} resolved from {}: {}",
        C::NAME,
        source,
        names
    ));
}

/// Construction root for everything pluggable
///
/// One instance is created at startup and shared by the pipeline; there is
/// no process-global registry.
///
/// # Example
///
/// ```
/// use rust_async_logger::core::plugins::{Plugins, ResolutionSource};
/// use rust_async_logger::core::properties::{FileProperties, SystemProperties};
///
/// let plugins = Plugins::new(SystemProperties::isolated(), FileProperties::empty());
/// let resolution = plugins.exporter_resolution().unwrap();
/// assert_eq!(resolution.source, ResolutionSource::BuiltInDefault);
/// assert_eq!(resolution.implementations[0].name(), "console");
/// ```
pub struct Plugins {
    system: Arc<dyn PropertySource>,
    file: Arc<dyn PropertySource>,
    exporter_catalog: Catalog<dyn Exporter>,
    fault_catalog: Catalog<dyn FaultHandler>,
    exporters: PluginSlot<dyn Exporter>,
    fault_handlers: PluginSlot<dyn FaultHandler>,
}

impl Plugins {
    /// Plugins over the given sources, with built-in catalogs
    pub fn new(
        system: impl PropertySource + 'static,
        file: impl PropertySource + 'static,
    ) -> Self {
        Self::from_sources(Arc::new(system), Arc::new(file))
    }

    pub fn from_sources(system: Arc<dyn PropertySource>, file: Arc<dyn PropertySource>) -> Self {
        let layered = LayeredProperties::new(vec![Arc::clone(&system), Arc::clone(&file)]);
        Self {
            exporter_catalog: Catalog::<dyn Exporter>::with_builtins(layered),
            fault_catalog: Catalog::<dyn FaultHandler>::with_builtins(),
            system,
            file,
            exporters: PluginSlot::new(),
            fault_handlers: PluginSlot::new(),
        }
    }

    /// Plugins over the environment and the configuration file it points to
    ///
    /// The file path is `asynclogger.config.file` if set, otherwise
    /// `async-logger.json` in the working directory.
    ///
    /// # Errors
    ///
    /// Fails if the configuration file exists but cannot be read or parsed.
    pub fn from_environment() -> Result<Self> {
        let system = SystemProperties::new();
        let path = system.get_string_or(keys::CONFIG_FILE, FileProperties::DEFAULT_PATH);
        let file = FileProperties::load(path)?;
        Ok(Self::new(system, file))
    }

    /// Both property sources, system first
    pub fn properties(&self) -> LayeredProperties {
        LayeredProperties::new(vec![Arc::clone(&self.system), Arc::clone(&self.file)])
    }

    pub fn exporter_catalog(&self) -> &Catalog<dyn Exporter> {
        &self.exporter_catalog
    }

    pub fn exporter_catalog_mut(&mut self) -> &mut Catalog<dyn Exporter> {
        &mut self.exporter_catalog
    }

    pub fn fault_handler_catalog_mut(&mut self) -> &mut Catalog<dyn FaultHandler> {
        &mut self.fault_catalog
    }

    /// Resolved exporters, resolving on first call
    pub fn exporter_resolution(&self) -> Result<&Resolution<dyn Exporter>> {
        self.exporters.get_or_resolve(|| {
            resolve(&self.exporter_catalog, self.system.as_ref(), self.file.as_ref())
        })
    }

    pub fn exporters(&self) -> Result<&[Arc<dyn Exporter>]> {
        Ok(&self.exporter_resolution()?.implementations)
    }

    /// Install exporters instead of resolving them
    ///
    /// # Errors
    ///
    /// `ConfigurationConflict` if exporters were already resolved or registered.
    pub fn register_exporters(&self, exporters: Vec<Arc<dyn Exporter>>) -> Result<()> {
        self.exporters.register(exporters)
    }

    pub fn fault_handler_resolution(&self) -> Result<&Resolution<dyn FaultHandler>> {
        self.fault_handlers.get_or_resolve(|| {
            resolve(&self.fault_catalog, self.system.as_ref(), self.file.as_ref())
        })
    }

    pub fn fault_handlers(&self) -> Result<&[Arc<dyn FaultHandler>]> {
        Ok(&self.fault_handler_resolution()?.implementations)
    }

    pub fn register_fault_handlers(&self, handlers: Vec<Arc<dyn FaultHandler>>) -> Result<()> {
        self.fault_handlers.register(handlers)
    }
}
