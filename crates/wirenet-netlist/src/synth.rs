//! Hierarchical netlist synthesis.
//!
//! The [`Netlister`] walks a design from a top hierarchical view down through
//! the views its instances resolve to. Every level is resolved and bound
//! independently, and each distinct sub-circuit is defined once, inline,
//! right after the first instance line that needs it.

use std::io::Write;

use chrono::{Local, NaiveDateTime};
use indexmap::{IndexMap, IndexSet};
use itertools::Itertools;
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};

use crate::binding::{PinNetBinder, PinNetMap};
use crate::connectivity::{ConnectivityResolver, DEFAULT_TOLERANCE};
use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::dialect::{Directives, NetlistDialect};
use crate::provider::{LoadError, ViewProvider};
use crate::template::{render_instance, render_instance_with, Rendered, Substitution, Template};
use crate::{
    strip_global, ExternalLanguage, ExternalView, Instance, Level, Pin, View, ViewKey,
    ATTR_MODEL_LINE, DEFAULT_VIEW,
};

#[derive(Debug, thiserror::Error)]
pub enum NetlistError {
    #[error("failed to write netlist: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("cyclic hierarchy: {}", .0.iter().join(" -> "))]
    Cycle(Vec<ViewKey>),

    #[error("{0} is not a hierarchical view")]
    NotHierarchical(ViewKey),
}

/// Caller choices for one netlisting pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetlistOptions {
    /// Preferred views, best first.
    pub switch_views: Vec<String>,
    /// Views that are instantiated but never descended into.
    pub stop_views: Vec<String>,
    /// Cell to view table. Cells listed here skip the preference list.
    pub config: Option<IndexMap<String, String>>,
    pub tolerance: i64,
    pub dialect: NetlistDialect,
    /// Date written into the header. Defaults to now.
    #[serde(skip)]
    pub timestamp: Option<NaiveDateTime>,
}

impl Default for NetlistOptions {
    fn default() -> Self {
        Self {
            switch_views: vec!["schematic".to_owned(), "symbol".to_owned()],
            stop_views: vec!["symbol".to_owned()],
            config: None,
            tolerance: DEFAULT_TOLERANCE,
            dialect: NetlistDialect::default(),
            timestamp: None,
        }
    }
}

impl NetlistOptions {
    pub fn with_switch_views<I, S>(mut self, views: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.switch_views = views.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_stop_views<I, S>(mut self, views: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.stop_views = views.into_iter().map(Into::into).collect();
        self
    }

    /// Pin `cell` to `view`, switching the pass into config-override mode.
    pub fn with_config_view(mut self, cell: impl Into<String>, view: impl Into<String>) -> Self {
        self.config
            .get_or_insert_with(IndexMap::new)
            .insert(cell.into(), view.into());
        self
    }

    pub fn with_tolerance(mut self, tolerance: i64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_dialect(mut self, dialect: NetlistDialect) -> Self {
        self.dialect = dialect;
        self
    }

    pub fn with_timestamp(mut self, timestamp: NaiveDateTime) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    fn is_stop_view(&self, view: &str) -> bool {
        self.stop_views.iter().any(|v| v == view)
    }
}

/// Summary of a finished pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NetlistReport {
    pub diagnostics: Vec<Diagnostic>,
    /// Sub-circuits defined, in emission order.
    pub subcircuits: Vec<ViewKey>,
    /// Number of instance lines written, at every level.
    pub instances: usize,
}

impl NetlistReport {
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.is_error())
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| !d.is_error())
    }
}

/// State of one walk over the hierarchy.
#[derive(Default)]
struct Walk {
    /// Keys already defined (or being defined) as sub-circuits.
    visited: IndexSet<ViewKey>,
    /// Keys on the active recursion path, top first.
    path: Vec<ViewKey>,
    directives: Directives,
    report: NetlistReport,
}

/// Where an instance leads once its view is chosen.
enum Target {
    /// Netlisted as a device; only a model line may be collected.
    Leaf,
    /// A sub-circuit that is already defined.
    Defined,
    External(ExternalView),
    Subcircuit(ViewKey, Level),
    /// The view could not be loaded; carries the diagnostic text.
    Unreadable(String),
}

/// Writes the netlist of a design hierarchy.
pub struct Netlister<P> {
    provider: P,
    options: NetlistOptions,
}

impl<P: ViewProvider> Netlister<P> {
    pub fn new(provider: P, options: NetlistOptions) -> Self {
        Self { provider, options }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn options(&self) -> &NetlistOptions {
        &self.options
    }

    /// Netlist the hierarchy below `top` into a string.
    pub fn render(&self, top: &ViewKey) -> Result<(String, NetlistReport), NetlistError> {
        let mut buf = Vec::new();
        let report = self.write(top, &mut buf)?;
        Ok((String::from_utf8_lossy(&buf).into_owned(), report))
    }

    /// Netlist the hierarchy below `top` into `out`.
    ///
    /// Output is written as it is produced. On error `out` holds a partial
    /// netlist that the caller should discard.
    pub fn write<W: Write>(&self, top: &ViewKey, out: &mut W) -> Result<NetlistReport, NetlistError> {
        let View::Hierarchical(level) = self.provider.load(top)? else {
            return Err(NetlistError::NotHierarchical(top.clone()));
        };
        info!("netlisting {top}");

        self.write_header(top, out)?;

        let mut walk = Walk::default();
        walk.visited.insert(top.clone());
        walk.path.push(top.clone());
        self.write_level(top, &level, out, &mut walk)?;

        for line in walk.directives.lines() {
            writeln!(out, "{line}")?;
        }
        writeln!(out, "{}", self.options.dialect.end)?;
        out.flush()?;

        debug!(
            "{top}: {} instance lines, {} sub-circuits, {} diagnostics",
            walk.report.instances,
            walk.report.subcircuits.len(),
            walk.report.diagnostics.len()
        );
        Ok(walk.report)
    }

    fn write_header<W: Write>(&self, top: &ViewKey, out: &mut W) -> std::io::Result<()> {
        let dialect = &self.options.dialect;
        let date = self
            .options
            .timestamp
            .unwrap_or_else(|| Local::now().naive_local());
        writeln!(out, "{}", dialect.comment_line("wirenet netlist"))?;
        writeln!(out, "{}", dialect.comment_line(format!("library: {}", top.library)))?;
        writeln!(out, "{}", dialect.comment_line(format!("cell: {}", top.cell)))?;
        writeln!(out, "{}", dialect.comment_line(format!("view: {}", top.view)))?;
        writeln!(
            out,
            "{}",
            dialect.comment_line(format!("date: {}", date.format("%Y-%m-%d %H:%M:%S")))
        )?;
        writeln!(out, "{}", dialect.comment_line(""))
    }

    fn write_level<W: Write>(
        &self,
        key: &ViewKey,
        level: &Level,
        out: &mut W,
        walk: &mut Walk,
    ) -> Result<(), NetlistError> {
        let scope = key.to_string();
        let tolerance = self.options.tolerance;

        let resolution = ConnectivityResolver::resolve_level(level, tolerance);
        for conflict in resolution.conflicts() {
            self.report(
                out,
                walk,
                Diagnostic::new(DiagnosticKind::NamingConflict, &scope, conflict.to_string()),
            )?;
        }
        let binding = PinNetBinder::new(&level.segments, &resolution)
            .with_tolerance(tolerance)
            .bind(&level.instances);

        for (index, instance) in level.instances.iter().enumerate() {
            let pins = binding.pin_net_map(index);

            if instance.ignore {
                let text = match render_instance(instance, pins) {
                    Rendered::Line(line) => line,
                    Rendered::MissingTemplate(_) => format!("{} ({})", instance.name(), instance.master),
                };
                writeln!(out, "{}", self.options.dialect.comment_line(text))?;
                walk.report.diagnostics.push(Diagnostic::new(
                    DiagnosticKind::IgnoredInstance,
                    &scope,
                    format!("instance {} is ignored", instance.name()),
                ));
                continue;
            }
            if instance.pass_through {
                debug!("{scope}: {} is expanded by the caller", instance.name());
                continue;
            }

            for unconnected in binding.unconnected_for(index) {
                self.report(
                    out,
                    walk,
                    Diagnostic::new(DiagnosticKind::UnconnectedPin, &scope, unconnected.to_string()),
                )?;
            }

            let view = self.select_view(instance, &scope, out, walk)?;
            let target = self.target(instance, view, walk)?;

            let template = match &target {
                Target::External(external) => external.netlist_line.as_deref(),
                _ => None,
            };
            match render_instance_with(instance, pins, template) {
                Rendered::Line(line) => writeln!(out, "{line}")?,
                Rendered::MissingTemplate(message) => self.report(
                    out,
                    walk,
                    Diagnostic::new(DiagnosticKind::MissingTemplate, &scope, message),
                )?,
            }
            walk.report.instances += 1;

            match target {
                Target::Leaf => self.collect_model(instance, pins, None, walk),
                Target::Defined => {}
                Target::External(external) => self.collect_external(instance, pins, &external, walk),
                Target::Subcircuit(key, child) => {
                    self.write_subcircuit(&key, &child, instance, pins, out, walk)?
                }
                Target::Unreadable(message) => self.report(
                    out,
                    walk,
                    Diagnostic::new(DiagnosticKind::UnreadableView, &scope, message),
                )?,
            }
        }

        Ok(())
    }

    /// Pick the view an instance is netlisted through.
    fn select_view<W: Write>(
        &self,
        instance: &Instance,
        scope: &str,
        out: &mut W,
        walk: &mut Walk,
    ) -> Result<String, NetlistError> {
        let master = &instance.master;
        if let Some(view) = self
            .options
            .config
            .as_ref()
            .and_then(|config| config.get(&master.cell))
        {
            return Ok(view.clone());
        }

        match self.provider.views(&master.library, &master.cell) {
            Ok(available) => Ok(self
                .options
                .switch_views
                .iter()
                .find(|view| available.contains(view))
                .cloned()
                .unwrap_or_else(|| DEFAULT_VIEW.to_owned())),
            Err(err) => {
                self.report(
                    out,
                    walk,
                    Diagnostic::new(
                        DiagnosticKind::UnreadableView,
                        scope,
                        format!("cannot list views of {}: {err}", instance.name()),
                    ),
                )?;
                Ok(DEFAULT_VIEW.to_owned())
            }
        }
    }

    /// Find out what the chosen view of an instance is, loading it if needed.
    fn target(
        &self,
        instance: &Instance,
        view: String,
        walk: &Walk,
    ) -> Result<Target, NetlistError> {
        if view == instance.master.view || self.options.is_stop_view(&view) {
            return Ok(Target::Leaf);
        }

        let key = instance.master.with_view(view);
        // Only hierarchical views are ever visited, so neither check needs a load.
        if walk.path.contains(&key) {
            let mut cycle = walk.path.clone();
            cycle.push(key.clone());
            error!("cyclic hierarchy at {key}");
            return Err(NetlistError::Cycle(cycle));
        }
        if walk.visited.contains(&key) {
            debug!("{key} already defined");
            return Ok(Target::Defined);
        }

        Ok(match self.provider.load(&key) {
            Ok(View::Leaf) => Target::Leaf,
            Ok(View::External(external)) => Target::External(external),
            Ok(View::Hierarchical(child)) => Target::Subcircuit(key, child),
            Err(err) => Target::Unreadable(format!("cannot expand {}: {err}", instance.name())),
        })
    }

    fn write_subcircuit<W: Write>(
        &self,
        key: &ViewKey,
        level: &Level,
        instance: &Instance,
        instance_pins: &PinNetMap,
        out: &mut W,
        walk: &mut Walk,
    ) -> Result<(), NetlistError> {
        debug!("expanding {key}");
        walk.visited.insert(key.clone());
        walk.report.subcircuits.push(key.clone());
        walk.path.push(key.clone());

        let ports = self.subcircuit_ports(key, level, instance, instance_pins, out, walk)?;

        let dialect = &self.options.dialect;
        let subst = Substitution::new()
            .property("libName", key.library.as_str())
            .property("cellName", key.cell.as_str())
            .property("viewName", key.view.as_str())
            .pins(&ports);
        writeln!(out, "{}", Template::parse(&dialect.subckt_header).render(&subst))?;
        self.write_level(key, level, out, walk)?;
        writeln!(out, "{}", Template::parse(&dialect.subckt_footer).render(&subst))?;

        walk.path.pop();
        Ok(())
    }

    /// Header ports of a sub-circuit, one per pin of the instance line that
    /// triggered the definition and in the same order. Pins without a
    /// boundary pin of the same name, and boundary pins the instance lacks,
    /// are reported.
    fn subcircuit_ports<W: Write>(
        &self,
        key: &ViewKey,
        level: &Level,
        instance: &Instance,
        instance_pins: &PinNetMap,
        out: &mut W,
        walk: &mut Walk,
    ) -> Result<PinNetMap, NetlistError> {
        let scope = key.to_string();
        let boundary: IndexMap<&str, &Pin> =
            level.pins.iter().map(|pin| (pin.name.as_str(), pin)).collect();

        let mut ports = PinNetMap::with_capacity(instance_pins.len());
        for name in instance_pins.keys() {
            let port = match boundary.get(name.as_str()) {
                Some(pin) => pin.net_name().to_owned(),
                None => {
                    if !name.ends_with('!') {
                        self.report(
                            out,
                            walk,
                            Diagnostic::new(
                                DiagnosticKind::PortMismatch,
                                &scope,
                                format!(
                                    "pin {name} of {} has no boundary pin in {key}",
                                    instance.master
                                ),
                            ),
                        )?;
                    }
                    strip_global(name).to_owned()
                }
            };
            ports.insert(name.clone(), port);
        }

        for pin in level.boundary_pins() {
            if !instance_pins.contains_key(&pin.name) {
                self.report(
                    out,
                    walk,
                    Diagnostic::new(
                        DiagnosticKind::PortMismatch,
                        &scope,
                        format!(
                            "boundary pin {} of {key} is not a pin of {}",
                            pin.name, instance.master
                        ),
                    ),
                )?;
            }
        }

        Ok(ports)
    }

    fn collect_external(
        &self,
        instance: &Instance,
        pins: &PinNetMap,
        external: &ExternalView,
        walk: &mut Walk,
    ) {
        let path = external.path.display().to_string();
        let dialect = &self.options.dialect;
        let added = match external.language {
            ExternalLanguage::Spice => walk.directives.add_include(dialect.include_line(&path)),
            ExternalLanguage::VerilogA => walk
                .directives
                .add_external(dialect.external_module_line(&path)),
        };
        if added {
            debug!("{}: referencing {path}", instance.master);
        }
        self.collect_model(instance, pins, external.model_line.as_deref(), walk);
    }

    /// Record a model directive from `template`, or from the instance's
    /// `modelLine` attribute when none is given.
    fn collect_model(
        &self,
        instance: &Instance,
        pins: &PinNetMap,
        template: Option<&str>,
        walk: &mut Walk,
    ) {
        let Some(source) = template.or_else(|| instance.attributes.get(ATTR_MODEL_LINE).map(String::as_str))
        else {
            return;
        };
        let subst = Substitution::for_instance(instance).pins(pins);
        let line = Template::parse(source).render(&subst);
        if !line.trim().is_empty() {
            walk.directives.add_model(line);
        }
    }

    /// Log a diagnostic, write it as a comment and keep it for the report.
    fn report<W: Write>(
        &self,
        out: &mut W,
        walk: &mut Walk,
        diagnostic: Diagnostic,
    ) -> Result<(), NetlistError> {
        if diagnostic.is_error() {
            error!("{diagnostic}");
        } else {
            warn!("{diagnostic}");
        }
        writeln!(
            out,
            "{}",
            self.options.dialect.comment_line(diagnostic.comment_text())
        )?;
        walk.report.diagnostics.push(diagnostic);
        Ok(())
    }
}
