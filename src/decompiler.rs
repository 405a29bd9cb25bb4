//! Request driver: gate, discover, configure, invoke, collect, then either
//! return banner + source or fall back to a stub view.
//!
//! A `Decompiler` holds only immutable configuration, so one instance can
//! serve concurrent requests. Everything mutable is created per request.

use serde::Serialize;
use tracing::{debug, error};

use crate::collector::ResultCollector;
use crate::engine::{DecompilerEngine, EngineLogger, EngineOptions};
use crate::error::{DecompileError, SkipReason};
use crate::inspect;
use crate::logger::TracingLogger;
use crate::mapping::LineMapping;
use crate::source::{ClassLocation, ClassUnit, CompilationUnitSet};
use crate::stub::{FallbackRenderer, StubRenderer};

pub const BANNER: &str = "//\n\
// Source code recreated from a .class file by classview\n\
// (powered by Fernflower decompiler)\n\
//\n\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TextOrigin {
    Decompiled,
    Skipped(SkipReason),
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecompiledText {
    pub text: String,
    pub mapping: Option<LineMapping>,
    pub origin: TextOrigin,
}

impl DecompiledText {
    pub fn is_decompiled(&self) -> bool {
        self.origin == TextOrigin::Decompiled
    }
}

pub struct Decompiler<E> {
    engine: E,
    options: EngineOptions,
    logger: Box<dyn EngineLogger>,
    fallback: Box<dyn FallbackRenderer>,
}

impl<E: DecompilerEngine> Decompiler<E> {
    pub fn new(engine: E, options: EngineOptions) -> Self {
        Self {
            engine,
            options,
            logger: Box::new(TracingLogger),
            fallback: Box::new(StubRenderer),
        }
    }

    pub fn with_fallback(mut self, fallback: impl FallbackRenderer + 'static) -> Self {
        self.fallback = Box::new(fallback);
        self
    }

    pub fn with_logger(mut self, logger: impl EngineLogger + 'static) -> Self {
        self.logger = Box::new(logger);
        self
    }

    /// Never fails: any problem past the gate degrades to the fallback rendering.
    pub fn decompile(&self, location: &ClassLocation) -> DecompiledText {
        let primary = match ClassUnit::read(location.clone()) {
            Ok(unit) => unit,
            Err(e) => {
                error!(file = %location, error = %format!("{e:#}"), "failed to read class file");
                return self.fallback(location, &[], TextOrigin::Failed);
            }
        };

        if let Err(DecompileError::SkippedByPolicy(reason)) = inspect::ensure_decompilable(&primary) {
            return self.fallback(location, primary.bytes(), TextOrigin::Skipped(reason));
        }

        match self.run(primary.clone()) {
            Ok(Some((text, mapping))) => DecompiledText {
                text: format!("{BANNER}{text}"),
                mapping,
                origin: TextOrigin::Decompiled,
            },
            Ok(None) => {
                error!(file = %location, "engine produced no output");
                self.fallback(location, primary.bytes(), TextOrigin::Failed)
            }
            Err(e) => {
                error!(file = %location, error = %error_chain(&e), "decompilation failed");
                self.fallback(location, primary.bytes(), TextOrigin::Failed)
            }
        }
    }

    fn run(
        &self,
        primary: ClassUnit,
    ) -> Result<Option<(String, Option<LineMapping>)>, DecompileError> {
        let key = primary.key().to_string();

        let units = CompilationUnitSet::discover(primary).map_err(|e| {
            DecompileError::engine(format!("{e:#}"))
                .into_internal(format!("discovering units of {key}"))
        })?;
        debug!(file = %key, units = units.len(), "discovered compilation units");

        let paths = units.keys();
        let mut collector = ResultCollector::new();
        self.engine
            .decompile_context(
                &units,
                &mut collector,
                &self.options,
                self.logger.as_ref(),
                &paths,
            )
            .map_err(|e| self.logger.write_error(&format!("decompiling {key}"), e))?;

        debug!(file = %key, ignored = collector.ignored(), "engine finished");
        Ok(collector
            .into_result()
            .map(|unit| (unit.content, unit.mapping)))
    }

    fn fallback(&self, location: &ClassLocation, bytes: &[u8], origin: TextOrigin) -> DecompiledText {
        DecompiledText {
            text: self.fallback.render(location, bytes),
            mapping: None,
            origin,
        }
    }
}

fn error_chain(e: &(dyn std::error::Error + 'static)) -> String {
    let mut out = e.to_string();
    let mut source = e.source();
    while let Some(cause) = source {
        out.push_str(": ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out
}
