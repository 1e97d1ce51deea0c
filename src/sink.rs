//! Delivery of emissions to `tracing` subscribers.
//!
//! The name of the caller-location field is only known at runtime, so the
//! `tracing` macros (which need field names as literals) can't be used here.
//! Instead every distinct (target, source field) pair gets its own set of
//! event callsites, registered once and kept for the life of the process,
//! and events are built against them by hand. Subscribers see them exactly
//! like macro-generated events: filters, `register_callsite` and span
//! parenting all apply.

use std::collections::HashMap;
use std::mem;
use std::panic::Location;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use once_cell::sync::{Lazy, OnceCell};
use tracing::{Dispatch, Level, Span};
use tracing_core::callsite::{self, Callsite, Identifier};
use tracing_core::field::{self, Field, FieldSet, Value, ValueSet};
use tracing_core::metadata::Kind;
use tracing_core::span::Id;
use tracing_core::subscriber::Interest;
use tracing_core::{Event, Metadata};

const FIELD_NAMES: [&str; 5] = ["message", "rows", "duration", "error", "reason"];

/// A single log entry produced by the logger.
#[derive(Debug, Clone, PartialEq)]
pub struct Emission {
    pub level: Level,
    pub message: String,
    pub rows: Option<i64>,
    pub duration: Option<Duration>,
    pub error: Option<String>,
    pub reason: Option<&'static str>,
    pub source: Option<&'static Location<'static>>,
}

impl Emission {
    /// An emission carrying only a message.
    pub fn message(level: Level, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            rows: None,
            duration: None,
            error: None,
            reason: None,
            source: None,
        }
    }
}

/// A destination for emissions.
///
/// A logger holds at most one sink of each kind and delivers every emission
/// to all of them.
#[derive(Debug, Clone)]
pub enum Sink {
    /// A specific subscriber.
    Dispatch(Dispatch),
    /// Events become children of this span and go to the subscriber that
    /// created it, inheriting the span's fields. Nothing is delivered if the
    /// span is disabled.
    Span(Span),
    /// Whichever subscriber is the default when the event is emitted.
    Current,
}

impl Sink {
    pub(crate) fn same_kind(&self, other: &Sink) -> bool {
        mem::discriminant(self) == mem::discriminant(other)
    }

    pub(crate) fn emit(&self, sites: &QuerySites, emission: &Emission) {
        let site = sites.for_level(emission.level);
        match self {
            Sink::Dispatch(dispatch) => site.dispatch(dispatch, None, emission),
            Sink::Span(span) => {
                span.with_subscriber(|(id, dispatch)| site.dispatch(dispatch, Some(id), emission));
            }
            Sink::Current => {
                tracing::dispatcher::get_default(|dispatch| site.dispatch(dispatch, None, emission))
            }
        }
    }
}

struct QueryCallsite {
    metadata: OnceCell<Metadata<'static>>,
}

/// Stand-in reported by a callsite whose metadata is not set yet.
struct Unregistered;

static UNREGISTERED_CALLSITE: Unregistered = Unregistered;

static UNREGISTERED: Metadata<'static> = Metadata::new(
    "db.query",
    "sea_orm_logging",
    Level::TRACE,
    None,
    None,
    None,
    FieldSet::new(&[], Identifier(&UNREGISTERED_CALLSITE)),
    Kind::EVENT,
);

impl Callsite for Unregistered {
    fn set_interest(&self, _interest: Interest) {}

    fn metadata(&self) -> &Metadata<'_> {
        &UNREGISTERED
    }
}

impl Callsite for QueryCallsite {
    fn set_interest(&self, _interest: Interest) {}

    fn metadata(&self) -> &Metadata<'_> {
        self.metadata.get().unwrap_or(&UNREGISTERED)
    }
}

struct QueryFields {
    message: Field,
    rows: Field,
    duration: Field,
    error: Field,
    reason: Field,
    source: Option<Field>,
}

impl QueryFields {
    fn new(set: &FieldSet) -> Option<Self> {
        Some(Self {
            message: set.field("message")?,
            rows: set.field("rows")?,
            duration: set.field("duration")?,
            error: set.field("error")?,
            reason: set.field("reason")?,
            source: set.iter().nth(FIELD_NAMES.len()),
        })
    }
}

struct EventSite {
    metadata: &'static Metadata<'static>,
    fields: QueryFields,
}

impl EventSite {
    fn register(
        level: Level,
        target: &'static str,
        names: &'static [&'static str],
    ) -> Option<Self> {
        let callsite: &'static QueryCallsite = Box::leak(Box::new(QueryCallsite {
            metadata: OnceCell::new(),
        }));
        let metadata = callsite.metadata.get_or_init(|| {
            Metadata::new(
                "db.query",
                target,
                level,
                None,
                None,
                Some(module_path!()),
                FieldSet::new(names, Identifier(callsite)),
                Kind::EVENT,
            )
        });
        let fields = QueryFields::new(metadata.fields())?;
        callsite::register(callsite);
        Some(Self { metadata, fields })
    }

    fn dispatch(&self, dispatch: &Dispatch, parent: Option<&Id>, emission: &Emission) {
        if !dispatch.enabled(self.metadata) {
            return;
        }

        let f = &self.fields;
        let message = field::display(&emission.message);
        let duration = emission.duration.map(field::debug);
        let error = emission.error.as_deref().map(field::display);
        let base = [
            (&f.message, Some(&message as &dyn Value)),
            (&f.rows, emission.rows.as_ref().map(|v| v as &dyn Value)),
            (&f.duration, duration.as_ref().map(|v| v as &dyn Value)),
            (&f.error, error.as_ref().map(|v| v as &dyn Value)),
            (&f.reason, emission.reason.as_ref().map(|v| v as &dyn Value)),
        ];

        match (&f.source, emission.source.map(field::display)) {
            (Some(source), Some(location)) => {
                let [message, rows, duration, error, reason] = base;
                let values = [
                    message,
                    rows,
                    duration,
                    error,
                    reason,
                    (source, Some(&location as &dyn Value)),
                ];
                deliver(dispatch, parent, self.metadata, &self.metadata.fields().value_set(&values));
            }
            _ => deliver(dispatch, parent, self.metadata, &self.metadata.fields().value_set(&base)),
        }
    }
}

fn deliver(
    dispatch: &Dispatch,
    parent: Option<&Id>,
    metadata: &'static Metadata<'static>,
    values: &ValueSet<'_>,
) {
    let event = match parent {
        Some(id) => Event::new_child_of(id.clone(), metadata, values),
        None => Event::new(metadata, values),
    };
    dispatch.event(&event);
}

/// One registered callsite per level for a (target, source field) pair.
pub(crate) struct QuerySites {
    error: EventSite,
    warn: EventSite,
    info: EventSite,
    debug: EventSite,
}

type SiteKey = (&'static str, Option<String>);

static REGISTRY: Lazy<Mutex<HashMap<SiteKey, &'static QuerySites>>> = Lazy::new(Default::default);

impl QuerySites {
    /// Returns the callsites for `target` and `source_field`, registering them
    /// on first use.
    pub(crate) fn get(target: &'static str, source_field: Option<&str>) -> Option<&'static QuerySites> {
        let mut registry = REGISTRY.lock().unwrap_or_else(PoisonError::into_inner);
        let key = (target, source_field.map(str::to_owned));
        if let Some(sites) = registry.get(&key) {
            return Some(*sites);
        }

        let mut names = FIELD_NAMES.to_vec();
        if let Some(name) = source_field {
            names.push(Box::leak(name.to_owned().into_boxed_str()));
        }
        let names: &'static [&'static str] = Box::leak(names.into_boxed_slice());
        let sites: &'static QuerySites = Box::leak(Box::new(QuerySites {
            error: EventSite::register(Level::ERROR, target, names)?,
            warn: EventSite::register(Level::WARN, target, names)?,
            info: EventSite::register(Level::INFO, target, names)?,
            debug: EventSite::register(Level::DEBUG, target, names)?,
        }));
        registry.insert(key, sites);
        Some(sites)
    }

    fn for_level(&self, level: Level) -> &EventSite {
        if level == Level::ERROR {
            &self.error
        } else if level == Level::WARN {
            &self.warn
        } else if level == Level::INFO {
            &self.info
        } else {
            &self.debug
        }
    }
}

impl std::fmt::Debug for QuerySites {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuerySites")
            .field("target", &self.debug.metadata.target())
            .field("fields", &self.debug.metadata.fields())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::Capture;

    #[test]
    fn test_sites_are_cached() {
        let a = QuerySites::get("sink_tests", Some("caller")).unwrap();
        let b = QuerySites::get("sink_tests", Some("caller")).unwrap();
        let c = QuerySites::get("sink_tests", None).unwrap();
        assert!(std::ptr::eq(a, b));
        assert!(!std::ptr::eq(a, c));
    }

    #[test]
    fn test_dispatch_sink_records_fields() {
        let capture = Capture::default();
        let sites = QuerySites::get("sink_tests", Some("src")).unwrap();
        let emission = Emission {
            rows: Some(-1),
            error: Some("boom".to_string()),
            source: Some(Location::caller()),
            ..Emission::message(Level::ERROR, "SELECT 1")
        };

        Sink::Dispatch(capture.dispatch()).emit(sites, &emission);

        let events = capture.events();
        assert_eq!(events.len(), 1);
        let event = &events[0];
        assert_eq!(event.level, Level::ERROR);
        assert_eq!(event.target, "sink_tests");
        assert_eq!(event.field("message"), Some("SELECT 1"));
        assert_eq!(event.field("rows"), Some("-1"));
        assert_eq!(event.field("error"), Some("boom"));
        assert!(event.field("src").unwrap().contains("sink.rs"));
        assert_eq!(event.field("duration"), None);
        assert_eq!(event.field("reason"), None);
    }

    #[test]
    fn test_span_sink_parents_event() {
        let capture = Capture::default();
        let dispatch = capture.dispatch();
        let span = tracing::dispatcher::with_default(&dispatch, || {
            tracing::info_span!("request", request_id = 7)
        });

        let sites = QuerySites::get("sink_tests", None).unwrap();
        Sink::Span(span).emit(sites, &Emission::message(Level::INFO, "hello"));

        let events = capture.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].parent.as_deref(), Some("request"));
    }

    #[test]
    fn test_disabled_span_drops_emission() {
        let capture = Capture::default();
        let sites = QuerySites::get("sink_tests", None).unwrap();
        tracing::dispatcher::with_default(&capture.dispatch(), || {
            Sink::Span(Span::none()).emit(sites, &Emission::message(Level::INFO, "hello"));
        });
        assert!(capture.events().is_empty());
    }

    #[test]
    fn test_current_sink_uses_default_subscriber() {
        let capture = Capture::default();
        let sites = QuerySites::get("sink_tests", None).unwrap();
        tracing::dispatcher::with_default(&capture.dispatch(), || {
            Sink::Current.emit(sites, &Emission::message(Level::WARN, "careful"));
        });
        let events = capture.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].level, Level::WARN);
    }

    #[test]
    fn test_callsite_metadata_matches_site() {
        let sites = QuerySites::get("sink_tests", Some("origin")).unwrap();
        let site = sites.for_level(Level::INFO);
        let callsite = site.metadata.callsite();
        let fields = site.metadata.fields();
        assert_eq!(fields.iter().count(), FIELD_NAMES.len() + 1);
        assert_eq!(site.fields.source.as_ref().map(Field::name), Some("origin"));
        assert!(fields.field("message").is_some());
        assert_eq!(site.metadata.level(), &Level::INFO);
        assert_eq!(callsite, fields.field("message").unwrap().callsite());
    }

    #[test]
    fn test_unregistered_callsite_reports_placeholder() {
        let callsite = QueryCallsite {
            metadata: OnceCell::new(),
        };
        assert_eq!(callsite.metadata().name(), "db.query");
        assert_eq!(callsite.metadata().fields().iter().count(), 0);
    }
}
