//! Ordered handler collection with index/name/instance lookup

use super::{
    error::{LoggerError, Result},
    handler::Handler,
    log_level::{get_level, Level},
    record::Record,
};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

pub type SharedHandler = Arc<dyn Handler>;

/// Which handler an operation targets
#[derive(Clone)]
pub enum HandlerSelector {
    Instance(SharedHandler),
    Index(usize),
    Name(String),
}

impl fmt::Debug for HandlerSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandlerSelector::Instance(handler) => {
                f.debug_tuple("Instance").field(&handler.name()).finish()
            }
            HandlerSelector::Index(index) => f.debug_tuple("Index").field(index).finish(),
            HandlerSelector::Name(name) => f.debug_tuple("Name").field(name).finish(),
        }
    }
}

impl From<usize> for HandlerSelector {
    fn from(index: usize) -> Self {
        HandlerSelector::Index(index)
    }
}

impl From<&str> for HandlerSelector {
    fn from(name: &str) -> Self {
        HandlerSelector::Name(name.to_string())
    }
}

impl From<String> for HandlerSelector {
    fn from(name: String) -> Self {
        HandlerSelector::Name(name)
    }
}

impl From<SharedHandler> for HandlerSelector {
    fn from(handler: SharedHandler) -> Self {
        HandlerSelector::Instance(handler)
    }
}

impl From<&SharedHandler> for HandlerSelector {
    fn from(handler: &SharedHandler) -> Self {
        HandlerSelector::Instance(Arc::clone(handler))
    }
}

/// Selectors coming from configuration: numbers pick by index, strings by name
impl TryFrom<&Value> for HandlerSelector {
    type Error = LoggerError;

    fn try_from(value: &Value) -> Result<Self> {
        match value {
            Value::String(name) => Ok(HandlerSelector::Name(name.clone())),
            Value::Number(n) => n
                .as_u64()
                .and_then(|i| usize::try_from(i).ok())
                .map(HandlerSelector::Index)
                .ok_or_else(|| {
                    LoggerError::invalid_type("handler", "a non-negative index or a name", n.to_string())
                }),
            other => Err(LoggerError::invalid_type(
                "handler",
                "an index or a name",
                json_type_name(other),
            )),
        }
    }
}

/// New threshold for a handler: a level, or a bare severity wrapped as `CUSTOM`
#[derive(Debug, Clone, PartialEq)]
pub enum Threshold {
    Level(Level),
    Severity(u32),
}

impl Threshold {
    pub fn into_level(self) -> Level {
        match self {
            Threshold::Level(level) => level,
            Threshold::Severity(severity) => Level::custom(severity),
        }
    }
}

impl From<Level> for Threshold {
    fn from(level: Level) -> Self {
        Threshold::Level(level)
    }
}

impl From<u32> for Threshold {
    fn from(severity: u32) -> Self {
        Threshold::Severity(severity)
    }
}

/// Thresholds coming from configuration: numbers are severities, strings level names
impl TryFrom<&Value> for Threshold {
    type Error = LoggerError;

    fn try_from(value: &Value) -> Result<Self> {
        match value {
            Value::String(name) => get_level(name).map(Threshold::Level),
            Value::Number(n) => {
                let severity = if let Some(int) = n.as_u64() {
                    u32::try_from(int).ok()
                } else {
                    // Fractional severities round down
                    n.as_f64()
                        .filter(|f| f.is_finite() && *f >= 0.0 && *f <= u32::MAX as f64)
                        .map(|f| f as u32)
                };
                severity.map(Threshold::Severity).ok_or_else(|| {
                    LoggerError::invalid_type("new_threshold", "a level or a non-negative severity", n.to_string())
                })
            }
            other => Err(LoggerError::invalid_type(
                "new_threshold",
                "a level or a severity",
                json_type_name(other),
            )),
        }
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Ordered sequence of handlers.
///
/// `count` is maintained on every mutation so the per-call emptiness check
/// never walks the vector; it must always equal `handlers.len()`. Cloning
/// only clones the handler pointers, which is how dispatch runs without the
/// owning lock held.
#[derive(Default, Clone)]
pub struct HandlerSet {
    handlers: Vec<SharedHandler>,
    count: usize,
}

impl HandlerSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_handlers(handlers: Vec<SharedHandler>) -> Self {
        let count = handlers.len();
        Self { handlers, count }
    }

    #[inline]
    pub fn len(&self) -> usize {
        debug_assert_eq!(self.count, self.handlers.len());
        self.count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = &SharedHandler> {
        self.handlers.iter()
    }

    pub fn names(&self) -> Vec<String> {
        self.handlers.iter().map(|h| h.name().to_string()).collect()
    }

    pub fn add(&mut self, handler: SharedHandler) {
        self.handlers.push(handler);
        self.count = self.handlers.len();
    }

    fn position(&self, selector: &HandlerSelector) -> Result<usize> {
        match selector {
            HandlerSelector::Index(index) => {
                if *index < self.handlers.len() {
                    Ok(*index)
                } else {
                    Err(LoggerError::HandlerIndexOutOfRange {
                        index: *index,
                        len: self.handlers.len(),
                    })
                }
            }
            HandlerSelector::Name(name) => self
                .handlers
                .iter()
                .position(|h| h.name() == name)
                .ok_or_else(|| LoggerError::handler_not_found(name.clone())),
            HandlerSelector::Instance(target) => self
                .handlers
                .iter()
                .position(|h| Arc::ptr_eq(h, target))
                .ok_or_else(|| LoggerError::handler_not_found(target.name())),
        }
    }

    pub fn get(&self, selector: impl Into<HandlerSelector>) -> Result<&SharedHandler> {
        let index = self.position(&selector.into())?;
        Ok(&self.handlers[index])
    }

    /// Remove the first matching handler. A failed lookup leaves the set untouched.
    pub fn remove(&mut self, selector: impl Into<HandlerSelector>) -> Result<SharedHandler> {
        let index = self.position(&selector.into())?;
        let removed = self.handlers.remove(index);
        self.count = self.handlers.len();
        Ok(removed)
    }

    pub fn set_threshold(
        &mut self,
        selector: impl Into<HandlerSelector>,
        threshold: impl Into<Threshold>,
    ) -> Result<()> {
        let index = self.position(&selector.into())?;
        self.handlers[index].set_threshold(threshold.into().into_level());
        Ok(())
    }

    /// Synchronous fan-out in registration order.
    ///
    /// Handlers below their threshold are skipped. The first handler error is
    /// returned to the caller and the remaining handlers are not invoked.
    pub fn dispatch(&self, record: &Record) -> Result<()> {
        for handler in self.handlers.iter() {
            if record.level().meets(&handler.threshold()) {
                handler.handle(record)?;
            }
        }
        Ok(())
    }

    pub fn flush(&self) -> Result<()> {
        for handler in self.handlers.iter() {
            handler.flush()?;
        }
        Ok(())
    }
}

impl fmt::Debug for HandlerSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerSet")
            .field("handlers", &self.names())
            .field("count", &self.count)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::MemoryHandler;
    use serde_json::json;

    fn named(name: &str) -> SharedHandler {
        Arc::new(MemoryHandler::new(name))
    }

    #[test]
    fn test_add_and_lookup() {
        let mut set = HandlerSet::new();
        assert!(set.is_empty());
        set.add(named("a"));
        set.add(named("b"));
        assert_eq!(set.len(), 2);
        assert_eq!(set.get(1usize).unwrap().name(), "b");
        assert_eq!(set.get("a").unwrap().name(), "a");
        assert_eq!(set.names(), vec!["a", "b"]);
    }

    #[test]
    fn test_remove_by_each_selector() {
        let target = named("target");
        let mut set = HandlerSet::from_handlers(vec![named("a"), Arc::clone(&target), named("c")]);

        let removed = set.remove(&target).unwrap();
        assert!(Arc::ptr_eq(&removed, &target));
        assert_eq!(set.names(), vec!["a", "c"]);

        set.remove(0usize).unwrap();
        assert_eq!(set.names(), vec!["c"]);

        set.remove("c").unwrap();
        assert!(set.is_empty());
    }

    #[test]
    fn test_remove_unknown_leaves_set_unchanged() {
        let mut set = HandlerSet::from_handlers(vec![named("a"), named("b")]);

        let err = set.remove("missing").err().unwrap();
        assert!(matches!(err, LoggerError::HandlerNotFound { .. }));
        assert_eq!(set.len(), 2);

        let err = set.remove(9usize).err().unwrap();
        assert!(matches!(err, LoggerError::HandlerIndexOutOfRange { index: 9, len: 2 }));
        assert_eq!(set.len(), 2);

        let stranger = named("a");
        assert!(set.remove(&stranger).is_err());
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_set_threshold_wraps_severity() {
        let mut set = HandlerSet::from_handlers(vec![named("a")]);
        set.set_threshold("a", 35u32).unwrap();
        let level = set.get(0usize).unwrap().threshold();
        assert_eq!(level, Level::custom(35));
        assert!(level > Level::WARN && level < Level::ERROR);

        set.set_threshold(0usize, Level::ERROR).unwrap();
        assert_eq!(set.get("a").unwrap().threshold(), Level::ERROR);

        assert!(matches!(
            set.set_threshold("b", Level::INFO),
            Err(LoggerError::HandlerNotFound { .. })
        ));
    }

    #[test]
    fn test_selector_from_json() {
        assert!(matches!(
            HandlerSelector::try_from(&json!(2)).unwrap(),
            HandlerSelector::Index(2)
        ));
        assert!(matches!(
            HandlerSelector::try_from(&json!("file")).unwrap(),
            HandlerSelector::Name(ref n) if n == "file"
        ));
        for bad in [json!(true), json!(null), json!([1]), json!(-1), json!(1.5)] {
            assert!(matches!(
                HandlerSelector::try_from(&bad),
                Err(LoggerError::InvalidArgumentType { .. })
            ));
        }
    }

    #[test]
    fn test_threshold_from_json() {
        assert_eq!(Threshold::try_from(&json!(12)).unwrap(), Threshold::Severity(12));
        assert_eq!(Threshold::try_from(&json!(12.9)).unwrap(), Threshold::Severity(12));
        assert_eq!(
            Threshold::try_from(&json!("error")).unwrap(),
            Threshold::Level(Level::ERROR)
        );
        assert!(matches!(
            Threshold::try_from(&json!({"level": 1})),
            Err(LoggerError::InvalidArgumentType { .. })
        ));
        assert!(matches!(
            Threshold::try_from(&json!("bogus")),
            Err(LoggerError::LevelNotFound { .. })
        ));
    }
}
