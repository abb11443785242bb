//! Rule instances and the message sources attached to them.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// An opaque rule instance: the Rust counterpart of a metadata attribute.
///
/// Any `'static + Debug + Send + Sync` value is a rule. Checkers recognise the
/// rules they understand by downcasting through [`Rule::as_any`].
pub trait Rule: Any + fmt::Debug + Send + Sync {
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any + fmt::Debug + Send + Sync> Rule for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl dyn Rule {
    /// Returns `true` if the rule instance is of type `R`.
    pub fn is<R: Any>(&self) -> bool {
        self.as_any().is::<R>()
    }

    pub fn downcast_ref<R: Any>(&self) -> Option<&R> {
        self.as_any().downcast_ref::<R>()
    }
}

/// A message attributed to a member of the failing object.
///
/// `member == None` attributes the message to the object itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberMessage {
    pub member: Option<String>,
    pub message: String,
}

impl MemberMessage {
    pub fn new(member: Option<String>, message: impl Into<String>) -> Self {
        Self {
            member,
            message: message.into(),
        }
    }

    /// A message attributed to the failing object itself.
    pub fn for_object(message: impl Into<String>) -> Self {
        Self::new(None, message)
    }
}

pub type MessageFactory = Arc<dyn Fn() -> anyhow::Result<String> + Send + Sync>;

pub type OccurrenceFactory =
    Arc<dyn Fn(&dyn Any) -> anyhow::Result<Vec<MemberMessage>> + Send + Sync>;

/// Where the text of a failing rule comes from.
#[derive(Clone)]
pub enum MessageSource {
    /// No message was supplied; resolves to [`UNSPECIFIED_MESSAGE`].
    Unspecified,
    Static(String),
    /// Evaluated at most once, on the first failure that needs it.
    Deferred(MessageFactory),
    /// Evaluated for every finding with the failing object.
    PerOccurrence(OccurrenceFactory),
}

/// Text used for rules whose provider supplied no message.
pub const UNSPECIFIED_MESSAGE: &str = "Unspecified error";

impl fmt::Debug for MessageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unspecified => f.write_str("Unspecified"),
            Self::Static(text) => f.debug_tuple("Static").field(text).finish(),
            Self::Deferred(_) => f.write_str("Deferred(..)"),
            Self::PerOccurrence(_) => f.write_str("PerOccurrence(..)"),
        }
    }
}

/// A rule instance together with its message source, as returned by a
/// [`crate::RuleProvider`].
///
/// `rule == None` is the capability marker: it asks a capability checker
/// (self-validation, legacy error string) to inspect the object itself.
#[derive(Debug, Clone)]
pub struct RuleInfo {
    rule: Option<Arc<dyn Rule>>,
    message: MessageSource,
}

impl RuleInfo {
    pub fn new(rule: Arc<dyn Rule>) -> Self {
        Self {
            rule: Some(rule),
            message: MessageSource::Unspecified,
        }
    }

    pub fn with_message(rule: Arc<dyn Rule>, message: impl Into<String>) -> Self {
        Self {
            rule: Some(rule),
            message: MessageSource::Static(message.into()),
        }
    }

    pub fn with_deferred<F>(rule: Arc<dyn Rule>, factory: F) -> Self
    where
        F: Fn() -> anyhow::Result<String> + Send + Sync + 'static,
    {
        Self {
            rule: Some(rule),
            message: MessageSource::Deferred(Arc::new(factory)),
        }
    }

    pub fn with_occurrence<F>(rule: Option<Arc<dyn Rule>>, factory: F) -> Self
    where
        F: Fn(&dyn Any) -> anyhow::Result<Vec<MemberMessage>> + Send + Sync + 'static,
    {
        Self {
            rule,
            message: MessageSource::PerOccurrence(Arc::new(factory)),
        }
    }

    /// Capability marker whose messages are computed from the failing object.
    pub fn capability<F>(factory: F) -> Self
    where
        F: Fn(&dyn Any) -> anyhow::Result<Vec<MemberMessage>> + Send + Sync + 'static,
    {
        Self::with_occurrence(None, factory)
    }

    pub fn rule(&self) -> Option<&dyn Rule> {
        self.rule.as_deref()
    }

    pub fn rule_arc(&self) -> Option<&Arc<dyn Rule>> {
        self.rule.as_ref()
    }

    pub fn message(&self) -> &MessageSource {
        &self.message
    }

    pub fn is_capability_marker(&self) -> bool {
        self.rule.is_none()
    }
}
