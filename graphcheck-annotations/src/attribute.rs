//! Annotation attributes and the [`Annotation`] rule wrapper.

use std::any::{Any, TypeId};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::Context;
use graphcheck::{check, Check};

/// A self-describing validation attribute.
///
/// `is_valid` is the dynamic fallback used by [`AnnotationChecker`]; attributes
/// with a faster typed form expose it through [`ValidationAttribute::range`].
///
/// [`AnnotationChecker`]: crate::AnnotationChecker
pub trait ValidationAttribute: fmt::Debug + Send + Sync + 'static {
    /// `None` means the value is absent.
    fn is_valid(&self, value: Option<&dyn Any>) -> bool;

    fn format_error_message(&self, name: &str) -> String;

    fn range(&self) -> Option<&dyn TypedRange> {
        None
    }
}

/// A range attribute that can emit a comparison specialised to its operand.
pub trait TypedRange: Send + Sync {
    fn operand_type(&self) -> TypeId;

    fn typed_check(&self) -> Check;
}

/// Rule instance carried in `#[rule(..)]` metadata.
#[derive(Clone)]
pub struct Annotation {
    attribute: Arc<dyn ValidationAttribute>,
    message: Option<String>,
}

impl Annotation {
    pub fn new(attribute: impl ValidationAttribute) -> Self {
        Self {
            attribute: Arc::new(attribute),
            message: None,
        }
    }

    /// Ad-hoc attribute from a predicate and a message template.
    pub fn custom<F>(message: impl Into<String>, is_valid: F) -> Self
    where
        F: Fn(Option<&dyn Any>) -> bool + Send + Sync + 'static,
    {
        Self::new(Custom {
            predicate: Arc::new(is_valid),
            template: message.into(),
        })
    }

    /// Replaces the attribute's own message. `{0}` expands to the member name.
    pub fn with_message(mut self, template: impl Into<String>) -> Self {
        self.message = Some(template.into());
        self
    }

    pub fn attribute(&self) -> &dyn ValidationAttribute {
        &*self.attribute
    }

    pub fn is_valid(&self, value: Option<&dyn Any>) -> bool {
        self.attribute.is_valid(value)
    }

    pub fn format_error_message(&self, name: &str) -> String {
        match &self.message {
            Some(template) => template.replace("{0}", name),
            None => self.attribute.format_error_message(name),
        }
    }
}

impl fmt::Debug for Annotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Annotation")
            .field("attribute", &self.attribute)
            .field("message", &self.message)
            .finish()
    }
}

/// `#[rule(range(1, 10))]`
pub fn range<T: RangeOperand>(min: T, max: T) -> Annotation {
    Annotation::new(Range::new(min, max))
}

/// `#[rule(required())]`
pub fn required() -> Annotation {
    Annotation::new(Required)
}

/// `#[rule(string_length(64))]`
pub fn string_length(max: usize) -> Annotation {
    Annotation::new(StringLength::new(max))
}

/// Numeric types a [`Range`] can compare.
pub trait RangeOperand: Copy + PartialOrd + fmt::Debug + fmt::Display + Send + Sync + 'static {
    fn to_f64(self) -> f64;
}

macro_rules! range_operand {
    ($($ty:ty),* $(,)?) => {
        $(
            impl RangeOperand for $ty {
                fn to_f64(self) -> f64 {
                    self as f64
                }
            }
        )*
    };
}

range_operand!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64);

/// Widens any supported numeric value for cross-type comparisons.
fn numeric_value(value: &dyn Any) -> Option<f64> {
    macro_rules! widen {
        ($($ty:ty),*) => {
            $(
                if let Some(v) = value.downcast_ref::<$ty>() {
                    return Some(v.to_f64());
                }
            )*
        };
    }
    widen!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64);
    None
}

/// Inclusive numeric range. Absent values pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Range<T> {
    min: T,
    max: T,
}

impl<T: RangeOperand> Range<T> {
    pub fn new(min: T, max: T) -> Self {
        Self { min, max }
    }

    pub fn min(&self) -> T {
        self.min
    }

    pub fn max(&self) -> T {
        self.max
    }

    pub fn contains(&self, value: T) -> bool {
        self.min <= value && value <= self.max
    }
}

impl<T> Range<T>
where
    T: RangeOperand + FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    /// Builds a range from bounds written as text.
    pub fn parse(min: &str, max: &str) -> anyhow::Result<Self> {
        let lower = min
            .trim()
            .parse::<T>()
            .with_context(|| format!("invalid range minimum {min:?}"))?;
        let upper = max
            .trim()
            .parse::<T>()
            .with_context(|| format!("invalid range maximum {max:?}"))?;
        if lower > upper {
            anyhow::bail!("range minimum {lower} is greater than maximum {upper}");
        }
        Ok(Self::new(lower, upper))
    }
}

impl<T: RangeOperand> ValidationAttribute for Range<T> {
    fn is_valid(&self, value: Option<&dyn Any>) -> bool {
        let Some(value) = value else {
            return true;
        };
        if let Some(v) = value.downcast_ref::<T>() {
            return self.contains(*v);
        }
        match numeric_value(value) {
            Some(v) => self.min.to_f64() <= v && v <= self.max.to_f64(),
            None => false,
        }
    }

    fn format_error_message(&self, name: &str) -> String {
        format!("The field {name} must be between {} and {}.", self.min, self.max)
    }

    fn range(&self) -> Option<&dyn TypedRange> {
        Some(self)
    }
}

impl<T: RangeOperand> TypedRange for Range<T> {
    fn operand_type(&self) -> TypeId {
        TypeId::of::<T>()
    }

    fn typed_check(&self) -> Check {
        let range = *self;
        check(move |value| match value {
            Some(value) => value.downcast_ref::<T>().map_or(true, |v| range.contains(*v)),
            None => true,
        })
    }
}

fn as_str(value: &dyn Any) -> Option<&str> {
    value
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| value.downcast_ref::<&'static str>().copied())
}

/// The value must be present; strings must also contain non-whitespace.
#[derive(Debug, Clone, Copy, Default)]
pub struct Required;

impl ValidationAttribute for Required {
    fn is_valid(&self, value: Option<&dyn Any>) -> bool {
        match value {
            None => false,
            Some(value) => as_str(value).map_or(true, |s| !s.trim().is_empty()),
        }
    }

    fn format_error_message(&self, name: &str) -> String {
        format!("The {name} field is required.")
    }
}

/// Bounds the character count of a string member. Absent values and
/// non-string values pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StringLength {
    max: usize,
    min: usize,
}

impl StringLength {
    pub fn new(max: usize) -> Self {
        Self { max, min: 0 }
    }

    pub fn min_length(mut self, min: usize) -> Self {
        self.min = min;
        self
    }
}

impl ValidationAttribute for StringLength {
    fn is_valid(&self, value: Option<&dyn Any>) -> bool {
        match value.and_then(as_str) {
            Some(s) => {
                let len = s.chars().count();
                self.min <= len && len <= self.max
            }
            None => true,
        }
    }

    fn format_error_message(&self, name: &str) -> String {
        if self.min == 0 {
            format!("The field {name} must be a string with a maximum length of {}.", self.max)
        } else {
            format!(
                "The field {name} must be a string with a minimum length of {} and a maximum length of {}.",
                self.min, self.max
            )
        }
    }
}

type Predicate = Arc<dyn Fn(Option<&dyn Any>) -> bool + Send + Sync>;

struct Custom {
    predicate: Predicate,
    template: String,
}

impl fmt::Debug for Custom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Custom").field("template", &self.template).finish_non_exhaustive()
    }
}

impl ValidationAttribute for Custom {
    fn is_valid(&self, value: Option<&dyn Any>) -> bool {
        (self.predicate)(value)
    }

    fn format_error_message(&self, name: &str) -> String {
        self.template.replace("{0}", name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn range_message_names_the_member() {
        assert_eq!(
            range(0, 120).format_error_message("Age"),
            "The field Age must be between 0 and 120."
        );
    }

    #[test]
    fn custom_template_overrides_the_attribute_message() {
        let annotation = required().with_message("{0} is missing");
        assert_eq!(annotation.format_error_message("Name"), "Name is missing");
    }

    #[test]
    fn range_accepts_other_numeric_types_dynamically() {
        let r = Range::new(5, 10);
        assert!(r.is_valid(Some(&7.5f64 as &dyn Any)));
        assert!(!r.is_valid(Some(&11u8 as &dyn Any)));
        assert!(!r.is_valid(Some(&"7" as &dyn Any)));
        assert!(r.is_valid(None));
    }

    #[test]
    fn range_parses_textual_bounds() {
        let r = Range::<i32>::parse("5", " 10 ").unwrap();
        assert_eq!((r.min(), r.max()), (5, 10));
        assert!(Range::<i32>::parse("five", "10").is_err());
        assert!(Range::<i32>::parse("10", "5").is_err());
    }

    #[test]
    fn typed_check_ignores_other_operand_types() {
        let check = Range::new(5, 10).typed_check();
        assert!(check(Some(&2.0f64 as &dyn Any)));
        assert!(!check(Some(&4 as &dyn Any)));
        assert!(check(None));
    }

    #[test]
    fn required_rejects_absent_and_blank() {
        assert!(!Required.is_valid(None));
        assert!(!Required.is_valid(Some(&String::from("  ") as &dyn Any)));
        assert!(Required.is_valid(Some(&String::from("x") as &dyn Any)));
        assert!(Required.is_valid(Some(&0u8 as &dyn Any)));
        assert_eq!(Required.format_error_message("Name"), "The Name field is required.");
    }

    #[test]
    fn string_length_counts_characters() {
        let attr = StringLength::new(3).min_length(2);
        assert!(attr.is_valid(Some(&String::from("äöü") as &dyn Any)));
        assert!(!attr.is_valid(Some(&String::from("a") as &dyn Any)));
        assert!(!attr.is_valid(Some(&"abcd" as &dyn Any)));
        assert!(attr.is_valid(None));
        assert_eq!(
            StringLength::new(3).format_error_message("Code"),
            "The field Code must be a string with a maximum length of 3."
        );
    }

    #[test]
    fn custom_uses_the_predicate() {
        let annotation = Annotation::custom("{0} must be even", |v| {
            v.and_then(|v| v.downcast_ref::<i32>()).map_or(true, |v| v % 2 == 0)
        });
        assert!(annotation.is_valid(Some(&4 as &dyn Any)));
        assert!(!annotation.is_valid(Some(&3 as &dyn Any)));
        assert_eq!(annotation.format_error_message("Count"), "Count must be even");
    }

    proptest! {
        #[test]
        fn typed_and_dynamic_range_agree(min in -1000i64..1000, span in 0i64..1000, v in -3000i64..3000) {
            let r = Range::new(min, min + span);
            let typed = r.typed_check();
            prop_assert_eq!(typed(Some(&v as &dyn Any)), r.is_valid(Some(&v as &dyn Any)));
            prop_assert_eq!(r.is_valid(Some(&v as &dyn Any)), min <= v && v <= min + span);
        }
    }
}
