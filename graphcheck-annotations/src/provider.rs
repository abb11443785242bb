use graphcheck::{MemberMessage, MetadataTarget, Rule, RuleInfo, RuleProvider};
use tracing::trace;

use crate::attribute::Annotation;

/// Reads [`Annotation`] metadata and self-validation capabilities.
///
/// For a type target the self-validation marker comes first, followed by the
/// type's annotations. Metadata that is not an [`Annotation`] is ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnnotationsRuleProvider;

impl RuleProvider for AnnotationsRuleProvider {
    fn rule_infos(&self, target: &MetadataTarget<'_>) -> anyhow::Result<Vec<RuleInfo>> {
        let mut infos = Vec::new();

        if let MetadataTarget::Type { ty, .. } = *target {
            let capabilities = *ty.capabilities();
            if capabilities.is_validatable() {
                infos.push(RuleInfo::capability(move |value| {
                    let results = capabilities.validate(value).unwrap_or_default();
                    Ok(results
                        .into_iter()
                        .flat_map(|result| {
                            if result.member_names.is_empty() {
                                vec![MemberMessage::for_object(result.message)]
                            } else {
                                result
                                    .member_names
                                    .into_iter()
                                    .map(|member| MemberMessage::new(Some(member), result.message.clone()))
                                    .collect()
                            }
                        })
                        .collect())
                }));
            }
        }

        let name = match *target {
            MetadataTarget::Type { ty, .. } => short_type_name(ty.name()),
            MetadataTarget::Member { member, .. } => member.name,
        };

        for rule in target.attributes() {
            let instance: &dyn Rule = &**rule;
            let Some(annotation) = instance.downcast_ref::<Annotation>() else {
                trace!(member = name, rule = ?instance, "not an annotation; ignored");
                continue;
            };
            let annotation = annotation.clone();
            infos.push(RuleInfo::with_deferred(rule.clone(), move || {
                Ok(annotation.format_error_message(name))
            }));
        }

        Ok(infos)
    }
}

/// `a::b::Order<c::Line>` becomes `Order`.
fn short_type_name(full: &'static str) -> &'static str {
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::{range, required};
    use graphcheck::reflect::{field, Reflect, TypeDescriptor};
    use graphcheck::{Capabilities, MessageSource, ValidatableObject, ValidationResult};

    #[derive(Debug)]
    struct NotAnAnnotation;

    struct Form {
        count: i32,
    }

    impl ValidatableObject for Form {
        fn validate(&self) -> Vec<ValidationResult> {
            vec![
                ValidationResult::new("whole form"),
                ValidationResult {
                    message: "pair".into(),
                    member_names: vec!["A".into(), "B".into()],
                },
            ]
        }
    }

    impl Reflect for Form {
        fn describe() -> TypeDescriptor {
            TypeDescriptor::new()
                .with_attribute(required())
                .with_attribute(NotAnAnnotation)
                .with_member(
                    field::<Self, i32>("Count", |f| &f.count)
                        .with_attribute(range(1, 3))
                        .with_attribute(NotAnAnnotation),
                )
        }

        fn capabilities() -> Capabilities {
            Capabilities::none().with_validatable::<Self>()
        }
    }

    fn deferred(info: &RuleInfo) -> String {
        match info.message() {
            MessageSource::Deferred(factory) => factory().unwrap(),
            other => panic!("expected deferred message, got {other:?}"),
        }
    }

    #[test]
    fn shortens_type_names() {
        assert_eq!(short_type_name("a::b::Order<c::Line>"), "Order");
        assert_eq!(short_type_name("Order"), "Order");
    }

    #[test]
    fn member_annotations_get_member_named_messages() {
        let ty = Form::type_ref();
        let descriptor = ty.descriptor();
        let target = MetadataTarget::Member {
            owner: &ty,
            member: &descriptor.members[0],
        };
        let infos = AnnotationsRuleProvider.rule_infos(&target).unwrap();
        assert_eq!(infos.len(), 1);
        assert_eq!(deferred(&infos[0]), "The field Count must be between 1 and 3.");
    }

    #[test]
    fn type_targets_put_the_capability_marker_first() {
        let ty = Form::type_ref();
        let descriptor = ty.descriptor();
        let target = MetadataTarget::Type {
            ty: &ty,
            descriptor: &descriptor,
        };
        let infos = AnnotationsRuleProvider.rule_infos(&target).unwrap();
        assert_eq!(infos.len(), 2);
        assert!(infos[0].is_capability_marker());
        assert_eq!(deferred(&infos[1]), "The Form field is required.");

        let MessageSource::PerOccurrence(factory) = infos[0].message() else {
            panic!("expected per-occurrence message");
        };
        let messages = factory(&Form { count: 0 }).unwrap();
        assert_eq!(
            messages,
            vec![
                MemberMessage::for_object("whole form"),
                MemberMessage::new(Some("A".into()), "pair"),
                MemberMessage::new(Some("B".into()), "pair"),
            ]
        );
    }
}
