//! Rule providers: where rules for a type or member come from.

use std::sync::Arc;

use crate::reflect::{MemberDescriptor, TypeDescriptor, TypeRef};
use crate::rule::{MemberMessage, Rule, RuleInfo};

/// What a provider is asked about.
#[derive(Debug, Clone, Copy)]
pub enum MetadataTarget<'a> {
    /// The type itself (type-level attributes and capabilities).
    Type {
        ty: &'a TypeRef,
        descriptor: &'a TypeDescriptor,
    },
    /// A member declared on `owner`.
    Member {
        owner: &'a TypeRef,
        member: &'a MemberDescriptor,
    },
}

impl<'a> MetadataTarget<'a> {
    pub fn attributes(&self) -> &'a [Arc<dyn Rule>] {
        match *self {
            Self::Type { descriptor, .. } => &descriptor.attributes,
            Self::Member { member, .. } => &member.attributes,
        }
    }

    /// Type of the value the rules will be checked against.
    pub fn value_type(&self) -> &'a TypeRef {
        match *self {
            Self::Type { ty, .. } => ty,
            Self::Member { member, .. } => &member.ty,
        }
    }

    /// Display name: the member name, or the type name for type targets.
    pub fn name(&self) -> &'static str {
        match *self {
            Self::Type { ty, .. } => ty.name(),
            Self::Member { member, .. } => member.name,
        }
    }

    pub fn is_type(&self) -> bool {
        matches!(self, Self::Type { .. })
    }
}

/// Supplies the ordered rules for a type or member.
///
/// Must be deterministic for a given target. Errors abort analysis of the
/// type being analysed; nothing is cached for it.
pub trait RuleProvider: Send + Sync {
    fn rule_infos(&self, target: &MetadataTarget<'_>) -> anyhow::Result<Vec<RuleInfo>>;
}

impl<F> RuleProvider for F
where
    F: Fn(&MetadataTarget<'_>) -> anyhow::Result<Vec<RuleInfo>> + Send + Sync,
{
    fn rule_infos(&self, target: &MetadataTarget<'_>) -> anyhow::Result<Vec<RuleInfo>> {
        self(target)
    }
}

/// Every attribute becomes a rule with an unspecified message.
///
/// Types with the [`crate::DataErrorInfo`] capability also get a capability
/// marker whose message is the object's current error string.
#[derive(Debug, Clone, Copy, Default)]
pub struct AttributeRuleProvider;

impl RuleProvider for AttributeRuleProvider {
    fn rule_infos(&self, target: &MetadataTarget<'_>) -> anyhow::Result<Vec<RuleInfo>> {
        let mut infos: Vec<RuleInfo> = target
            .attributes()
            .iter()
            .map(|rule| RuleInfo::new(rule.clone()))
            .collect();

        if let MetadataTarget::Type { ty, .. } = target {
            let capabilities = *ty.capabilities();
            if capabilities.has_error_info() {
                infos.push(RuleInfo::capability(move |value| {
                    Ok(capabilities
                        .error(value)
                        .map(MemberMessage::for_object)
                        .into_iter()
                        .collect())
                }));
            }
        }

        Ok(infos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{Capabilities, DataErrorInfo};
    use crate::reflect::{field, Reflect};

    #[derive(Debug)]
    struct Tag(&'static str);

    struct Account {
        balance: i64,
        error: Option<String>,
    }

    impl DataErrorInfo for Account {
        fn error(&self) -> Option<String> {
            self.error.clone()
        }
    }

    impl Reflect for Account {
        fn describe() -> TypeDescriptor {
            TypeDescriptor::new()
                .with_attribute(Tag("type"))
                .with_member(field::<Self, i64>("balance", |a| &a.balance).with_attribute(Tag("member")))
        }

        fn capabilities() -> Capabilities {
            Capabilities::none().with_error_info::<Self>()
        }
    }

    #[test]
    fn member_attributes_become_rules() {
        let ty = Account::type_ref();
        let descriptor = ty.descriptor();
        let target = MetadataTarget::Member {
            owner: &ty,
            member: &descriptor.members[0],
        };
        let infos = AttributeRuleProvider.rule_infos(&target).unwrap();
        assert_eq!(infos.len(), 1);
        let tag = infos[0].rule().and_then(|r| r.downcast_ref::<Tag>()).unwrap();
        assert_eq!(tag.0, "member");
    }

    #[test]
    fn error_info_types_get_a_capability_marker() {
        let ty = Account::type_ref();
        let descriptor = ty.descriptor();
        let target = MetadataTarget::Type {
            ty: &ty,
            descriptor: &descriptor,
        };
        let infos = AttributeRuleProvider.rule_infos(&target).unwrap();
        assert_eq!(infos.len(), 2);
        assert!(infos[1].is_capability_marker());

        let account = Account {
            balance: 1,
            error: Some("foo".into()),
        };
        let crate::rule::MessageSource::PerOccurrence(factory) = infos[1].message() else {
            panic!("expected per-occurrence message");
        };
        assert_eq!(factory(&account).unwrap(), vec![MemberMessage::for_object("foo")]);
    }
}
