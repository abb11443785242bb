//! Member graph: the side index that maps compiled checks back to readable
//! member paths and error text.
//!
//! Ids are handed out while a program is being compiled. Once the program is
//! packaged the graph is sealed and only the lazily memoized strings change.

use std::any::Any;
use std::fmt;

use once_cell::sync::OnceCell;

use crate::error::{Error, Result};
use crate::rule::{MessageSource, RuleInfo, UNSPECIFIED_MESSAGE};

/// Name used for the root object in every access path.
pub const ROOT_MEMBER_NAME: &str = "root";

/// Dense member node id. `0` is always the root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MemberId(u32);

impl MemberId {
    pub const ROOT: MemberId = MemberId(0);

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Dense id of a rule bound to a member node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RuleId(u32);

impl RuleId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemberKind {
    Scalar,
    /// The elements of an enumerable member; rendered as `name[]`.
    Collection,
}

#[derive(Debug)]
struct MemberNode {
    parent: Option<MemberId>,
    name: Option<&'static str>,
    kind: MemberKind,
    path: OnceCell<String>,
}

#[derive(Debug)]
struct RuleRecord {
    member: MemberId,
    info: RuleInfo,
    resolved: OnceCell<Vec<(String, String)>>,
}

/// Append-only index of member nodes and rule records.
#[derive(Debug)]
pub struct MemberGraph {
    members: Vec<MemberNode>,
    rules: Vec<RuleRecord>,
    sealed: bool,
}

impl Default for MemberGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl MemberGraph {
    pub fn new() -> Self {
        let root = MemberNode {
            parent: None,
            name: None,
            kind: MemberKind::Scalar,
            path: OnceCell::with_value(ROOT_MEMBER_NAME.to_owned()),
        };
        Self {
            members: vec![root],
            rules: Vec::new(),
            sealed: false,
        }
    }

    pub fn root(&self) -> MemberId {
        MemberId::ROOT
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    pub fn new_member_id(
        &mut self,
        parent: MemberId,
        name: &'static str,
        kind: MemberKind,
    ) -> Result<MemberId> {
        if self.sealed {
            return Err(Error::SealedGraph);
        }
        self.node(parent)?;

        let id = MemberId(self.members.len() as u32);
        self.members.push(MemberNode {
            parent: Some(parent),
            name: Some(name),
            kind,
            path: OnceCell::new(),
        });
        Ok(id)
    }

    pub fn new_rule_id(&mut self, member: MemberId, info: RuleInfo) -> Result<RuleId> {
        if self.sealed {
            return Err(Error::SealedGraph);
        }
        self.node(member)?;

        let id = RuleId(self.rules.len() as u32);
        self.rules.push(RuleRecord {
            member,
            info,
            resolved: OnceCell::new(),
        });
        Ok(id)
    }

    /// Freezes the graph. Later allocations fail with [`Error::SealedGraph`].
    pub fn seal(&mut self) {
        self.sealed = true;
        self.members.shrink_to_fit();
        self.rules.shrink_to_fit();
    }

    /// Member the rule was bound to.
    pub fn rule_member(&self, rule: RuleId) -> Result<MemberId> {
        Ok(self.record(rule)?.member)
    }

    /// Renders `root.a.b[]` style paths, memoized per node.
    pub fn access_path(&self, id: MemberId) -> Result<&str> {
        let node = self.node(id)?;
        if let Some(path) = node.path.get() {
            return Ok(path.as_str());
        }

        // Climb to the nearest ancestor that already knows its path.
        let mut chain = vec![node];
        let mut base = ROOT_MEMBER_NAME;
        let mut cursor = node.parent;
        while let Some(parent) = cursor {
            let parent_node = self.node(parent)?;
            if let Some(path) = parent_node.path.get() {
                base = path.as_str();
                break;
            }
            chain.push(parent_node);
            cursor = parent_node.parent;
        }

        let mut path = String::from(base);
        for member in chain.iter().rev() {
            path.push('.');
            path.push_str(member.name.unwrap_or_default());
            if member.kind == MemberKind::Collection {
                path.push_str("[]");
            }
        }

        Ok(node.path.get_or_init(|| path).as_str())
    }

    /// Resolves the messages for a failing rule.
    ///
    /// Static, deferred and unspecified sources are resolved once and then
    /// served from the memo. Per-occurrence sources run for every call with
    /// the failing object.
    pub fn error_messages(&self, rule: RuleId, failing: &dyn Any) -> Result<Vec<(String, String)>> {
        let record = self.record(rule)?;
        let path = self.access_path(record.member)?;

        let resolved = match record.info.message() {
            MessageSource::PerOccurrence(factory) => {
                let messages = factory(failing).map_err(|source| Error::Message {
                    member_path: path.to_owned(),
                    source,
                })?;
                return Ok(messages
                    .into_iter()
                    .map(|m| {
                        let member_path = match m.member {
                            Some(name) if !name.is_empty() => format!("{path}.{name}"),
                            _ => path.to_owned(),
                        };
                        (member_path, m.message)
                    })
                    .collect());
            }
            MessageSource::Static(text) => record
                .resolved
                .get_or_init(|| vec![(path.to_owned(), text.clone())]),
            MessageSource::Unspecified => record
                .resolved
                .get_or_init(|| vec![(path.to_owned(), UNSPECIFIED_MESSAGE.to_owned())]),
            MessageSource::Deferred(factory) => record.resolved.get_or_try_init(|| {
                factory()
                    .map(|text| vec![(path.to_owned(), text)])
                    .map_err(|source| Error::Message {
                        member_path: path.to_owned(),
                        source,
                    })
            })?,
        };
        Ok(resolved.clone())
    }

    fn node(&self, id: MemberId) -> Result<&MemberNode> {
        self.members.get(id.index()).ok_or(Error::UnknownMember(id))
    }

    fn record(&self, id: RuleId) -> Result<&RuleRecord> {
        self.rules.get(id.index()).ok_or(Error::UnknownRule(id))
    }
}
