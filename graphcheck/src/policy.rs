//! Recursion policies decide, per member, whether the compiler descends into
//! the member's own members and whether it iterates its elements.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

use crate::reflect::{MemberDescriptor, Origin, TypeRef};

/// Recursion directives for one member.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PolicyOptions(u8);

impl PolicyOptions {
    pub const NONE: Self = Self(0);
    /// Do not validate the member's own members.
    pub const NO_FOLLOW: Self = Self(1);
    /// Do not validate the member's elements.
    pub const NO_ITERATE: Self = Self(1 << 1);
    pub const ALL: Self = Self(Self::NO_FOLLOW.0 | Self::NO_ITERATE.0);

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn forbids_follow(self) -> bool {
        self.contains(Self::NO_FOLLOW)
    }

    pub const fn forbids_iterate(self) -> bool {
        self.contains(Self::NO_ITERATE)
    }
}

impl BitOr for PolicyOptions {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for PolicyOptions {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl fmt::Debug for PolicyOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PolicyOptions")
            .field("no_follow", &self.forbids_follow())
            .field("no_iterate", &self.forbids_iterate())
            .finish()
    }
}

/// Consulted once per member during shape analysis.
pub trait RecursionPolicy: Send + Sync {
    fn policy(&self, owner: &TypeRef, member: &MemberDescriptor) -> PolicyOptions;
}

impl<F> RecursionPolicy for F
where
    F: Fn(&TypeRef, &MemberDescriptor) -> PolicyOptions + Send + Sync,
{
    fn policy(&self, owner: &TypeRef, member: &MemberDescriptor) -> PolicyOptions {
        self(owner, member)
    }
}

/// Never follows into externally defined types. Elements are still iterated.
#[derive(Debug, Clone, Copy, Default)]
pub struct UserTypeRecursionPolicy;

impl RecursionPolicy for UserTypeRecursionPolicy {
    fn policy(&self, _owner: &TypeRef, member: &MemberDescriptor) -> PolicyOptions {
        match member.ty.origin() {
            Origin::External => PolicyOptions::NO_FOLLOW,
            Origin::User => PolicyOptions::NONE,
        }
    }
}

/// Follows and iterates everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct FollowAllPolicy;

impl RecursionPolicy for FollowAllPolicy {
    fn policy(&self, _owner: &TypeRef, _member: &MemberDescriptor) -> PolicyOptions {
        PolicyOptions::NONE
    }
}
