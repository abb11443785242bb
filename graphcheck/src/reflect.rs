//! Static introspection model.
//!
//! [`Reflect`] is what the shape analyzer reads instead of runtime reflection.
//! User types get it from `#[derive(Reflect)]`; the standard scalars,
//! wrappers and collections are covered here.

use std::any::{type_name, Any, TypeId};
use std::collections::{BTreeSet, HashSet, VecDeque};
use std::fmt;
use std::sync::Arc;

use crate::capability::Capabilities;
use crate::rule::Rule;

/// Where a type was defined. The default recursion policy never descends
/// into [`Origin::External`] types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Origin {
    User,
    External,
}

/// Iterator over the projected elements of an enumerable value. `None` items
/// are absent elements (for example `None` inside a `Vec<Option<T>>`).
pub type ElementIter<'a> = Box<dyn Iterator<Item = Option<&'a dyn Any>> + 'a>;

/// Element access for enumerable types.
#[derive(Clone, Copy)]
pub struct Elements {
    pub element: fn() -> TypeRef,
    pub iter: for<'a> fn(&'a dyn Any) -> ElementIter<'a>,
}

impl Elements {
    pub fn element_type(&self) -> TypeRef {
        (self.element)()
    }

    pub fn iter<'a>(&self, collection: &'a dyn Any) -> ElementIter<'a> {
        (self.iter)(collection)
    }
}

impl fmt::Debug for Elements {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Elements")
            .field("element", &self.element_type().name())
            .finish()
    }
}

/// Cheap handle describing a type reachable from a validated object.
#[derive(Clone, Copy)]
pub struct TypeRef {
    type_id: TypeId,
    name: &'static str,
    origin: Origin,
    nullable: bool,
    describe: fn() -> TypeDescriptor,
    elements: Option<Elements>,
    capabilities: Capabilities,
}

impl TypeRef {
    pub fn of<T: Reflect>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            name: type_name::<T>(),
            origin: T::origin(),
            nullable: false,
            describe: T::describe,
            elements: T::elements(),
            capabilities: T::capabilities(),
        }
    }

    /// Same type, but values of it may be absent.
    pub fn into_nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Identity of the projected value type (wrappers removed).
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn origin(&self) -> Origin {
        self.origin
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    pub fn elements(&self) -> Option<&Elements> {
        self.elements.as_ref()
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    pub fn descriptor(&self) -> TypeDescriptor {
        (self.describe)()
    }

    pub fn is<T: Any>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }
}

impl fmt::Debug for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeRef")
            .field("name", &self.name)
            .field("origin", &self.origin)
            .field("nullable", &self.nullable)
            .field("elements", &self.elements)
            .finish()
    }
}

impl PartialEq for TypeRef {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id && self.nullable == other.nullable
    }
}

impl Eq for TypeRef {}

/// Reads a member value out of its (projected) owner. `None` means absent.
pub type Accessor = Arc<dyn for<'a> Fn(&'a dyn Any) -> Option<&'a dyn Any> + Send + Sync>;

// Pins the closure signature to the higher-ranked form.
pub(crate) fn accessor<F>(f: F) -> F
where
    F: for<'a> Fn(&'a dyn Any) -> Option<&'a dyn Any>,
{
    f
}

/// One readable member of a type.
#[derive(Clone)]
pub struct MemberDescriptor {
    pub name: &'static str,
    pub declaring_type: &'static str,
    pub ty: TypeRef,
    pub attributes: Vec<Arc<dyn Rule>>,
    access: Accessor,
}

impl MemberDescriptor {
    pub fn new(name: &'static str, declaring_type: &'static str, ty: TypeRef, access: Accessor) -> Self {
        Self {
            name,
            declaring_type,
            ty,
            attributes: Vec::new(),
            access,
        }
    }

    pub fn with_attribute<R: Rule>(mut self, rule: R) -> Self {
        self.attributes.push(Arc::new(rule));
        self
    }

    pub fn accessor(&self) -> &Accessor {
        &self.access
    }

    pub fn read<'a>(&self, owner: &'a dyn Any) -> Option<&'a dyn Any> {
        (self.access)(owner)
    }
}

impl fmt::Debug for MemberDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemberDescriptor")
            .field("name", &self.name)
            .field("declaring_type", &self.declaring_type)
            .field("ty", &self.ty)
            .field("attributes", &self.attributes)
            .finish_non_exhaustive()
    }
}

/// Describes a field `name` of `O` whose value has type `M`.
pub fn field<O: Reflect, M: Reflect>(name: &'static str, get: fn(&O) -> &M) -> MemberDescriptor {
    let access = accessor(move |owner| owner.downcast_ref::<O>().and_then(|o| get(o).project()));
    MemberDescriptor::new(name, type_name::<O>(), M::type_ref(), Arc::new(access))
}

/// Type-level metadata plus the ordered member list.
#[derive(Debug, Clone, Default)]
pub struct TypeDescriptor {
    pub attributes: Vec<Arc<dyn Rule>>,
    pub members: Vec<MemberDescriptor>,
}

impl TypeDescriptor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_attribute<R: Rule>(mut self, rule: R) -> Self {
        self.attributes.push(Arc::new(rule));
        self
    }

    pub fn with_member(mut self, member: MemberDescriptor) -> Self {
        self.members.push(member);
        self
    }
}

/// A type that can take part in a validated object graph.
pub trait Reflect: Any + Sized {
    fn describe() -> TypeDescriptor;

    fn type_ref() -> TypeRef {
        TypeRef::of::<Self>()
    }

    fn origin() -> Origin {
        Origin::User
    }

    fn elements() -> Option<Elements> {
        None
    }

    fn capabilities() -> Capabilities {
        Capabilities::none()
    }

    /// The value with wrappers removed; `None` when absent.
    fn project(&self) -> Option<&dyn Any> {
        Some(self)
    }
}

/// Object-safe view of [`Reflect`], used by the inferred entry points.
pub trait DynReflect: Any {
    fn dyn_type_ref(&self) -> TypeRef;

    fn as_value(&self) -> Option<&dyn Any>;
}

impl<T: Reflect> DynReflect for T {
    fn dyn_type_ref(&self) -> TypeRef {
        T::type_ref()
    }

    fn as_value(&self) -> Option<&dyn Any> {
        self.project()
    }
}

macro_rules! external_scalar {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Reflect for $ty {
                fn describe() -> TypeDescriptor {
                    TypeDescriptor::default()
                }

                fn origin() -> Origin {
                    Origin::External
                }
            }
        )*
    };
}

external_scalar!(
    bool, char, u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize, f32, f64, String,
    &'static str, (),
);

impl<T: Reflect> Reflect for Option<T> {
    fn describe() -> TypeDescriptor {
        T::describe()
    }

    fn type_ref() -> TypeRef {
        T::type_ref().into_nullable()
    }

    fn origin() -> Origin {
        T::origin()
    }

    fn elements() -> Option<Elements> {
        T::elements()
    }

    fn capabilities() -> Capabilities {
        T::capabilities()
    }

    fn project(&self) -> Option<&dyn Any> {
        self.as_ref().and_then(|value| value.project())
    }
}

macro_rules! transparent_pointer {
    ($($ptr:ident),*) => {
        $(
            impl<T: Reflect> Reflect for $ptr<T> {
                fn describe() -> TypeDescriptor {
                    T::describe()
                }

                fn type_ref() -> TypeRef {
                    T::type_ref()
                }

                fn origin() -> Origin {
                    T::origin()
                }

                fn elements() -> Option<Elements> {
                    T::elements()
                }

                fn capabilities() -> Capabilities {
                    T::capabilities()
                }

                fn project(&self) -> Option<&dyn Any> {
                    (**self).project()
                }
            }
        )*
    };
}

transparent_pointer!(Box, Arc);

macro_rules! enumerable {
    ($($coll:ident),*) => {
        $(
            impl<T: Reflect> Reflect for $coll<T> {
                fn describe() -> TypeDescriptor {
                    TypeDescriptor::default()
                }

                fn origin() -> Origin {
                    Origin::External
                }

                fn elements() -> Option<Elements> {
                    fn iter<T: Reflect>(value: &dyn Any) -> ElementIter<'_> {
                        Box::new(
                            value
                                .downcast_ref::<$coll<T>>()
                                .into_iter()
                                .flatten()
                                .map(|element| element.project()),
                        )
                    }

                    Some(Elements {
                        element: T::type_ref,
                        iter: iter::<T>,
                    })
                }
            }
        )*
    };
}

enumerable!(Vec, VecDeque, BTreeSet, HashSet);

impl<T: Reflect, const N: usize> Reflect for [T; N] {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::default()
    }

    fn origin() -> Origin {
        Origin::External
    }

    fn elements() -> Option<Elements> {
        fn iter<T: Reflect, const N: usize>(value: &dyn Any) -> ElementIter<'_> {
            Box::new(
                value
                    .downcast_ref::<[T; N]>()
                    .into_iter()
                    .flatten()
                    .map(|element| element.project()),
            )
        }

        Some(Elements {
            element: T::type_ref,
            iter: iter::<T, N>,
        })
    }
}
