//! Argument values and parameter sets
//!
//! Test arguments are heterogeneous, so they travel through the framework as
//! type-erased [`Value`]s. Every value keeps the text it renders to in
//! invocation display names; that text is produced once, through [`Repr`],
//! when the value is created.
//!
//! Binding runs the other way: [`FromArgs`] downcasts a [`ParamSet`] back into
//! the tuple of concrete types a test body or fixture declares.

use std::any::{Any, type_name};
use std::fmt;
use std::sync::Arc;

use crate::error::ArgumentError;

// ============================================================================
// Repr
// ============================================================================

/// Human-readable rendering used in invocation display names.
pub trait Repr {
    fn repr(&self) -> String;
}

macro_rules! repr_via_display {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Repr for $ty {
                fn repr(&self) -> String {
                    self.to_string()
                }
            }
        )*
    };
}

repr_via_display!(
    i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64, bool, char
);

impl Repr for str {
    fn repr(&self) -> String {
        format!("{self:?}")
    }
}

impl Repr for String {
    fn repr(&self) -> String {
        self.as_str().repr()
    }
}

impl Repr for () {
    fn repr(&self) -> String {
        "()".to_string()
    }
}

impl<T: Repr + ?Sized> Repr for &T {
    fn repr(&self) -> String {
        (**self).repr()
    }
}

impl<T: Repr + ?Sized> Repr for Box<T> {
    fn repr(&self) -> String {
        (**self).repr()
    }
}

impl<T: Repr> Repr for Vec<T> {
    fn repr(&self) -> String {
        let items: Vec<String> = self.iter().map(Repr::repr).collect();
        format!("[{}]", items.join(", "))
    }
}

impl<T: Repr> Repr for Option<T> {
    fn repr(&self) -> String {
        match self {
            Some(value) => format!("Some({})", value.repr()),
            None => "None".to_string(),
        }
    }
}

// ============================================================================
// Value
// ============================================================================

/// A type-erased argument value.
///
/// Cloning is cheap: the payload is shared.
#[derive(Clone)]
pub struct Value {
    inner: Arc<dyn Any + Send + Sync>,
    repr: String,
    type_name: &'static str,
}

impl Value {
    pub fn new<T>(value: T) -> Self
    where
        T: Any + Send + Sync + Repr,
    {
        let repr = value.repr();
        Self {
            inner: Arc::new(value),
            repr,
            type_name: type_name::<T>(),
        }
    }

    /// Display text of the value.
    pub fn repr(&self) -> &str {
        &self.repr
    }

    /// Rust type name of the stored value.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn is<T: Any>(&self) -> bool {
        self.inner.is::<T>()
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.downcast_ref::<T>()
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Value")
            .field("repr", &self.repr)
            .field("type", &self.type_name)
            .finish()
    }
}

// ============================================================================
// ParamSet
// ============================================================================

/// One ordered argument tuple.
#[derive(Debug, Clone, Default)]
pub struct ParamSet {
    values: Vec<Value>,
}

impl ParamSet {
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn push(&mut self, value: Value) {
        self.values.push(value);
    }

    /// Render as a parenthesised, comma-separated argument list: `(a, 10)`.
    pub fn render(&self) -> String {
        let parts: Vec<&str> = self.values.iter().map(Value::repr).collect();
        format!("({})", parts.join(", "))
    }

    /// Clone the value at `index` out as a `T`.
    pub fn bind<T: Any + Clone>(&self, index: usize) -> Result<T, ArgumentError> {
        let value = self.values.get(index).ok_or(ArgumentError::Arity {
            expected: index + 1,
            found: self.values.len(),
        })?;
        value
            .downcast_ref::<T>()
            .cloned()
            .ok_or_else(|| ArgumentError::Type {
                index,
                expected: type_name::<T>(),
                found: value.type_name(),
            })
    }
}

impl FromIterator<Value> for ParamSet {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Conversion of Rust tuples into a [`ParamSet`].
pub trait IntoParamSet {
    fn into_param_set(self) -> ParamSet;
}

impl IntoParamSet for ParamSet {
    fn into_param_set(self) -> ParamSet {
        self
    }
}

impl IntoParamSet for () {
    fn into_param_set(self) -> ParamSet {
        ParamSet::default()
    }
}

/// Binding of a [`ParamSet`] to a tuple of concrete argument types.
pub trait FromArgs: Sized {
    fn from_args(args: &ParamSet) -> Result<Self, ArgumentError>;
}

impl FromArgs for () {
    fn from_args(args: &ParamSet) -> Result<Self, ArgumentError> {
        if args.is_empty() {
            Ok(())
        } else {
            Err(ArgumentError::Arity {
                expected: 0,
                found: args.len(),
            })
        }
    }
}

macro_rules! tuple_impls {
    ($len:literal; $($idx:tt $ty:ident),+) => {
        impl<$($ty),+> IntoParamSet for ($($ty,)+)
        where
            $($ty: Any + Send + Sync + Repr),+
        {
            fn into_param_set(self) -> ParamSet {
                ParamSet::new(vec![$(Value::new(self.$idx)),+])
            }
        }

        impl<$($ty),+> FromArgs for ($($ty,)+)
        where
            $($ty: Any + Clone),+
        {
            fn from_args(args: &ParamSet) -> Result<Self, ArgumentError> {
                if args.len() != $len {
                    return Err(ArgumentError::Arity {
                        expected: $len,
                        found: args.len(),
                    });
                }
                Ok(($(args.bind::<$ty>($idx)?,)+))
            }
        }
    };
}

tuple_impls!(1; 0 A);
tuple_impls!(2; 0 A, 1 B);
tuple_impls!(3; 0 A, 1 B, 2 C);
tuple_impls!(4; 0 A, 1 B, 2 C, 3 D);
tuple_impls!(5; 0 A, 1 B, 2 C, 3 D, 4 E);
tuple_impls!(6; 0 A, 1 B, 2 C, 3 D, 4 E, 5 F);
tuple_impls!(7; 0 A, 1 B, 2 C, 3 D, 4 E, 5 F, 6 G);
tuple_impls!(8; 0 A, 1 B, 2 C, 3 D, 4 E, 5 F, 6 G, 7 H);

/// Cross product of value columns, first column outermost.
///
/// No columns yields a single empty set; any empty column yields no sets.
pub fn cartesian_product<I>(columns: I) -> Vec<ParamSet>
where
    I: IntoIterator<Item = Vec<Value>>,
{
    let mut sets = vec![ParamSet::default()];
    for column in columns {
        sets = sets
            .iter()
            .flat_map(|prefix| {
                column.iter().map(move |value| {
                    let mut next = prefix.clone();
                    next.push(value.clone());
                    next
                })
            })
            .collect();
    }
    sets
}

/// Build a literal list of parameter sets from tuples.
///
/// ```ignore
/// let sets = params![('a', 10), ('c', 12)];
/// ```
#[macro_export]
macro_rules! params {
    ($($set:expr),* $(,)?) => {
        ::std::vec![$($crate::IntoParamSet::into_param_set($set)),*]
    };
}

/// Build the cross product of value lists.
///
/// ```ignore
/// let sets = cartesian!(['a', 'c'], [10, 15, 20]); // 6 sets
/// ```
#[macro_export]
macro_rules! cartesian {
    ($([$($value:expr),* $(,)?]),+ $(,)?) => {
        $crate::cartesian_product([$(::std::vec![$($crate::Value::new($value)),*]),+])
    };
}
