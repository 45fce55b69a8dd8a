//! Calling conventions for test bodies and fixture producers
//!
//! Test bodies and fixtures are plain Rust functions or closures taking up to
//! eight arguments. [`Callable`] erases the arity so the builders can accept
//! `fn test(foo: char, bar: i32)` directly and bind it against a parameter
//! tuple later.

/// Error type a test body may return.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A function callable with its arguments packed into a tuple.
pub trait Callable<Args>: Send + Sync + 'static {
    type Output;

    fn call(&self, args: Args) -> Self::Output;
}

macro_rules! callable_impls {
    ($($idx:tt $ty:ident),*) => {
        impl<Func, Out, $($ty,)*> Callable<($($ty,)*)> for Func
        where
            Func: Fn($($ty),*) -> Out + Send + Sync + 'static,
        {
            type Output = Out;

            #[allow(unused_variables)]
            fn call(&self, args: ($($ty,)*)) -> Out {
                (self)($(args.$idx),*)
            }
        }
    };
}

callable_impls!();
callable_impls!(0 A);
callable_impls!(0 A, 1 B);
callable_impls!(0 A, 1 B, 2 C);
callable_impls!(0 A, 1 B, 2 C, 3 D);
callable_impls!(0 A, 1 B, 2 C, 3 D, 4 E);
callable_impls!(0 A, 1 B, 2 C, 3 D, 4 E, 5 F);
callable_impls!(0 A, 1 B, 2 C, 3 D, 4 E, 5 F, 6 G);
callable_impls!(0 A, 1 B, 2 C, 3 D, 4 E, 5 F, 6 G, 7 H);

/// Return types accepted from a test body.
pub trait TestReturn {
    fn into_result(self) -> Result<(), BoxError>;
}

impl TestReturn for () {
    fn into_result(self) -> Result<(), BoxError> {
        Ok(())
    }
}

impl<E: Into<BoxError>> TestReturn for Result<(), E> {
    fn into_result(self) -> Result<(), BoxError> {
        self.map_err(Into::into)
    }
}
