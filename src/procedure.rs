//! Procedures: named business-logic steps and their argument injection.
//!
//! # What a procedure looks like
//!
//! A procedure is a plain function. Each argument declares where it comes
//! from by its type; the return value is a `(status, partial payload)` pair:
//!
//! ```text
//! fn update(todo: Todo, manager: Dep<dyn TodoManager>) -> (u32, Payload)
//!           └─ Field: payload["todo"], else container
//!                       └─ Dep: container only
//! ```
//!
//! # How arguments are resolved
//!
//! | Argument type | Source |
//! |---|---|
//! | `T: Field` | payload field `T::NAME`; falls back to a container binding of `T` |
//! | `Dep<T>` | container binding of `T` (usually a trait object) |
//! | `Payload` | a copy of the whole current payload |
//!
//! Payload fields win over container bindings of the same type. If neither
//! source can satisfy an argument the call fails with
//! [`Error::UnresolvableDependency`] before the function body runs.
//!
//! Up to four arguments are supported. Functions are type-erased into
//! [`BoxedProcedure`] the same way route handlers are.

use std::any::type_name;
use std::marker::PhantomData;
use std::ops::Deref;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::container::Container;
use crate::error::Error;
use crate::payload::Payload;
use crate::status::Status;

// ── Injection ─────────────────────────────────────────────────────────────────

/// What a procedure can see while its arguments are resolved.
pub struct Context<'a> {
    payload: &'a Payload,
    container: &'a Container,
}

impl<'a> Context<'a> {
    pub(crate) fn new(payload: &'a Payload, container: &'a Container) -> Self {
        Self { payload, container }
    }

    pub fn payload(&self) -> &Payload { self.payload }
    pub fn container(&self) -> &Container { self.container }
}

/// Implemented by every type that may appear as a procedure argument.
pub trait Inject: Sized {
    fn inject(cx: &Context<'_>) -> Result<Self, Error>;
}

/// A typed payload field.
///
/// `NAME` is the payload key the value is read from. The type must also be
/// cloneable so it can be taken from a container binding when the payload
/// does not carry it.
pub trait Field: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    const NAME: &'static str;
}

impl<T: Field> Inject for T {
    fn inject(cx: &Context<'_>) -> Result<Self, Error> {
        if let Some(value) = cx.payload.field::<T>(T::NAME)? {
            return Ok(value);
        }
        cx.container
            .resolve::<T>()
            .map(|value| T::clone(&value))
            .map_err(|_| Error::unresolvable(T::NAME))
    }
}

/// A service resolved from the [`Container`].
///
/// `Dep<dyn TodoManager>` derefs to `dyn TodoManager`.
pub struct Dep<T: ?Sized>(pub Arc<T>);

impl<T: ?Sized> Deref for Dep<T> {
    type Target = T;

    fn deref(&self) -> &T { &self.0 }
}

impl<T: ?Sized + Send + Sync + 'static> Inject for Dep<T> {
    fn inject(cx: &Context<'_>) -> Result<Self, Error> {
        cx.container.resolve::<T>().map(Dep)
    }
}

impl Inject for Payload {
    fn inject(cx: &Context<'_>) -> Result<Self, Error> {
        Ok(cx.payload.clone())
    }
}

// ── Outcome ───────────────────────────────────────────────────────────────────

/// The result of one procedure: a status and the payload it contributes.
#[derive(Debug)]
pub struct Outcome {
    pub status: Status,
    pub payload: Payload,
}

/// Conversion of a procedure's return value into an [`Outcome`].
///
/// Implemented for `(status, Payload)` and for `Result` of it, so a
/// procedure whose store write can fail returns `Result<(u32, Payload), Error>`
/// and uses `?`.
pub trait IntoOutcome {
    fn into_outcome(self) -> Result<Outcome, Error>;
}

impl<S: Into<Status>> IntoOutcome for (S, Payload) {
    fn into_outcome(self) -> Result<Outcome, Error> {
        Ok(Outcome { status: self.0.into(), payload: self.1 })
    }
}

impl<T: IntoOutcome> IntoOutcome for Result<T, Error> {
    fn into_outcome(self) -> Result<Outcome, Error> {
        self.and_then(IntoOutcome::into_outcome)
    }
}

// ── Procedure trait ───────────────────────────────────────────────────────────

/// Implemented for every function usable as a procedure.
///
/// `Args` is a marker tuple of the argument types; it only exists so the
/// blanket impls for different arities do not overlap. You never name it.
pub trait Procedure<Args>: Send + Sync + 'static {
    fn call(&self, cx: &Context<'_>) -> Result<Outcome, Error>;

    #[doc(hidden)]
    fn into_boxed_procedure(self) -> BoxedProcedure
    where
        Self: Sized,
        Args: 'static,
    {
        Arc::new(Erased { procedure: self, args: PhantomData })
    }
}

macro_rules! impl_procedure {
    ($($arg:ident),*) => {
        impl<F, R, $($arg,)*> Procedure<($($arg,)*)> for F
        where
            F: Fn($($arg),*) -> R + Send + Sync + 'static,
            R: IntoOutcome,
            $($arg: Inject,)*
        {
            #[allow(non_snake_case, unused_variables)]
            fn call(&self, cx: &Context<'_>) -> Result<Outcome, Error> {
                $(let $arg = $arg::inject(cx)?;)*
                (self)($($arg),*).into_outcome()
            }
        }
    };
}

impl_procedure!();
impl_procedure!(A);
impl_procedure!(A, B);
impl_procedure!(A, B, C);
impl_procedure!(A, B, C, D);

// ── Type erasure ──────────────────────────────────────────────────────────────

#[doc(hidden)]
pub trait ErasedProcedure: Send + Sync {
    fn call(&self, cx: &Context<'_>) -> Result<Outcome, Error>;
    fn name(&self) -> &'static str;
}

/// A type-erased procedure, shared by every request that runs it.
#[doc(hidden)]
pub type BoxedProcedure = Arc<dyn ErasedProcedure>;

struct Erased<P, Args> {
    procedure: P,
    args: PhantomData<fn() -> Args>,
}

impl<P, Args> ErasedProcedure for Erased<P, Args>
where
    P: Procedure<Args>,
    Args: 'static,
{
    fn call(&self, cx: &Context<'_>) -> Result<Outcome, Error> {
        self.procedure.call(cx)
    }

    fn name(&self) -> &'static str {
        type_name::<P>()
    }
}
