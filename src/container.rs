//! A minimal dependency container.
//!
//! Procedures and status callbacks ask for services by type. The container
//! maps a type (usually a trait object such as `dyn TodoManager`) to either
//! a ready-made instance or a factory:
//!
//! ```text
//! instance::<T>(value)   ← already built, shared as Arc<T>
//! bind::<T>(factory)     ← factory runs on every resolve
//! share::<T>(factory)    ← factory runs once, on first resolve, then cached
//! ```
//!
//! Swapping the flat-file store for another implementation is a single
//! `share::<dyn TodoManager>(…)` call at wiring time.

use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use tracing::debug;

use crate::error::Error;

type Erased = Box<dyn Any + Send + Sync>;
type Factory = Box<dyn Fn(&Container) -> Result<Erased, Error> + Send + Sync>;

enum Binding {
    Instance(Erased),
    Transient(Factory),
    Shared { factory: Factory, cell: OnceLock<Erased> },
}

/// Type-keyed registry of services.
///
/// Every entry stores an `Arc<T>` behind `dyn Any`; `T` may be unsized, so
/// `Arc<dyn Trait>` bindings work the same way as concrete types.
#[derive(Default)]
pub struct Container {
    bindings: HashMap<TypeId, Binding>,
}

impl Container {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an already-built instance. Replaces any previous binding.
    pub fn instance<T>(&mut self, value: Arc<T>) -> &mut Self
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.bindings.insert(TypeId::of::<T>(), Binding::Instance(Box::new(value)));
        self
    }

    /// Registers a factory that builds a fresh value on every resolve.
    pub fn bind<T, F>(&mut self, factory: F) -> &mut Self
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&Container) -> Result<Arc<T>, Error> + Send + Sync + 'static,
    {
        self.bindings
            .insert(TypeId::of::<T>(), Binding::Transient(erase(factory)));
        self
    }

    /// Registers a lazily-built singleton: the factory runs on first resolve
    /// and its result is reused afterwards.
    pub fn share<T, F>(&mut self, factory: F) -> &mut Self
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&Container) -> Result<Arc<T>, Error> + Send + Sync + 'static,
    {
        self.bindings.insert(
            TypeId::of::<T>(),
            Binding::Shared { factory: erase(factory), cell: OnceLock::new() },
        );
        self
    }

    pub fn has<T: ?Sized + 'static>(&self) -> bool {
        self.bindings.contains_key(&TypeId::of::<T>())
    }

    /// Resolves `T`, building it if the binding is a factory.
    pub fn resolve<T>(&self) -> Result<Arc<T>, Error>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let binding = self
            .bindings
            .get(&TypeId::of::<T>())
            .ok_or_else(|| Error::unresolvable(type_name::<T>()))?;

        match binding {
            Binding::Instance(value) => downcast::<T>(value),
            Binding::Transient(factory) => downcast::<T>(&factory(self)?),
            Binding::Shared { factory, cell } => {
                if let Some(value) = cell.get() {
                    return downcast::<T>(value);
                }
                debug!(service = type_name::<T>(), "building shared service");
                // A concurrent resolve may have filled the cell first; the
                // cell keeps whichever value landed first.
                if cell.set(factory(self)?).is_err() {
                    debug!(service = type_name::<T>(), "shared service built twice, keeping first");
                }
                cell.get()
                    .ok_or_else(|| Error::unresolvable(type_name::<T>()))
                    .and_then(downcast::<T>)
            }
        }
    }
}

fn erase<T, F>(factory: F) -> Factory
where
    T: ?Sized + Send + Sync + 'static,
    F: Fn(&Container) -> Result<Arc<T>, Error> + Send + Sync + 'static,
{
    Box::new(move |container| factory(container).map(|value| Box::new(value) as Erased))
}

fn downcast<T>(value: &Erased) -> Result<Arc<T>, Error>
where
    T: ?Sized + Send + Sync + 'static,
{
    value
        .downcast_ref::<Arc<T>>()
        .cloned()
        .ok_or_else(|| Error::unresolvable(type_name::<T>()))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    trait Greeter: Send + Sync {
        fn greet(&self) -> String;
    }

    struct English;

    impl Greeter for English {
        fn greet(&self) -> String {
            "hello".to_owned()
        }
    }

    #[test]
    fn resolves_trait_objects() {
        let mut container = Container::new();
        container.instance::<dyn Greeter>(Arc::new(English));

        let greeter = container.resolve::<dyn Greeter>().unwrap();
        assert_eq!(greeter.greet(), "hello");
    }

    #[test]
    fn shared_factories_run_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);

        let mut container = Container::new();
        container.share::<dyn Greeter, _>(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(English))
        });

        let first = container.resolve::<dyn Greeter>().unwrap();
        let second = container.resolve::<dyn Greeter>().unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn transient_factories_run_every_time() {
        let mut container = Container::new();
        container.bind::<String, _>(|_| Ok(Arc::new("fresh".to_owned())));

        let first = container.resolve::<String>().unwrap();
        let second = container.resolve::<String>().unwrap();

        assert_eq!(first, second);
        assert!(!Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn factories_can_resolve_other_services() {
        let mut container = Container::new();
        container.instance(Arc::new(3_usize));
        container.bind::<String, _>(|c| Ok(Arc::new("x".repeat(*c.resolve::<usize>()?))));

        assert_eq!(*container.resolve::<String>().unwrap(), "xxx");
    }

    #[test]
    fn missing_bindings_are_unresolvable() {
        let container = Container::new();
        let err = container.resolve::<dyn Greeter>().err().unwrap();
        assert!(matches!(err, Error::UnresolvableDependency { .. }));
        assert!(!container.has::<dyn Greeter>());
    }
}
