//! # Component Registry
//!
//! Components are plain data attached to entities. Any `'static` type
//! qualifies; handlers may be stored as components too, as long as they are
//! `fn` pointers or reference-counted closures.
//!
//! Each world owns its own registry, so component ids and stores never leak
//! from one world into the next.

use std::any::{type_name, TypeId};
use std::collections::HashMap;

use super::coordinator::Coordinator;
use super::entity::{ComponentId, ComponentMask, Entity, MAX_COMPONENTS};
use super::storage::{ComponentStore, ErasedStore};

/// Marker trait for ECS components.
///
/// Implemented for every `'static` type.
pub trait Component: 'static {}

impl<T: 'static> Component for T {}

/// Maps component types to ids and owns one store per type.
///
/// # Invariants
///
/// - `stores[id]` holds a `ComponentStore<T>` for the type registered as `id`.
/// - Ids are assigned sequentially and never reused within a registry.
#[derive(Default)]
pub struct ComponentRegistry {
    by_type: HashMap<TypeId, ComponentId>,
    stores: Vec<Box<dyn ErasedStore>>,
}

impl ComponentRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers component type `T` and returns its id.
    ///
    /// # Panics
    ///
    /// Panics if `T` is already registered or all [`MAX_COMPONENTS`] ids are taken.
    pub fn register<T: Component>(&mut self) -> ComponentId {
        let type_id = TypeId::of::<T>();
        assert!(
            !self.by_type.contains_key(&type_id),
            "component {} registered twice",
            type_name::<T>()
        );
        assert!(
            self.stores.len() < MAX_COMPONENTS,
            "cannot register {}: all {MAX_COMPONENTS} component ids are taken",
            type_name::<T>()
        );

        #[allow(clippy::cast_possible_truncation)]
        let id = self.stores.len() as ComponentId;
        self.by_type.insert(type_id, id);
        self.stores.push(Box::new(ComponentStore::<T>::new()));
        id
    }

    /// Returns the id of `T`, if registered.
    #[inline]
    #[must_use]
    pub fn id_of<T: Component>(&self) -> Option<ComponentId> {
        self.by_type.get(&TypeId::of::<T>()).copied()
    }

    /// Returns the id of `T`.
    ///
    /// # Panics
    ///
    /// Panics if `T` was not registered.
    #[inline]
    #[must_use]
    pub fn require_id<T: Component>(&self) -> ComponentId {
        match self.id_of::<T>() {
            Some(id) => id,
            None => panic!("component {} not registered", type_name::<T>()),
        }
    }

    /// Number of registered component types.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.stores.len()
    }

    /// Returns `true` if nothing is registered.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stores.is_empty()
    }

    /// Rust type name registered under `id`.
    #[must_use]
    pub fn name_of(&self, id: ComponentId) -> Option<&'static str> {
        self.stores.get(usize::from(id)).map(|s| s.component_name())
    }

    /// Typed store for `T`.
    ///
    /// # Panics
    ///
    /// Panics if `T` was not registered.
    #[must_use]
    pub fn store<T: Component>(&self) -> &ComponentStore<T> {
        let id = self.require_id::<T>();
        self.stores[usize::from(id)]
            .as_any()
            .downcast_ref::<ComponentStore<T>>()
            .unwrap_or_else(|| unreachable!("store {id} holds a different type"))
    }

    /// Typed store for `T`, mutably.
    ///
    /// # Panics
    ///
    /// Panics if `T` was not registered.
    pub fn store_mut<T: Component>(&mut self) -> &mut ComponentStore<T> {
        let id = self.require_id::<T>();
        self.stores[usize::from(id)]
            .as_any_mut()
            .downcast_mut::<ComponentStore<T>>()
            .unwrap_or_else(|| unreachable!("store {id} holds a different type"))
    }

    /// Every store, indexed by component id.
    pub(crate) fn stores_mut(&mut self) -> &mut [Box<dyn ErasedStore>] {
        &mut self.stores
    }

    /// Empties slot `index` in every store named by `mask`.
    pub fn invalidate(&mut self, index: usize, mask: ComponentMask) {
        for id in mask.iter() {
            if let Some(store) = self.stores.get_mut(usize::from(id)) {
                store.invalidate(index);
            }
        }
    }

    /// Returns `true` if the store for `id` has a valid slot at `index`.
    #[must_use]
    pub fn slot_is_valid(&self, id: ComponentId, index: usize) -> bool {
        self.stores
            .get(usize::from(id))
            .is_some_and(|s| s.contains(index))
    }
}

/// A group of components attached in one call.
///
/// Implemented for tuples of up to eight distinct components.
///
/// ```rust
/// use tecs_core::Coordinator;
///
/// #[derive(Clone, Copy)]
/// struct Position(i32, i32);
/// #[derive(Clone, Copy)]
/// struct Velocity(i32, i32);
///
/// let mut world = Coordinator::new();
/// world.register_component::<Position>();
/// world.register_component::<Velocity>();
///
/// let e = world.new_entity().unwrap();
/// let (_, velocity) = world.add_components(e, (Position(0, 0), Velocity(1, 1)));
/// velocity.0 = 3;
/// assert_eq!(world.get_ref::<Velocity>(e).0, 3);
/// ```
pub trait ComponentBundle: 'static {
    /// Tuple of mutable references to the stored components, in bundle order.
    type Refs<'a>;

    /// Combined mask of every component in the bundle.
    ///
    /// # Panics
    ///
    /// Panics if a component in the bundle was not registered.
    fn mask(world: &Coordinator) -> ComponentMask;

    /// Attaches every component to `entity`, in order.
    fn attach(self, world: &mut Coordinator, entity: Entity);

    /// Borrows every component of the bundle held by `entity`.
    ///
    /// # Panics
    ///
    /// Panics if `entity` does not hold one of the components, or if the
    /// bundle names the same type twice.
    fn refs(world: &mut Coordinator, entity: Entity) -> Self::Refs<'_>;
}

macro_rules! impl_component_bundle {
    ($(($name:ident, $id:ident, $slot:ident)),+) => {
        impl<$($name: Component),+> ComponentBundle for ($($name,)+) {
            type Refs<'a> = ($(&'a mut $name,)+);

            fn mask(world: &Coordinator) -> ComponentMask {
                ComponentMask::EMPTY $(.with(world.component_id::<$name>()))+
            }

            #[allow(non_snake_case)]
            fn attach(self, world: &mut Coordinator, entity: Entity) {
                let ($($name,)+) = self;
                $(world.add_component(entity, $name);)+
            }

            fn refs(world: &mut Coordinator, entity: Entity) -> Self::Refs<'_> {
                $(let $id = usize::from(world.component_id::<$name>());)+
                $(let mut $slot: Option<&mut $name> = None;)+
                let index = entity.index();

                // Each store is visited once, so the borrows are disjoint.
                for (id, store) in world.components_mut().stores_mut().iter_mut().enumerate() {
                    $(
                        if id == $id {
                            $slot = store
                                .as_any_mut()
                                .downcast_mut::<ComponentStore<$name>>()
                                .and_then(|store| store.get_mut(index));
                            continue;
                        }
                    )+
                }

                ($(
                    match $slot {
                        Some(component) => component,
                        None => panic!("entity {entity} has no {} component", type_name::<$name>()),
                    },
                )+)
            }
        }
    };
}

impl_component_bundle!((A, a_id, a_ref));
impl_component_bundle!((A, a_id, a_ref), (B, b_id, b_ref));
impl_component_bundle!((A, a_id, a_ref), (B, b_id, b_ref), (C, c_id, c_ref));
impl_component_bundle!((A, a_id, a_ref), (B, b_id, b_ref), (C, c_id, c_ref), (D, d_id, d_ref));
impl_component_bundle!(
    (A, a_id, a_ref),
    (B, b_id, b_ref),
    (C, c_id, c_ref),
    (D, d_id, d_ref),
    (E, e_id, e_ref)
);
impl_component_bundle!(
    (A, a_id, a_ref),
    (B, b_id, b_ref),
    (C, c_id, c_ref),
    (D, d_id, d_ref),
    (E, e_id, e_ref),
    (F, f_id, f_ref)
);
impl_component_bundle!(
    (A, a_id, a_ref),
    (B, b_id, b_ref),
    (C, c_id, c_ref),
    (D, d_id, d_ref),
    (E, e_id, e_ref),
    (F, f_id, f_ref),
    (G, g_id, g_ref)
);
impl_component_bundle!(
    (A, a_id, a_ref),
    (B, b_id, b_ref),
    (C, c_id, c_ref),
    (D, d_id, d_ref),
    (E, e_id, e_ref),
    (F, f_id, f_ref),
    (G, g_id, g_ref),
    (H, h_id, h_ref)
);
