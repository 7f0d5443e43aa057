//! Property Registry
//!
//! Holds one [`ClassRegistration`] per class identifier: version tag, property
//! descriptors, the notification-channel -> property map and a non-owning
//! handle to the exposed object. Both protocol adapters resolve, read and
//! write through this type, so coercion rules live in exactly one place.
//!
//! Registration subscribes to every notifying property's [`ChangeSignal`].
//! When a signal fires, the registry resolves the channel back to its
//! property, rereads the value and hands a [`PropertyChange`] to every
//! attached [`ChangeListener`].

use crate::domain::{ChangeSignal, DynamicValue, PropertyDescriptor, Subscription};
use crate::error::{PropertyError, Result};
use crate::port::exposed::PropertyEntry;
use crate::port::{ChangeListener, ClassTable, Exposed, PropertyChange};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};
use tracing::{debug, info, warn};

/// Version tag used when a class table declares none
pub const DEFAULT_VERSION: &str = "unknown";

/// Outcome of [`PropertyRegistry::register`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub class_id: String,
    pub version: String,
    pub property_count: usize,
    /// True when an earlier registration under the same class id was replaced
    pub replaced: bool,
}

/// A resolved (class, property) pair, detached from the registry lock
#[derive(Clone)]
pub struct BoundProperty {
    class_id: String,
    descriptor: PropertyDescriptor,
    binding: Arc<dyn ObjectBinding>,
}

impl BoundProperty {
    pub fn class_id(&self) -> &str {
        &self.class_id
    }

    pub fn descriptor(&self) -> &PropertyDescriptor {
        &self.descriptor
    }

    /// `Class.property`
    pub fn method(&self) -> String {
        format!("{}.{}", self.class_id, self.descriptor.name())
    }
}

impl fmt::Debug for BoundProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundProperty")
            .field("class_id", &self.class_id)
            .field("descriptor", &self.descriptor)
            .finish()
    }
}

/// Shared, cheaply clonable registry handle
#[derive(Clone, Default)]
pub struct PropertyRegistry {
    shared: Arc<Shared>,
}

#[derive(Default)]
struct Shared {
    classes: RwLock<HashMap<String, ClassRegistration>>,
    listeners: RwLock<Vec<Arc<dyn ChangeListener>>>,
}

struct ClassRegistration {
    version: String,
    descriptors: HashMap<String, PropertyDescriptor>,
    // notification channel name -> property name
    channels: HashMap<String, String>,
    binding: Arc<dyn ObjectBinding>,
    // Dropping the registration disconnects these
    _subscriptions: Vec<Subscription>,
}

impl PropertyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `object` under its class table's identifier.
    ///
    /// The registry keeps only a weak reference. A prior registration under
    /// the same class identifier is replaced and its signal subscriptions are
    /// dropped.
    pub fn register<T: Exposed>(&self, object: &Arc<T>) -> Registration {
        let ClassTable {
            class_id,
            version,
            entries,
        } = T::class_table();
        let version = version.unwrap_or_else(|| DEFAULT_VERSION.to_string());

        let mut descriptors = HashMap::new();
        let mut channels = HashMap::new();
        let mut signals: HashMap<String, ChangeSignal> = HashMap::new();
        let mut bound = HashMap::new();

        for entry in entries {
            let name = entry.descriptor.name().to_string();
            if let (Some(channel), Some(accessor)) =
                (entry.descriptor.notify_channel(), entry.signal.as_ref())
            {
                // One subscription per channel even if several properties share it
                signals
                    .entry(channel.to_string())
                    .or_insert_with(|| accessor(&**object));
                channels.insert(channel.to_string(), name.clone());
            }
            descriptors.insert(name.clone(), entry.descriptor.clone());
            bound.insert(name, entry);
        }

        let subscriptions = signals
            .into_iter()
            .map(|(channel, signal)| {
                let shared = Arc::downgrade(&self.shared);
                let class_id = class_id.clone();
                signal.connect(move || {
                    if let Some(shared) = shared.upgrade() {
                        shared.channel_fired(&class_id, &channel);
                    }
                })
            })
            .collect();

        let property_count = descriptors.len();
        let registration = ClassRegistration {
            version: version.clone(),
            descriptors,
            channels,
            binding: Arc::new(Binding {
                object: Arc::downgrade(object),
                entries: bound,
            }),
            _subscriptions: subscriptions,
        };

        let previous = self.shared.classes_mut().insert(class_id.clone(), registration);
        let replaced = previous.is_some();
        // Old subscriptions disconnect here, outside the registry lock
        drop(previous);

        if replaced {
            warn!(class = %class_id, "Replaced existing registration (last registration wins)");
        }
        info!(
            class = %class_id,
            version = %version,
            properties = property_count,
            "Registered exposed object"
        );

        Registration {
            class_id,
            version,
            property_count,
            replaced,
        }
    }

    /// Remove a class; returns whether it was registered.
    pub fn unregister(&self, class_id: &str) -> bool {
        let removed = self.shared.classes_mut().remove(class_id);
        let existed = removed.is_some();
        drop(removed);
        if existed {
            info!(class = %class_id, "Unregistered exposed object");
        }
        existed
    }

    pub fn lookup(&self, class_id: &str, property: &str) -> Result<BoundProperty> {
        let classes = self.shared.classes();
        let registration = classes
            .get(class_id)
            .ok_or_else(|| PropertyError::ClassNotFound(class_id.to_string()))?;
        let descriptor =
            registration
                .descriptors
                .get(property)
                .ok_or_else(|| PropertyError::PropertyNotFound {
                    class: class_id.to_string(),
                    property: property.to_string(),
                })?;
        if !registration.binding.is_alive() {
            return Err(PropertyError::ObjectDropped(class_id.to_string()));
        }

        Ok(BoundProperty {
            class_id: class_id.to_string(),
            descriptor: descriptor.clone(),
            binding: Arc::clone(&registration.binding),
        })
    }

    /// Read the current value; fails with `NotReadable` for write-only properties.
    pub fn read(&self, property: &BoundProperty) -> Result<DynamicValue> {
        if !property.descriptor.is_readable() {
            return Err(PropertyError::NotReadable {
                class: property.class_id.clone(),
                property: property.descriptor.name().to_string(),
            });
        }
        property
            .binding
            .get(property.descriptor.name())
            .map_err(|failure| failure.into_error(property))
    }

    /// Convert `value` to the property's declared type and assign it.
    pub fn write(&self, property: &BoundProperty, value: DynamicValue) -> Result<()> {
        let descriptor = &property.descriptor;
        if !descriptor.is_writable() {
            return Err(PropertyError::NotWritable {
                class: property.class_id.clone(),
                property: descriptor.name().to_string(),
            });
        }

        let converted =
            value
                .convert(descriptor.kind())
                .ok_or_else(|| PropertyError::WriteRejected {
                    class: property.class_id.clone(),
                    property: descriptor.name().to_string(),
                    reason: format!("cannot convert {} to {}", value.kind(), descriptor.kind()),
                })?;

        property
            .binding
            .set(descriptor.name(), converted)
            .map_err(|failure| failure.into_error(property))?;

        debug!(method = %property.method(), "Property written");
        Ok(())
    }

    /// Fire the property's notification channel; false if it has none.
    pub fn notify(&self, property: &BoundProperty) -> bool {
        match property.binding.signal(property.descriptor.name()) {
            Some(signal) => {
                signal.emit();
                true
            }
            None => false,
        }
    }

    /// Attach a listener that receives every resolved property change
    pub fn add_listener(&self, listener: Arc<dyn ChangeListener>) {
        self.shared
            .listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(listener);
    }

    /// Detach a listener previously passed to [`add_listener`](Self::add_listener)
    pub fn remove_listener(&self, listener: &Arc<dyn ChangeListener>) -> bool {
        let mut listeners = self
            .shared
            .listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let before = listeners.len();
        listeners.retain(|attached| !Arc::ptr_eq(attached, listener));
        listeners.len() != before
    }

    pub fn listener_count(&self) -> usize {
        self.shared
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn version(&self, class_id: &str) -> Option<String> {
        self.shared
            .classes()
            .get(class_id)
            .map(|registration| registration.version.clone())
    }

    /// Registered class identifiers, sorted
    pub fn class_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.shared.classes().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Descriptors of one class, sorted by property name
    pub fn descriptors(&self, class_id: &str) -> Option<Vec<PropertyDescriptor>> {
        self.shared.classes().get(class_id).map(|registration| {
            let mut descriptors: Vec<PropertyDescriptor> =
                registration.descriptors.values().cloned().collect();
            descriptors.sort_by(|a, b| a.name().cmp(b.name()));
            descriptors
        })
    }
}

impl fmt::Debug for PropertyRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyRegistry")
            .field("classes", &self.class_ids())
            .field("listeners", &self.listener_count())
            .finish()
    }
}

impl Shared {
    fn classes(&self) -> RwLockReadGuard<'_, HashMap<String, ClassRegistration>> {
        self.classes.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn classes_mut(&self) -> RwLockWriteGuard<'_, HashMap<String, ClassRegistration>> {
        self.classes.write().unwrap_or_else(PoisonError::into_inner)
    }

    // Signal slot: resolve the channel, reread, fan out. No lock is held while
    // calling the getter or the listeners.
    fn channel_fired(&self, class_id: &str, channel: &str) {
        let (property, binding) = {
            let classes = self.classes();
            let Some(registration) = classes.get(class_id) else {
                return;
            };
            let Some(property) = registration.channels.get(channel) else {
                return;
            };
            match registration.descriptors.get(property) {
                Some(descriptor) if descriptor.is_readable() => {}
                _ => return,
            }
            (property.clone(), Arc::clone(&registration.binding))
        };

        let value = match binding.get(&property) {
            Ok(value) => value,
            Err(_) => {
                debug!(class = %class_id, property = %property, "Change not readable; skipped");
                return;
            }
        };

        let change = PropertyChange {
            class_id: class_id.to_string(),
            property,
            value,
        };
        let listeners: Vec<Arc<dyn ChangeListener>> = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for listener in listeners {
            listener.property_changed(&change);
        }
    }
}

// ============================================================================
// Type-erased object binding
// ============================================================================

enum BindingFailure {
    Dropped,
    Missing,
    Rejected(String),
}

impl BindingFailure {
    fn into_error(self, property: &BoundProperty) -> PropertyError {
        let class = property.class_id.clone();
        let name = property.descriptor.name().to_string();
        match self {
            BindingFailure::Dropped => PropertyError::ObjectDropped(class),
            BindingFailure::Missing => PropertyError::PropertyNotFound {
                class,
                property: name,
            },
            BindingFailure::Rejected(reason) => PropertyError::WriteRejected {
                class,
                property: name,
                reason,
            },
        }
    }
}

trait ObjectBinding: Send + Sync {
    fn is_alive(&self) -> bool;
    fn get(&self, property: &str) -> std::result::Result<DynamicValue, BindingFailure>;
    fn set(&self, property: &str, value: DynamicValue) -> std::result::Result<(), BindingFailure>;
    fn signal(&self, property: &str) -> Option<ChangeSignal>;
}

struct Binding<T> {
    object: Weak<T>,
    entries: HashMap<String, PropertyEntry<T>>,
}

impl<T: Exposed> ObjectBinding for Binding<T> {
    fn is_alive(&self) -> bool {
        self.object.strong_count() > 0
    }

    fn get(&self, property: &str) -> std::result::Result<DynamicValue, BindingFailure> {
        let object = self.object.upgrade().ok_or(BindingFailure::Dropped)?;
        let getter = self
            .entries
            .get(property)
            .and_then(|entry| entry.getter.as_ref())
            .ok_or(BindingFailure::Missing)?;
        Ok(getter(&*object))
    }

    fn set(&self, property: &str, value: DynamicValue) -> std::result::Result<(), BindingFailure> {
        let object = self.object.upgrade().ok_or(BindingFailure::Dropped)?;
        let setter = self
            .entries
            .get(property)
            .and_then(|entry| entry.setter.as_ref())
            .ok_or(BindingFailure::Missing)?;
        setter(&*object, value).map_err(BindingFailure::Rejected)
    }

    fn signal(&self, property: &str) -> Option<ChangeSignal> {
        let object = self.object.upgrade()?;
        let accessor = self.entries.get(property)?.signal.as_ref()?;
        Some(accessor(&*object))
    }
}

#[cfg(test)]
#[path = "registry_test.rs"]
mod tests;
