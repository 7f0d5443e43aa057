//! Exposed Object Port
//!
//! Application types opt in to remote exposure by implementing [`Exposed`]
//! and returning a [`ClassTable`]: a static list of
//! (name, getter, setter-or-absent, notification-channel-or-absent) entries.
//! The registry consumes the table once per registration.
//!
//! ```
//! use propbridge_core::{ChangeSignal, ClassTable, Exposed, Notify};
//! use std::sync::atomic::{AtomicI64, Ordering};
//!
//! struct Counter {
//!     value: AtomicI64,
//!     value_changed: ChangeSignal,
//! }
//!
//! impl Counter {
//!     fn value(&self) -> i64 {
//!         self.value.load(Ordering::SeqCst)
//!     }
//!
//!     fn set_value(&self, value: i64) {
//!         if self.value.swap(value, Ordering::SeqCst) != value {
//!             self.value_changed.emit();
//!         }
//!     }
//! }
//!
//! impl Exposed for Counter {
//!     fn class_table() -> ClassTable<Self> {
//!         ClassTable::new("Counter").version("0.1").read_write(
//!             "value",
//!             Counter::value,
//!             Counter::set_value,
//!             Some(Notify::new("valueChanged", |c: &Counter| c.value_changed.clone())),
//!         )
//!     }
//! }
//! ```

use crate::domain::{Capabilities, ChangeSignal, DynamicValue, PropertyDescriptor, PropertyType};

pub(crate) type Getter<T> = Box<dyn Fn(&T) -> DynamicValue + Send + Sync>;
pub(crate) type Setter<T> = Box<dyn Fn(&T, DynamicValue) -> Result<(), String> + Send + Sync>;
pub(crate) type SignalAccessor<T> = Box<dyn Fn(&T) -> ChangeSignal + Send + Sync>;

/// A type whose properties can be registered with a `PropertyRegistry`
pub trait Exposed: Sized + Send + Sync + 'static {
    /// Capability descriptor table for this type
    fn class_table() -> ClassTable<Self>;
}

/// Association of a property with the object's change signal
pub struct Notify<T> {
    channel: String,
    signal: SignalAccessor<T>,
}

impl<T> Notify<T> {
    /// `channel` names the signal; `signal` returns a handle to it.
    pub fn new<F>(channel: impl Into<String>, signal: F) -> Self
    where
        F: Fn(&T) -> ChangeSignal + Send + Sync + 'static,
    {
        Self {
            channel: channel.into(),
            signal: Box::new(signal),
        }
    }
}

pub(crate) struct PropertyEntry<T> {
    pub(crate) descriptor: PropertyDescriptor,
    pub(crate) getter: Option<Getter<T>>,
    pub(crate) setter: Option<Setter<T>>,
    pub(crate) signal: Option<SignalAccessor<T>>,
}

/// Capability descriptor table of one exposed class
pub struct ClassTable<T> {
    pub(crate) class_id: String,
    pub(crate) version: Option<String>,
    pub(crate) entries: Vec<PropertyEntry<T>>,
}

impl<T: 'static> ClassTable<T> {
    pub fn new(class_id: impl Into<String>) -> Self {
        Self {
            class_id: class_id.into(),
            version: None,
            entries: Vec::new(),
        }
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn read_write<V, G, S>(
        self,
        name: &str,
        getter: G,
        setter: S,
        notify: Option<Notify<T>>,
    ) -> Self
    where
        V: PropertyType,
        G: Fn(&T) -> V + Send + Sync + 'static,
        S: Fn(&T, V) + Send + Sync + 'static,
    {
        self.push::<V>(
            name,
            Capabilities::READ_WRITE,
            Some(erase_getter(getter)),
            Some(erase_setter(setter)),
            notify,
        )
    }

    pub fn read_only<V, G>(self, name: &str, getter: G, notify: Option<Notify<T>>) -> Self
    where
        V: PropertyType,
        G: Fn(&T) -> V + Send + Sync + 'static,
    {
        self.push::<V>(
            name,
            Capabilities::READ_ONLY,
            Some(erase_getter(getter)),
            None,
            notify,
        )
    }

    pub fn write_only<V, S>(self, name: &str, setter: S) -> Self
    where
        V: PropertyType,
        S: Fn(&T, V) + Send + Sync + 'static,
    {
        self.push::<V>(
            name,
            Capabilities::WRITE_ONLY,
            None,
            Some(erase_setter(setter)),
            None,
        )
    }

    pub fn class_id(&self) -> &str {
        &self.class_id
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    // A repeated name replaces the earlier declaration.
    fn push<V: PropertyType>(
        mut self,
        name: &str,
        capabilities: Capabilities,
        getter: Option<Getter<T>>,
        setter: Option<Setter<T>>,
        notify: Option<Notify<T>>,
    ) -> Self {
        let (channel, signal) = match notify {
            Some(notify) => (Some(notify.channel), Some(notify.signal)),
            None => (None, None),
        };
        self.entries.retain(|entry| entry.descriptor.name() != name);
        self.entries.push(PropertyEntry {
            descriptor: PropertyDescriptor::new(name, V::KIND, capabilities, channel),
            getter,
            setter,
            signal,
        });
        self
    }
}

fn erase_getter<T, V, G>(getter: G) -> Getter<T>
where
    T: 'static,
    V: PropertyType,
    G: Fn(&T) -> V + Send + Sync + 'static,
{
    Box::new(move |object| getter(object).into_value())
}

fn erase_setter<T, V, S>(setter: S) -> Setter<T>
where
    T: 'static,
    V: PropertyType,
    S: Fn(&T, V) + Send + Sync + 'static,
{
    Box::new(move |object, value| {
        let kind = value.kind();
        let typed = V::from_value(value)
            .ok_or_else(|| format!("{} value out of range for declared {}", kind, V::KIND))?;
        setter(object, typed);
        Ok(())
    })
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Readable/writable integer `value` (initially 42) notifying on `valueChanged`.
    /// The setter ignores no-op writes, like a typical property setter.
    pub struct Counter {
        value: Mutex<i64>,
        value_changed: ChangeSignal,
        set_calls: AtomicUsize,
    }

    impl Counter {
        pub fn new(value: i64) -> Self {
            Self {
                value: Mutex::new(value),
                value_changed: ChangeSignal::new(),
                set_calls: AtomicUsize::new(0),
            }
        }

        pub fn value(&self) -> i64 {
            *self.value.lock().unwrap()
        }

        pub fn set_value(&self, value: i64) {
            self.set_calls.fetch_add(1, Ordering::SeqCst);
            {
                let mut current = self.value.lock().unwrap();
                if *current == value {
                    return;
                }
                *current = value;
            }
            self.value_changed.emit();
        }

        /// Number of times the mutator ran
        pub fn set_calls(&self) -> usize {
            self.set_calls.load(Ordering::SeqCst)
        }

        pub fn value_changed(&self) -> &ChangeSignal {
            &self.value_changed
        }
    }

    impl Default for Counter {
        fn default() -> Self {
            Self::new(42)
        }
    }

    impl Exposed for Counter {
        fn class_table() -> ClassTable<Self> {
            ClassTable::new("Counter").version("0.1").read_write(
                "value",
                Counter::value,
                Counter::set_value,
                Some(Notify::new("valueChanged", |c: &Counter| {
                    c.value_changed.clone()
                })),
            )
        }
    }

    /// Mixed-capability fixture without a version tag
    pub struct Device {
        pub name: String,
        secret: Mutex<String>,
        ratio: Mutex<f64>,
        enabled: Mutex<bool>,
        tags: Vec<DynamicValue>,
        enabled_changed: ChangeSignal,
        status_changed: ChangeSignal,
    }

    impl Device {
        pub fn new(name: impl Into<String>) -> Self {
            Self {
                name: name.into(),
                secret: Mutex::new(String::new()),
                ratio: Mutex::new(0.5),
                enabled: Mutex::new(false),
                tags: vec![DynamicValue::from("a"), DynamicValue::Int(1)],
                enabled_changed: ChangeSignal::new(),
                status_changed: ChangeSignal::new(),
            }
        }

        pub fn secret(&self) -> String {
            self.secret.lock().unwrap().clone()
        }

        pub fn ratio(&self) -> f64 {
            *self.ratio.lock().unwrap()
        }

        pub fn enabled(&self) -> bool {
            *self.enabled.lock().unwrap()
        }

        /// Changes `enabled` without going through any adapter
        pub fn toggle(&self) {
            {
                let mut enabled = self.enabled.lock().unwrap();
                *enabled = !*enabled;
            }
            self.enabled_changed.emit();
        }

        /// Fires `statusChanged` although nothing changed
        pub fn touch_status(&self) {
            self.status_changed.emit();
        }
    }

    impl Exposed for Device {
        fn class_table() -> ClassTable<Self> {
            ClassTable::new("Device")
                .read_only("name", |d: &Device| d.name.clone(), None)
                .write_only("secret", |d: &Device, v: String| {
                    *d.secret.lock().unwrap() = v;
                })
                .read_write(
                    "ratio",
                    Device::ratio,
                    |d: &Device, v: f64| *d.ratio.lock().unwrap() = v,
                    None,
                )
                .read_write(
                    "enabled",
                    Device::enabled,
                    |d: &Device, v: bool| *d.enabled.lock().unwrap() = v,
                    Some(Notify::new("enabledChanged", |d: &Device| {
                        d.enabled_changed.clone()
                    })),
                )
                .read_only("tags", |d: &Device| d.tags.clone(), None)
                .read_only(
                    "status",
                    |_: &Device| "idle".to_string(),
                    Some(Notify::new("statusChanged", |d: &Device| {
                        d.status_changed.clone()
                    })),
                )
        }
    }

    /// Writable list property `items`, initially `[9]`
    pub struct Bag {
        items: Mutex<Vec<DynamicValue>>,
    }

    impl Bag {
        pub fn items(&self) -> Vec<DynamicValue> {
            self.items.lock().unwrap().clone()
        }

        pub fn set_items(&self, items: Vec<DynamicValue>) {
            *self.items.lock().unwrap() = items;
        }
    }

    impl Default for Bag {
        fn default() -> Self {
            Self {
                items: Mutex::new(vec![DynamicValue::Int(9)]),
            }
        }
    }

    impl Exposed for Bag {
        fn class_table() -> ClassTable<Self> {
            ClassTable::new("Bag").read_write("items", Bag::items, Bag::set_items, None)
        }
    }
}
