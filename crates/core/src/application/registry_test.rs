//! Unit tests for the property registry

use super::*;
use crate::domain::ValueKind;
use crate::port::change_listener::mocks::RecordingListener;
use crate::port::exposed::mocks::{Counter, Device};

fn registry_with_listener() -> (PropertyRegistry, Arc<RecordingListener>) {
    let registry = PropertyRegistry::new();
    let listener = Arc::new(RecordingListener::new());
    registry.add_listener(listener.clone());
    (registry, listener)
}

#[test]
fn test_register_builds_descriptors() {
    let registry = PropertyRegistry::new();
    let counter = Arc::new(Counter::default());

    let registration = registry.register(&counter);

    assert_eq!(registration.class_id, "Counter");
    assert_eq!(registration.version, "0.1");
    assert_eq!(registration.property_count, 1);
    assert!(!registration.replaced);

    let descriptors = registry.descriptors("Counter").unwrap();
    assert_eq!(descriptors.len(), 1);
    assert_eq!(descriptors[0].name(), "value");
    assert_eq!(descriptors[0].kind(), ValueKind::Int);
    assert_eq!(descriptors[0].notify_channel(), Some("valueChanged"));
}

#[test]
fn test_version_defaults_to_unknown() {
    let registry = PropertyRegistry::new();
    let device = Arc::new(Device::new("lamp"));

    registry.register(&device);

    assert_eq!(registry.version("Device").as_deref(), Some(DEFAULT_VERSION));
    assert_eq!(registry.version("Nope"), None);
}

#[test]
fn test_lookup_unknown_class_and_property() {
    let registry = PropertyRegistry::new();
    let counter = Arc::new(Counter::default());
    registry.register(&counter);

    assert_eq!(
        registry.lookup("Unknown", "value").unwrap_err(),
        PropertyError::ClassNotFound("Unknown".to_string())
    );
    let err = registry.lookup("Counter", "missing").unwrap_err();
    assert!(err.is_not_found());
    assert!(matches!(err, PropertyError::PropertyNotFound { .. }));
}

#[test]
fn test_read_after_write_returns_written_value() {
    let registry = PropertyRegistry::new();
    let counter = Arc::new(Counter::default());
    registry.register(&counter);

    let property = registry.lookup("Counter", "value").unwrap();
    assert_eq!(registry.read(&property).unwrap(), DynamicValue::Int(42));

    registry.write(&property, DynamicValue::from("7")).unwrap();

    assert_eq!(registry.read(&property).unwrap(), DynamicValue::Int(7));
    assert_eq!(counter.value(), 7);
}

#[test]
fn test_write_rejects_unconvertible_value() {
    let registry = PropertyRegistry::new();
    let counter = Arc::new(Counter::default());
    registry.register(&counter);
    let property = registry.lookup("Counter", "value").unwrap();

    let err = registry
        .write(&property, DynamicValue::from("seven"))
        .unwrap_err();

    assert!(matches!(err, PropertyError::WriteRejected { .. }));
    assert_eq!(counter.value(), 42);
    assert_eq!(counter.set_calls(), 0);
}

#[test]
fn test_capabilities_enforced() {
    let registry = PropertyRegistry::new();
    let device = Arc::new(Device::new("lamp"));
    registry.register(&device);

    let name = registry.lookup("Device", "name").unwrap();
    assert!(matches!(
        registry.write(&name, DynamicValue::from("x")),
        Err(PropertyError::NotWritable { .. })
    ));
    assert_eq!(
        registry.read(&name).unwrap(),
        DynamicValue::from("lamp")
    );

    let secret = registry.lookup("Device", "secret").unwrap();
    assert!(matches!(
        registry.read(&secret),
        Err(PropertyError::NotReadable { .. })
    ));
    registry.write(&secret, DynamicValue::Int(1234)).unwrap();
    assert_eq!(device.secret(), "1234");
}

#[test]
fn test_list_and_float_properties() {
    let registry = PropertyRegistry::new();
    let device = Arc::new(Device::new("lamp"));
    registry.register(&device);

    let tags = registry.lookup("Device", "tags").unwrap();
    assert_eq!(
        registry.read(&tags).unwrap(),
        DynamicValue::List(vec![DynamicValue::from("a"), DynamicValue::Int(1)])
    );

    let ratio = registry.lookup("Device", "ratio").unwrap();
    registry.write(&ratio, DynamicValue::Int(2)).unwrap();
    assert_eq!(registry.read(&ratio).unwrap(), DynamicValue::Float(2.0));
}

#[test]
fn test_signal_fans_out_reread_value() {
    let (registry, listener) = registry_with_listener();
    let counter = Arc::new(Counter::default());
    registry.register(&counter);

    counter.set_value(9);

    let change = listener.last().unwrap();
    assert_eq!(change.class_id, "Counter");
    assert_eq!(change.property, "value");
    assert_eq!(change.value, DynamicValue::Int(9));
    assert_eq!(change.method(), "Counter.value");
    assert_eq!(listener.count(), 1);
}

#[test]
fn test_internal_change_also_notifies() {
    let (registry, listener) = registry_with_listener();
    let device = Arc::new(Device::new("lamp"));
    registry.register(&device);

    device.toggle();

    let change = listener.last().unwrap();
    assert_eq!(change.method(), "Device.enabled");
    assert_eq!(change.value, DynamicValue::Bool(true));
}

#[test]
fn test_no_op_write_does_not_notify_but_notify_forces() {
    let (registry, listener) = registry_with_listener();
    let counter = Arc::new(Counter::default());
    registry.register(&counter);
    let property = registry.lookup("Counter", "value").unwrap();

    registry.write(&property, DynamicValue::Int(42)).unwrap();
    assert_eq!(listener.count(), 0);

    assert!(registry.notify(&property));
    assert_eq!(listener.count(), 1);
    assert_eq!(listener.last().unwrap().value, DynamicValue::Int(42));
}

#[test]
fn test_notify_without_channel_returns_false() {
    let (registry, listener) = registry_with_listener();
    let device = Arc::new(Device::new("lamp"));
    registry.register(&device);

    let ratio = registry.lookup("Device", "ratio").unwrap();
    assert!(!registry.notify(&ratio));
    assert_eq!(listener.count(), 0);
}

#[test]
fn test_reregistration_replaces_and_disconnects_old_object() {
    let (registry, listener) = registry_with_listener();
    let first = Arc::new(Counter::new(1));
    let second = Arc::new(Counter::new(2));

    registry.register(&first);
    let registration = registry.register(&second);

    assert!(registration.replaced);
    assert_eq!(registry.class_ids(), vec!["Counter".to_string()]);
    assert_eq!(first.value_changed().listener_count(), 0);
    assert_eq!(second.value_changed().listener_count(), 1);

    let property = registry.lookup("Counter", "value").unwrap();
    assert_eq!(registry.read(&property).unwrap(), DynamicValue::Int(2));

    first.set_value(100);
    assert_eq!(listener.count(), 0);
}

#[test]
fn test_registry_does_not_own_object() {
    let (registry, listener) = registry_with_listener();
    let counter = Arc::new(Counter::default());
    registry.register(&counter);
    let signal = counter.value_changed().clone();

    drop(counter);

    assert_eq!(
        registry.lookup("Counter", "value").unwrap_err(),
        PropertyError::ObjectDropped("Counter".to_string())
    );
    // The object is gone, so there is nothing to reread or broadcast
    signal.emit();
    assert_eq!(listener.count(), 0);
}

#[test]
fn test_unregister_disconnects() {
    let (registry, listener) = registry_with_listener();
    let counter = Arc::new(Counter::default());
    registry.register(&counter);

    assert!(registry.unregister("Counter"));
    assert!(!registry.unregister("Counter"));

    counter.set_value(1);
    assert_eq!(listener.count(), 0);
    assert_eq!(counter.value_changed().listener_count(), 0);
}

#[test]
fn test_same_object_in_two_registries() {
    let (left, left_listener) = registry_with_listener();
    let (right, right_listener) = registry_with_listener();
    let counter = Arc::new(Counter::default());
    left.register(&counter);
    right.register(&counter);

    counter.set_value(5);

    assert_eq!(left_listener.count(), 1);
    assert_eq!(right_listener.count(), 1);
}

#[test]
fn test_bound_property_survives_reentrant_write() {
    // The setter emits synchronously; the slot takes the registry read lock
    // again, which must not deadlock.
    let (registry, listener) = registry_with_listener();
    let counter = Arc::new(Counter::default());
    registry.register(&counter);
    let property = registry.lookup("Counter", "value").unwrap();

    registry.write(&property, DynamicValue::Float(6.6)).unwrap();

    assert_eq!(counter.value(), 7);
    assert_eq!(listener.last().unwrap().value, DynamicValue::Int(7));
    assert_eq!(property.method(), "Counter.value");
}

#[test]
fn test_removed_listener_no_longer_notified() {
    let registry = PropertyRegistry::new();
    let kept = Arc::new(RecordingListener::new());
    let removed = Arc::new(RecordingListener::new());
    let removed_handle: Arc<dyn ChangeListener> = removed.clone();
    registry.add_listener(kept.clone());
    registry.add_listener(removed_handle.clone());
    let counter = Arc::new(Counter::default());
    registry.register(&counter);

    assert!(registry.remove_listener(&removed_handle));
    assert!(!registry.remove_listener(&removed_handle));
    assert_eq!(registry.listener_count(), 1);

    counter.set_value(1);

    assert_eq!(kept.count(), 1);
    assert_eq!(removed.count(), 0);
}
