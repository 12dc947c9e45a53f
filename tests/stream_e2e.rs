use std::cell::RefCell;
use std::rc::Rc;

use vizstream::bridge::{dispatch, EventMessage};
use vizstream::variants::{numeric, position_x, position_xy, position_y};
use vizstream::{
    DispatchError, NameMapping, Rename, SourceId, StreamError, StreamRegistry, SubscriberError,
    SubscriberFn, Value, ValueMap,
};

fn updates(pairs: &[(&str, f64)]) -> ValueMap {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), Value::Float(*v)))
        .collect()
}

fn recording(log: &Rc<RefCell<Vec<ValueMap>>>) -> SubscriberFn {
    let log = Rc::clone(log);
    Box::new(move |values| {
        log.borrow_mut().push(values.clone());
        Ok(())
    })
}

#[test]
fn value_projection_is_pure() {
    let mut registry = StreamRegistry::new();
    let id = registry.insert(
        position_xy()
            .mapping(NameMapping::table([("x", "posx")]))
            .preprocessor(Rename::single("y", "posy"))
            .build()
            .unwrap(),
    );

    registry.stage(id, updates(&[("x", 1.0), ("y", 2.0)])).unwrap();

    let first = registry.value(id).unwrap();
    let second = registry.value(id).unwrap();
    assert_eq!(first, second);
    assert_eq!(first["posx"], Value::Float(1.0));
    assert_eq!(first["posy"], Value::Float(2.0));
}

#[test]
fn update_triggers_exactly_once_with_remapped_field() {
    let mut registry = StreamRegistry::new();
    let id = registry.insert(position_x().mapping("posx").build().unwrap());

    let log = Rc::new(RefCell::new(Vec::new()));
    registry.subscribe(id, recording(&log)).unwrap();

    registry.update(id, updates(&[("x", 5.0)])).unwrap();

    let log = log.borrow();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0]["posx"], Value::Float(5.0));
}

#[test]
fn deferred_updates_batch_into_one_trigger() {
    let mut registry = StreamRegistry::new();
    let a = registry.insert(position_x().build().unwrap());
    let b = registry.insert(position_y().build().unwrap());

    let log_a = Rc::new(RefCell::new(Vec::new()));
    let log_b = Rc::new(RefCell::new(Vec::new()));
    let log_shared = Rc::new(RefCell::new(Vec::new()));

    registry.subscribe(a, recording(&log_a)).unwrap();
    registry.subscribe(b, recording(&log_b)).unwrap();
    let shared = registry.subscribe(a, recording(&log_shared)).unwrap();
    registry.attach(b, shared).unwrap();

    registry.stage(a, updates(&[("x", 1.0)])).unwrap();
    registry.stage(b, updates(&[("y", 2.0)])).unwrap();
    assert!(log_a.borrow().is_empty());
    assert!(log_b.borrow().is_empty());

    registry.trigger(&[a, b]).unwrap();

    // Every subscriber in the union fired exactly once with the merged map.
    for log in [&log_a, &log_b, &log_shared] {
        let log = log.borrow();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0]["x"], Value::Float(1.0));
        assert_eq!(log[0]["y"], Value::Float(2.0));
    }
}

#[test]
fn later_stream_wins_key_collisions() {
    let mut registry = StreamRegistry::new();
    let a = registry.insert(position_x().build().unwrap());
    let b = registry.insert(position_x().build().unwrap());

    registry.stage(a, updates(&[("x", 1.0)])).unwrap();
    registry.stage(b, updates(&[("x", 9.0)])).unwrap();

    let log = Rc::new(RefCell::new(Vec::new()));
    registry.subscribe(a, recording(&log)).unwrap();

    registry.trigger(&[a, b]).unwrap();
    assert_eq!(log.borrow()[0]["x"], Value::Float(9.0));
}

#[test]
fn constant_protection_survives_update() {
    let mut registry = StreamRegistry::new();
    let id = registry.insert(position_x().build().unwrap());

    registry.update(id, updates(&[("x", 5.0)])).unwrap();
    assert_eq!(
        registry.get(id).unwrap().current("x"),
        Some(&Value::Float(5.0))
    );

    // Direct assignment outside the update protocol still fails.
    let err = registry.get_mut(id).unwrap().set("x", 7.0).unwrap_err();
    assert!(matches!(err, vizstream::UpdateError::ConstantField { .. }));
    assert_eq!(
        registry.get(id).unwrap().current("x"),
        Some(&Value::Float(5.0))
    );
}

#[test]
fn rename_preprocessor_remaps_single_key() {
    use vizstream::Preprocessor;

    let rename = Rename::single("x", "posx");
    let mut input = ValueMap::new();
    input.insert("x".to_string(), Value::Int(3));
    input.insert("y".to_string(), Value::Int(4));

    let out = rename.apply(input);
    assert_eq!(out["posx"], Value::Int(3));
    assert_eq!(out["y"], Value::Int(4));
    assert!(!out.contains_key("x"));
}

#[test]
fn find_returns_streams_by_source_identity() {
    let mut registry = StreamRegistry::new();
    let obj_a = SourceId::new();
    let obj_b = SourceId::new();

    let s1 = registry.insert(position_x().source(obj_a).build().unwrap());
    let s2 = registry.insert(position_y().source(obj_a).build().unwrap());
    let s3 = registry.insert(position_xy().source(obj_b).build().unwrap());

    assert_eq!(registry.find(obj_a), vec![s1, s2]);
    assert_eq!(registry.find(obj_b), vec![s3]);
}

#[test]
fn scalar_mapping_projects_single_field() {
    let mut registry = StreamRegistry::new();
    let id = registry.insert(position_x().mapping("posx").value("x", 1.5).build().unwrap());

    let projection = registry.value(id).unwrap();
    assert_eq!(projection.len(), 1);
    assert_eq!(projection["posx"], Value::Float(1.5));
}

#[test]
fn unknown_field_update_fails_fast() {
    let mut registry = StreamRegistry::new();
    let id = registry.insert(position_x().build().unwrap());

    let log = Rc::new(RefCell::new(Vec::new()));
    registry.subscribe(id, recording(&log)).unwrap();

    let err = registry
        .update(id, updates(&[("x", 1.0), ("z", 2.0)]))
        .unwrap_err();
    assert!(matches!(
        err,
        StreamError::Update(vizstream::UpdateError::UnknownField { .. })
    ));

    // Nothing was applied, nothing was delivered.
    assert!(log.borrow().is_empty());
    assert_eq!(
        registry.get(id).unwrap().current("x"),
        Some(&Value::Float(0.0))
    );
}

#[test]
fn subscriber_failure_aborts_remaining_fanout() {
    let mut registry = StreamRegistry::new();
    let id = registry.insert(position_x().build().unwrap());

    let reached = Rc::new(RefCell::new(Vec::new()));
    registry
        .subscribe(id, Box::new(|_| Err(SubscriberError::new("boom"))))
        .unwrap();
    registry.subscribe(id, recording(&reached)).unwrap();

    let err = registry.update(id, updates(&[("x", 1.0)])).unwrap_err();
    assert!(matches!(
        err,
        StreamError::Dispatch(DispatchError::SubscriberFailed { .. })
    ));
    assert!(reached.borrow().is_empty());
}

#[test]
fn bridge_event_drives_full_pipeline() {
    let mut registry = StreamRegistry::new();
    let id = registry.insert(position_xy().build().unwrap());

    let log = Rc::new(RefCell::new(Vec::new()));
    registry.subscribe(id, recording(&log)).unwrap();

    let payload = format!(
        r#"{{
            "stream": "{id}",
            "values": {{
                "x": {{"type": "float", "value": 3.0}},
                "y": {{"type": "float", "value": 4.0}}
            }}
        }}"#
    );
    let message = EventMessage::from_json(&payload).unwrap();
    dispatch(&mut registry, message).unwrap();

    let log = log.borrow();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0]["x"], Value::Float(3.0));
    assert_eq!(log[0]["y"], Value::Float(4.0));
}

#[test]
fn removed_stream_no_longer_participates() {
    let mut registry = StreamRegistry::new();
    let source = SourceId::new();
    let id = registry.insert(position_x().source(source).build().unwrap());

    assert_eq!(registry.find(source).len(), 1);
    let retired = registry.remove(id).unwrap();
    assert_eq!(retired.name(), "PositionX");

    assert!(registry.find(source).is_empty());
    let err = registry.update(id, updates(&[("x", 1.0)])).unwrap_err();
    assert!(matches!(
        err,
        StreamError::Dispatch(DispatchError::UnknownStream { .. })
    ));
}

#[test]
fn custom_numeric_variant_batches_with_positions() {
    let mut registry = StreamRegistry::new();
    let extents = registry.insert(numeric("Extents", &["x0", "x1"]).build().unwrap());
    let cursor = registry.insert(position_x().build().unwrap());

    let log = Rc::new(RefCell::new(Vec::new()));
    let sub = registry.subscribe(extents, recording(&log)).unwrap();
    registry.attach(cursor, sub).unwrap();

    registry
        .stage(extents, updates(&[("x0", -1.0), ("x1", 1.0)]))
        .unwrap();
    registry.stage(cursor, updates(&[("x", 0.5)])).unwrap();
    registry.trigger(&[extents, cursor]).unwrap();

    let log = log.borrow();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0]["x0"], Value::Float(-1.0));
    assert_eq!(log[0]["x1"], Value::Float(1.0));
    assert_eq!(log[0]["x"], Value::Float(0.5));
}
