//! Engine behaviour on small hand-built shapes: synchronization, remapping,
//! collections, error aggregation, disable state and notifications.

use std::cell::RefCell;
use std::rc::Rc;

use rstest::{fixture, rstest};
use serde_json::{json, Value};

use subform::domain::{
    CollectionShape, FnValidator, Form, FormError, GroupShape, LeafShape, Mapper, MinLength,
    Required, Shape, Snapshot, VariantSpec,
};
use subform::util::testing;

/// Root mapper that leaves inactive variant fields out of the domain value.
fn payment_mapper() -> Mapper {
    Mapper::new(
        |value| value.as_object().cloned().unwrap_or_default(),
        |rep| {
            Value::Object(
                rep.iter()
                    .filter(|(key, value)| !(matches!(key.as_str(), "card" | "bank") && value.is_null()))
                    .map(|(key, value)| (key.clone(), value.clone()))
                    .collect(),
            )
        },
    )
}

fn card() -> GroupShape {
    GroupShape::new(Mapper::projection(&["number", "holder"]))
        .child("number", LeafShape::new().validator(Required))
        .child("holder", LeafShape::new().validator(Required))
}

fn bank() -> GroupShape {
    GroupShape::new(Mapper::projection(&["iban", "holder"]))
        .child("iban", LeafShape::new().validator(Required))
        .child("holder", LeafShape::new().validator(Required))
}

fn payment() -> GroupShape {
    GroupShape::new(payment_mapper())
        .child("method", LeafShape::new().validator(Required))
        .child("note", LeafShape::new().default_value(""))
        .variants(
            VariantSpec::on("method")
                .variant("card", "card", card())
                .variant("bank", "bank", bank()),
        )
}

fn team() -> GroupShape {
    GroupShape::new(Mapper::identity())
        .child("name", LeafShape::new().validator(Required))
        .child(
            "tags",
            CollectionShape::new(LeafShape::new().validator(Required)).validator(MinLength(1)),
        )
}

#[fixture]
fn card_payment() -> Form {
    testing::init_test_setup();
    Form::create(
        payment(),
        &json!({
            "method": "card",
            "note": "",
            "card": { "number": "4111", "holder": "Ann" }
        }),
    )
    .expect("card payment")
}

fn counter() -> (Rc<RefCell<usize>>, impl FnMut(&Snapshot)) {
    let count = Rc::new(RefCell::new(0));
    let sink = count.clone();
    (count, move |_: &Snapshot| *sink.borrow_mut() += 1)
}

// ============================================================
// Construction and synchronization
// ============================================================

#[rstest]
fn given_valid_domain_value_when_created_then_round_trips_and_no_errors(card_payment: Form) {
    assert_eq!(
        card_payment.value(),
        &json!({
            "method": "card",
            "note": "",
            "card": { "number": "4111", "holder": "Ann" }
        })
    );
    assert!(card_payment.valid());
    assert_eq!(card_payment.errors(), None);
    assert_eq!(card_payment.snapshot().errors, None);
}

#[rstest]
fn given_leaf_edit_when_set_then_every_ancestor_recomputed(mut card_payment: Form) {
    card_payment.set_value("card.holder", "Bob").unwrap();

    assert_eq!(card_payment.value_at("card").unwrap()["holder"], json!("Bob"));
    assert_eq!(card_payment.value()["card"]["holder"], json!("Bob"));
    assert!(card_payment.is_dirty("card.holder").unwrap());
    assert!(card_payment.is_dirty("").unwrap());
    assert!(!card_payment.is_dirty("card.number").unwrap());
}

#[rstest]
fn given_subtree_write_when_written_then_children_updated_and_not_dirty(mut card_payment: Form) {
    card_payment
        .write_at("card", &json!({ "number": "5500", "holder": "Cy" }))
        .unwrap();

    assert_eq!(card_payment.value_at("card.number").unwrap(), &json!("5500"));
    assert_eq!(card_payment.value()["card"]["holder"], json!("Cy"));
    assert!(!card_payment.is_dirty("").unwrap());
}

#[rstest]
fn given_write_missing_field_when_written_then_leaf_default_restored(mut card_payment: Form) {
    card_payment.set_value("note", "urgent").unwrap();

    card_payment
        .write(&json!({ "method": "card", "card": { "number": "1", "holder": "A" } }))
        .unwrap();

    assert_eq!(card_payment.value_at("note").unwrap(), &json!(""));
}

// ============================================================
// Remapping
// ============================================================

#[rstest]
fn given_card_when_method_switched_to_bank_then_only_bank_fields_remain(mut card_payment: Form) {
    // Act
    card_payment.set_value("method", "bank").unwrap();

    // Assert
    assert_eq!(
        card_payment.value(),
        &json!({
            "method": "bank",
            "note": "",
            "bank": { "iban": null, "holder": "Ann" }
        })
    );
    assert!(matches!(
        card_payment.value_at("card.number"),
        Err(FormError::PathNotFound(_))
    ));
    assert_eq!(
        card_payment.errors().unwrap().to_json(),
        json!({ "bank": { "iban": { "required": true } } })
    );
}

#[rstest]
fn given_card_when_switched_away_and_back_then_exclusive_values_not_restored(mut card_payment: Form) {
    card_payment.set_value("method", "bank").unwrap();
    card_payment.set_value("method", "card").unwrap();

    assert_eq!(card_payment.value_at("card.number").unwrap(), &Value::Null);
    assert_eq!(card_payment.value_at("card.holder").unwrap(), &json!("Ann"));
}

#[rstest]
fn given_active_variant_when_discriminant_cleared_then_subtree_gone(mut card_payment: Form) {
    card_payment.set_value("method", Value::Null).unwrap();

    assert!(card_payment.value().get("card").is_none());
    assert_eq!(
        card_payment.errors().unwrap().to_json(),
        json!({ "method": { "required": true } })
    );
}

#[rstest]
fn given_card_when_root_written_with_bank_then_bank_built_from_written_value(mut card_payment: Form) {
    card_payment
        .write(&json!({
            "method": "bank",
            "bank": { "iban": "DE02", "holder": "Dee" }
        }))
        .unwrap();

    assert_eq!(card_payment.value_at("bank.iban").unwrap(), &json!("DE02"));
    assert!(card_payment.value_at("card").is_err());
    assert!(card_payment.valid());
}

#[rstest]
fn given_unknown_method_when_set_then_unknown_variant_and_state_kept(mut card_payment: Form) {
    // Arrange
    let before = card_payment.value().clone();
    let (count, listener) = counter();
    card_payment.subscribe(listener);

    // Act
    let err = card_payment.set_value("method", "cash").unwrap_err();

    // Assert
    assert!(matches!(err, FormError::UnknownVariant { .. }));
    assert_eq!(card_payment.value(), &before);
    assert_eq!(*count.borrow(), 0);
}

#[rstest]
fn given_undeclared_field_when_written_then_shape_mismatch_and_rolled_back(mut card_payment: Form) {
    let before = card_payment.value().clone();

    let err = card_payment
        .write(&json!({ "method": "bank", "cvv": "123" }))
        .unwrap_err();

    assert!(matches!(err, FormError::ShapeMismatch { ref field, .. } if field == "cvv"));
    assert_eq!(card_payment.value_at("method").unwrap(), &json!("card"));
    assert_eq!(card_payment.value(), &before);
}

// ============================================================
// Collections and error aggregation
// ============================================================

#[test]
fn given_invalid_first_element_when_aggregated_then_keyed_by_index() {
    let form = Form::create(team(), &json!({ "name": "Rebels", "tags": ["", "x-wing"] })).unwrap();

    assert_eq!(
        form.errors().unwrap().to_json(),
        json!({ "tags": { "0": { "required": true } } })
    );
}

#[test]
fn given_only_invalid_element_when_removed_then_form_valid() {
    let mut form = Form::create(team(), &json!({ "name": "Rebels", "tags": [""] })).unwrap();
    assert!(!form.valid());

    form.remove_at("tags", 0).unwrap();

    assert_eq!(form.len("tags").unwrap(), 0);
    assert_eq!(form.errors(), None);
}

#[test]
fn given_too_short_tag_list_when_aggregated_then_collection_tag_beside_items() {
    let shape = GroupShape::new(Mapper::identity()).child(
        "tags",
        CollectionShape::new(LeafShape::new().validator(Required)).validator(MinLength(2)),
    );

    let form = Form::create(shape, &json!({ "tags": [""] })).unwrap();

    assert_eq!(
        form.errors().unwrap().to_json(),
        json!({
            "tags": {
                "minLength": { "requiredLength": 2, "actualLength": 1 },
                "0": { "required": true }
            }
        })
    );
}

#[rstest]
#[case(json!(["a"]), json!(["a", "b", "c"]), 3)]
#[case(json!(["a", "b", "c"]), json!(["z"]), 1)]
#[case(json!(["a", "b"]), json!([]), 0)]
fn given_collection_when_written_with_other_length_then_resized(
    #[case] initial: Value,
    #[case] written: Value,
    #[case] expected_len: usize,
) {
    let mut form = Form::create(team(), &json!({ "name": "Rebels", "tags": initial })).unwrap();

    form.write_at("tags", &written).unwrap();

    assert_eq!(form.len("tags").unwrap(), expected_len);
    assert_eq!(form.value()["tags"], written);
}

#[test]
fn given_collection_when_appended_and_removed_then_value_tracks_items() {
    // Arrange
    let mut form = Form::create(team(), &json!({ "name": "Rebels", "tags": ["a"] })).unwrap();

    // Act
    let position = form.append("tags", &json!("b")).unwrap();
    let removed = form.remove_at("tags", 0).unwrap();

    // Assert
    assert_eq!(position, 1);
    assert_eq!(removed, json!("a"));
    assert_eq!(form.value()["tags"], json!(["b"]));
    assert_eq!(form.value_at("tags.0").unwrap(), &json!("b"));
}

/// Team shape whose tag elements come from a factory that records each call.
fn recorded_team(calls: Rc<RefCell<Vec<String>>>) -> GroupShape {
    team().collection_factory(move |key, value| {
        calls.borrow_mut().push(format!("{key}:{value}"));
        Shape::from(LeafShape::new().validator(Required))
    })
}

#[test]
fn given_collection_factory_when_appended_then_invoked_once_with_key_and_value() {
    // Arrange
    let calls = Rc::new(RefCell::new(Vec::new()));
    let mut form = Form::create(recorded_team(calls.clone()), &json!({ "name": "Rebels", "tags": [] }))
        .unwrap();

    // Act
    form.append("tags", &json!("a")).unwrap();

    // Assert
    assert_eq!(*calls.borrow(), vec![r#"tags:"a""#.to_string()]);
}

#[test]
fn given_collection_factory_when_write_grows_collection_then_invoked_once_per_new_item() {
    // Arrange
    let calls = Rc::new(RefCell::new(Vec::new()));
    let mut form = Form::create(recorded_team(calls.clone()), &json!({ "name": "Rebels", "tags": ["a"] }))
        .unwrap();
    calls.borrow_mut().clear();

    // Act
    form.write_at("tags", &json!(["a", "b", "c"])).unwrap();

    // Assert
    assert_eq!(
        *calls.borrow(),
        vec![r#"tags:"b""#.to_string(), r#"tags:"c""#.to_string()]
    );
    assert_eq!(form.value()["tags"], json!(["a", "b", "c"]));
}

#[rstest]
#[case("tags", 5)]
fn given_out_of_range_index_when_removing_then_index_out_of_range(#[case] path: &str, #[case] index: usize) {
    let mut form = Form::create(team(), &json!({ "name": "Rebels", "tags": ["a"] })).unwrap();

    let err = form.remove_at(path, index).unwrap_err();

    assert!(matches!(err, FormError::IndexOutOfRange { len: 1, .. }));
    assert_eq!(form.len("tags").unwrap(), 1);
}

#[test]
fn given_leaf_path_when_appending_then_not_a_collection() {
    let mut form = Form::create(team(), &json!({ "name": "Rebels", "tags": [] })).unwrap();

    let err = form.append("name", &json!("x")).unwrap_err();

    assert!(matches!(err, FormError::NotACollection(_)));
}

#[test]
fn given_group_validator_when_cross_field_rule_fails_then_tag_beside_field_errors() {
    // Arrange
    let shape = GroupShape::new(Mapper::identity())
        .child("password", LeafShape::new().validator(Required))
        .child("confirm", LeafShape::new())
        .validator(FnValidator::predicate("mismatch", |v| v["password"] == v["confirm"]));

    // Act
    let form = Form::create(shape, &json!({ "password": "", "confirm": "x" })).unwrap();

    // Assert
    assert_eq!(
        form.errors().unwrap().to_json(),
        json!({ "mismatch": true, "password": { "required": true } })
    );
}

// ============================================================
// Disable state
// ============================================================

#[rstest]
fn given_root_disabled_when_queried_then_every_descendant_non_interactive(mut card_payment: Form) {
    card_payment.disable("").unwrap();

    for path in ["", "method", "note", "card", "card.number", "card.holder"] {
        assert!(!card_payment.is_interactive(path).unwrap(), "{path} still interactive");
    }
}

#[rstest]
fn given_independently_disabled_leaf_when_root_reenabled_then_leaf_stays_disabled(mut card_payment: Form) {
    // Arrange
    card_payment.disable("card.number").unwrap();
    card_payment.disable("").unwrap();

    // Act
    card_payment.enable("").unwrap();

    // Assert
    assert!(card_payment.is_interactive("card").unwrap());
    assert!(card_payment.is_interactive("card.holder").unwrap());
    assert!(card_payment.is_disabled("card.number").unwrap());
}

#[rstest]
fn given_disabled_invalid_leaf_when_aggregated_then_error_still_reported(mut card_payment: Form) {
    card_payment.set_value("card.number", "").unwrap();
    card_payment.disable("card.number").unwrap();

    assert!(card_payment
        .errors()
        .unwrap()
        .at(&"card.number".parse().unwrap())
        .unwrap()
        .has_tag("required"));
}

// ============================================================
// Notifications, flags and output
// ============================================================

#[rstest]
fn given_remap_when_subscribed_then_single_settled_snapshot(mut card_payment: Form) {
    // Arrange
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = seen.clone();
    card_payment.subscribe(move |s: &Snapshot| sink.borrow_mut().push(s.clone()));

    // Act
    card_payment.set_value("method", "bank").unwrap();

    // Assert
    let seen = seen.borrow();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].value["method"], json!("bank"));
    assert!(!seen[0].valid);
}

#[rstest]
fn given_node_listener_in_torn_down_variant_when_variant_rebuilt_then_never_called(
    mut card_payment: Form,
) {
    // Arrange
    let calls = Rc::new(RefCell::new(Vec::<Value>::new()));
    let sink = calls.clone();
    card_payment
        .subscribe_at("card.number", move |v: &Value| sink.borrow_mut().push(v.clone()))
        .unwrap();

    // Act
    card_payment.set_value("method", "bank").unwrap();
    card_payment.set_value("method", "card").unwrap();
    card_payment.set_value("card.number", "4000").unwrap();

    // Assert
    assert!(calls.borrow().is_empty());
}

#[test]
fn given_listener_on_variant_group_when_discriminant_switched_then_notified_with_new_variant() {
    // Arrange
    testing::init_test_setup();
    let shape = GroupShape::new(Mapper::identity()).child("payment", payment());
    let mut form = Form::create(
        shape,
        &json!({ "payment": { "method": "card", "note": "", "card": { "number": "4111", "holder": "Ann" } } }),
    )
    .unwrap();
    let calls = Rc::new(RefCell::new(Vec::<Value>::new()));
    let sink = calls.clone();
    form.subscribe_at("payment", move |v: &Value| sink.borrow_mut().push(v.clone()))
        .unwrap();

    // Act
    form.set_value("payment.method", "bank").unwrap();

    // Assert
    let calls = calls.borrow();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0]["method"], json!("bank"));
    assert_eq!(calls[0]["bank"], json!({ "iban": null, "holder": "Ann" }));
    assert!(calls[0].get("card").is_none());
}

#[rstest]
fn given_node_listener_when_leaf_edited_then_receives_new_value(mut card_payment: Form) {
    let calls = Rc::new(RefCell::new(Vec::<Value>::new()));
    let sink = calls.clone();
    let subscription = card_payment
        .subscribe_at("note", move |v: &Value| sink.borrow_mut().push(v.clone()))
        .unwrap();

    card_payment.set_value("note", "first").unwrap();
    assert!(card_payment.unsubscribe(subscription));
    card_payment.set_value("note", "second").unwrap();

    assert_eq!(*calls.borrow(), vec![json!("first")]);
}

#[rstest]
fn given_touched_and_dirty_form_when_reset_then_flags_cleared(mut card_payment: Form) {
    // Arrange
    card_payment.set_value("note", "x").unwrap();
    card_payment.mark_touched("card").unwrap();
    assert!(card_payment.is_touched("card.number").unwrap());

    // Act
    let value = card_payment.value().clone();
    card_payment.reset(&value).unwrap();

    // Assert
    assert!(!card_payment.is_dirty("").unwrap());
    assert!(!card_payment.is_touched("").unwrap());
}

#[rstest]
fn given_user_edit_when_output_then_emitted_until_written_back(mut card_payment: Form) {
    assert_eq!(card_payment.output(), None);

    card_payment.set_value("note", "gift").unwrap();
    let out = card_payment.output().expect("changed valid value");
    assert_eq!(out["note"], json!("gift"));

    card_payment.write(&out).unwrap();
    assert_eq!(card_payment.output(), None);
}

#[rstest]
fn given_invalid_edit_when_output_then_none(mut card_payment: Form) {
    card_payment.set_value("card.number", "").unwrap();

    assert_eq!(card_payment.output(), None);
}

#[rstest]
fn given_disposed_form_when_dropped_then_listeners_released(mut card_payment: Form) {
    let (count, listener) = counter();
    card_payment.subscribe(listener);

    card_payment.dispose();

    assert_eq!(Rc::strong_count(&count), 1);
}

#[rstest]
fn given_form_when_described_then_tree_lists_active_variant(card_payment: Form) {
    let text = card_payment.describe().to_string();

    assert!(text.contains("variant \"card\""), "{text}");
    assert!(text.contains("number = \"4111\""), "{text}");
    assert!(!text.contains("iban"));
}
