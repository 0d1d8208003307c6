//! Testing utilities for the Shift workspace
//!
//! A small versioned "game save" model and helpers for building values of
//! it. Versions:
//!
//! | key | change                                          | fix                  |
//! |-----|-------------------------------------------------|----------------------|
//! | 0   | initial types                                   |                      |
//! | 10  | `Player.name` and `Board.shapes` renamed        | two renames          |
//! | 20  | `Shape` gains `triangle`                        | none                 |
//! | 30  | `Tree.value` becomes a long                     | re-encode `Tree`     |
//! | 40  | `count` of every `Inventory` entry is a long    | re-encode `Inventory`|

#![allow(missing_docs)]

use std::sync::Arc;

use shift_core::{DataFixer, DataFixerBuilder, FixerConfig, RenameFieldFix, WidenTypeFix};
use shift_dynamic::Value;
use shift_types::dsl::*;
use shift_types::{make_key, Primitive, Schema, SchemaBuilder, Type, TypeTemplate};
use tracing_subscriber::EnvFilter;

pub const V0: u32 = make_key(0, 0);
pub const V1: u32 = make_key(1, 0);
pub const V2: u32 = make_key(2, 0);
pub const V3: u32 = make_key(3, 0);
pub const V4: u32 = make_key(4, 0);

/// Install a test subscriber honouring `RUST_LOG`; repeat calls are no-ops
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn shape_alternatives(triangle: bool) -> Vec<(&'static str, TypeTemplate)> {
    let mut alternatives = vec![
        ("circle", fields([("r", int_type())])),
        ("square", fields([("s", int_type())])),
    ];
    if triangle {
        alternatives.push(("triangle", fields([("b", int_type()), ("h", int_type())])));
    }
    alternatives
}

fn shape(triangle: bool) -> TypeTemplate {
    tagged_choice(
        "type",
        Type::primitive(Primitive::String),
        shape_alternatives(triangle),
    )
}

fn inventory(count: TypeTemplate) -> TypeTemplate {
    list(all_with_remainder([
        field("id", string_type()),
        field("count", count),
    ]))
}

/// Every schema version of the game model, oldest first
#[must_use]
pub fn game_schemas() -> Vec<Arc<Schema>> {
    let mut v0 = SchemaBuilder::new(V0);
    let shape_ref = v0.id("Shape");
    let tree_ref = v0.id("Tree");
    v0.register("Player", all_with_remainder([field("name", string_type())]))
        .register("Shape", shape(false))
        .register("Board", all_with_remainder([field("shapes", list(shape_ref.clone()))]))
        .register("Inventory", inventory(int_type()))
        .register(
            "Tree",
            all_with_remainder([field("value", int_type()), field("children", list(tree_ref.clone()))]),
        );
    let v0 = Arc::new(build(v0));

    let mut v1 = SchemaBuilder::from_parent(V1, &v0);
    v1.register("Player", all_with_remainder([field("displayName", string_type())]))
        .register("Board", all_with_remainder([field("pieces", list(shape_ref))]));
    let v1 = Arc::new(build(v1));

    let mut v2 = SchemaBuilder::from_parent(V2, &v1);
    v2.register("Shape", shape(true));
    let v2 = Arc::new(build(v2));

    let mut v3 = SchemaBuilder::from_parent(V3, &v2);
    v3.register(
        "Tree",
        all_with_remainder([field("value", long_type()), field("children", list(tree_ref))]),
    );
    let v3 = Arc::new(build(v3));

    let mut v4 = SchemaBuilder::from_parent(V4, &v3);
    v4.register("Inventory", inventory(long_type()));
    let v4 = Arc::new(build(v4));

    vec![v0, v1, v2, v3, v4]
}

#[allow(clippy::needless_pass_by_value)]
fn build(builder: SchemaBuilder) -> Schema {
    match builder.build() {
        Ok(schema) => schema,
        Err(e) => panic!("fixture schema is invalid: {e}"),
    }
}

/// Builder with every game schema and fix registered
#[must_use]
pub fn game_builder(config: FixerConfig) -> DataFixerBuilder {
    let mut builder = DataFixerBuilder::new(config);
    for schema in game_schemas() {
        builder.add_schema(schema);
    }
    builder
        .add_fix(RenameFieldFix::new(V1, "Player", "name", "displayName"))
        .add_fix(RenameFieldFix::new(V1, "Board", "shapes", "pieces"))
        .add_fix(WidenTypeFix::new(V3, "Tree"))
        .add_fix(WidenTypeFix::new(V4, "Inventory"));
    builder
}

/// Fixer over the game model
#[must_use]
pub fn game_fixer(config: FixerConfig) -> DataFixer {
    match game_builder(config).build() {
        Ok(fixer) => fixer,
        Err(e) => panic!("fixture fixer is invalid: {e}"),
    }
}

pub fn circle(r: i32) -> Value {
    Value::map([("type", Value::from("circle")), ("r", Value::from(r))])
}

pub fn square(s: i32) -> Value {
    Value::map([("type", Value::from("square")), ("s", Value::from(s))])
}

pub fn triangle(b: i32, h: i32) -> Value {
    Value::map([
        ("type", Value::from("triangle")),
        ("b", Value::from(b)),
        ("h", Value::from(h)),
    ])
}

pub fn entry(id: &str, count: impl Into<Value>) -> Value {
    Value::map([("id", Value::from(id)), ("count", count.into())])
}

pub fn tree<V: Into<Value>>(value: V, children: Vec<Value>) -> Value {
    Value::map([("value", value.into()), ("children", Value::List(children))])
}

/// Spine of `depth` nodes holding their depth, each with a leaf sibling
#[must_use]
pub fn deep_tree(depth: i32) -> Value {
    let mut node = tree(depth, vec![]);
    for level in (0..depth).rev() {
        node = tree(level, vec![node, tree(level + 100, vec![])]);
    }
    node
}

/// [`deep_tree`] with every value widened to a long
#[must_use]
pub fn deep_tree_long(depth: i32) -> Value {
    let mut node = tree(i64::from(depth), vec![]);
    for level in (0..depth).rev() {
        node = tree(
            i64::from(level),
            vec![node, tree(i64::from(level + 100), vec![])],
        );
    }
    node
}
