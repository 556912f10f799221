//! Tests for TreeBuilder tree assembly

use rstest::rstest;
use serde_json::{json, Value};

use restree::domain::{FieldError, LinkFields, Record, RecordId, TreeBuilder};
use restree::util::testing;

/// Ten records: two roots (1 and 6) with nested children.
fn canonical_records() -> Vec<Value> {
    [(1, 0), (2, 1), (3, 1), (4, 2), (5, 4), (6, 0), (7, 6), (8, 6), (9, 8), (10, 8)]
        .iter()
        .map(|&(id, pid)| json!({"id": id, "pid": pid, "title": format!("Item {}", id)}))
        .collect()
}

fn ints(ids: &[i64]) -> Vec<RecordId> {
    ids.iter().map(|&id| RecordId::Int(id)).collect()
}

#[test]
fn given_canonical_records_when_building_tree_then_nests_children() {
    testing::init_test_setup();
    // Arrange
    let mut builder = TreeBuilder::new(canonical_records());

    // Act
    let tree = builder.build_tree(None);

    // Assert
    assert_eq!(tree.top_level_ids(), ints(&[1, 6]));
    let one = tree.root().child(&RecordId::Int(1)).expect("node 1");
    assert_eq!(one.child_ids(), ints(&[2, 3]));
    let two = one.child(&RecordId::Int(2)).expect("node 2");
    assert_eq!(two.child_ids(), ints(&[4]));
    let four = two.child(&RecordId::Int(4)).expect("node 4");
    assert_eq!(four.child_ids(), ints(&[5]));
    assert!(one.child(&RecordId::Int(3)).expect("node 3").is_leaf());

    let six = tree.root().child(&RecordId::Int(6)).expect("node 6");
    assert_eq!(six.child_ids(), ints(&[7, 8]));
    let eight = six.child(&RecordId::Int(8)).expect("node 8");
    assert_eq!(eight.child_ids(), ints(&[9, 10]));
}

#[test]
fn given_canonical_records_when_building_tree_then_nodes_carry_index_and_data() {
    let mut builder = TreeBuilder::new(canonical_records());

    let tree = builder.build_tree(None);

    let four = tree.get(&RecordId::Int(4)).expect("node 4");
    assert_eq!(four.index(), Some(3));
    assert_eq!(four.data().expect("data")["title"], "Item 4");

    let root = tree.root();
    assert_eq!(root.id(), None);
    assert!(root.data().is_none());
}

#[test]
fn given_canonical_records_when_building_tree_then_reports_depth_and_leaves() {
    let mut builder = TreeBuilder::new(canonical_records());

    let tree = builder.build_tree(None);

    assert_eq!(tree.depth(), 4);
    assert_eq!(tree.leaf_ids(), ints(&[5, 3, 7, 9, 10]));
}

#[rstest]
#[case(4, &[5])]
#[case(6, &[7, 8])]
#[case(8, &[9, 10])]
#[case(1, &[2, 3])]
#[case(5, &[])]
#[case(99, &[])]
fn given_filter_when_building_tree_then_top_level_is_children_of_filter(
    #[case] filter: i64,
    #[case] expected: &[i64],
) {
    let mut builder = TreeBuilder::new(canonical_records());

    let tree = builder.build_tree(Some(&RecordId::Int(filter)));

    assert_eq!(tree.top_level_ids(), ints(expected));
    assert_eq!(tree.arena().filter(), Some(&RecordId::Int(filter)));
}

#[test]
fn given_filter_when_building_tree_then_keeps_full_subtrees() {
    let mut builder = TreeBuilder::new(canonical_records());

    let tree = builder.build_tree(Some(&RecordId::Int(6)));

    let eight = tree.root().child(&RecordId::Int(8)).expect("node 8");
    assert_eq!(eight.child_ids(), ints(&[9, 10]));
    assert!(tree.root().child(&RecordId::Int(1)).is_none());
}

#[test]
fn given_sentinel_filter_when_building_tree_then_builds_full_tree() {
    let mut builder = TreeBuilder::new(canonical_records());

    let tree = builder.build_tree(Some(&RecordId::Int(0)));

    assert_eq!(tree.top_level_ids(), ints(&[1, 6]));
    assert_eq!(tree.arena().filter(), None);
}

#[test]
fn given_unmatched_filter_when_building_tree_then_returns_empty_tree() {
    let mut builder = TreeBuilder::new(canonical_records());

    let tree = builder.build_tree(Some(&RecordId::from("nope")));

    assert!(tree.is_empty());
    assert_eq!(tree.iter().count(), 0);
}

#[test]
fn given_orphan_when_building_tree_then_promotes_to_root() {
    // Arrange
    let records = vec![
        json!({"id": 1, "pid": 0}),
        json!({"id": 2, "pid": 99}),
        json!({"id": 3, "pid": 2}),
    ];
    let mut builder = TreeBuilder::new(records);

    // Act
    let tree = builder.build_tree(None);

    // Assert
    assert_eq!(tree.top_level_ids(), ints(&[1, 2]));
    let two = tree.root().child(&RecordId::Int(2)).expect("node 2");
    assert_eq!(two.child_ids(), ints(&[3]));
    assert_eq!(builder.parent_of(1), None);
    assert_eq!(builder.records()[1]["pid"], Value::Null);
}

#[test]
fn given_orphans_when_sanitizing_twice_then_second_run_promotes_none() {
    let records = vec![
        json!({"id": 1, "pid": 42}),
        json!({"id": 2, "pid": 1}),
        json!({"id": 3, "pid": 43}),
    ];
    let mut builder = TreeBuilder::new(records);

    assert_eq!(builder.sanitize_orphans(), 2);
    assert_eq!(builder.sanitize_orphans(), 0);
    assert_eq!(builder.parent_of(1), Some(&RecordId::Int(1)));
}

#[test]
fn given_orphan_when_building_filtered_tree_then_skips_sanitizing() {
    // Arrange
    let records = vec![json!({"id": 1, "pid": 0}), json!({"id": 2, "pid": 99})];
    let mut builder = TreeBuilder::new(records);

    // Act
    let filtered = builder.build_tree(Some(&RecordId::Int(99))).top_level_ids();
    let parent_after_filter = builder.parent_of(1).cloned();
    let full = builder.build_tree(None).top_level_ids();

    // Assert
    assert_eq!(filtered, ints(&[2]));
    assert_eq!(parent_after_filter, Some(RecordId::Int(99)));
    assert_eq!(full, ints(&[1, 2]));
}

#[test]
fn given_same_builder_when_building_twice_then_trees_match() {
    let mut builder = TreeBuilder::new(canonical_records());

    let shape = |builder: &mut TreeBuilder<Value>| -> Vec<(usize, Option<RecordId>, Option<usize>)> {
        builder
            .build_tree(None)
            .iter()
            .map(|(depth, node)| (depth, node.id().cloned(), node.index()))
            .collect()
    };
    let first = shape(&mut builder);
    let second = shape(&mut builder);

    assert_eq!(first.len(), 10);
    assert_eq!(first, second);
}

#[test]
fn given_duplicate_ids_when_building_tree_then_last_record_wins() {
    let records = vec![
        json!({"id": 1, "pid": 0, "title": "first"}),
        json!({"id": 2, "pid": 1}),
        json!({"id": 1, "pid": 0, "title": "second"}),
    ];
    let mut builder = TreeBuilder::new(records);

    let tree = builder.build_tree(None);

    assert_eq!(tree.top_level_ids(), ints(&[1]));
    let one = tree.root().child(&RecordId::Int(1)).expect("node 1");
    assert_eq!(one.index(), Some(2));
    assert_eq!(one.data().expect("data")["title"], "second");
    assert_eq!(one.child_ids(), ints(&[2]));
}

#[test]
fn given_child_before_parent_when_building_tree_then_links_later_parent() {
    let records = vec![
        json!({"id": 3, "pid": 2}),
        json!({"id": 2, "pid": 1}),
        json!({"id": 1, "pid": 0}),
    ];
    let mut builder = TreeBuilder::new(records);

    let tree = builder.build_tree(None);

    assert_eq!(tree.top_level_ids(), ints(&[1]));
    let order: Vec<_> = tree.iter().filter_map(|(_, node)| node.id().cloned()).collect();
    assert_eq!(order, ints(&[1, 2, 3]));
}

#[test]
fn given_custom_fields_when_building_tree_then_uses_them() {
    let records = vec![
        json!({"key": "fruit", "parent_key": null}),
        json!({"key": "apple", "parent_key": "fruit"}),
        json!({"key": "pear", "parent_key": "fruit"}),
        json!({"key": "veg", "parent_key": ""}),
    ];
    let mut builder = TreeBuilder::with_fields(records, LinkFields::new("key", "parent_key"));

    let tree = builder.build_tree(None);

    assert_eq!(
        tree.top_level_ids(),
        vec![RecordId::from("fruit"), RecordId::from("veg")]
    );
    let fruit = tree.root().child(&RecordId::from("fruit")).expect("fruit");
    assert_eq!(
        fruit.child_ids(),
        vec![RecordId::from("apple"), RecordId::from("pear")]
    );
}

#[test]
fn given_numeric_strings_when_building_tree_then_match_numbers() {
    let records = vec![json!({"id": "1", "pid": "0"}), json!({"id": 2, "pid": "1"})];
    let mut builder = TreeBuilder::new(records);

    let tree = builder.build_tree(None);

    assert_eq!(tree.top_level_ids(), ints(&[1]));
    assert_eq!(
        tree.root().child(&RecordId::Int(1)).expect("node 1").child_ids(),
        ints(&[2])
    );
}

#[test]
fn given_records_without_id_when_building_tree_then_places_them_by_parent() {
    let records = vec![
        json!({"pid": 0, "title": "no id"}),
        json!({"id": [1], "pid": 0}),
        json!({"id": 1, "pid": 0}),
        json!({"id": 2, "pid": true}),
        json!({"pid": 1, "title": "no id below 1"}),
    ];
    let mut builder = TreeBuilder::new(records);

    let tree = builder.build_tree(None);

    assert_eq!(tree.top_level_ids(), ints(&[1, 2]));
    let top: Vec<_> = tree.top_level().map(|n| n.index()).collect();
    assert_eq!(top, vec![Some(0), Some(1), Some(2), Some(3)]);
    let one = tree.get(&RecordId::Int(1)).expect("1");
    let below: Vec<_> = one.children().map(|n| (n.id().cloned(), n.index())).collect();
    assert_eq!(below, vec![(None, Some(4))]);
    assert!(one.child_ids().is_empty());
    assert_eq!(builder.flatten(None, false).len(), 5);
}

#[test]
fn given_record_without_id_under_filter_when_building_tree_then_is_top_level() {
    let records = vec![
        json!({"id": 1, "pid": 0}),
        json!({"pid": 1, "title": "no id"}),
        json!({"pid": 0, "title": "outside"}),
    ];
    let mut builder = TreeBuilder::new(records);

    let tree = builder.build_tree(Some(&RecordId::Int(1)));

    let top: Vec<_> = tree.top_level().map(|n| n.index()).collect();
    assert_eq!(top, vec![Some(1)]);
}

#[test]
fn given_tree_when_rendering_then_prints_one_line_per_node() {
    let mut builder = TreeBuilder::new(canonical_records());

    let tree = builder.build_tree(None);
    let rendered = tree
        .to_termtree(|node| {
            node.data()
                .and_then(|r| r["title"].as_str())
                .unwrap_or_default()
                .to_string()
        })
        .to_string();

    assert_eq!(rendered.lines().count(), 11);
    assert!(rendered.contains("Item 5"));
    assert!(rendered.contains("Item 10"));
}

/// Row type exposing its linking fields under its own names.
#[derive(Debug)]
struct Category {
    code: u32,
    parent: Option<u32>,
    name: &'static str,
}

impl Record for Category {
    fn link_field(&self, field: &str) -> Result<Option<RecordId>, FieldError> {
        match field {
            "code" => Ok(Some(self.code.into())),
            "parent" => Ok(self.parent.map(RecordId::from)),
            _ => Ok(None),
        }
    }

    fn clear_link_field(&mut self, field: &str) {
        if field == "parent" {
            self.parent = None;
        }
    }
}

#[test]
fn given_custom_record_type_when_building_tree_then_links_and_sanitizes() {
    let records = vec![
        Category { code: 10, parent: None, name: "tools" },
        Category { code: 11, parent: Some(10), name: "hammers" },
        Category { code: 12, parent: Some(77), name: "lost" },
    ];
    let mut builder = TreeBuilder::with_fields(records, LinkFields::new("code", "parent"));

    let tree = builder.build_tree(None);
    assert_eq!(tree.top_level_ids(), ints(&[10, 12]));

    let names: Vec<_> = builder.flatten(None, false).iter().map(|c| c.name).collect();
    assert_eq!(names, ["tools", "hammers", "lost"]);
    assert_eq!(builder.records()[2].parent, None);
}
