//! Property-based tests for markup documents.
//!
//! Generates random element trees, writes them out and reads them back,
//! and checks that the child list and the name index never disagree.

use proptest::prelude::*;
use thunderstorm_common::MemoryStream;
use thunderstorm_common::{Origin, Stream};
use thunderstorm_markup::{ElemId, ElemShape, InfoFile, InfoTree, Variable};

// ===========================================================================
// Generators
// ===========================================================================

#[derive(Debug, Clone)]
enum Node {
    Value(String, Variable),
    List(String, Vec<Variable>),
    ValueBlock(String, Variable, Vec<Node>),
    Block(String, Vec<Node>),
}

fn arb_name() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{0,5}"
}

fn arb_value() -> impl Strategy<Value = Variable> {
    prop_oneof![
        any::<i32>().prop_map(Variable::Int),
        any::<u32>().prop_map(Variable::Dword),
        any::<bool>().prop_map(Variable::Bool),
        // Quarter steps print exactly
        (-4000..4000i32).prop_map(|n| Variable::Float(n as f32 / 4.0)),
        "[A-Za-z0-9 _.-]{0,10}".prop_map(Variable::string),
        arb_name()
            .prop_filter("bool words", |n| n != "true" && n != "false")
            .prop_map(Variable::enum_name),
    ]
}

fn arb_node() -> impl Strategy<Value = Node> {
    let leaf = prop_oneof![
        (arb_name(), arb_value()).prop_map(|(n, v)| Node::Value(n, v)),
        // A single-value list reads back as a plain value
        (arb_name(), proptest::collection::vec(arb_value(), 2..5))
            .prop_map(|(n, vs)| Node::List(n, vs)),
    ];
    leaf.prop_recursive(4, 48, 6, |inner| {
        prop_oneof![
            (arb_name(), proptest::collection::vec(inner.clone(), 0..6))
                .prop_map(|(n, cs)| Node::Block(n, cs)),
            (arb_name(), arb_value(), proptest::collection::vec(inner, 0..6))
                .prop_map(|(n, v, cs)| Node::ValueBlock(n, v, cs)),
        ]
    })
}

fn arb_document() -> impl Strategy<Value = InfoFile> {
    (arb_name(), proptest::collection::vec(arb_node(), 0..8)).prop_map(|(name, children)| {
        let mut doc = InfoFile::new();
        let root = doc.create_set_root(name);
        for child in &children {
            build(doc.tree_mut(), root, child);
        }
        doc
    })
}

fn build(tree: &mut InfoTree, parent: ElemId, node: &Node) {
    match node {
        Node::Value(name, value) => {
            tree.create_value(parent, name.as_str(), value.clone()).unwrap();
        }
        Node::List(name, values) => {
            let id = tree.create_child(parent, name.as_str(), ElemShape::ValueList).unwrap();
            tree.from_values(id, values.iter().cloned()).unwrap();
        }
        Node::ValueBlock(name, value, children) => {
            let id = tree.create_child(parent, name.as_str(), ElemShape::ValueBlock).unwrap();
            tree.set_value(id, value.clone()).unwrap();
            for child in children {
                build(tree, id, child);
            }
        }
        Node::Block(name, children) => {
            let id = tree.create_child(parent, name.as_str(), ElemShape::Block).unwrap();
            for child in children {
                build(tree, id, child);
            }
        }
    }
}

/// Every name index entry lists exactly the same-named children, in order
fn index_consistent(tree: &InfoTree, id: ElemId) -> bool {
    let children = tree.children(id);
    children.iter().all(|&child| {
        let name = tree[child].name();
        let expected: Vec<ElemId> = children
            .iter()
            .copied()
            .filter(|&c| tree[c].name() == name)
            .collect();
        tree.find_children(id, name, false) == expected
            && tree.parent(child) == Some(id)
            && index_consistent(tree, child)
    })
}

#[derive(Debug, Clone)]
enum MutOp {
    Add(String),
    Insert(usize, String),
    Remove(usize),
    Rename(usize, String),
}

fn arb_mutations() -> impl Strategy<Value = Vec<MutOp>> {
    // Few distinct names so siblings collide often
    let name = prop_oneof![Just("a"), Just("b"), Just("c")].prop_map(String::from);
    proptest::collection::vec(
        prop_oneof![
            name.clone().prop_map(MutOp::Add),
            (0..12usize, name.clone()).prop_map(|(i, n)| MutOp::Insert(i, n)),
            (0..12usize).prop_map(MutOp::Remove),
            (0..12usize, name).prop_map(|(i, n)| MutOp::Rename(i, n)),
        ],
        1..40,
    )
}

// ===========================================================================
// Properties
// ===========================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Writing then reading gives back an equal tree
    #[test]
    fn text_round_trip(doc in arb_document()) {
        let text = doc.to_markup_string();
        let mut parsed = InfoFile::new();
        parsed.parse_str(&text).unwrap();
        prop_assert_eq!(&parsed, &doc);
    }

    /// Serialization is a fixed point after one pass
    #[test]
    fn serialize_is_stable(doc in arb_document()) {
        let first = doc.to_markup_string();
        let mut parsed = InfoFile::new();
        parsed.parse_str(&first).unwrap();
        prop_assert_eq!(parsed.to_markup_string(), first);
    }

    /// The unicode stream form reads back too
    #[test]
    fn stream_round_trip(doc in arb_document()) {
        let mut stream = MemoryStream::new("prop.th");
        doc.serialize(&mut stream).unwrap();
        stream.set_position(0, Origin::Begin).unwrap();

        let mut loaded = InfoFile::new();
        loaded.deserialize(&mut stream).unwrap();
        prop_assert_eq!(&loaded, &doc);
    }

    /// Built trees and parsed trees keep child list and index in lockstep
    #[test]
    fn index_matches_children(doc in arb_document()) {
        let root = doc.root().unwrap();
        prop_assert!(index_consistent(doc.tree(), root));

        let mut parsed = InfoFile::new();
        parsed.parse_str(&doc.to_markup_string()).unwrap();
        prop_assert!(index_consistent(parsed.tree(), parsed.root().unwrap()));
    }

    /// Arbitrary add / insert / remove / rename sequences keep the index exact
    #[test]
    fn mutations_keep_index(ops in arb_mutations()) {
        let mut tree = InfoTree::new();
        let root = tree.create_root("root");

        for op in ops {
            let children = tree.children(root).to_vec();
            match op {
                MutOp::Add(name) => {
                    tree.create_child(root, name, ElemShape::Block).unwrap();
                }
                MutOp::Insert(at, name) => {
                    let id = tree.create(name, ElemShape::Block);
                    tree.insert_child(root, at, id).unwrap();
                }
                MutOp::Remove(i) => {
                    if let Some(&child) = children.get(i) {
                        tree.remove_child(root, child).unwrap();
                    }
                }
                MutOp::Rename(i, name) => {
                    if let Some(&child) = children.get(i) {
                        tree.set_name(child, name).unwrap();
                    }
                }
            }
            prop_assert!(index_consistent(&tree, root));
        }
        prop_assert_eq!(tree.len(), tree.children(root).len() + 1);
    }
}
